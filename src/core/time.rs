use std::str::FromStr;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::EpochMillis;

/// Zones timestamps can be normalized between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Local,
    Utc,
    Fixed(FixedOffset),
    Named(Tz),  // IANA name, e.g. "America/New_York"
}

impl FromStr for Zone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" | "Local" => Ok(Zone::Local),
            "utc" | "UTC" | "Z" => Ok(Zone::Utc),
            other => FixedOffset::from_str(other)
                .map(Zone::Fixed)
                .or_else(|_| other.parse::<Tz>().map(Zone::Named))
                .map_err(|_| Error::new(
                    ErrorKind::InvalidArgument,
                    format!("Unknown timezone '{}', expected local, utc, +HH:MM or an IANA name", other),
                )),
        }
    }
}

fn wall_clock(ts: EpochMillis, zone: Zone) -> Result<NaiveDateTime> {
    let instant = DateTime::<Utc>::from_timestamp_millis(ts).ok_or_else(|| {
        Error::new(ErrorKind::InvalidArgument, format!("Timestamp {} out of range", ts))
    })?;
    Ok(match zone {
        Zone::Local => instant.with_timezone(&Local).naive_local(),
        Zone::Utc => instant.naive_utc(),
        Zone::Fixed(offset) => instant.with_timezone(&offset).naive_local(),
        Zone::Named(tz) => instant.with_timezone(&tz).naive_local(),
    })
}

fn from_wall_clock(local: &NaiveDateTime, zone: Zone) -> Result<EpochMillis> {
    // Ambiguous wall clocks (DST fold) resolve to the earliest instant
    let resolved = match zone {
        Zone::Local => Local.from_local_datetime(local).earliest().map(|t| t.timestamp_millis()),
        Zone::Utc => Some(Utc.from_utc_datetime(local).timestamp_millis()),
        Zone::Fixed(offset) => offset.from_local_datetime(local).earliest().map(|t| t.timestamp_millis()),
        Zone::Named(tz) => tz.from_local_datetime(local).earliest().map(|t| t.timestamp_millis()),
    };
    resolved.ok_or_else(|| Error::new(
        ErrorKind::InvalidArgument,
        format!("Wall clock {} does not exist in {:?}", local, zone),
    ))
}

/// Re-reads the wall clock `ts` shows in `source` as a wall clock in `target`.
pub fn source_to_target(ts: EpochMillis, source: Zone, target: Zone) -> Result<EpochMillis> {
    if source == target {
        return Ok(ts);
    }
    from_wall_clock(&wall_clock(ts, source)?, target)
}

pub fn local_to_utc(ts: EpochMillis) -> Result<EpochMillis> {
    source_to_target(ts, Zone::Local, Zone::Utc)
}

pub fn utc_to_local(ts: EpochMillis) -> Result<EpochMillis> {
    source_to_target(ts, Zone::Utc, Zone::Local)
}

pub fn utc_to_target(ts: EpochMillis, target: Zone) -> Result<EpochMillis> {
    source_to_target(ts, Zone::Utc, target)
}

pub fn target_to_utc(ts: EpochMillis, target: Zone) -> Result<EpochMillis> {
    source_to_target(ts, target, Zone::Utc)
}

/// Normalizes a caller-supplied bound given in `zone` to UTC epoch millis.
/// The open-ended sentinels pass through untouched.
pub fn normalize_bound(ts: EpochMillis, zone: Zone) -> Result<EpochMillis> {
    if ts == EpochMillis::MIN || ts == EpochMillis::MAX || zone == Zone::Utc {
        return Ok(ts);
    }
    utc_to_target(ts, zone)
}
