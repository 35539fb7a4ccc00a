use serde::{Serialize, Deserialize};

/// Milliseconds since the Unix epoch.
pub type EpochMillis = i64;

pub const MIN_EPOCH_MILLIS: EpochMillis = i64::MIN;
pub const MAX_EPOCH_MILLIS: EpochMillis = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogtypeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

impl LogtypeId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl VariableId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl SegmentId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u64> for LogtypeId {
    fn from(id: u64) -> Self {
        LogtypeId(id)
    }
}

impl From<u64> for VariableId {
    fn from(id: u64) -> Self {
        VariableId(id)
    }
}

impl From<u32> for SegmentId {
    fn from(id: u32) -> Self {
        SegmentId(id)
    }
}

/// Inclusive timestamp window applied to files and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub begin: EpochMillis,
    pub end: EpochMillis,
}

impl TimeRange {
    pub fn new(begin: EpochMillis, end: EpochMillis) -> Self {
        TimeRange { begin, end }
    }

    pub fn unbounded() -> Self {
        TimeRange {
            begin: MIN_EPOCH_MILLIS,
            end: MAX_EPOCH_MILLIS,
        }
    }

    /// An inverted window matches nothing.
    pub fn is_empty(&self) -> bool {
        self.begin > self.end
    }

    pub fn contains(&self, ts: EpochMillis) -> bool {
        self.begin <= ts && ts <= self.end
    }

    pub fn overlaps(&self, begin: EpochMillis, end: EpochMillis) -> bool {
        !self.is_empty() && begin <= self.end && self.begin <= end
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_millisecond_window() {
        let range = TimeRange::new(1000, 1000);
        assert!(range.contains(1000));
        assert!(!range.contains(999));
        assert!(!range.contains(1001));
    }

    #[test]
    fn inverted_window_matches_nothing() {
        let range = TimeRange::new(2000, 1000);
        assert!(range.is_empty());
        assert!(!range.contains(1500));
        assert!(!range.overlaps(0, 5000));
    }
}
