use std::io::{self, Read, Write};
use crate::core::config::OutputMethod;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EpochMillis, LogtypeId};

/// A match as handed to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRecord<'r> {
    pub path: &'r str,
    pub timestamp: EpochMillis,
    pub logtype_id: LogtypeId,
    pub message: &'r str,
}

/// Receives matches as the executor finds them.
pub trait MatchSink {
    fn write_match(&mut self, record: &OutputRecord<'_>);
}

/// Wire form chosen once per invocation.
pub enum OutputSink<W: Write> {
    Text(W),    // "<path>:<message>", best effort
    Binary(W),  // Length-prefixed little-endian frames
}

impl<W: Write> OutputSink<W> {
    pub fn new(method: OutputMethod, writer: W) -> Self {
        match method {
            OutputMethod::Text => OutputSink::Text(writer),
            OutputMethod::Binary => OutputSink::Binary(writer),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self {
            OutputSink::Text(w) | OutputSink::Binary(w) => w.flush()?,
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        match self {
            OutputSink::Text(w) | OutputSink::Binary(w) => w,
        }
    }
}

impl<W: Write> MatchSink for OutputSink<W> {
    fn write_match(&mut self, record: &OutputRecord<'_>) {
        match self {
            OutputSink::Text(w) => {
                let _ = w
                    .write_all(record.path.as_bytes())
                    .and_then(|_| w.write_all(b":"))
                    .and_then(|_| w.write_all(record.message.as_bytes()));
            }
            OutputSink::Binary(w) => {
                if let Err(e) = BinaryRecord::write_to(record, w) {
                    let err = Error::from(e);
                    tracing::error!(
                        path = record.path,
                        errno = err.errno.unwrap_or(0),
                        "Failed to write binary record: {}",
                        err.context
                    );
                }
            }
        }
    }
}

/// Owned match, also the decoded form of a binary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    pub path: String,
    pub timestamp: EpochMillis,
    pub logtype_id: LogtypeId,
    pub message: String,
}

impl BinaryRecord {
    pub fn write_to<W: Write>(record: &OutputRecord<'_>, w: &mut W) -> io::Result<()> {
        w.write_all(&(record.path.len() as u64).to_le_bytes())?;
        w.write_all(record.path.as_bytes())?;
        w.write_all(&record.timestamp.to_le_bytes())?;
        w.write_all(&record.logtype_id.value().to_le_bytes())?;
        w.write_all(&(record.message.len() as u64).to_le_bytes())?;
        w.write_all(record.message.as_bytes())?;
        Ok(())
    }

    /// Read the next frame. `None` at a clean end of stream.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Self>> {
        let mut word = [0u8; 8];
        match r.read_exact(&mut word) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let path = read_string(r, u64::from_le_bytes(word))?;
        r.read_exact(&mut word)?;
        let timestamp = i64::from_le_bytes(word);
        r.read_exact(&mut word)?;
        let logtype_id = LogtypeId(u64::from_le_bytes(word));
        r.read_exact(&mut word)?;
        let message = read_string(r, u64::from_le_bytes(word))?;

        Ok(Some(BinaryRecord { path, timestamp, logtype_id, message }))
    }

    pub fn as_output(&self) -> OutputRecord<'_> {
        OutputRecord {
            path: &self.path,
            timestamp: self.timestamp,
            logtype_id: self.logtype_id,
            message: &self.message,
        }
    }
}

fn read_string<R: Read>(r: &mut R, len: u64) -> Result<String> {
    let mut bytes = Vec::new();
    r.take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(Error::new(ErrorKind::Corrupt, "Truncated binary record"));
    }
    String::from_utf8(bytes).map_err(|e| Error::new(ErrorKind::Corrupt, e.to_string()))
}

impl MatchSink for Vec<BinaryRecord> {
    fn write_match(&mut self, record: &OutputRecord<'_>) {
        self.push(BinaryRecord {
            path: record.path.to_string(),
            timestamp: record.timestamp,
            logtype_id: record.logtype_id,
            message: record.message.to_string(),
        });
    }
}
