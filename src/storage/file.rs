use std::collections::{HashMap, HashSet};
use bytes::Bytes;
use crate::analysis::token::TokenKind;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EpochMillis, LogtypeId, VariableId};
use crate::index::dictionary::LogtypeDictionary;
use crate::index::encoding::placeholder_kinds;
use crate::storage::metadata::FileRecord;
use crate::storage::segment::EncodedFile;

/// One encoded message, borrowing its variables from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'f> {
    pub timestamp: EpochMillis,
    pub logtype_id: LogtypeId,
    pub kinds: &'f [TokenKind],     // Placeholder kinds of the logtype
    pub variables: &'f [i64],
}

/// Open handle on one archived file: its decoded columns and two read
/// cursors. Released when dropped.
pub struct CompressedFile {
    record: FileRecord,
    encoded: EncodedFile,
    placeholders: HashMap<LogtypeId, Vec<TokenKind>>,
    dictionary_vars: HashSet<VariableId>,
    message_cursor: usize,
    variable_cursor: usize,
}

impl CompressedFile {
    /// Decode the file's byte range out of its decompressed segment.
    pub fn open(record: &FileRecord, segment: &Bytes, logtypes: &LogtypeDictionary) -> Result<Self> {
        let start = record.offset as usize;
        let end = start.checked_add(record.length as usize).filter(|end| *end <= segment.len());
        let Some(end) = end else {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("File {} lies outside segment {}", record.path, record.segment_id.value()),
            ));
        };
        let encoded = EncodedFile::from_bytes(&segment.slice(start..end))?;

        if encoded.num_messages() as u64 != record.num_messages {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("File {} holds {} messages, metadata says {}", record.path, encoded.num_messages(), record.num_messages),
            ));
        }

        let mut placeholders: HashMap<LogtypeId, Vec<TokenKind>> = HashMap::new();
        let mut dictionary_vars = HashSet::new();
        let mut consumed = 0usize;
        for &raw_id in &encoded.logtype_ids {
            let id = LogtypeId(raw_id);
            if !placeholders.contains_key(&id) {
                let logtype = logtypes.get(id).ok_or_else(|| {
                    Error::new(ErrorKind::Corrupt, format!("Unknown logtype id {}", raw_id))
                })?;
                placeholders.insert(id, placeholder_kinds(logtype).collect());
            }
            let kinds = &placeholders[&id];
            let values = encoded.variables.get(consumed..consumed + kinds.len()).ok_or_else(|| {
                Error::new(ErrorKind::Corrupt, format!("File {} runs out of variables", record.path))
            })?;
            for (kind, value) in kinds.iter().zip(values) {
                if *kind == TokenKind::Dictionary {
                    dictionary_vars.insert(VariableId(*value as u64));
                }
            }
            consumed += kinds.len();
        }
        if consumed != encoded.variables.len() {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("File {} has {} unused variables", record.path, encoded.variables.len() - consumed),
            ));
        }

        tracing::trace!(path = %record.path, messages = record.num_messages, "Opened file");
        Ok(CompressedFile {
            record: record.clone(),
            encoded,
            placeholders,
            dictionary_vars,
            message_cursor: 0,
            variable_cursor: 0,
        })
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    pub fn path(&self) -> &str {
        &self.record.path
    }

    pub fn contains_logtype(&self, id: LogtypeId) -> bool {
        self.placeholders.contains_key(&id)
    }

    pub fn contains_dictionary_var(&self, id: VariableId) -> bool {
        self.dictionary_vars.contains(&id)
    }

    /// Rewind both cursors to the first message.
    pub fn reset_indices(&mut self) {
        self.message_cursor = 0;
        self.variable_cursor = 0;
    }

    pub fn next_message(&mut self) -> Option<Message<'_>> {
        let index = self.message_cursor;
        let logtype_id = LogtypeId(*self.encoded.logtype_ids.get(index)?);
        let kinds = self.placeholders.get(&logtype_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = self.variable_cursor;

        self.message_cursor += 1;
        self.variable_cursor += kinds.len();
        Some(Message {
            timestamp: self.encoded.timestamps[index],
            logtype_id,
            kinds,
            variables: &self.encoded.variables[start..start + kinds.len()],
        })
    }
}

impl Drop for CompressedFile {
    fn drop(&mut self) {
        tracing::trace!(path = %self.record.path, "Closed file");
    }
}
