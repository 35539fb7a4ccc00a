use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EpochMillis, FileId, SegmentId, TimeRange};
use crate::search::wildcard::WildcardPattern;

pub const ARCHIVE_MAGIC: [u8; 4] = *b"CLGA";
pub const FORMAT_VERSION: u32 = 1;

/// Archive-wide header stored in the metadata buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub creator_id: String,
    pub begin_ts: EpochMillis,
    pub end_ts: EpochMillis,
    pub num_files: u64,
    pub num_segments: u32,
}

impl ArchiveHeader {
    pub fn new(creator_id: impl Into<String>) -> Self {
        ArchiveHeader {
            magic: ARCHIVE_MAGIC,
            version: FORMAT_VERSION,
            creator_id: creator_id.into(),
            begin_ts: EpochMillis::MAX,
            end_ts: EpochMillis::MIN,
            num_files: 0,
            num_segments: 0,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: ArchiveHeader = decode_checked(bytes, "archive header")?;
        if header.magic != ARCHIVE_MAGIC {
            return Err(Error::new(ErrorKind::Corrupt, "Bad archive magic"));
        }
        if header.version != FORMAT_VERSION {
            return Err(Error::new(
                ErrorKind::Unsupported,
                format!("Archive format version {} (expected {})", header.version, FORMAT_VERSION),
            ));
        }
        Ok(header)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_checked(self)
    }
}

/// One original log file and where its encoded data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub path: String,
    pub begin_ts: EpochMillis,
    pub end_ts: EpochMillis,
    pub num_messages: u64,
    pub segment_id: SegmentId,   // Segment holding the file's data
    pub indexed: bool,           // Covered by the segment indexes
    pub offset: u64,             // Byte range inside the decompressed segment
    pub length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTables {
    pub files: Vec<FileRecord>,
}

impl MetadataTables {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode_checked(bytes, "metadata tables")
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_checked(self)
    }
}

/// Serialize with a trailing little-endian CRC32 of the payload.
fn encode_checked<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = bincode::serialize(value)?;
    let checksum = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&checksum.to_le_bytes());
    Ok(bytes)
}

fn decode_checked<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    if bytes.len() < 4 {
        return Err(Error::new(ErrorKind::Corrupt, format!("Truncated {}", what)));
    }
    let (payload, trailer) = bytes.split_at(bytes.len() - 4);
    let mut stored = [0u8; 4];
    stored.copy_from_slice(trailer);
    if crc32fast::hash(payload) != u32::from_le_bytes(stored) {
        return Err(Error::new(ErrorKind::Corrupt, format!("Checksum mismatch in {}", what)));
    }
    bincode::deserialize(payload)
        .map_err(|e| Error::new(ErrorKind::Corrupt, format!("Malformed {}: {}", what, e)))
}

/// Read-only file table deserialized from the metadata buffers.
#[derive(Debug)]
pub struct MetadataStore {
    header: ArchiveHeader,
    files: Vec<FileRecord>,
}

impl MetadataStore {
    pub fn open(metadata: &[u8], metadata_db: &[u8]) -> Result<Self> {
        let header = ArchiveHeader::from_bytes(metadata)?;
        let tables = MetadataTables::from_bytes(metadata_db)?;

        if tables.files.len() as u64 != header.num_files {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("Header lists {} files, table has {}", header.num_files, tables.files.len()),
            ));
        }
        if let Some(file) = tables.files.iter().find(|f| f.segment_id.value() >= header.num_segments) {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("File {} refers to segment {} of {}", file.path, file.segment_id.value(), header.num_segments),
            ));
        }

        Ok(MetadataStore { header, files: tables.files })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }
}

/// Which files a pass over the metadata may yield
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentScope {
    Any,
    Unsegmented,          // Files outside the segment indexes
    Segment(SegmentId),   // Indexed files stored in this segment
}

impl SegmentScope {
    pub fn admits(&self, file: &FileRecord) -> bool {
        match self {
            SegmentScope::Any => true,
            SegmentScope::Unsegmented => !file.indexed,
            SegmentScope::Segment(id) => file.indexed && file.segment_id == *id,
        }
    }
}

/// Cursor over the file records matching a time range, path filter and
/// segment scope. Holds the store alive; the archive cannot close while a
/// cursor exists.
pub struct FileIterator {
    store: Arc<MetadataStore>,
    time_range: TimeRange,
    path_filter: Option<WildcardPattern>,
    scope: SegmentScope,
    position: usize,
    pending: Option<usize>,
    current: Option<usize>,
}

impl FileIterator {
    pub fn new(store: Arc<MetadataStore>, time_range: TimeRange, path_filter: Option<WildcardPattern>) -> Self {
        FileIterator {
            store,
            time_range,
            path_filter,
            scope: SegmentScope::Any,
            position: 0,
            pending: None,
            current: None,
        }
    }

    /// Restrict the cursor and rewind it.
    pub fn set_segment_scope(&mut self, scope: SegmentScope) {
        self.scope = scope;
        self.reset();
    }

    pub fn scope(&self) -> SegmentScope {
        self.scope
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.pending = None;
        self.current = None;
    }

    fn admits(&self, file: &FileRecord) -> bool {
        self.scope.admits(file)
            && self.time_range.overlaps(file.begin_ts, file.end_ts)
            && self
                .path_filter
                .as_ref()
                .is_none_or(|pattern| pattern.is_match_str(&file.path, true))
    }

    pub fn has_next(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        while self.position < self.store.files.len() {
            let index = self.position;
            self.position += 1;
            if self.admits(&self.store.files[index]) {
                self.pending = Some(index);
                return true;
            }
        }
        false
    }

    /// Move to the next matching file and return it.
    pub fn advance(&mut self) -> Option<&FileRecord> {
        if !self.has_next() {
            self.current = None;
            return None;
        }
        self.current = self.pending.take();
        self.current.map(|index| &self.store.files[index])
    }

    pub fn current(&self) -> Option<&FileRecord> {
        self.current.map(|index| &self.store.files[index])
    }

    pub fn get_path(&self) -> Option<&str> {
        self.current().map(|file| file.path.as_str())
    }
}
