use std::path::Path;
use std::sync::Arc;
use crate::core::config::SearchConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{SegmentId, TimeRange};
use crate::index::dictionary::{LogtypeDictionary, VariableDictionary};
use crate::index::encoding::decode_message;
use crate::index::segment_index::{LogtypeSegmentIndex, VariableSegmentIndex};
use crate::mmap::mmap_file::Region;
use crate::search::wildcard::WildcardPattern;
use crate::storage::file::{CompressedFile, Message};
use crate::storage::layout::ArchiveLayout;
use crate::storage::metadata::{ArchiveHeader, FileIterator, FileRecord, MetadataStore};
use crate::storage::segment::SegmentStore;

/// Caller-owned buffers making up an in-memory archive. The archive only
/// borrows them.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveAddresses<'a> {
    pub logtype_dictionary: &'a [u8],
    pub logtype_segment_index: &'a [u8],
    pub metadata: &'a [u8],
    pub metadata_db: &'a [u8],
    pub var_dictionary: &'a [u8],
    pub var_segment_index: &'a [u8],
    pub segments: &'a [&'a [u8]],
}

struct Sources<'a> {
    logtype_dictionary: Region<'a>,
    logtype_segment_index: Region<'a>,
    metadata: Region<'a>,
    metadata_db: Region<'a>,
    var_dictionary: Region<'a>,
    var_segment_index: Region<'a>,
}

/// An opened archive: metadata store, both dictionaries and segment indexes,
/// and the segment buffers.
pub struct Archive<'a> {
    metadata: Arc<MetadataStore>,
    logtype_dictionary: LogtypeDictionary,
    var_dictionary: VariableDictionary,
    logtype_segments: LogtypeSegmentIndex,
    var_segments: VariableSegmentIndex,
    sources: Sources<'a>,
    segments: SegmentStore<'a>,
    closed: bool,
}

impl<'a> Archive<'a> {
    /// Open over borrowed buffers. Fails as a whole with `OpenFailed`.
    pub fn open_in_memory(addresses: ArchiveAddresses<'a>, config: &SearchConfig) -> Result<Self> {
        let sources = Sources {
            logtype_dictionary: Region::Borrowed(addresses.logtype_dictionary),
            logtype_segment_index: Region::Borrowed(addresses.logtype_segment_index),
            metadata: Region::Borrowed(addresses.metadata),
            metadata_db: Region::Borrowed(addresses.metadata_db),
            var_dictionary: Region::Borrowed(addresses.var_dictionary),
            var_segment_index: Region::Borrowed(addresses.var_segment_index),
        };
        let segments = |header: &ArchiveHeader| -> Result<Vec<Option<Region<'a>>>> {
            if addresses.segments.len() as u64 != u64::from(header.num_segments) {
                return Err(Error::new(
                    ErrorKind::Corrupt,
                    format!(
                        "Archive has {} segments but {} segment buffers were supplied",
                        header.num_segments,
                        addresses.segments.len()
                    ),
                ));
            }
            Ok(addresses.segments.iter().map(|s| Some(Region::Borrowed(*s))).collect())
        };
        Self::assemble(sources, segments, config)
            .map_err(|e| e.with_kind(ErrorKind::OpenFailed).with_context("Opening in-memory archive"))
    }

    fn assemble<F>(sources: Sources<'a>, segments: F, config: &SearchConfig) -> Result<Self>
    where
        F: FnOnce(&ArchiveHeader) -> Result<Vec<Option<Region<'a>>>>,
    {
        let metadata = MetadataStore::open(&sources.metadata, &sources.metadata_db)?;
        let segments = segments(metadata.header())?;
        let logtype_segments = LogtypeSegmentIndex::from_bytes(&sources.logtype_segment_index)?;
        let var_segments = VariableSegmentIndex::from_bytes(&sources.var_segment_index)?;

        let mut archive = Archive {
            metadata: Arc::new(metadata),
            logtype_dictionary: LogtypeDictionary::from_values(Vec::new())?,
            var_dictionary: VariableDictionary::from_values(Vec::new())?,
            logtype_segments,
            var_segments,
            sources,
            segments: SegmentStore::new(segments, config.segment_cache_capacity),
            closed: false,
        };
        archive.refresh_dictionaries()?;

        let header = archive.header();
        tracing::debug!(
            creator = %header.creator_id,
            files = header.num_files,
            segments = header.num_segments,
            logtypes = archive.logtype_dictionary.len(),
            variables = archive.var_dictionary.len(),
            "Opened archive"
        );
        Ok(archive)
    }

    /// (Re)load both dictionaries from their buffers.
    pub fn refresh_dictionaries(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.logtype_dictionary = LogtypeDictionary::from_bytes(&self.sources.logtype_dictionary)?;
        self.var_dictionary = VariableDictionary::from_bytes(&self.sources.var_dictionary)?;
        Ok(())
    }

    pub fn header(&self) -> &ArchiveHeader {
        self.metadata.header()
    }

    pub fn logtype_dictionary(&self) -> &LogtypeDictionary {
        &self.logtype_dictionary
    }

    pub fn var_dictionary(&self) -> &VariableDictionary {
        &self.var_dictionary
    }

    pub fn logtype_segment_index(&self) -> &LogtypeSegmentIndex {
        &self.logtype_segments
    }

    pub fn var_segment_index(&self) -> &VariableSegmentIndex {
        &self.var_segments
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::new(ErrorKind::NotInit, "Archive is closed"));
        }
        Ok(())
    }

    /// Cursor over matching file records. The archive cannot be closed
    /// while it is alive.
    pub fn file_iterator(&self, time_range: TimeRange, path_filter: Option<WildcardPattern>) -> Result<FileIterator> {
        self.ensure_open()?;
        Ok(FileIterator::new(self.metadata.clone(), time_range, path_filter))
    }

    pub fn open_file(&self, record: &FileRecord) -> Result<CompressedFile> {
        self.ensure_open()?;
        let segment = self.segments.load(record.segment_id)?;
        CompressedFile::open(record, &segment, &self.logtype_dictionary)
    }

    /// Decompress one message back to its original text.
    pub fn decode(&self, message: &Message<'_>) -> Result<String> {
        self.ensure_open()?;
        let logtype = self.logtype_dictionary.get(message.logtype_id).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt, format!("Unknown logtype id {}", message.logtype_id.value()))
        })?;
        decode_message(logtype, message.variables, &self.var_dictionary)
    }

    /// Release the metadata connection. Returns false, leaving the archive
    /// usable, while file iterators still hold it.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return true;
        }
        let dependents = Arc::strong_count(&self.metadata) - 1;
        if dependents > 0 {
            tracing::warn!(dependents, "Archive still in use, not closing");
            return false;
        }
        self.segments.clear_cache();
        self.closed = true;
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Archive<'static> {
    /// Open an archive directory, memory-mapping each component. Missing
    /// segment files surface later, when a file stored in them is opened.
    pub fn open_dir<P: AsRef<Path>>(path: P, config: &SearchConfig) -> Result<Self> {
        let layout = ArchiveLayout::new(path);
        let open = || -> Result<Archive<'static>> {
            let sources = Sources {
                logtype_dictionary: Region::map(layout.logtype_dictionary_path())?,
                logtype_segment_index: Region::map(layout.logtype_segment_index_path())?,
                metadata: Region::map(layout.metadata_path())?,
                metadata_db: Region::map(layout.metadata_db_path())?,
                var_dictionary: Region::map(layout.var_dictionary_path())?,
                var_segment_index: Region::map(layout.var_segment_index_path())?,
            };
            let map_segments = |header: &ArchiveHeader| -> Result<Vec<Option<Region<'static>>>> {
                let mut segments = Vec::with_capacity(header.num_segments as usize);
                for id in 0..header.num_segments {
                    match Region::map(layout.segment_path(SegmentId(id))) {
                        Ok(region) => segments.push(Some(region)),
                        Err(e) if e.kind == ErrorKind::FileNotFound => {
                            tracing::warn!(segment = id, "Segment file missing");
                            segments.push(None);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(segments)
            };
            Archive::assemble(sources, map_segments, config)
        };

        open().map_err(|e| {
            e.with_kind(ErrorKind::OpenFailed)
                .with_context(format!("Opening archive {}", layout.base_dir.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::metadata::MetadataTables;

    struct Buffers {
        dict: Vec<u8>,
        index: Vec<u8>,
        metadata: Vec<u8>,
        db: Vec<u8>,
    }

    fn empty_buffers() -> Buffers {
        Buffers {
            dict: LogtypeDictionary::encode(&[]).unwrap(),
            index: LogtypeSegmentIndex::encode(&[]).unwrap(),
            metadata: ArchiveHeader::new("test").to_bytes().unwrap(),
            db: MetadataTables::default().to_bytes().unwrap(),
        }
    }

    fn addresses(b: &Buffers) -> ArchiveAddresses<'_> {
        ArchiveAddresses {
            logtype_dictionary: &b.dict,
            logtype_segment_index: &b.index,
            metadata: &b.metadata,
            metadata_db: &b.db,
            var_dictionary: &b.dict,
            var_segment_index: &b.index,
            segments: &[],
        }
    }

    #[test]
    fn opens_an_empty_archive() {
        let buffers = empty_buffers();
        let archive = Archive::open_in_memory(addresses(&buffers), &SearchConfig::default()).unwrap();
        assert_eq!(archive.header().num_files, 0);
        assert!(archive.logtype_dictionary().is_empty());
    }

    #[test]
    fn malformed_metadata_fails_the_open() {
        let mut buffers = empty_buffers();
        buffers.metadata = vec![0xde, 0xad];
        let err = Archive::open_in_memory(addresses(&buffers), &SearchConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::OpenFailed);
    }

    #[test]
    fn corrupt_dictionary_fails_the_open() {
        let mut buffers = empty_buffers();
        buffers.dict = vec![0xff; 3];
        let err = Archive::open_in_memory(addresses(&buffers), &SearchConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::OpenFailed);
    }

    #[test]
    fn close_waits_for_iterators() {
        let buffers = empty_buffers();
        let mut archive = Archive::open_in_memory(addresses(&buffers), &SearchConfig::default()).unwrap();
        let iter = archive.file_iterator(TimeRange::unbounded(), None).unwrap();
        assert!(!archive.close());
        assert!(!archive.is_closed());
        drop(iter);
        assert!(archive.close());
        assert_eq!(
            archive.file_iterator(TimeRange::unbounded(), None).err().unwrap().kind,
            ErrorKind::NotInit
        );
    }

    #[test]
    fn segment_buffer_count_must_match_the_header() {
        let mut buffers = empty_buffers();
        let mut header = ArchiveHeader::new("test");
        header.num_segments = 2;
        buffers.metadata = header.to_bytes().unwrap();

        let one: [&[u8]; 1] = [&[]];
        let short = ArchiveAddresses { segments: &one, ..addresses(&buffers) };
        let err = Archive::open_in_memory(short, &SearchConfig::default()).err().unwrap();
        assert_eq!(err.kind, ErrorKind::OpenFailed);

        let two: [&[u8]; 2] = [&[], &[]];
        let exact = ArchiveAddresses { segments: &two, ..addresses(&buffers) };
        assert!(Archive::open_in_memory(exact, &SearchConfig::default()).is_ok());
    }

    #[test]
    fn closed_archive_refuses_to_decode() {
        let buffers = empty_buffers();
        let mut archive = Archive::open_in_memory(addresses(&buffers), &SearchConfig::default()).unwrap();
        assert!(archive.close());
        let message = Message {
            timestamp: 0,
            logtype_id: crate::core::types::LogtypeId(0),
            kinds: &[],
            variables: &[],
        };
        assert_eq!(archive.decode(&message).err().unwrap().kind, ErrorKind::NotInit);
    }

    #[test]
    fn missing_directory_fails_the_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = Archive::open_dir(dir.path().join("nope"), &SearchConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::OpenFailed);
    }
}
