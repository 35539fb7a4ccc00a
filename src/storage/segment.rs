use std::num::NonZeroUsize;
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use crate::compression::compress::CompressedBlock;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{EpochMillis, SegmentId};
use crate::mmap::mmap_file::Region;

/// Columnar encoding of one file's messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFile {
    pub timestamps: Vec<EpochMillis>,
    pub logtype_ids: Vec<u64>,
    pub variables: Vec<i64>,    // Flattened, in placeholder order
}

impl EncodedFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let file: EncodedFile = bincode::deserialize(bytes)
            .map_err(|e| Error::new(ErrorKind::Corrupt, format!("Malformed file block: {}", e)))?;
        if file.timestamps.len() != file.logtype_ids.len() {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("{} timestamps for {} messages", file.timestamps.len(), file.logtype_ids.len()),
            ));
        }
        Ok(file)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn num_messages(&self) -> usize {
        self.logtype_ids.len()
    }
}

/// Segment buffers plus a bounded cache of their decompressed contents.
/// A `None` slot is a segment whose data could not be found.
pub struct SegmentStore<'a> {
    buffers: Vec<Option<Region<'a>>>,
    cache: Mutex<LruCache<SegmentId, Bytes>>,
}

impl<'a> SegmentStore<'a> {
    pub fn new(buffers: Vec<Option<Region<'a>>>, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        SegmentStore {
            buffers,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Decompressed bytes of a segment, decompressing on first use.
    pub fn load(&self, id: SegmentId) -> Result<Bytes> {
        if let Some(bytes) = self.cache.lock().get(&id) {
            return Ok(bytes.clone());
        }

        let buffer = match self.buffers.get(id.value() as usize) {
            Some(Some(region)) => region,
            _ => {
                return Err(Error::new(
                    ErrorKind::FileNotFound,
                    format!("Segment {} is missing", id.value()),
                ));
            }
        };

        let block = CompressedBlock::from_bytes(buffer)?;
        let bytes = Bytes::from(block.decompress()?);
        tracing::debug!(segment = id.value(), size = bytes.len(), "Decompressed segment");

        self.cache.lock().put(id, bytes.clone());
        Ok(bytes)
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::compress::CompressionType;

    fn segment(payload: &[u8]) -> Vec<u8> {
        CompressedBlock::compress(payload, CompressionType::Zstd)
            .unwrap()
            .to_bytes()
            .unwrap()
    }

    #[test]
    fn loads_and_caches_segments() {
        let raw = segment(b"decompressed contents");
        let store = SegmentStore::new(vec![Some(Region::Borrowed(&raw))], 1);
        let first = store.load(SegmentId(0)).unwrap();
        let second = store.load(SegmentId(0)).unwrap();
        assert_eq!(&first[..], b"decompressed contents");
        assert_eq!(first.as_ptr(), second.as_ptr());
    }

    #[test]
    fn missing_segments_are_not_found() {
        let store = SegmentStore::new(vec![None], 4);
        assert_eq!(store.load(SegmentId(0)).unwrap_err().kind, ErrorKind::FileNotFound);
        assert_eq!(store.load(SegmentId(7)).unwrap_err().kind, ErrorKind::FileNotFound);
    }

    #[test]
    fn column_lengths_must_agree() {
        let broken = EncodedFile {
            timestamps: vec![1, 2],
            logtype_ids: vec![0],
            variables: Vec::new(),
        };
        let bytes = broken.to_bytes().unwrap();
        assert_eq!(EncodedFile::from_bytes(&bytes).unwrap_err().kind, ErrorKind::Corrupt);
    }
}
