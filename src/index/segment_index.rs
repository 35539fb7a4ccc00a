use std::collections::HashMap;
use std::marker::PhantomData;
use roaring::RoaringBitmap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{LogtypeId, SegmentId, VariableId};
use crate::index::dictionary::DictionaryId;

/// Inverted index from a dictionary entry to the indexed segments that
/// contain it. Entries absent from the index occur in no indexed segment.
pub struct SegmentIndex<Id> {
    segments: HashMap<u64, RoaringBitmap>,
    _id: PhantomData<Id>,
}

pub type LogtypeSegmentIndex = SegmentIndex<LogtypeId>;
pub type VariableSegmentIndex = SegmentIndex<VariableId>;

impl<Id: DictionaryId> SegmentIndex<Id> {
    /// Load an index buffer: a bincode `Vec<(u64, Vec<u32>)>`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let entries: Vec<(u64, Vec<u32>)> = bincode::deserialize(bytes).map_err(|e| {
            Error::new(ErrorKind::Corrupt, format!("Malformed segment index: {}", e))
        })?;

        let mut segments: HashMap<u64, RoaringBitmap> = HashMap::with_capacity(entries.len());
        for (id, ids) in entries {
            segments.entry(id).or_default().extend(ids);
        }
        Ok(SegmentIndex { segments, _id: PhantomData })
    }

    pub fn encode(entries: &[(u64, Vec<u32>)]) -> Result<Vec<u8>> {
        Ok(bincode::serialize(entries)?)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments_of(&self, id: Id) -> Option<&RoaringBitmap> {
        self.segments.get(&id.index())
    }

    pub fn contains(&self, id: Id, segment: SegmentId) -> bool {
        self.segments_of(id).is_some_and(|s| s.contains(segment.value()))
    }

    /// Segments containing any of `ids`.
    pub fn union_of(&self, ids: &[Id]) -> RoaringBitmap {
        let mut union = RoaringBitmap::new();
        for id in ids {
            if let Some(segments) = self.segments_of(*id) {
                union |= segments;
            }
        }
        union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unions_over_ids() {
        let bytes = VariableSegmentIndex::encode(&[(0, vec![1, 3]), (2, vec![3, 4])]).unwrap();
        let index = VariableSegmentIndex::from_bytes(&bytes).unwrap();

        let union = index.union_of(&[VariableId(0), VariableId(2), VariableId(9)]);
        assert_eq!(union.iter().collect::<Vec<_>>(), vec![1, 3, 4]);
        assert!(index.contains(VariableId(2), SegmentId(4)));
        assert!(!index.contains(VariableId(1), SegmentId(1)));
    }

    #[test]
    fn repeated_entries_merge() {
        let bytes = LogtypeSegmentIndex::encode(&[(5, vec![0]), (5, vec![2])]).unwrap();
        let index = LogtypeSegmentIndex::from_bytes(&bytes).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.segments_of(LogtypeId(5)).map(|s| s.len()), Some(2));
    }

    #[test]
    fn truncated_buffer_is_corrupt() {
        let bytes = LogtypeSegmentIndex::encode(&[(5, vec![0, 1])]).unwrap();
        let err = LogtypeSegmentIndex::from_bytes(&bytes[..bytes.len() - 2]).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Corrupt);
    }
}
