use std::marker::PhantomData;
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{LogtypeId, VariableId};
use crate::search::wildcard::WildcardPattern;

/// Id types a dictionary can hand out.
pub trait DictionaryId: Copy + Ord {
    fn from_index(index: u64) -> Self;
    fn index(self) -> u64;
}

impl DictionaryId for LogtypeId {
    fn from_index(index: u64) -> Self {
        LogtypeId(index)
    }

    fn index(self) -> u64 {
        self.0
    }
}

impl DictionaryId for VariableId {
    fn from_index(index: u64) -> Self {
        VariableId(index)
    }

    fn index(self) -> u64 {
        self.0
    }
}

/// Id-indexed string table with an FST from value to id.
pub struct Dictionary<Id> {
    values: Vec<String>,
    fst: Map<Vec<u8>>,
    _id: PhantomData<Id>,
}

pub type LogtypeDictionary = Dictionary<LogtypeId>;
pub type VariableDictionary = Dictionary<VariableId>;

impl<Id: DictionaryId> Dictionary<Id> {
    /// Load a dictionary buffer: a bincode `Vec<String>` where position is id.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let values: Vec<String> = bincode::deserialize(bytes)
            .map_err(|e| Error::new(ErrorKind::Corrupt, format!("Malformed dictionary: {}", e)))?;
        Self::from_values(values)
    }

    pub fn from_values(values: Vec<String>) -> Result<Self> {
        let mut sorted: Vec<(&str, u64)> = values
            .iter()
            .enumerate()
            .map(|(id, value)| (value.as_str(), id as u64))
            .collect();

        // FST requires sorted, unique keys
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("Dictionary value {:?} appears twice", pair[0].0),
            ));
        }

        let mut builder = MapBuilder::memory();
        for (value, id) in sorted {
            builder.insert(value.as_bytes(), id)?;
        }

        Ok(Dictionary {
            fst: builder.into_map(),
            values,
            _id: PhantomData,
        })
    }

    /// Serialize values in id order, the form `from_bytes` reads.
    pub fn encode(values: &[String]) -> Result<Vec<u8>> {
        Ok(bincode::serialize(values)?)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, id: Id) -> Option<&str> {
        self.values.get(id.index() as usize).map(String::as_str)
    }

    /// Exact lookup.
    pub fn lookup(&self, value: &str) -> Option<Id> {
        self.fst.get(value.as_bytes()).map(Id::from_index)
    }

    /// Exact lookup honoring case sensitivity. Case-insensitive lookups may
    /// resolve to several ids.
    pub fn lookup_all(&self, value: &str, case_sensitive: bool) -> Vec<Id> {
        if case_sensitive {
            return self.lookup(value).into_iter().collect();
        }
        let mut ids: Vec<Id> = self
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.eq_ignore_ascii_case(value))
            .map(|(id, _)| Id::from_index(id as u64))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of every value the pattern matches, ascending.
    pub fn search(&self, pattern: &WildcardPattern, case_sensitive: bool) -> Vec<Id> {
        let mut ids = Vec::new();
        let prefix = pattern.literal_prefix();

        if case_sensitive && !prefix.is_empty() {
            // Range scan over the values sharing the literal prefix
            let mut stream = self.fst.range().ge(&prefix).into_stream();
            while let Some((value, id)) = stream.next() {
                if !value.starts_with(&prefix) {
                    break;
                }
                if pattern.is_match(value, true) {
                    ids.push(Id::from_index(id));
                }
            }
        } else {
            let mut stream = self.fst.stream();
            while let Some((value, id)) = stream.next() {
                if pattern.is_match(value, case_sensitive) {
                    ids.push(Id::from_index(id));
                }
            }
        }

        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, &str)> {
        self.values
            .iter()
            .enumerate()
            .map(|(id, v)| (Id::from_index(id as u64), v.as_str()))
    }
}
