#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use clg::analysis::lexer::ByteLexer;
use clg::compression::compress::{CompressedBlock, CompressionType};
use clg::core::types::{FileId, SegmentId};
use clg::index::dictionary::{LogtypeDictionary, VariableDictionary};
use clg::index::encoding::{encode_message, EncodedVariable};
use clg::index::segment_index::{LogtypeSegmentIndex, VariableSegmentIndex};
use clg::storage::archive::ArchiveAddresses;
use clg::storage::layout::ArchiveLayout;
use clg::storage::metadata::{ArchiveHeader, FileRecord, MetadataTables};
use clg::storage::segment::EncodedFile;

pub struct FixtureFile {
    pub path: String,
    pub segment: u32,
    pub indexed: bool,
    pub messages: Vec<(i64, String)>,
}

/// Builds archive buffers in the on-disk format from plain messages.
pub struct ArchiveBuilder {
    files: Vec<FixtureFile>,
    compression: CompressionType,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        ArchiveBuilder {
            files: Vec::new(),
            compression: CompressionType::Zstd,
        }
    }

    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn file(mut self, path: &str, segment: u32, indexed: bool, messages: &[(i64, &str)]) -> Self {
        self.files.push(FixtureFile {
            path: path.to_string(),
            segment,
            indexed,
            messages: messages.iter().map(|(ts, m)| (*ts, m.to_string())).collect(),
        });
        self
    }

    pub fn files(&self) -> &[FixtureFile] {
        &self.files
    }

    pub fn build(&self) -> ArchiveBuffers {
        let lexer = ByteLexer::forward();
        let mut logtypes: Vec<String> = Vec::new();
        let mut logtype_ids: HashMap<String, u64> = HashMap::new();
        let mut vars: Vec<String> = Vec::new();
        let mut var_ids: HashMap<String, u64> = HashMap::new();
        let mut logtype_segments: BTreeMap<u64, BTreeSet<u32>> = BTreeMap::new();
        let mut var_segments: BTreeMap<u64, BTreeSet<u32>> = BTreeMap::new();

        let num_segments = self.files.iter().map(|f| f.segment + 1).max().unwrap_or(0);
        let mut segment_data: Vec<Vec<u8>> = vec![Vec::new(); num_segments as usize];
        let mut records = Vec::new();
        let mut header = ArchiveHeader::new("fixture");

        for (index, file) in self.files.iter().enumerate() {
            let mut encoded = EncodedFile::default();
            for (ts, message) in &file.messages {
                let message = encode_message(&lexer, message).unwrap();
                let next_id = logtype_ids.len() as u64;
                let logtype_id = *logtype_ids.entry(message.logtype.clone()).or_insert_with(|| {
                    logtypes.push(message.logtype.clone());
                    next_id
                });
                if file.indexed {
                    logtype_segments.entry(logtype_id).or_default().insert(file.segment);
                }
                for var in message.variables {
                    let value = match var {
                        EncodedVariable::Integer(v) => v,
                        EncodedVariable::Dictionary(text) => {
                            let next_id = var_ids.len() as u64;
                            let id = *var_ids.entry(text.clone()).or_insert_with(|| {
                                vars.push(text);
                                next_id
                            });
                            if file.indexed {
                                var_segments.entry(id).or_default().insert(file.segment);
                            }
                            id as i64
                        }
                    };
                    encoded.variables.push(value);
                }
                encoded.timestamps.push(*ts);
                encoded.logtype_ids.push(logtype_id);
            }

            let bytes = encoded.to_bytes().unwrap();
            let data = &mut segment_data[file.segment as usize];
            let begin_ts = file.messages.iter().map(|m| m.0).min().unwrap_or(0);
            let end_ts = file.messages.iter().map(|m| m.0).max().unwrap_or(0);
            header.begin_ts = header.begin_ts.min(begin_ts);
            header.end_ts = header.end_ts.max(end_ts);
            records.push(FileRecord {
                id: FileId(index as u64),
                path: file.path.clone(),
                begin_ts,
                end_ts,
                num_messages: file.messages.len() as u64,
                segment_id: SegmentId(file.segment),
                indexed: file.indexed,
                offset: data.len() as u64,
                length: bytes.len() as u64,
            });
            data.extend_from_slice(&bytes);
        }

        header.num_files = records.len() as u64;
        header.num_segments = num_segments;

        let flatten = |index: BTreeMap<u64, BTreeSet<u32>>| -> Vec<(u64, Vec<u32>)> {
            index.into_iter().map(|(id, s)| (id, s.into_iter().collect())).collect()
        };

        ArchiveBuffers {
            logtype_dictionary: LogtypeDictionary::encode(&logtypes).unwrap(),
            logtype_segment_index: LogtypeSegmentIndex::encode(&flatten(logtype_segments)).unwrap(),
            metadata: header.to_bytes().unwrap(),
            metadata_db: MetadataTables { files: records }.to_bytes().unwrap(),
            var_dictionary: VariableDictionary::encode(&vars).unwrap(),
            var_segment_index: VariableSegmentIndex::encode(&flatten(var_segments)).unwrap(),
            segments: segment_data
                .iter()
                .map(|raw| CompressedBlock::compress(raw, self.compression).unwrap().to_bytes().unwrap())
                .collect(),
        }
    }
}

pub struct ArchiveBuffers {
    pub logtype_dictionary: Vec<u8>,
    pub logtype_segment_index: Vec<u8>,
    pub metadata: Vec<u8>,
    pub metadata_db: Vec<u8>,
    pub var_dictionary: Vec<u8>,
    pub var_segment_index: Vec<u8>,
    pub segments: Vec<Vec<u8>>,
}

impl ArchiveBuffers {
    pub fn segment_slices(&self) -> Vec<&[u8]> {
        self.segments.iter().map(Vec::as_slice).collect()
    }

    pub fn addresses<'a>(&'a self, segments: &'a [&'a [u8]]) -> ArchiveAddresses<'a> {
        ArchiveAddresses {
            logtype_dictionary: &self.logtype_dictionary,
            logtype_segment_index: &self.logtype_segment_index,
            metadata: &self.metadata,
            metadata_db: &self.metadata_db,
            var_dictionary: &self.var_dictionary,
            var_segment_index: &self.var_segment_index,
            segments,
        }
    }

    pub fn write_dir(&self, dir: &Path) {
        let layout = ArchiveLayout::new(dir);
        layout.create_dirs().unwrap();
        fs::write(layout.metadata_path(), &self.metadata).unwrap();
        fs::write(layout.metadata_db_path(), &self.metadata_db).unwrap();
        fs::write(layout.logtype_dictionary_path(), &self.logtype_dictionary).unwrap();
        fs::write(layout.logtype_segment_index_path(), &self.logtype_segment_index).unwrap();
        fs::write(layout.var_dictionary_path(), &self.var_dictionary).unwrap();
        fs::write(layout.var_segment_index_path(), &self.var_segment_index).unwrap();
        for (id, segment) in self.segments.iter().enumerate() {
            fs::write(layout.segment_path(SegmentId(id as u32)), segment).unwrap();
        }
    }
}

/// The single-file archive most scenarios start from.
pub fn single_error_archive() -> ArchiveBuilder {
    ArchiveBuilder::new().file("/var/log/a.log", 0, true, &[(1000, "ERROR connect failed")])
}
