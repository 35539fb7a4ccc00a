use std::fs;
use std::path::{Path, PathBuf};
use crate::core::error::Result;
use crate::core::types::SegmentId;

/// File names of an archive stored as a directory
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    pub base_dir: PathBuf,      // Archive root
    pub segments_dir: PathBuf,  // One file per segment, named by id
}

impl ArchiveLayout {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let segments_dir = base_dir.join("s");
        ArchiveLayout { base_dir, segments_dir }
    }

    /// Create the directories a writer needs.
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.segments_dir)?;
        Ok(())
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.base_dir.join("metadata")
    }

    pub fn metadata_db_path(&self) -> PathBuf {
        self.base_dir.join("metadata.db")
    }

    pub fn logtype_dictionary_path(&self) -> PathBuf {
        self.base_dir.join("logtype.dict")
    }

    pub fn logtype_segment_index_path(&self) -> PathBuf {
        self.base_dir.join("logtype.segindex")
    }

    pub fn var_dictionary_path(&self) -> PathBuf {
        self.base_dir.join("var.dict")
    }

    pub fn var_segment_index_path(&self) -> PathBuf {
        self.base_dir.join("var.segindex")
    }

    pub fn segment_path(&self, id: SegmentId) -> PathBuf {
        self.segments_dir.join(id.value().to_string())
    }
}
