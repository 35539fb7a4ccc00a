use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use crate::core::error::Result;

/// Memory-mapped file for zero-copy reads
pub struct MmapFile {
    pub mmap: Option<Mmap>,   // None for empty files, which cannot be mapped
    pub len: usize,
}

impl MmapFile {
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        let len = metadata.len() as usize;
        if len == 0 {
            return Ok(MmapFile { mmap: None, len });
        }

        // SAFETY: archives are immutable once written; the mapping is read-only.
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };

        Ok(MmapFile { mmap: Some(mmap), len })
    }

    pub fn data(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}

/// A read-only byte region backing one archive component: either borrowed
/// from the caller or mapped from disk by the archive itself.
pub enum Region<'a> {
    Borrowed(&'a [u8]),
    Mapped(MmapFile),
}

impl<'a> Region<'a> {
    pub fn map<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Region::Mapped(MmapFile::open_read_only(path)?))
    }
}

impl Deref for Region<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Region::Borrowed(bytes) => bytes,
            Region::Mapped(file) => file.data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mapped_and_borrowed_regions_read_the_same() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"segment bytes").unwrap();
        file.flush().unwrap();

        let mapped = Region::map(file.path()).unwrap();
        let borrowed = Region::Borrowed(b"segment bytes");
        assert_eq!(&*mapped, &*borrowed);
    }

    #[test]
    fn empty_files_map_to_empty_regions() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mapped = Region::map(file.path()).unwrap();
        assert!(mapped.is_empty());
    }
}
