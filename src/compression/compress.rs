use crate::core::error::{Error, ErrorKind, Result};
use serde::{Serialize, Deserialize};

/// Compressed block as stored in a segment buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    LZ4,      // Fast, used for hot segments
    Zstd,     // Better ratio, archival default
}

impl CompressedBlock {
    /// Compress raw bytes. Archives are produced elsewhere; this exists so
    /// fixtures and tools can build segments in the same format.
    pub fn compress(data: &[u8], compression: CompressionType) -> Result<Self> {
        let compressed = match compression {
            CompressionType::None => data.to_vec(),

            CompressionType::LZ4 => {
                lz4::block::compress(data, None, false)?
            }

            CompressionType::Zstd => {
                zstd::encode_all(data, 3)?  // Level 3 is balanced
            }
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        })
    }

    /// Parse a block from its serialized form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| Error::new(ErrorKind::Corrupt, format!("Malformed segment block: {}", e)))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        let raw = match self.compression {
            CompressionType::None => self.data.clone(),

            CompressionType::LZ4 => {
                let size = i32::try_from(self.original_size).map_err(|_| {
                    Error::new(ErrorKind::Corrupt, "LZ4 block larger than 2 GiB".to_string())
                })?;
                lz4::block::decompress(&self.data, Some(size))
                    .map_err(|e| Error::new(ErrorKind::Corrupt, e.to_string()))?
            }

            CompressionType::Zstd => {
                zstd::decode_all(&self.data[..])
                    .map_err(|e| Error::new(ErrorKind::Corrupt, e.to_string()))?
            }
        };

        if raw.len() != self.original_size {
            return Err(Error::new(
                ErrorKind::Corrupt,
                format!("Decompressed {} bytes, expected {}", raw.len(), self.original_size),
            ));
        }
        Ok(raw)
    }
}
