//! Compaction image builder.
//!
//! Compresses values one by one in sorted key order and produces a
//! [`CompactionJob`] holding the encoded header and chunks.

use crate::codec;
use crate::compaction::CompactionJob;
use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::format::Header;

/// Builds a [`CompactionJob`] from sorted key-value pairs.
///
/// Usage:
/// ```
/// use coffer::compaction::CompactionBuilder;
/// use coffer::CompressionType;
///
/// let mut builder = CompactionBuilder::new(CompressionType::default());
/// builder.add("key1", b"value1").unwrap();
/// builder.add("key2", b"value2").unwrap();
/// let job = builder.finish().unwrap();
/// assert_eq!(job.header().len(), 2);
/// ```
pub struct CompactionBuilder {
    compression: CompressionType,
    keys: Vec<String>,
    chunk_sizes: Vec<u32>,
    chunks: Vec<Vec<u8>>,
}

impl CompactionBuilder {
    /// Create a new builder
    pub fn new(compression: CompressionType) -> Self {
        Self { compression, keys: Vec::new(), chunk_sizes: Vec::new(), chunks: Vec::new() }
    }

    /// Add a key-value pair.
    ///
    /// Keys must be added in strictly ascending byte order.
    pub fn add(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if let Some(last) = self.keys.last() {
            if key.as_bytes() <= last.as_bytes() {
                return Err(Error::invalid_argument("Keys must be added in sorted order"));
            }
        }

        let chunk = codec::compress(self.compression, value)?;
        let size = u32::try_from(chunk.len()).map_err(|_| {
            Error::invalid_argument(format!(
                "Compressed value of {:?} is {} bytes, exceeds u32",
                key,
                chunk.len()
            ))
        })?;

        self.keys.push(key.to_owned());
        self.chunk_sizes.push(size);
        self.chunks.push(chunk);
        Ok(())
    }

    /// Get the number of entries added
    pub fn num_entries(&self) -> usize {
        self.keys.len()
    }

    /// Encode the header and hand over the finished image.
    pub fn finish(self) -> Result<CompactionJob> {
        let header = Header::new(self.keys, self.chunk_sizes)?;
        let header_bytes = header.encode(self.compression)?;
        Ok(CompactionJob::new(header, header_bytes, self.chunks))
    }
}
