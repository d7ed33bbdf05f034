//! Store header implementation.
//!
//! The header lists every key in the file together with the compressed size
//! of its value chunk. Chunk offsets are not stored; they are the running
//! sum of the sizes, see [`Header::entries`].

use crate::codec;
use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::format::{CHUNK_SIZE_WIDTH, FIXED_HEADER_SIZE};
use crate::index::Entry;
use bytes::{Buf, BufMut, BytesMut};
use std::collections::HashSet;
use std::io::{self, Read};
use std::path::Path;

// Caps the up-front allocation driven by an untrusted entry count.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Decoded header: keys in file order and their compressed chunk sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    keys: Vec<String>,
    chunk_sizes: Vec<u32>,
}

impl Header {
    /// Create a header from parallel key and chunk size lists.
    ///
    /// Keys are written in the given order; callers pass them sorted.
    pub fn new(keys: Vec<String>, chunk_sizes: Vec<u32>) -> Result<Self> {
        if keys.len() != chunk_sizes.len() {
            return Err(Error::invalid_argument(format!(
                "{} keys but {} chunk sizes",
                keys.len(),
                chunk_sizes.len()
            )));
        }
        if u32::try_from(keys.len()).is_err() {
            return Err(Error::invalid_argument("Too many entries for one store file"));
        }
        Ok(Self { keys, chunk_sizes })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the header describes no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in file order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Compressed chunk sizes in file order.
    pub fn chunk_sizes(&self) -> &[u32] {
        &self.chunk_sizes
    }

    /// Total length of the data region described by this header.
    pub fn data_len(&self) -> u64 {
        self.chunk_sizes.iter().map(|&size| size as u64).sum()
    }

    /// Each key with the location of its chunk inside the data region.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Entry)> + '_ {
        let mut offset = 0u64;
        self.keys.iter().zip(&self.chunk_sizes).map(move |(key, &size)| {
            let entry = Entry::new(offset, size);
            offset += size as u64;
            (key.as_str(), entry)
        })
    }

    /// Encode the header to bytes.
    pub fn encode(&self, compression: CompressionType) -> Result<Vec<u8>> {
        let blob = encode_key_blob(&self.keys)?;
        let compressed = codec::compress(compression, &blob)?;
        let blob_size = u32::try_from(compressed.len())
            .map_err(|_| Error::invalid_argument("Compressed key blob exceeds u32"))?;

        let mut buf = BytesMut::with_capacity(
            FIXED_HEADER_SIZE + CHUNK_SIZE_WIDTH * self.keys.len() + compressed.len(),
        );
        buf.put_u32_le(self.keys.len() as u32);
        buf.put_u32_le(blob_size);
        for &size in &self.chunk_sizes {
            buf.put_u32_le(size);
        }
        buf.put_slice(&compressed);
        Ok(buf.to_vec())
    }

    /// Read a header from the start of a store file.
    ///
    /// Returns the header and its encoded length, which is where the data
    /// region begins. `source` only labels I/O errors.
    pub fn read_from<R: Read>(
        reader: &mut R,
        compression: CompressionType,
        source: &Path,
    ) -> Result<(Self, u64)> {
        let mut fixed = [0u8; FIXED_HEADER_SIZE];
        read_field(reader, &mut fixed, "entry count and key blob size", source)?;
        let mut fixed = &fixed[..];
        let count = fixed.get_u32_le();
        let blob_size = fixed.get_u32_le();

        let mut chunk_sizes = Vec::with_capacity((count as usize).min(PREALLOC_LIMIT));
        let mut word = [0u8; CHUNK_SIZE_WIDTH];
        for i in 0..count {
            read_field(reader, &mut word, "chunk size", source).map_err(|e| match e {
                Error::TruncatedHeader(_) => Error::truncated(format!(
                    "short read of chunk size {} of {}",
                    i, count
                )),
                other => other,
            })?;
            chunk_sizes.push(u32::from_le_bytes(word));
        }

        let mut compressed = Vec::new();
        reader
            .by_ref()
            .take(blob_size as u64)
            .read_to_end(&mut compressed)
            .map_err(|e| Error::io(source, e))?;
        if compressed.len() < blob_size as usize {
            return Err(Error::truncated(format!(
                "key blob: expected {} bytes, got {}",
                blob_size,
                compressed.len()
            )));
        }

        let blob = codec::decompress(compression, &compressed)?;
        let keys = decode_key_blob(&blob, count)?;

        let encoded_len = (FIXED_HEADER_SIZE + CHUNK_SIZE_WIDTH * count as usize) as u64
            + blob_size as u64;
        Ok((Self { keys, chunk_sizes }, encoded_len))
    }
}

fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], what: &str, source: &Path) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::truncated(format!("short read of {}", what))
        } else {
            Error::io(source, e)
        }
    })
}

/// Encode keys as `[len: u32][bytes]` records.
fn encode_key_blob(keys: &[String]) -> Result<Vec<u8>> {
    let total: usize = keys.iter().map(|k| 4 + k.len()).sum();
    let mut buf = BytesMut::with_capacity(total);
    for key in keys {
        let len = u32::try_from(key.len())
            .map_err(|_| Error::invalid_argument("Key length exceeds u32"))?;
        buf.put_u32_le(len);
        buf.put_slice(key.as_bytes());
    }
    Ok(buf.to_vec())
}

/// Split a decompressed key blob back into keys.
fn decode_key_blob(blob: &[u8], expected: u32) -> Result<Vec<String>> {
    let mut buf = blob;
    let mut keys = Vec::with_capacity((expected as usize).min(PREALLOC_LIMIT));

    while buf.has_remaining() {
        if buf.remaining() < 4 {
            return Err(Error::corruption(format!(
                "Key record {} has a truncated length prefix",
                keys.len()
            )));
        }
        let len = buf.get_u32_le() as usize;
        if buf.remaining() < len {
            return Err(Error::corruption(format!(
                "Key record {} claims {} bytes, {} left in blob",
                keys.len(),
                len,
                buf.remaining()
            )));
        }
        let key = String::from_utf8(buf[..len].to_vec())
            .map_err(|e| Error::corruption(format!("Key {} is not UTF-8: {}", keys.len(), e)))?;
        buf.advance(len);
        keys.push(key);
    }

    if keys.len() != expected as usize {
        return Err(Error::HeaderMismatch { expected, actual: keys.len() });
    }

    if !keys.windows(2).all(|w| w[0] < w[1]) {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert(key.as_str()) {
                return Err(Error::corruption(format!("Duplicate key {:?} in header", key)));
            }
        }
        log::warn!("Key blob is not in sorted order; using file order for offsets");
    }

    Ok(keys)
}
