//! Compression integration.
//!
//! Every value chunk and the key blob go through the same algorithm, fixed
//! by [`Options::compression`](crate::Options::compression). Snappy and LZ4
//! streams record their own uncompressed length, and decoding checks the
//! output against it, so a chunk that decodes "successfully" to the wrong
//! number of bytes is still reported as corruption.

use crate::config::CompressionType;
use crate::error::{Error, Result};

/// Upper bound on decompressed/compressed size for Snappy. The densest
/// element is a 3-byte copy producing 64 bytes.
#[cfg(feature = "snappy")]
const MAX_SNAPPY_RATIO: usize = 32;

/// Upper bound on decompressed/compressed size for LZ4 blocks.
#[cfg(feature = "lz4-compression")]
const MAX_LZ4_RATIO: usize = 256;

/// Compresses `data` with the given algorithm.
///
/// Empty input produces a valid stream that decompresses back to empty.
pub fn compress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| Error::invalid_argument(format!("Compression failed: {}", e))),
        #[cfg(feature = "lz4-compression")]
        CompressionType::Lz4 => {
            if data.len() > i32::MAX as usize {
                return Err(Error::invalid_argument("Value too large for LZ4 block"));
            }
            lz4::block::compress(data, None, true)
                .map_err(|e| Error::invalid_argument(format!("Compression failed: {}", e)))
        }
    }
}

/// Decompresses a stream produced by [`compress`].
///
/// Fails with [`Error::Corruption`] if the stream is malformed or if the
/// decoded length differs from the length recorded in the stream.
pub fn decompress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => {
            let expected = snap::raw::decompress_len(data)
                .map_err(|e| Error::corruption(format!("Malformed snappy stream: {}", e)))?;
            check_claimed_len(expected, data.len(), MAX_SNAPPY_RATIO)?;
            let decoded = snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| Error::corruption(format!("Decompression failed: {}", e)))?;
            check_len(decoded, expected)
        }
        #[cfg(feature = "lz4-compression")]
        CompressionType::Lz4 => {
            if data.len() < 4 {
                return Err(Error::corruption("LZ4 stream shorter than its size prefix"));
            }
            let prefix = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            let expected = usize::try_from(prefix)
                .map_err(|_| Error::corruption(format!("Negative LZ4 size prefix: {}", prefix)))?;
            if expected == 0 {
                return Ok(Vec::new());
            }
            check_claimed_len(expected, data.len() - 4, MAX_LZ4_RATIO)?;
            let decoded = lz4::block::decompress(data, None)
                .map_err(|e| Error::corruption(format!("Decompression failed: {}", e)))?;
            check_len(decoded, expected)
        }
    }
}

/// Reject a recorded length no stream of `stream_len` bytes could decode
/// to, before allocating for it.
#[cfg(any(feature = "snappy", feature = "lz4-compression"))]
fn check_claimed_len(expected: usize, stream_len: usize, max_ratio: usize) -> Result<()> {
    if expected > stream_len.saturating_mul(max_ratio) {
        return Err(Error::corruption(format!(
            "Stream of {} bytes claims {} decompressed bytes",
            stream_len, expected
        )));
    }
    Ok(())
}

#[cfg(any(feature = "snappy", feature = "lz4-compression"))]
fn check_len(decoded: Vec<u8>, expected: usize) -> Result<Vec<u8>> {
    if decoded.len() != expected {
        return Err(Error::corruption(format!(
            "Decompressed length mismatch: expected {}, got {}",
            expected,
            decoded.len()
        )));
    }
    Ok(decoded)
}
