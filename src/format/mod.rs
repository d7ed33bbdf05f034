//! On-disk file format.
//!
//! A store is one file. It starts with a header describing every key and
//! the compressed size of its value, followed by the data region holding
//! the compressed values back to back.
//!
//! ## File Format
//!
//! ```text
//! [entry_count: u32]                  N
//! [key_blob_size: u32]                Ks, compressed size of the key blob
//! [chunk_size: u32] x N               compressed size of each value, key order
//! [key_blob: Ks bytes]                compress(key records, sorted)
//! [chunk 0][chunk 1]...[chunk N-1]    data region, no padding
//! ```
//!
//! All integers are little-endian. A key record inside the uncompressed key
//! blob is `[key_len: u32][key bytes]`, so keys may contain any byte.
//!
//! Next to the live file a flush uses two derived paths, see [`StorePaths`].

pub mod header;
pub mod paths;

pub use header::Header;
pub use paths::StorePaths;

/// Size of the two fixed leading header words.
pub const FIXED_HEADER_SIZE: usize = 8;

/// Size of each per-chunk size word.
pub const CHUNK_SIZE_WIDTH: usize = 4;
