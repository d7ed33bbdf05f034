//! Whole-file compaction.
//!
//! Every flush rewrites the store from scratch. The process:
//!
//! 1. Resolve every key to its uncompressed value (done by the store)
//! 2. Compress each value in sorted key order (builder.rs)
//! 3. Write header + chunks to `<path>.new` ([`CompactionJob::write_to`])
//! 4. Install the new file through a backup rename (swap.rs)
//!
//! Identical logical content always yields a byte-identical file.

pub mod builder;
pub mod swap;

pub use builder::CompactionBuilder;

use crate::error::{IoResultExt, Result};
use crate::format::Header;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A fully encoded store image, ready to be written.
#[derive(Debug)]
pub struct CompactionJob {
    header: Header,
    header_bytes: Vec<u8>,
    chunks: Vec<Vec<u8>>,
}

impl CompactionJob {
    pub(crate) fn new(header: Header, header_bytes: Vec<u8>, chunks: Vec<Vec<u8>>) -> Self {
        Self { header, header_bytes, chunks }
    }

    /// The header of the new image.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Where the data region begins in the new image.
    pub fn data_offset(&self) -> u64 {
        self.header_bytes.len() as u64
    }

    /// Total size of the new image.
    pub fn file_len(&self) -> u64 {
        self.data_offset() + self.header.data_len()
    }

    /// Write the image to `path`, replacing anything already there.
    pub fn write_to(&self, path: &Path, sync: bool) -> Result<()> {
        let file = File::create(path).with_path(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&self.header_bytes).with_path(path)?;
        for chunk in &self.chunks {
            writer.write_all(chunk).with_path(path)?;
        }
        writer.flush().with_path(path)?;

        if sync {
            writer.get_ref().sync_all().with_path(path)?;
        }

        log::info!(
            "Compaction image written: {} entries, {} bytes -> {:?}",
            self.header.len(),
            self.file_len(),
            path
        );
        Ok(())
    }
}
