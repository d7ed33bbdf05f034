//! Configuration options for the Coffer store.

/// Configuration options for opening a store.
#[derive(Debug, Clone)]
pub struct Options {
    /// Create the store file if it doesn't exist.
    /// Default: true
    pub create_if_missing: bool,

    /// Error if the store file already exists.
    /// Default: false
    pub error_if_exists: bool,

    /// Compression algorithm for the key blob and value chunks.
    /// Must stay the same for every open of a given file.
    /// Default: CompressionType::Snappy
    pub compression: CompressionType,

    /// Fsync the rewritten file before it replaces the live one, and the
    /// parent directory afterwards.
    /// Default: true
    pub sync: bool,

    /// Flush immediately when `delete` removes a key. When disabled, deletes
    /// become durable with the next flush.
    /// Default: true
    pub flush_on_delete: bool,

    /// Restore `<path>.bak` when `<path>` is missing at open time.
    /// When off, such an open fails instead of starting empty.
    /// Default: true
    pub recover_backup: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            compression: CompressionType::default(),
            sync: true,
            flush_on_delete: true,
            recover_backup: true,
        }
    }
}

/// Compression algorithms supported by Coffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    None = 0,

    /// Snappy compression (fast, moderate compression ratio).
    #[cfg(feature = "snappy")]
    Snappy = 1,

    /// LZ4 compression (very fast, lower compression ratio).
    #[cfg(feature = "lz4-compression")]
    Lz4 = 2,
}

impl Default for CompressionType {
    fn default() -> Self {
        #[cfg(feature = "snappy")]
        return CompressionType::Snappy;

        #[cfg(not(feature = "snappy"))]
        CompressionType::None
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store file if it doesn't exist.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether opening an existing file is an error.
    pub fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets the compression algorithm.
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Enables or disables fsync during flush.
    pub fn sync(mut self, value: bool) -> Self {
        self.sync = value;
        self
    }

    /// Sets whether `delete` flushes immediately.
    pub fn flush_on_delete(mut self, value: bool) -> Self {
        self.flush_on_delete = value;
        self
    }

    /// Sets whether a leftover backup is restored at open.
    pub fn recover_backup(mut self, value: bool) -> Self {
        self.recover_backup = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.error_if_exists && !self.create_if_missing {
            return Err(crate::Error::invalid_argument(
                "error_if_exists requires create_if_missing",
            ));
        }
        Ok(())
    }
}
