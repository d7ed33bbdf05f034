//! Error types for the Coffer store.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The result type used throughout Coffer.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for Coffer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation on one of the store's files failed.
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// The file the operation was acting on.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A fixed-width header field could not be read in full.
    #[error("Truncated header: {0}")]
    TruncatedHeader(String),

    /// The header's entry count disagrees with its key blob.
    #[error("Header mismatch: header declares {expected} entries, key blob holds {actual}")]
    HeaderMismatch {
        /// Entry count stored in the header.
        expected: u32,
        /// Number of keys actually recovered from the key blob.
        actual: usize,
    },

    /// Compressed data is malformed or decodes to the wrong length.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A key known to the store cannot be resolved to bytes.
    #[error("Inconsistent store: {0}")]
    Inconsistent(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store file does not exist and creation was not requested.
    #[error("Not found: {0:?}")]
    NotFound(PathBuf),

    /// The store file (or its backup) exists but may not be opened as
    /// requested: `error_if_exists` is set, or the backup would have to be
    /// restored with `recover_backup` off.
    #[error("Already exists: {0:?}")]
    AlreadyExists(PathBuf),
}

impl Error {
    /// Creates a new I/O error bound to a path.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io { path: path.as_ref().to_path_buf(), source }
    }

    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new truncated header error.
    pub fn truncated(msg: impl Into<String>) -> Self {
        Error::TruncatedHeader(msg.into())
    }

    /// Creates a new inconsistency error.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Error::Inconsistent(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// Attaches a path to a raw `std::io::Result`.
pub trait IoResultExt<T> {
    /// Converts the error into [`Error::Io`] for `path`.
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
