//! Paths derived from the live store file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of the temporary file a flush writes before installing it.
pub const TEMP_SUFFIX: &str = ".new";

/// Suffix the live file is moved to while a flush installs its replacement.
pub const BACKUP_SUFFIX: &str = ".bak";

/// The live file and its flush-time siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// The live data file.
    pub live: PathBuf,
    /// `<live>.new`, exists only mid-flush.
    pub temp: PathBuf,
    /// `<live>.bak`, exists only while the new file is being installed.
    pub backup: PathBuf,
}

impl StorePaths {
    /// Derives the sibling paths of `live`.
    pub fn new<P: AsRef<Path>>(live: P) -> Self {
        let live = live.as_ref().to_path_buf();
        let temp = with_suffix(&live, TEMP_SUFFIX);
        let backup = with_suffix(&live, BACKUP_SUFFIX);
        Self { live, temp, backup }
    }

    /// Directory holding all three files.
    pub fn dir(&self) -> &Path {
        match self.live.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

// Appends to the full file name; `with_extension` would replace `.db`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
