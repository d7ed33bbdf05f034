//! Installing a freshly written image over the live file.
//!
//! ```text
//! <path>      -> <path>.bak     (abort here: live file untouched)
//! <path>.new  -> <path>         (on failure: <path>.bak -> <path>)
//! remove <path>.bak
//! ```
//!
//! Same-directory renames are assumed atomic, so an observer of `<path>`
//! sees either the old image or the new one.

use crate::error::{Error, Result};
use crate::format::StorePaths;
use std::fs;
use std::io;
use std::path::Path;

/// Rename primitive used by [`install`]. Swappable so tests can fail it.
pub(crate) type RenameFn = fn(&Path, &Path) -> io::Result<()>;

/// Replace the live file with the temporary one.
///
/// On error the live path holds the pre-flush file again (unless restoring
/// the backup itself failed, which is logged).
pub(crate) fn install(paths: &StorePaths, rename: RenameFn, sync: bool) -> Result<()> {
    let backed_up = match rename(&paths.live, &paths.backup) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Live file {:?} vanished before flush; installing without backup", paths.live);
            false
        }
        Err(e) => {
            discard_temp(paths);
            return Err(Error::io(&paths.live, e));
        }
    };

    if let Err(e) = rename(&paths.temp, &paths.live) {
        if backed_up {
            if let Err(restore) = rename(&paths.backup, &paths.live) {
                log::error!(
                    "Failed to restore backup {:?} to {:?}: {}",
                    paths.backup,
                    paths.live,
                    restore
                );
            }
        }
        discard_temp(paths);
        return Err(Error::io(&paths.temp, e));
    }

    if backed_up {
        if let Err(e) = fs::remove_file(&paths.backup) {
            log::warn!("Failed to remove backup {:?}: {}", paths.backup, e);
        }
    }

    // The new file is live from here on; report success even if the
    // directory sync fails.
    if sync {
        if let Err(e) = sync_dir(paths.dir()) {
            log::warn!("Failed to sync directory {:?}: {}", paths.dir(), e);
        }
    }
    Ok(())
}

fn discard_temp(paths: &StorePaths) {
    if let Err(e) = fs::remove_file(&paths.temp) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Failed to remove temporary file {:?}: {}", paths.temp, e);
        }
    }
}

/// Persist the renames by syncing the directory entry.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir).and_then(|d| d.sync_all()).map_err(|e| Error::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
