//! # Coffer - A Single-File Embedded Key-Value Store
//!
//! Coffer keeps a whole dataset in one file and rewrites that file on every
//! mutation. There is no log and no in-place update: each flush compacts
//! the current contents into a fresh image and swaps it in atomically.
//!
//! ## Architecture
//!
//! - **Codec**: compresses each value and the key list (Snappy by default)
//! - **Header**: entry count, per-value compressed sizes, compressed keys
//! - **Index**: per key, either the loaded value or its on-disk location
//! - **Compaction**: writes `<path>.new`, then installs it via `<path>.bak`
//!
//! Values of an existing file are read lazily on first access.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use coffer::{Options, Store};
//!
//! # fn main() -> Result<(), coffer::Error> {
//! // Open or create a store
//! let mut store = Store::open("./data.db", Options::default())?;
//!
//! // Each put rewrites the file
//! store.put("key1", b"value1")?;
//! store.put_all(vec![("key2", "value2"), ("key3", "value3")])?;
//!
//! if let Some(value) = store.get("key1") {
//!     println!("Found: {:?}", value);
//! }
//!
//! store.delete("key1")?;
//! store.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Single writer
//!
//! A `Store` owns its file exclusively. Every operation takes `&mut self`,
//! so sharing one between threads needs a `Mutex`. Two processes (or two
//! `Store` values) opening the same path is outside the contract: both
//! would rewrite the file and the derived `<path>.new` / `<path>.bak`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod codec;
pub mod compaction;
pub mod config;
pub mod error;
pub mod format;
pub mod index;
pub mod write_batch;

// Re-exports
pub use config::{CompressionType, Options};
pub use error::{Error, Result};
pub use index::{Entry, Slot};
pub use write_batch::{WriteBatch, WriteOp};

use compaction::swap::{self, RenameFn};
use compaction::CompactionBuilder;
use error::IoResultExt;
use format::{Header, StorePaths};
use index::Index;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// The main store handle.
///
/// Created by [`Store::open`]; every mutating call rewrites the file before
/// returning.
pub struct Store {
    /// Live file and its flush-time siblings
    paths: StorePaths,

    /// Configuration options
    options: Options,

    /// Read handle on the live file; `None` after `close` or mid-flush
    file: Option<File>,

    /// Where the data region of the live file begins
    data_offset: u64,

    /// Every key in the store and where its value lives
    index: Index,

    /// Successful compactions since open
    flush_count: u64,

    rename: RenameFn,
}

impl Store {
    /// Opens the store file at `path`.
    ///
    /// A missing file is created empty (unless `create_if_missing` is off);
    /// nothing is written to it until the first flush. An existing file has
    /// its header parsed and every key indexed; values stay on disk until
    /// read.
    ///
    /// # Errors
    ///
    /// A file whose header is truncated, inconsistent or corrupt is refused
    /// rather than treated as empty:
    /// - [`Error::TruncatedHeader`] for a short read of any header field
    /// - [`Error::HeaderMismatch`] if the key blob doesn't hold `N` keys
    /// - [`Error::Corruption`] for an undecodable key blob or a data region
    ///   shorter than the header describes
    /// - [`Error::Io`] for open/read failures
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use coffer::{Options, Store};
    ///
    /// # fn main() -> Result<(), coffer::Error> {
    /// let store = Store::open("./my_store.db", Options::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        options.validate()?;
        let paths = StorePaths::new(path);

        Self::check_existing(&paths, &options)?;
        Self::clean_leftovers(&paths, &options)?;

        let (file, header, data_offset) = match OpenOptions::new()
            .read(true)
            .write(true)
            .open(&paths.live)
        {
            Ok(file) => {
                if options.error_if_exists {
                    return Err(Error::AlreadyExists(paths.live.clone()));
                }
                let (header, data_offset) = Self::load(&file, &paths.live, options.compression)?;
                (file, header, data_offset)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !options.create_if_missing {
                    return Err(Error::NotFound(paths.live.clone()));
                }
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create_new(true)
                    .open(&paths.live)
                    .with_path(&paths.live)?;
                log::info!("Created new store file {:?}", paths.live);
                (file, Header::default(), 0)
            }
            Err(e) => return Err(Error::io(&paths.live, e)),
        };

        let index = Index::from_header(&header);
        log::info!(
            "Opened store {:?}: {} entries, data region at offset {}",
            paths.live,
            index.len(),
            data_offset
        );

        Ok(Self {
            paths,
            options,
            file: Some(file),
            data_offset,
            index,
            flush_count: 0,
            rename: default_rename,
        })
    }

    /// Refuse the open before anything on disk is touched.
    ///
    /// A backup without a live file still holds the dataset: it either gets
    /// restored or the open fails, since an empty store would overwrite it
    /// on its first flush.
    fn check_existing(paths: &StorePaths, options: &Options) -> Result<()> {
        let live = paths.live.exists();
        let backup = paths.backup.exists();

        if options.error_if_exists {
            if live {
                return Err(Error::AlreadyExists(paths.live.clone()));
            }
            if backup {
                return Err(Error::AlreadyExists(paths.backup.clone()));
            }
        }
        if !live && backup && !options.recover_backup {
            log::error!(
                "Store file {:?} missing but backup {:?} exists and recovery is disabled",
                paths.live,
                paths.backup
            );
            return Err(Error::AlreadyExists(paths.backup.clone()));
        }
        if !live && !backup && !options.create_if_missing {
            return Err(Error::NotFound(paths.live.clone()));
        }
        Ok(())
    }

    /// Deal with files an interrupted flush may have left behind.
    fn clean_leftovers(paths: &StorePaths, options: &Options) -> Result<()> {
        if paths.temp.exists() {
            log::warn!("Removing stale temporary file {:?}", paths.temp);
            fs::remove_file(&paths.temp).with_path(&paths.temp)?;
        }

        if options.recover_backup && !paths.live.exists() && paths.backup.exists() {
            log::warn!("Store file {:?} missing, restoring backup {:?}", paths.live, paths.backup);
            fs::rename(&paths.backup, &paths.live).with_path(&paths.backup)?;
        }

        Ok(())
    }

    /// Parse the header of an open file and check the data region fits.
    fn load(file: &File, path: &Path, compression: CompressionType) -> Result<(Header, u64)> {
        let file_len = file.metadata().with_path(path)?.len();
        if file_len == 0 {
            // Created but never flushed.
            return Ok((Header::default(), 0));
        }

        let mut reader = BufReader::new(file);
        let (header, data_offset) = Header::read_from(&mut reader, compression, path)?;

        let required = data_offset + header.data_len();
        if file_len < required {
            return Err(Error::corruption(format!(
                "{:?} is {} bytes but its header describes {}",
                path, file_len, required
            )));
        }
        if file_len > required {
            log::warn!("{:?} has {} trailing bytes after the data region", path, file_len - required);
        }

        Ok((header, data_offset))
    }

    /// Retrieves the value for a key.
    ///
    /// Returns `None` if the key doesn't exist. A value that exists but
    /// cannot be read back from disk is also reported as `None` and logged
    /// at error level; use [`Store::try_get`] to see the error.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to read {:?} from {:?}: {}", key, self.paths.live, e);
                None
            }
        }
    }

    /// Retrieves the value for a key, surfacing disk and decode errors.
    ///
    /// A value read from disk is kept in memory afterwards.
    pub fn try_get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let entry = match self.index.get(key) {
            None => return Ok(None),
            Some(Slot::Resident(value)) => return Ok(Some(value.clone())),
            Some(Slot::OnDisk(entry)) => *entry,
        };

        let value = self.read_chunk(entry)?;
        self.index.insert(key.to_owned(), value.clone());
        Ok(Some(value))
    }

    /// Read and decompress one chunk of the live file.
    fn read_chunk(&mut self, entry: Entry) -> Result<Vec<u8>> {
        let position = self.data_offset + entry.offset;
        let path = &self.paths.live;
        let file = live_file(&mut self.file, path)?;

        file.seek(SeekFrom::Start(position)).with_path(path)?;
        let mut buf = vec![0u8; entry.size as usize];
        file.read_exact(&mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::corruption(format!(
                    "chunk of {} bytes at offset {} runs past the end of {:?}",
                    entry.size, position, path
                ))
            } else {
                Error::io(path, e)
            }
        })?;

        codec::decompress(self.options.compression, &buf)
    }

    /// Inserts or overwrites a key and flushes.
    ///
    /// An empty value is stored as such and is distinct from an absent key.
    /// If the flush fails the new value stays visible in memory while the
    /// file keeps its previous contents.
    pub fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.index.insert(key.to_owned(), value.to_vec());
        self.flush()
    }

    /// Inserts or overwrites many keys with a single flush.
    ///
    /// An empty iterator doesn't flush.
    pub fn put_all<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let mut applied = 0usize;
        for (key, value) in entries {
            self.index.insert(key.into(), value.into());
            applied += 1;
        }
        if applied == 0 {
            return Ok(());
        }
        self.flush()
    }

    /// Applies a batch of puts and deletes in order, then flushes once.
    pub fn write(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        log::debug!(
            "Applying batch of {} operations (~{} bytes) to {:?}",
            batch.len(),
            batch.approximate_size(),
            self.paths.live
        );
        for op in batch {
            match op {
                WriteOp::Put { key, value } => self.index.insert(key, value),
                WriteOp::Delete { key } => {
                    self.index.remove(&key);
                }
            }
        }
        self.flush()
    }

    /// Removes a key. Returns whether the key existed.
    ///
    /// With [`Options::flush_on_delete`] (the default) removing an existing
    /// key flushes right away. Otherwise the removal is visible immediately
    /// but only reaches the file with the next flush.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        if !self.index.remove(key) {
            return Ok(false);
        }
        if self.options.flush_on_delete {
            self.flush()?;
        }
        Ok(true)
    }

    /// Rewrites the file from the current contents.
    ///
    /// Values not yet read since open are copied over from the old file.
    /// The new image goes to `<path>.new`, the old file moves to
    /// `<path>.bak`, the new one takes its place and the backup is removed.
    /// On failure the file at `<path>` is the pre-flush one.
    ///
    /// # Errors
    ///
    /// [`Error::Inconsistent`] if an indexed value cannot be read from the
    /// old file (nothing is written in that case), [`Error::Io`] for write
    /// or rename failures.
    pub fn flush(&mut self) -> Result<()> {
        let mut loaded: HashMap<String, Vec<u8>> = HashMap::new();
        for (key, entry) in self.index.on_disk() {
            let value = self.read_chunk(entry).map_err(|e| {
                Error::inconsistent(format!(
                    "{:?} is recorded at offset {} but cannot be read: {}",
                    key, entry.offset, e
                ))
            })?;
            loaded.insert(key, value);
        }

        let mut builder = CompactionBuilder::new(self.options.compression);
        for key in self.index.sorted_keys() {
            let value = match self.index.get(key) {
                Some(Slot::Resident(value)) => value.as_slice(),
                _ => loaded.get(key).map(Vec::as_slice).ok_or_else(|| {
                    Error::inconsistent(format!("{:?} has no resolvable value", key))
                })?,
            };
            builder.add(key, value)?;
        }
        let job = builder.finish()?;

        if let Err(e) = job.write_to(&self.paths.temp, self.options.sync) {
            let _ = fs::remove_file(&self.paths.temp);
            return Err(e);
        }

        // The old handle must be closed before its file is renamed away.
        self.file = None;
        swap::install(&self.paths, self.rename, self.options.sync)?;

        self.data_offset = job.data_offset();
        self.index.relocate(job.header().entries());
        self.flush_count += 1;

        match File::open(&self.paths.live) {
            Ok(file) => self.file = Some(file),
            Err(e) => log::warn!("Flushed {:?} but could not reopen it: {}", self.paths.live, e),
        }

        log::info!(
            "Compacted {:?}: {} entries, {} bytes",
            self.paths.live,
            job.header().len(),
            job.file_len()
        );
        Ok(())
    }

    /// Number of keys in the store.
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether `key` exists, without reading its value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// All keys, in ascending byte order.
    pub fn keys(&self) -> Vec<String> {
        self.index.sorted_keys().into_iter().map(str::to_owned).collect()
    }

    /// Releases the file handle. Idempotent.
    ///
    /// In-memory contents are kept; a later read of an unloaded value or a
    /// write reopens the file.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            log::debug!("Closed {:?}", self.paths.live);
        }
    }

    /// Path of the live store file.
    pub fn path(&self) -> &Path {
        &self.paths.live
    }

    /// The options this store was opened with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of successful flushes since open.
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.paths.live)
            .field("options", &self.options)
            .field("open", &self.file.is_some())
            .field("data_offset", &self.data_offset)
            .field("entries", &self.index.len())
            .field("flush_count", &self.flush_count)
            .finish()
    }
}

/// Return the live file handle, reopening it after `close` or a flush.
fn live_file<'a>(slot: &'a mut Option<File>, path: &Path) -> Result<&'a mut File> {
    if slot.is_none() {
        log::debug!("Reopening {:?}", path);
        *slot = Some(File::open(path).with_path(path)?);
    }
    slot.as_mut().ok_or_else(|| Error::inconsistent("live file handle unavailable"))
}

fn default_rename(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}
