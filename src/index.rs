//! In-memory index of the store.
//!
//! Every key maps to a [`Slot`]: either the value bytes themselves, or an
//! [`Entry`] locating the compressed value inside the installed file. Keys
//! loaded at open start out on disk and become resident when read; keys
//! written this session are resident from the start.

use crate::format::Header;
use std::collections::HashMap;

/// Location of one compressed value chunk.
///
/// `offset` is relative to the start of the data region, not the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Offset of the chunk within the data region
    pub offset: u64,
    /// Compressed size of the chunk in bytes
    pub size: u32,
}

impl Entry {
    /// Create a new Entry
    pub fn new(offset: u64, size: u32) -> Self {
        Self { offset, size }
    }

    /// Get the end offset of this chunk
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size as u64
    }
}

/// Where the value of a key currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Uncompressed value held in memory.
    Resident(Vec<u8>),
    /// Compressed chunk in the installed file, not read yet.
    OnDisk(Entry),
}

/// Key to slot map.
#[derive(Debug, Default)]
pub struct Index {
    slots: HashMap<String, Slot>,
}

impl Index {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index of on-disk slots from a parsed header.
    pub fn from_header(header: &Header) -> Self {
        let slots = header
            .entries()
            .map(|(key, entry)| (key.to_owned(), Slot::OnDisk(entry)))
            .collect();
        Self { slots }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Look up the slot for `key`.
    pub fn get(&self, key: &str) -> Option<&Slot> {
        self.slots.get(key)
    }

    /// Store a resident value, replacing any previous slot.
    pub fn insert(&mut self, key: String, value: Vec<u8>) {
        self.slots.insert(key, Slot::Resident(value));
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Keys in byte-wise ascending order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Keys whose value has not been read from disk yet.
    pub fn on_disk(&self) -> Vec<(String, Entry)> {
        self.slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::OnDisk(entry) => Some((key.clone(), *entry)),
                Slot::Resident(_) => None,
            })
            .collect()
    }

    /// Re-point on-disk slots at the chunk locations of a newly installed
    /// file. Resident slots are left alone.
    pub fn relocate<'a>(&mut self, entries: impl IntoIterator<Item = (&'a str, Entry)>) {
        for (key, entry) in entries {
            if let Some(Slot::OnDisk(old)) = self.slots.get_mut(key) {
                *old = entry;
            }
        }
    }
}
