//! WriteBatch groups puts and deletes behind a single flush.
//!
//! Every flush rewrites the whole file, so applying N changes one at a time
//! costs N rewrites. A batch applies all of them to memory first and then
//! compacts once.
//!
//! # Example
//!
//! ```rust,no_run
//! use coffer::{Options, Store, WriteBatch};
//!
//! # fn main() -> Result<(), coffer::Error> {
//! let mut store = Store::open("./data.db", Options::default())?;
//! let mut batch = WriteBatch::new();
//!
//! batch.put("key1", b"value1");
//! batch.put("key2", b"value2");
//! batch.delete("key3");
//!
//! // One compaction for all three operations
//! store.write(batch)?;
//! # Ok(())
//! # }
//! ```

/// Type of write operation in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Put operation with key and value
    Put {
        /// Key to insert
        key: String,
        /// Value to associate with the key
        value: Vec<u8>,
    },
    /// Delete operation with key
    Delete {
        /// Key to delete
        key: String,
    },
}

/// WriteBatch accumulates write operations, applied in insertion order.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    operations: Vec<WriteOp>,
    approximate_size: usize,
}

impl WriteBatch {
    /// Creates a new empty WriteBatch.
    ///
    /// # Example
    ///
    /// ```
    /// use coffer::WriteBatch;
    ///
    /// let batch = WriteBatch::new();
    /// assert!(batch.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a Put operation to the batch.
    ///
    /// # Example
    ///
    /// ```
    /// use coffer::WriteBatch;
    ///
    /// let mut batch = WriteBatch::new();
    /// batch.put("key", b"value");
    /// assert_eq!(batch.len(), 1);
    /// ```
    pub fn put(&mut self, key: impl Into<String>, value: impl AsRef<[u8]>) {
        let key = key.into();
        let value = value.as_ref().to_vec();
        self.approximate_size += key.len() + value.len() + 8;
        self.operations.push(WriteOp::Put { key, value });
    }

    /// Adds a Delete operation to the batch.
    pub fn delete(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.approximate_size += key.len() + 4;
        self.operations.push(WriteOp::Delete { key });
    }

    /// Clears all operations from the batch.
    pub fn clear(&mut self) {
        self.operations.clear();
        self.approximate_size = 0;
    }

    /// Returns the number of operations in the batch.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the batch contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the approximate size of the batch in bytes.
    pub fn approximate_size(&self) -> usize {
        self.approximate_size
    }

    /// Returns an iterator over the operations in the batch.
    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.operations.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for WriteBatch
where
    K: Into<String>,
    V: AsRef<[u8]>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut batch = WriteBatch::new();
        for (key, value) in iter {
            batch.put(key, value);
        }
        batch
    }
}
