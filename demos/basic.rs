//! Basic usage example for Coffer
//!
//! This example demonstrates the fundamental operations:
//! - Opening a store
//! - Writing and batch-writing key-value pairs
//! - Reading values back after a reopen
//! - Deleting keys
//!
//! Run with `RUST_LOG=info` to see each compaction.

use coffer::{Options, Store, WriteBatch};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let path = std::env::temp_dir().join("coffer_example.db");

    {
        let mut store = Store::open(&path, Options::default())?;
        println!("Store opened at {:?} with {} keys", store.path(), store.count());

        // Each put rewrites the file
        println!("Writing data...");
        store.put("key1", b"value1")?;
        store.put("key2", b"value2")?;

        // A batch rewrites it once
        let mut batch = WriteBatch::new();
        for i in 3..=10 {
            batch.put(format!("key{}", i), format!("value{}", i));
        }
        store.write(batch)?;
        println!("{} keys after {} flushes", store.count(), store.flush_count());

        println!("Deleting key2...");
        store.delete("key2")?;
        store.close();
    }

    // Reopen: values are read lazily from disk
    let mut store = Store::open(&path, Options::default())?;
    for key in store.keys() {
        if let Some(value) = store.get(&key) {
            println!("{} => {}", key, String::from_utf8_lossy(&value));
        }
    }
    store.close();

    std::fs::remove_file(&path)?;
    println!("Example completed successfully!");
    Ok(())
}
