// Fault Injection Tests for Coffer
// Hand-crafted and damaged store files must be refused, never half-loaded

use coffer::{codec, CompressionType, Error, Options, Store};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("store.db")
}

/// Build a store file by hand: header fields as given, key blob compressed
/// with the default codec, followed by `data`.
fn write_raw_store(path: &Path, count: u32, sizes: &[u32], keys: &[&str], data: &[u8]) {
    let mut blob = Vec::new();
    for key in keys {
        blob.extend_from_slice(&(key.len() as u32).to_le_bytes());
        blob.extend_from_slice(key.as_bytes());
    }
    let blob = codec::compress(CompressionType::default(), &blob).unwrap();

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&count.to_le_bytes());
    bytes.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    for size in sizes {
        bytes.extend_from_slice(&size.to_le_bytes());
    }
    bytes.extend_from_slice(&blob);
    bytes.extend_from_slice(data);
    fs::write(path, bytes).unwrap();
}

fn chunk(value: &[u8]) -> Vec<u8> {
    codec::compress(CompressionType::default(), value).unwrap()
}

#[test]
fn test_hand_built_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let (a, b) = (chunk(b"first"), chunk(b"second"));
    let data = [a.clone(), b.clone()].concat();
    write_raw_store(&path, 2, &[a.len() as u32, b.len() as u32], &["a", "b"], &data);

    let mut store = Store::open(&path, Options::default()).unwrap();
    assert_eq!(store.get("b"), Some(b"second".to_vec()));
    assert_eq!(store.get("a"), Some(b"first".to_vec()));
}

#[test]
fn test_entry_count_exceeds_key_blob() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let c = chunk(b"v");
    let data = [c.clone(), c.clone(), c.clone()].concat();
    let size = c.len() as u32;
    write_raw_store(&path, 3, &[size, size, size], &["a", "b"], &data);

    let result = Store::open(&path, Options::default());
    assert!(matches!(result, Err(Error::HeaderMismatch { expected: 3, actual: 2 })));
}

#[test]
fn test_truncated_header() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    {
        let mut store = Store::open(&path, Options::default()).unwrap();
        store.put_all(vec![("a", "1"), ("b", "2")]).unwrap();
    }
    let full = fs::read(&path).unwrap();

    for cut in [3, 8, 11] {
        fs::write(&path, &full[..cut]).unwrap();
        let result = Store::open(&path, Options::default());
        assert!(matches!(result, Err(Error::TruncatedHeader(_))), "cut at {}", cut);
    }
}

#[test]
fn test_truncated_data_region() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    {
        let mut store = Store::open(&path, Options::default()).unwrap();
        store.put("big", &vec![7u8; 4096]).unwrap();
    }
    let full = fs::read(&path).unwrap();
    fs::write(&path, &full[..full.len() - 1]).unwrap();

    let result = Store::open(&path, Options::default());
    assert!(matches!(result, Err(Error::Corruption(_))));
}

#[cfg(feature = "snappy")]
#[test]
fn test_corrupt_key_blob() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&3u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&[0x40, 0xff, 0xff]);
    fs::write(&path, bytes).unwrap();

    let result = Store::open(&path, Options::default());
    assert!(matches!(result, Err(Error::Corruption(_))));
}

#[cfg(feature = "snappy")]
#[test]
fn test_key_blob_claiming_huge_length() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    // Snappy preamble for 2 GiB in a 7-byte blob.
    let blob = [0x80, 0x80, 0x80, 0x80, 0x08, 0x00, b'k'];
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&blob);
    fs::write(&path, bytes).unwrap();

    let result = Store::open(&path, Options::default());
    assert!(matches!(result, Err(Error::Corruption(_))));
}

#[test]
fn test_corrupt_file_is_not_replaced() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    fs::write(&path, b"\x05\x00\x00").unwrap();
    assert!(Store::open(&path, Options::default()).is_err());
    assert_eq!(fs::read(&path).unwrap(), b"\x05\x00\x00");
}

#[cfg(feature = "snappy")]
#[test]
fn test_corrupt_value_chunk() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let good = chunk(b"intact");
    // Snappy preamble claiming 64 bytes, then an incomplete copy tag.
    let bad = vec![0x40, 0xff, 0xff, 0xff];
    let data = [good.clone(), bad.clone()].concat();
    write_raw_store(&path, 2, &[good.len() as u32, bad.len() as u32], &["good", "bad"], &data);

    let mut store = Store::open(&path, Options::default()).unwrap();
    assert_eq!(store.get("good"), Some(b"intact".to_vec()));

    // Reported as missing through get, as an error through try_get.
    assert_eq!(store.get("bad"), None);
    assert!(matches!(store.try_get("bad"), Err(Error::Corruption(_))));
    assert!(store.contains_key("bad"));

    // Flushing would lose "bad", so it refuses and leaves the file alone.
    let before = fs::read(&path).unwrap();
    assert!(matches!(store.put("new", b"x"), Err(Error::Inconsistent(_))));
    assert_eq!(fs::read(&path).unwrap(), before);

    // Deleting the broken key lets the store move on.
    assert!(store.delete("bad").unwrap());
    drop(store);
    let mut store = Store::open(&path, Options::default()).unwrap();
    assert_eq!(store.keys(), vec!["good", "new"]);
    assert_eq!(store.get("new"), Some(b"x".to_vec()));
}

#[test]
fn test_unwritable_temp_path_keeps_original() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let mut store = Store::open(&path, Options::default()).unwrap();
    store.put("k", b"v1").unwrap();
    let before = fs::read(&path).unwrap();

    // A directory where the temporary file should go makes the write fail.
    fs::create_dir(dir.path().join("store.db.new")).unwrap();
    let err = store.put("k", b"v2").unwrap_err();
    assert!(matches!(err, Error::Io { .. }));

    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(store.get("k"), Some(b"v2".to_vec()));
    assert_eq!(store.flush_count(), 1);
}

#[test]
fn test_missing_file_without_create() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let options = Options::default().create_if_missing(false);
    let result = Store::open(&path, options);
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(!path.exists());
}

#[test]
fn test_error_if_exists() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let options = Options::default().error_if_exists(true);
    Store::open(&path, options.clone()).unwrap();
    let result = Store::open(&path, options);
    assert!(matches!(result, Err(Error::AlreadyExists(_))));
}

#[test]
fn test_missing_directory_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no_such_dir").join("store.db");

    match Store::open(&path, Options::default()) {
        Err(Error::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected result: {:?}", other),
    }
}
