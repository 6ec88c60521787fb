//! Session lifecycle and read/write behavior against on-disk databases.

use kvbridge_core::{Database, ErrorKind, Options, ReadOptions, WriteBatch, WriteOptions};
use kvbridge_testkit::prelude::*;
use tempfile::TempDir;

#[test]
fn open_put_get_delete_close() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("db");

    let db = Database::open(&path, Options::default()).unwrap();
    db.put(WriteOptions::default(), b"a", b"1").unwrap();
    assert_eq!(db.get(ReadOptions::default(), b"a").unwrap(), Some(b"1".to_vec()));

    db.delete(WriteOptions::default(), b"a").unwrap();
    assert_eq!(db.get(ReadOptions::default(), b"a").unwrap(), None);
    db.close();
}

#[test]
fn open_missing_without_create_is_io_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing");

    let err = Database::open(&path, Options::default().create_if_missing(false)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(!path.exists());

    let db = Database::open(&path, Options::default()).unwrap();
    assert!(path.join("data.redb").exists());
    db.close();
}

#[test]
fn open_empty_directory_without_create_is_io_error() {
    let temp = TempDir::new().unwrap();
    let err = Database::open(temp.path(), Options::default().create_if_missing(false)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    // The failed open released the directory lock.
    Database::open(temp.path(), Options::default()).unwrap().close();
}

#[test]
fn second_open_of_same_path_fails() {
    let test_db = TestDb::new();
    let err = Database::open(test_db.path(), Options::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn error_if_exists_rejects_existing_database() {
    let mut test_db = TestDb::new();
    test_db.close();

    let err = Database::open(test_db.path(), Options::default().error_if_exists(true)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);
}

#[test]
fn data_survives_reopen() {
    let mut test_db = TestDb::with_options(Options::default().cache_size(1 << 20));
    test_db.put(WriteOptions::sync(), b"k", b"v").unwrap();
    test_db.put(WriteOptions::sync(), b"empty", b"").unwrap();

    test_db.reopen(Options::default().paranoid_checks(true));
    assert_eq!(test_db.get(ReadOptions::default(), b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(
        test_db.get(ReadOptions::default(), b"empty").unwrap(),
        Some(Vec::new())
    );
}

#[test]
fn batch_applies_all_operations() {
    let test_db = TestDb::new();
    test_db.put(WriteOptions::default(), b"B", b"old").unwrap();

    let mut batch = WriteBatch::new();
    batch.put(b"A", b"1").delete(b"B");
    test_db.write(WriteOptions::sync(), &batch).unwrap();

    assert_eq!(test_db.get(ReadOptions::default(), b"A").unwrap(), Some(b"1".to_vec()));
    assert_eq!(test_db.get(ReadOptions::default(), b"B").unwrap(), None);
}

#[test]
fn snapshot_isolation() {
    let test_db = TestDb::new();
    test_db.put(WriteOptions::default(), b"K", b"V1").unwrap();
    let snapshot = test_db.snapshot().unwrap();

    test_db.put(WriteOptions::default(), b"K", b"V2").unwrap();
    test_db.put(WriteOptions::default(), b"new", b"x").unwrap();

    assert_eq!(
        test_db.get(ReadOptions::at(&snapshot), b"K").unwrap(),
        Some(b"V1".to_vec())
    );
    assert_eq!(test_db.get(ReadOptions::at(&snapshot), b"new").unwrap(), None);
    assert_eq!(test_db.get(ReadOptions::default(), b"K").unwrap(), Some(b"V2".to_vec()));

    let mut iter = test_db.new_iterator(ReadOptions::at(&snapshot)).unwrap();
    let keys: Vec<_> = iter.entries().map(|e| e.unwrap().0).collect();
    assert_eq!(keys, vec![b"K".to_vec()]);

    test_db.release_snapshot(snapshot).unwrap();
}

#[test]
fn properties_on_disk() {
    let test_db = scenarios::populated_database(5);

    assert_eq!(
        test_db.get_property(kvbridge_core::property::NUM_ENTRIES),
        Some(b"5".to_vec())
    );
    let size: u64 = String::from_utf8(
        test_db
            .get_property(kvbridge_core::property::APPROXIMATE_SIZE)
            .unwrap(),
    )
    .unwrap()
    .parse()
    .unwrap();
    assert!(size > 0);

    let stats = String::from_utf8(test_db.get_property(kvbridge_core::property::STATS).unwrap()).unwrap();
    assert!(stats.contains("entries: 5"));
    assert!(stats.contains(&test_db.path().display().to_string()));
}

#[test]
fn destroy_and_repair() {
    let mut test_db = scenarios::populated_database(3);
    test_db.close();

    Database::repair(test_db.path()).unwrap();
    test_db.reopen(Options::default());
    assert_eq!(
        test_db.get(ReadOptions::default(), &scenarios::key(2)).unwrap(),
        Some(scenarios::value(2))
    );
    test_db.close();

    Database::destroy(test_db.path()).unwrap();
    assert!(!test_db.path().exists());
    assert!(Database::destroy(test_db.path()).is_ok());

    let err = Database::repair(test_db.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn destroy_live_database_fails() {
    let test_db = TestDb::new();
    let err = Database::destroy(test_db.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn close_with_open_children_releases_engine() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("db");

    let db = Database::open(&path, Options::default()).unwrap();
    db.put(WriteOptions::sync(), b"k", b"v").unwrap();
    let snapshot = db.snapshot().unwrap();
    let mut iter = db.new_iterator(ReadOptions::default()).unwrap();
    iter.seek_to_first().unwrap();
    let mut pinned = db.new_iterator(ReadOptions::at(&snapshot)).unwrap();
    pinned.seek_to_first().unwrap();
    db.close();

    assert!(snapshot.is_released());
    assert_eq!(iter.status().unwrap_err().kind(), ErrorKind::Programming);
    assert_eq!(pinned.seek_to_last().unwrap_err().kind(), ErrorKind::Programming);

    let reopened = Database::open(&path, Options::default().create_if_missing(false)).unwrap();
    assert_eq!(reopened.get(ReadOptions::default(), b"k").unwrap(), Some(b"v".to_vec()));
    reopened.close();

    drop(pinned);
    drop(iter);
    drop(snapshot);
}

#[test]
fn destroy_after_close_with_live_snapshot() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("db");

    let db = Database::open(&path, Options::default()).unwrap();
    db.put(WriteOptions::sync(), b"k", b"v").unwrap();
    let snapshot = db.snapshot().unwrap();
    db.close();

    Database::destroy(&path).unwrap();
    assert!(!path.exists());
    assert!(snapshot.is_released());

    let fresh = Database::open(&path, Options::default()).unwrap();
    assert_eq!(fresh.get(ReadOptions::default(), b"k").unwrap(), None);
}
