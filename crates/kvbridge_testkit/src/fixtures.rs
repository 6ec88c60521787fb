//! Test fixtures and database helpers.

use kvbridge_core::{Database, Options, WriteOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test database with automatic cleanup.
///
/// The database is closed before its temporary directory is removed.
pub struct TestDb {
    db: Option<Database>,
    temp_dir: TempDir,
}

impl TestDb {
    /// Opens a fresh database in a new temporary directory.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Opens a fresh database with `options`.
    pub fn with_options(options: Options) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(temp_dir.path().join("db"), options)
            .expect("Failed to open test database");
        Self {
            db: Some(db),
            temp_dir,
        }
    }

    /// Path of the database directory.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("db")
    }

    /// Root of the temporary directory, for sibling databases.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Closes the database and opens it again with `options`.
    pub fn reopen(&mut self, options: Options) {
        if let Some(db) = self.db.take() {
            db.close();
        }
        self.db = Some(Database::open(self.path(), options).expect("Failed to reopen database"));
    }

    /// Closes the database, keeping the directory for inspection.
    pub fn close(&mut self) {
        if let Some(db) = self.db.take() {
            db.close();
        }
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDb {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        self.db.as_ref().expect("test database is closed")
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs a test with a temporary in-memory database.
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let db = Database::open_in_memory(Options::default()).expect("Failed to open in-memory database");
    let result = f(&db);
    db.close();
    result
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDb::new();
    let path = test_db.path();
    f(&*test_db, path.as_path())
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Key used for entry `i` of a populated database.
    pub fn key(i: usize) -> Vec<u8> {
        format!("key-{i:06}").into_bytes()
    }

    /// Value used for entry `i` of a populated database.
    pub fn value(i: usize) -> Vec<u8> {
        format!("value-{i}").into_bytes()
    }

    /// Creates a database holding `count` ordered entries.
    pub fn populated_database(count: usize) -> TestDb {
        let test_db = TestDb::new();
        for i in 0..count {
            test_db
                .put(WriteOptions::default(), &key(i), &value(i))
                .expect("Failed to put entry");
        }
        test_db
    }
}
