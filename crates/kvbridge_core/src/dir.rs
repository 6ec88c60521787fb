//! Database directory management.
//!
//! A database path names a directory:
//!
//! ```text
//! <db_path>/
//! ├─ LOCK          # Advisory lock, one live session per directory
//! └─ data.redb     # Engine file
//! ```
//!
//! The LOCK file is held for as long as the engine handle is alive, so a
//! second open of the same directory fails instead of sharing the engine.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// File names within the database directory.
const LOCK_FILE: &str = "LOCK";
const DATA_FILE: &str = "data.redb";

/// An opened database directory holding the exclusive lock.
#[derive(Debug)]
pub(crate) struct DatabaseDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    lock_file: File,
}

impl DatabaseDir {
    /// Opens (and optionally creates) a database directory and locks it.
    ///
    /// # Errors
    ///
    /// Returns an IO error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - Another session holds the lock
    pub fn open(path: &Path, create_if_missing: bool) -> Result<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(Error::io(format!(
                    "{}: does not exist (create_if_missing is false)",
                    path.display()
                )));
            }
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(Error::io(format!("{}: not a directory", path.display())));
        }

        let lock_file = Self::lock(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lock_file,
        })
    }

    fn lock(path: &Path) -> Result<File> {
        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(Error::io(format!(
                "lock {}: already held by process",
                lock_path.display()
            )));
        }
        Ok(lock_file)
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the engine file path.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        data_path(&self.path)
    }

    /// Returns true if the engine file exists.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data_path().exists()
    }

    /// Size of the engine file in bytes.
    pub fn data_size(&self) -> io::Result<u64> {
        fs::metadata(self.data_path()).map(|m| m.len())
    }

    /// Removes every file the bridge owns under `path`.
    ///
    /// A path that does not exist is already destroyed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if a live session holds the lock or removal fails.
    pub fn destroy(path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let lock_file = Self::lock(path)?;
        let data = data_path(path);
        if data.exists() {
            fs::remove_file(&data)?;
        }
        // Unlocking can only fail if the descriptor is already gone.
        let _ = FileExt::unlock(&lock_file);
        drop(lock_file);
        fs::remove_file(path.join(LOCK_FILE))?;

        // Leave the directory behind if the caller keeps other files in it.
        let _ = fs::remove_dir(path);
        Ok(())
    }
}

impl Drop for DatabaseDir {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}

/// Returns the engine file path for a database directory.
pub(crate) fn data_path(path: &Path) -> PathBuf {
    path.join(DATA_FILE)
}
