//! Database sessions.

use crate::cache::BlockCache;
use crate::dir::DatabaseDir;
use crate::engine::{Engine, Mutation, ReadView, ViewLease};
use crate::error::{Error, Result};
use crate::iterator::DbIterator;
use crate::logger::SessionLogger;
use crate::options::{Options, ReadOptions, WriteOptions};
use crate::property;
use crate::snapshot::Snapshot;
use crate::write_batch::WriteBatch;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// State shared between a session and the iterators and snapshots it
/// hands out. Children hold it weakly.
///
/// Fields drop in declaration order: the engine handle is released before
/// the block cache, and the logger goes last. Views leased to children are
/// revoked before any of them.
pub(crate) struct SessionInner {
    engine: Engine,
    cache: Option<BlockCache>,
    pub(crate) logger: SessionLogger,
    options: Options,
    pub(crate) live_snapshots: AtomicUsize,
    pub(crate) live_iterators: AtomicUsize,
    leases: Mutex<Vec<Weak<ViewLease>>>,
}

impl SessionInner {
    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn options(&self) -> &Options {
        &self.options
    }

    /// Leases `view` to a child, to be revoked when the session closes.
    pub(crate) fn lease(&self, view: Arc<ReadView>) -> Arc<ViewLease> {
        let lease = Arc::new(ViewLease::new(view));
        let mut leases = self.leases.lock();
        leases.retain(|l| l.strong_count() > 0);
        leases.push(Arc::downgrade(&lease));
        lease
    }

    fn revoke_leases(&self) -> usize {
        let mut revoked = 0;
        for lease in self.leases.lock().drain(..) {
            if let Some(lease) = lease.upgrade() {
                lease.revoke();
                revoked += 1;
            }
        }
        revoked
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let revoked = self.revoke_leases();
        if revoked > 0 {
            self.logger.debug(format_args!("revoked {revoked} leased view(s)"));
        }
        self.logger.debug(format_args!(
            "closing session (cache: {})",
            self.cache.as_ref().map_or(0, BlockCache::capacity)
        ));
    }
}

/// An open database.
///
/// # Example
///
/// ```rust,ignore
/// use kvbridge_core::{Database, Options, ReadOptions, WriteOptions};
///
/// let db = Database::open("/tmp/db", Options::default())?;
/// db.put(WriteOptions::default(), b"a", b"1")?;
/// assert_eq!(db.get(ReadOptions::default(), b"a")?, Some(b"1".to_vec()));
/// db.close();
/// ```
pub struct Database {
    pub(crate) inner: Arc<SessionInner>,
}

impl Database {
    /// Opens the database at `path`.
    ///
    /// # Errors
    ///
    /// - `Io` if the path is missing and `create_if_missing` is false, or
    ///   another session holds the directory
    /// - `Generic` if the database exists and `error_if_exists` is true
    /// - any mapped engine error
    ///
    /// Resources acquired before a failure are released before returning.
    pub fn open(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let logger = SessionLogger::new(path.display().to_string());
        let cache = BlockCache::new(options.cache_size);
        let dir = DatabaseDir::open(path, options.create_if_missing)?;
        let engine = Engine::open(dir, &options, cache.as_ref(), &logger)?;
        Ok(Self::assemble(engine, cache, logger, options))
    }

    /// Opens a database that lives only in memory.
    pub fn open_in_memory(options: Options) -> Result<Self> {
        let logger = SessionLogger::new(":memory:");
        let cache = BlockCache::new(options.cache_size);
        let engine = Engine::open_in_memory(cache.as_ref())?;
        Ok(Self::assemble(engine, cache, logger, options))
    }

    fn assemble(
        engine: Engine,
        cache: Option<BlockCache>,
        logger: SessionLogger,
        options: Options,
    ) -> Self {
        logger.info("database opened");
        Self {
            inner: Arc::new(SessionInner {
                engine,
                cache,
                logger,
                options,
                live_snapshots: AtomicUsize::new(0),
                live_iterators: AtomicUsize::new(0),
                leases: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Closes the database.
    ///
    /// Releases the engine handle, then the block cache, then the logger.
    /// Iterators and snapshots that are still open lose their views here
    /// and report [`Error::Closed`] on their next use.
    pub fn close(self) {
        let snapshots = self.inner.live_snapshots.load(Ordering::Relaxed);
        let iterators = self.inner.live_iterators.load(Ordering::Relaxed);
        if snapshots + iterators > 0 {
            self.inner.logger.warn(format_args!(
                "closing with {snapshots} snapshot(s) and {iterators} iterator(s) still open"
            ));
        }
    }

    /// The directory this database lives in, `None` when in memory.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.engine.path()
    }

    /// Options the database was opened with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Stores `value` under `key`.
    pub fn put(&self, options: WriteOptions, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner
            .engine
            .apply(options.sync, [Mutation::Put(key, value)])
    }

    /// Stores `value` under `key`, or deletes `key` when `value` is absent.
    pub fn put_opt(&self, options: WriteOptions, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        match value {
            Some(value) => self.put(options, key, value),
            None => self.delete(options, key),
        }
    }

    /// Removes `key`. Deleting a missing key succeeds.
    pub fn delete(&self, options: WriteOptions, key: &[u8]) -> Result<()> {
        self.inner
            .engine
            .apply(options.sync, [Mutation::Delete(key)])
    }

    /// Applies every operation in `batch` atomically.
    ///
    /// The batch is left untouched and can be reused.
    pub fn write(&self, options: WriteOptions, batch: &WriteBatch) -> Result<()> {
        self.inner
            .engine
            .apply(options.sync, batch.iter().map(|op| op.as_mutation()))
    }

    /// Reads `key`.
    ///
    /// Returns `Ok(None)` when the key is absent. A present value may be
    /// empty.
    pub fn get(&self, options: ReadOptions<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match options.snapshot {
            Some(snapshot) => {
                self.check_owner(snapshot)?;
                snapshot.view()?.get(key)
            }
            None => self.inner.engine.read_view()?.get(key),
        }
    }

    /// Reads a diagnostic property. Unknown names and failures are `None`.
    #[must_use]
    pub fn get_property(&self, name: impl AsRef<[u8]>) -> Option<Vec<u8>> {
        let name = name.as_ref();
        match property::render(&self.inner, name) {
            Ok(value) => value.map(String::into_bytes),
            Err(e) => {
                self.inner.logger.debug(format_args!(
                    "property {} unavailable: {e}",
                    String::from_utf8_lossy(name)
                ));
                None
            }
        }
    }

    /// Opens an iterator.
    ///
    /// Reads are pinned to `options.snapshot`, or to the state at the time
    /// of this call. Engine failures surface through the iterator's status.
    ///
    /// # Errors
    ///
    /// [`Error::SnapshotOwnership`] if the snapshot belongs to another
    /// database.
    pub fn new_iterator(&self, options: ReadOptions<'_>) -> Result<DbIterator> {
        let view = match options.snapshot {
            Some(snapshot) => {
                self.check_owner(snapshot)?;
                snapshot.view()
            }
            None => self.inner.engine.read_view().map(Arc::new),
        };
        Ok(DbIterator::new(view, &self.inner))
    }

    /// Takes a snapshot of the current state.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let view = self.inner.engine.read_view()?;
        Ok(Snapshot::new(view, &self.inner))
    }

    /// Releases `snapshot`.
    ///
    /// # Errors
    ///
    /// [`Error::SnapshotOwnership`] if another database created it. The
    /// snapshot is released either way.
    pub fn release_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.check_owner(&snapshot)
    }

    /// Removes the database at `path`. A missing path succeeds.
    pub fn destroy(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        Engine::destroy(path)?;
        tracing::info!(path = %path.display(), "database destroyed");
        Ok(())
    }

    /// Runs the engine's repair pass over the database at `path`.
    pub fn repair(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let logger = SessionLogger::new(path.display().to_string());
        Engine::repair(path, &logger)
    }

    fn check_owner(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.is_owned_by(&self.inner) {
            Ok(())
        } else {
            Err(Error::SnapshotOwnership)
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.logger.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn memory_db() -> Database {
        Database::open_in_memory(Options::default()).unwrap()
    }

    #[test]
    fn put_get_delete() {
        let db = memory_db();
        let w = WriteOptions::default();

        db.put(w, b"a", b"1").unwrap();
        assert_eq!(db.get(ReadOptions::default(), b"a").unwrap(), Some(b"1".to_vec()));

        db.delete(w, b"a").unwrap();
        assert_eq!(db.get(ReadOptions::default(), b"a").unwrap(), None);
    }

    #[test]
    fn empty_value_is_present() {
        let db = memory_db();
        db.put(WriteOptions::sync(), b"k", b"").unwrap();
        assert_eq!(db.get(ReadOptions::default(), b"k").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn put_opt_none_deletes() {
        let db = memory_db();
        let w = WriteOptions::default();
        db.put_opt(w, b"k", Some(b"v")).unwrap();
        db.put_opt(w, b"k", None).unwrap();
        assert_eq!(db.get(ReadOptions::default(), b"k").unwrap(), None);
    }

    #[test]
    fn delete_missing_key_succeeds() {
        let db = memory_db();
        assert!(db.delete(WriteOptions::default(), b"never").is_ok());
    }

    #[test]
    fn write_batch_is_reusable() {
        let db = memory_db();
        let mut batch = WriteBatch::new();
        batch.put(b"a", b"1").put(b"b", b"2");
        db.write(WriteOptions::default(), &batch).unwrap();
        assert_eq!(batch.len(), 2);

        db.delete(WriteOptions::default(), b"a").unwrap();
        db.write(WriteOptions::default(), &batch).unwrap();
        assert_eq!(db.get(ReadOptions::default(), b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn snapshot_from_other_database_is_rejected() {
        let db1 = memory_db();
        let db2 = memory_db();
        let snapshot = db1.snapshot().unwrap();

        let err = db2.get(ReadOptions::at(&snapshot), b"k").unwrap_err();
        assert!(matches!(err, Error::SnapshotOwnership));
        let err = db2.new_iterator(ReadOptions::at(&snapshot)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Programming);
        assert!(db2.release_snapshot(snapshot).is_err());
    }

    #[test]
    fn snapshot_released_when_owner_closes() {
        let db = memory_db();
        let snapshot = db.snapshot().unwrap();
        assert!(!snapshot.is_released());

        db.close();
        assert!(snapshot.is_released());
    }

    #[test]
    fn children_are_counted() {
        let db = memory_db();
        let snapshot = db.snapshot().unwrap();
        let iter = db.new_iterator(ReadOptions::default()).unwrap();

        let stats = String::from_utf8(db.get_property(property::STATS).unwrap()).unwrap();
        assert!(stats.contains("snapshots: 1"));
        assert!(stats.contains("iterators: 1"));

        drop(iter);
        db.release_snapshot(snapshot).unwrap();
        let stats = String::from_utf8(db.get_property(property::STATS).unwrap()).unwrap();
        assert!(stats.contains("snapshots: 0"));
        assert!(stats.contains("iterators: 0"));
    }

    #[test]
    fn properties() {
        let db = memory_db();
        db.put(WriteOptions::default(), b"a", b"1").unwrap();
        db.put(WriteOptions::default(), b"b", b"2").unwrap();

        assert_eq!(db.get_property(property::NUM_ENTRIES), Some(b"2".to_vec()));
        assert_eq!(db.get_property(property::APPROXIMATE_SIZE), Some(b"0".to_vec()));
        let options = db.get_property(property::OPTIONS).unwrap();
        assert!(String::from_utf8(options).unwrap().contains("cache_size: 0"));
        assert_eq!(db.get_property("kvbridge.unknown"), None);
        assert_eq!(db.get_property([0xff, 0xfe]), None);
    }

    #[test]
    fn in_memory_has_no_path() {
        let db = memory_db();
        assert!(db.path().is_none());
        assert!(db.options().create_if_missing);
    }
}
