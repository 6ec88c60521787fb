//! Binding to the storage engine.
//!
//! This is the only module that talks to `redb`. It exposes the narrow
//! surface the bridge needs (open, apply mutations, pinned read views,
//! destroy, repair) and copies every key and value out of engine-owned
//! pages before returning, so no caller ever holds a reference into an
//! engine buffer.

use crate::cache::BlockCache;
use crate::dir::DatabaseDir;
use crate::error::{absent_on_not_found, Error, Result};
use crate::logger::SessionLogger;
use crate::options::Options;
use crate::status::Status;
use parking_lot::RwLock;
use redb::backends::InMemoryBackend;
use redb::{
    AccessGuard, Builder, Durability, ReadOnlyTable, ReadableTable, StorageError, TableDefinition,
};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The single ordered keyspace.
const DATA: TableDefinition<&[u8], &[u8]> = TableDefinition::new("kvbridge");

/// An owned key/value pair copied out of the engine.
pub(crate) type Entry = (Vec<u8>, Vec<u8>);

type RawEntry<'a> =
    std::result::Result<(AccessGuard<'a, &'static [u8]>, AccessGuard<'a, &'static [u8]>), StorageError>;

/// A single mutation handed to the engine.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Mutation<'a> {
    Put(&'a [u8], &'a [u8]),
    Delete(&'a [u8]),
}

/// A live engine handle.
///
/// Field order is release order: the engine file is closed before the
/// directory lock is dropped.
pub(crate) struct Engine {
    db: redb::Database,
    dir: Option<DatabaseDir>,
}

impl Engine {
    /// Opens the engine inside a locked database directory.
    pub fn open(
        dir: DatabaseDir,
        options: &Options,
        cache: Option<&BlockCache>,
        logger: &SessionLogger,
    ) -> Result<Self> {
        let existed = dir.has_data();
        if existed && options.error_if_exists {
            return Err(Error::Generic {
                message: format!("{}: exists (error_if_exists is true)", dir.path().display()),
            });
        }

        let mut builder = Builder::new();
        if let Some(cache) = cache {
            cache.configure(&mut builder);
        }

        let file = dir.data_path();
        let opened = if options.create_if_missing {
            builder.create(&file)
        } else {
            builder.open(&file)
        };
        let mut db = opened.map_err(Error::from_engine)?;

        if options.paranoid_checks {
            let clean = db.check_integrity().map_err(Error::from_engine)?;
            if !clean {
                logger.warn("integrity check repaired the engine file");
            }
        }

        ensure_keyspace(&db)?;
        logger.debug(format_args!(
            "engine opened ({})",
            if existed { "existing" } else { "created" }
        ));
        Ok(Self { db, dir: Some(dir) })
    }

    /// Opens an engine backed by memory only.
    pub fn open_in_memory(cache: Option<&BlockCache>) -> Result<Self> {
        let mut builder = Builder::new();
        if let Some(cache) = cache {
            cache.configure(&mut builder);
        }
        let db = builder
            .create_with_backend(InMemoryBackend::new())
            .map_err(Error::from_engine)?;
        ensure_keyspace(&db)?;
        Ok(Self { db, dir: None })
    }

    /// Applies `mutations` atomically: all of them become visible, or none.
    pub fn apply<'a>(
        &self,
        sync: bool,
        mutations: impl IntoIterator<Item = Mutation<'a>>,
    ) -> Result<()> {
        let mut txn = self.db.begin_write().map_err(Error::from_engine)?;
        txn.set_durability(if sync {
            Durability::Immediate
        } else {
            Durability::Eventual
        });
        {
            let mut table = txn.open_table(DATA).map_err(Error::from_engine)?;
            for mutation in mutations {
                match mutation {
                    Mutation::Put(key, value) => {
                        table.insert(key, value).map_err(Error::from_engine)?;
                    }
                    Mutation::Delete(key) => {
                        table.remove(key).map_err(Error::from_engine)?;
                    }
                }
            }
        }
        // Any `?` above drops `txn` uncommitted, which aborts it: a failed
        // mutation leaves none of the earlier ones applied. Engine failures
        // cannot be injected mid-transaction, so tests exercise the
        // abort-on-drop path directly.
        txn.commit().map_err(Error::from_engine)
    }

    /// Pins a read view of the latest committed state.
    pub fn read_view(&self) -> Result<ReadView> {
        let txn = self.db.begin_read().map_err(Error::from_engine)?;
        let table = txn.open_table(DATA).map_err(Error::from_engine)?;
        Ok(ReadView { table })
    }

    /// Directory this engine lives in, `None` when memory-backed.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(DatabaseDir::path)
    }

    /// Size of the engine file, `0` when memory-backed.
    pub fn approximate_size(&self) -> Result<u64> {
        match &self.dir {
            Some(dir) => Ok(dir.data_size()?),
            None => Ok(0),
        }
    }

    /// Removes the engine's files from `path`.
    pub fn destroy(path: &Path) -> Result<()> {
        DatabaseDir::destroy(path)
    }

    /// Reopens the engine file at `path` and runs its repair pass.
    pub fn repair(path: &Path, logger: &SessionLogger) -> Result<()> {
        let dir = DatabaseDir::open(path, false)?;
        let mut db = Builder::new()
            .open(dir.data_path())
            .map_err(Error::from_engine)?;
        let clean = db.check_integrity().map_err(Error::from_engine)?;
        ensure_keyspace(&db)?;
        if clean {
            logger.info("repair: engine file is consistent");
        } else {
            logger.warn("repair: engine file was rebuilt");
        }
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        debug!(memory = self.dir.is_none(), "engine handle released");
    }
}

/// Creates the keyspace on first open so read views never miss it.
fn ensure_keyspace(db: &redb::Database) -> Result<()> {
    let txn = db.begin_write().map_err(Error::from_engine)?;
    txn.open_table(DATA).map_err(Error::from_engine)?;
    txn.commit().map_err(Error::from_engine)
}

/// A pinned, point-in-time view of the keyspace.
pub(crate) struct ReadView {
    table: ReadOnlyTable<&'static [u8], &'static [u8]>,
}

impl ReadView {
    /// Point lookup. A missing key is `None`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.table.get(key) {
            Ok(Some(value)) => Ok(Some(value.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => absent_on_not_found(Status::from_engine(e)),
        }
    }

    /// Smallest entry.
    pub fn first(&self) -> Result<Option<Entry>> {
        let mut range = self.table.iter().map_err(Error::from_engine)?;
        copy_out(range.next())
    }

    /// Largest entry.
    pub fn last(&self) -> Result<Option<Entry>> {
        let mut range = self.table.iter().map_err(Error::from_engine)?;
        copy_out(range.next_back())
    }

    /// Smallest entry with a key at or after `key`.
    pub fn seek(&self, key: &[u8]) -> Result<Option<Entry>> {
        let mut range = self
            .table
            .range::<&[u8]>((Bound::Included(key), Bound::Unbounded))
            .map_err(Error::from_engine)?;
        copy_out(range.next())
    }

    /// Smallest entry with a key strictly after `key`.
    pub fn after(&self, key: &[u8]) -> Result<Option<Entry>> {
        let mut range = self
            .table
            .range::<&[u8]>((Bound::Excluded(key), Bound::Unbounded))
            .map_err(Error::from_engine)?;
        copy_out(range.next())
    }

    /// Largest entry with a key strictly before `key`.
    pub fn before(&self, key: &[u8]) -> Result<Option<Entry>> {
        let mut range = self
            .table
            .range::<&[u8]>((Bound::Unbounded, Bound::Excluded(key)))
            .map_err(Error::from_engine)?;
        copy_out(range.next_back())
    }

    /// Number of live keys.
    pub fn count(&self) -> Result<u64> {
        let mut count = 0;
        for item in self.table.iter().map_err(Error::from_engine)? {
            item.map_err(Error::from_engine)?;
            count += 1;
        }
        Ok(count)
    }
}

/// A read view handed to an iterator or snapshot, revocable by its session.
///
/// The view pins engine storage (and the engine file) for as long as it is
/// held, so a closing session revokes every lease before it releases the
/// engine handle.
pub(crate) struct ViewLease {
    view: RwLock<Option<Arc<ReadView>>>,
}

impl ViewLease {
    pub fn new(view: Arc<ReadView>) -> Self {
        Self {
            view: RwLock::new(Some(view)),
        }
    }

    /// The leased view, or [`Error::Closed`] once revoked.
    pub fn get(&self) -> Result<Arc<ReadView>> {
        self.view
            .read()
            .clone()
            .ok_or_else(|| Error::closed("database"))
    }

    /// Drops the view.
    pub fn revoke(&self) {
        self.view.write().take();
    }

    pub fn is_revoked(&self) -> bool {
        self.view.read().is_none()
    }
}

/// Copies an engine entry into caller-owned buffers.
fn copy_out(item: Option<RawEntry<'_>>) -> Result<Option<Entry>> {
    match item {
        None => Ok(None),
        Some(Ok((key, value))) => Ok(Some((key.value().to_vec(), value.value().to_vec()))),
        Some(Err(e)) => Err(Error::from_engine(e)),
    }
}
