//! Handle registry.
//!
//! Every native object crossing the boundary is referenced by a `u64`
//! token, never by a pointer:
//!
//! ```text
//! 63      56 55            32 31                 0
//! +---------+----------------+--------------------+
//! |  kind   |   generation   |   slot index + 1   |
//! +---------+----------------+--------------------+
//! ```
//!
//! `0` is the null token. Removing an entry bumps its slot's generation,
//! so a token that outlived its object is rejected rather than resolved to
//! whatever reuses the slot. A slot that has used up all 2^24 generations
//! is retired.
//!
//! The registry lock guards bookkeeping only. Lookups hand out `Arc`
//! clones and every engine call runs after the lock is released.

use crate::error::{fail, KvbResult};
use kvbridge_core::{Database, DbIterator, Snapshot, WriteBatch};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// An opaque handle. `0` is the null handle.
pub type KvbHandle = u64;

/// The null handle.
pub const KVB_NULL_HANDLE: KvbHandle = 0;

const GENERATION_MASK: u32 = (1 << 24) - 1;

/// Kind of object a token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandleKind {
    /// A database session.
    Database = 1,
    /// An iterator.
    Iterator = 2,
    /// A snapshot.
    Snapshot = 3,
    /// A write batch.
    Batch = 4,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Database => "database",
            Self::Iterator => "iterator",
            Self::Snapshot => "snapshot",
            Self::Batch => "write batch",
        })
    }
}

/// Why a token could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The null token where a live object is required.
    #[error("null {0} handle")]
    Null(HandleKind),

    /// The token belongs to another kind of object.
    #[error("handle is not a {0} handle")]
    WrongKind(HandleKind),

    /// The token is unknown or its object has been released.
    #[error("stale or unknown {0} handle")]
    Stale(HandleKind),

    /// Every slot index is in use.
    #[error("too many live {0} handles")]
    Exhausted(HandleKind),
}

impl From<HandleError> for KvbResult {
    fn from(err: HandleError) -> Self {
        let code = match err {
            HandleError::Null(_) => KvbResult::NullPointer,
            HandleError::Exhausted(_) => KvbResult::Error,
            HandleError::WrongKind(_) | HandleError::Stale(_) => KvbResult::InvalidHandle,
        };
        fail(code, err.to_string())
    }
}

fn encode(kind: HandleKind, generation: u32, index: u32) -> KvbHandle {
    (u64::from(kind as u8) << 56) | (u64::from(generation) << 32) | (u64::from(index) + 1)
}

struct Slot<T> {
    generation: u32,
    entry: Option<T>,
}

/// Slots for one kind of object.
pub(crate) struct Registry<T> {
    kind: HandleKind,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T: Clone> Registry<T> {
    pub(crate) const fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Stores `entry` and returns its token.
    pub(crate) fn insert(&mut self, entry: T) -> Result<KvbHandle, HandleError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return Ok(encode(self.kind, slot.generation, index));
        }
        let index = u32::try_from(self.slots.len())
            .ok()
            .filter(|i| *i < u32::MAX)
            .ok_or(HandleError::Exhausted(self.kind))?;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        Ok(encode(self.kind, 0, index))
    }

    fn locate(&self, token: KvbHandle) -> Result<usize, HandleError> {
        if token == KVB_NULL_HANDLE {
            return Err(HandleError::Null(self.kind));
        }
        if (token >> 56) as u8 != self.kind as u8 {
            return Err(HandleError::WrongKind(self.kind));
        }
        let generation = ((token >> 32) as u32) & GENERATION_MASK;
        let index = (token as u32)
            .checked_sub(1)
            .ok_or(HandleError::Stale(self.kind))? as usize;
        match self.slots.get(index) {
            Some(slot) if slot.generation == generation && slot.entry.is_some() => Ok(index),
            _ => Err(HandleError::Stale(self.kind)),
        }
    }

    /// Resolves `token` to a shared reference to its entry.
    pub(crate) fn get(&self, token: KvbHandle) -> Result<T, HandleError> {
        let index = self.locate(token)?;
        self.slots[index]
            .entry
            .clone()
            .ok_or(HandleError::Stale(self.kind))
    }

    /// Removes the entry behind `token`, invalidating the token.
    pub(crate) fn remove(&mut self, token: KvbHandle) -> Result<T, HandleError> {
        let index = self.locate(token)?;
        self.vacate(index).ok_or(HandleError::Stale(self.kind))
    }

    /// Removes every entry matching `pred`.
    pub(crate) fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let matching: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.as_ref().is_some_and(&pred))
            .map(|(index, _)| index)
            .collect();
        matching
            .into_iter()
            .filter_map(|index| self.vacate(index))
            .collect()
    }

    /// Number of live entries.
    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    /// Empties a slot. A slot whose generation would wrap is retired
    /// instead of reused, so no token can resolve twice.
    fn vacate(&mut self, index: usize) -> Option<T> {
        let slot = &mut self.slots[index];
        let entry = slot.entry.take()?;
        if slot.generation < GENERATION_MASK {
            slot.generation += 1;
            self.free.push(index as u32);
        }
        Some(entry)
    }
}

/// A registered iterator.
pub(crate) struct IteratorEntry {
    pub owner: KvbHandle,
    pub iter: Mutex<DbIterator>,
}

/// A registered snapshot.
pub(crate) struct SnapshotEntry {
    pub owner: KvbHandle,
    pub snapshot: Snapshot,
}

/// All live handles.
pub(crate) struct Handles {
    pub databases: Registry<Arc<Database>>,
    pub iterators: Registry<Arc<IteratorEntry>>,
    pub snapshots: Registry<Arc<SnapshotEntry>>,
    pub batches: Registry<Arc<Mutex<WriteBatch>>>,
}

static HANDLES: Mutex<Handles> = parking_lot::const_mutex(Handles {
    databases: Registry::new(HandleKind::Database),
    iterators: Registry::new(HandleKind::Iterator),
    snapshots: Registry::new(HandleKind::Snapshot),
    batches: Registry::new(HandleKind::Batch),
});

/// Runs `f` with the registry locked. `f` must not call into the engine.
pub(crate) fn with_handles<R>(f: impl FnOnce(&mut Handles) -> R) -> R {
    f(&mut HANDLES.lock())
}

/// Resolves a database token.
pub(crate) fn database(token: KvbHandle) -> Result<Arc<Database>, KvbResult> {
    with_handles(|h| h.databases.get(token)).map_err(KvbResult::from)
}

/// Resolves an iterator token.
pub(crate) fn iterator(token: KvbHandle) -> Result<Arc<IteratorEntry>, KvbResult> {
    with_handles(|h| h.iterators.get(token)).map_err(KvbResult::from)
}

/// Resolves a write batch token.
pub(crate) fn batch(token: KvbHandle) -> Result<Arc<Mutex<WriteBatch>>, KvbResult> {
    with_handles(|h| h.batches.get(token)).map_err(KvbResult::from)
}

/// Resolves an optional snapshot token on behalf of database `owner`.
///
/// The null token means "no snapshot".
pub(crate) fn snapshot_for(
    owner: KvbHandle,
    token: KvbHandle,
) -> Result<Option<Arc<SnapshotEntry>>, KvbResult> {
    if token == KVB_NULL_HANDLE {
        return Ok(None);
    }
    let entry = with_handles(|h| h.snapshots.get(token)).map_err(KvbResult::from)?;
    if entry.owner != owner {
        return Err(fail(
            KvbResult::OwnershipMismatch,
            "snapshot is not owned by this database",
        ));
    }
    Ok(Some(entry))
}
