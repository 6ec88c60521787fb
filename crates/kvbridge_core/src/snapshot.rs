//! Point-in-time read views.

use crate::database::SessionInner;
use crate::engine::{ReadView, ViewLease};
use crate::error::Result;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

/// An immutable, point-in-time view of a database.
///
/// A snapshot pins the state that was committed when it was taken; later
/// writes are invisible through it. It belongs to the session that created
/// it and does not keep that session alive. Dropping the snapshot (or
/// handing it to [`Database::release_snapshot`]) releases the view.
///
/// [`Database::release_snapshot`]: crate::Database::release_snapshot
pub struct Snapshot {
    lease: Arc<ViewLease>,
    owner: Weak<SessionInner>,
}

impl Snapshot {
    pub(crate) fn new(view: ReadView, owner: &Arc<SessionInner>) -> Self {
        owner.live_snapshots.fetch_add(1, Ordering::Relaxed);
        Self {
            lease: owner.lease(Arc::new(view)),
            owner: Arc::downgrade(owner),
        }
    }

    /// The pinned view, shared with iterators opened at this snapshot.
    pub(crate) fn view(&self) -> Result<Arc<ReadView>> {
        self.lease.get()
    }

    /// Returns true if `session` created this snapshot.
    pub(crate) fn is_owned_by(&self, session: &Arc<SessionInner>) -> bool {
        std::ptr::eq(self.owner.as_ptr(), Arc::as_ptr(session))
    }

    /// Returns true once the owning session has been closed.
    ///
    /// A released snapshot no longer pins any engine state and can not be
    /// used for reads.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.lease.is_revoked() || self.owner.strong_count() == 0
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.live_snapshots.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
