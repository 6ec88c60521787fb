//! Snapshot FFI functions.

use crate::error::{clear_last_error, fail, report, try_ffi, KvbResult};
use crate::handle::{self, with_handles, KvbHandle, SnapshotEntry, KVB_NULL_HANDLE};
use std::sync::Arc;

/// Takes a snapshot of a database's current state.
///
/// The snapshot must be released with `kvb_release_snapshot` against the
/// same database, or it is released when that database closes.
///
/// # Safety
///
/// `out_snapshot` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvb_snapshot(handle: KvbHandle, out_snapshot: *mut KvbHandle) -> KvbResult {
    clear_last_error();

    if out_snapshot.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_snapshot.write(KVB_NULL_HANDLE);

    let db = try_ffi!(handle::database(handle));
    let snapshot = match db.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => return report(&e),
    };
    let entry = Arc::new(SnapshotEntry {
        owner: handle,
        snapshot,
    });
    match with_handles(|h| h.snapshots.insert(entry)) {
        Ok(token) => {
            out_snapshot.write(token);
            KvbResult::Ok
        }
        Err(e) => KvbResult::from(e),
    }
}

/// Releases a snapshot.
///
/// Releasing the null handle is a no-op. Releasing a snapshot against a
/// database that did not create it returns `KvbResult::OwnershipMismatch`
/// and leaves the snapshot registered.
#[no_mangle]
pub extern "C" fn kvb_release_snapshot(handle: KvbHandle, snapshot: KvbHandle) -> KvbResult {
    clear_last_error();

    if snapshot == KVB_NULL_HANDLE {
        return KvbResult::Ok;
    }
    try_ffi!(handle::database(handle));

    let removed = with_handles(|h| {
        let entry = h.snapshots.get(snapshot).map_err(KvbResult::from)?;
        if entry.owner != handle {
            return Err(KvbResult::OwnershipMismatch);
        }
        h.snapshots.remove(snapshot).map_err(KvbResult::from)
    });
    match removed {
        Ok(entry) => {
            drop(entry);
            KvbResult::Ok
        }
        Err(KvbResult::OwnershipMismatch) => fail(
            KvbResult::OwnershipMismatch,
            "snapshot is not owned by this database",
        ),
        Err(code) => code,
    }
}
