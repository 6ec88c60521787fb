//! Iterator FFI functions.
//!
//! Positioning calls return the engine status of that call; the iterator
//! also keeps it, so `kvb_iter_status` reports the last failure until the
//! next successful positioning call.

use crate::buffer::{borrow_bytes, write_out, KvbBuffer};
use crate::error::{clear_last_error, fail, report, try_ffi, KvbResult};
use crate::handle::{self, with_handles, IteratorEntry, KvbHandle, KVB_NULL_HANDLE};
use kvbridge_core::{DbIterator, ReadOptions};
use parking_lot::Mutex;
use std::sync::Arc;

/// Creates an iterator over a database.
///
/// Pass `KVB_NULL_HANDLE` as `snapshot` to iterate over the state at the
/// time of this call. The iterator starts unpositioned.
///
/// # Safety
///
/// `out_iter` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvb_iter_create(
    handle: KvbHandle,
    fill_cache: bool,
    snapshot: KvbHandle,
    out_iter: *mut KvbHandle,
) -> KvbResult {
    clear_last_error();

    if out_iter.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_iter.write(KVB_NULL_HANDLE);

    let db = try_ffi!(handle::database(handle));
    let snapshot = try_ffi!(handle::snapshot_for(handle, snapshot));
    let options = match &snapshot {
        Some(entry) => ReadOptions::at(&entry.snapshot),
        None => ReadOptions::default(),
    }
    .fill_cache(fill_cache);

    let iter = match db.new_iterator(options) {
        Ok(iter) => iter,
        Err(e) => return report(&e),
    };
    let entry = Arc::new(IteratorEntry {
        owner: handle,
        iter: Mutex::new(iter),
    });
    match with_handles(|h| h.iterators.insert(entry)) {
        Ok(token) => {
            out_iter.write(token);
            KvbResult::Ok
        }
        Err(e) => KvbResult::from(e),
    }
}

fn position(iter: KvbHandle, op: impl FnOnce(&mut DbIterator) -> kvbridge_core::Result<()>) -> KvbResult {
    clear_last_error();

    let entry = try_ffi!(handle::iterator(iter));
    let mut guard = entry.iter.lock();
    match op(&mut *guard) {
        Ok(()) => KvbResult::Ok,
        Err(e) => report(&e),
    }
}

/// Positions at the first entry with a key at or after `key`.
///
/// # Safety
///
/// `key` must be valid for `key_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn kvb_iter_seek(iter: KvbHandle, key: *const u8, key_len: usize) -> KvbResult {
    clear_last_error();
    let key = try_ffi!(borrow_bytes(key, key_len, "key"));
    position(iter, |it| it.seek(key))
}

/// Positions at the first entry.
#[no_mangle]
pub extern "C" fn kvb_iter_seek_to_first(iter: KvbHandle) -> KvbResult {
    position(iter, DbIterator::seek_to_first)
}

/// Positions at the last entry.
#[no_mangle]
pub extern "C" fn kvb_iter_seek_to_last(iter: KvbHandle) -> KvbResult {
    position(iter, DbIterator::seek_to_last)
}

/// Advances to the next entry. A no-op while the iterator is invalid.
#[no_mangle]
pub extern "C" fn kvb_iter_next(iter: KvbHandle) -> KvbResult {
    position(iter, DbIterator::next)
}

/// Steps back to the previous entry. A no-op while the iterator is invalid.
#[no_mangle]
pub extern "C" fn kvb_iter_prev(iter: KvbHandle) -> KvbResult {
    position(iter, DbIterator::prev)
}

/// Reports whether the iterator is on an entry.
///
/// # Safety
///
/// `out_valid` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvb_iter_valid(iter: KvbHandle, out_valid: *mut bool) -> KvbResult {
    clear_last_error();

    if out_valid.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_valid.write(false);

    let entry = try_ffi!(handle::iterator(iter));
    let valid = entry.iter.lock().valid();
    out_valid.write(valid);
    KvbResult::Ok
}

unsafe fn read_current(
    iter: KvbHandle,
    out_buffer: *mut KvbBuffer,
    pick: impl FnOnce(&DbIterator) -> Option<&[u8]>,
) -> KvbResult {
    clear_last_error();

    if out_buffer.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_buffer.write(KvbBuffer::absent());

    let entry = try_ffi!(handle::iterator(iter));
    let copied = pick(&*entry.iter.lock()).map(<[u8]>::to_vec);
    write_out(out_buffer, KvbBuffer::from_option(copied))
}

/// Copies the current key.
///
/// An invalid iterator yields an absent buffer and `KvbResult::Ok`.
///
/// # Safety
///
/// `out_buffer` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvb_iter_key(iter: KvbHandle, out_buffer: *mut KvbBuffer) -> KvbResult {
    read_current(iter, out_buffer, DbIterator::key)
}

/// Copies the current value.
///
/// An invalid iterator yields an absent buffer and `KvbResult::Ok`.
///
/// # Safety
///
/// `out_buffer` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvb_iter_value(iter: KvbHandle, out_buffer: *mut KvbBuffer) -> KvbResult {
    read_current(iter, out_buffer, DbIterator::value)
}

/// Returns the iterator's last positioning status.
#[no_mangle]
pub extern "C" fn kvb_iter_status(iter: KvbHandle) -> KvbResult {
    clear_last_error();

    let entry = try_ffi!(handle::iterator(iter));
    let status = entry.iter.lock().status();
    match status {
        Ok(()) => KvbResult::Ok,
        Err(e) => report(&e),
    }
}

/// Frees an iterator. Freeing the null handle is a no-op.
#[no_mangle]
pub extern "C" fn kvb_iter_free(iter: KvbHandle) -> KvbResult {
    clear_last_error();

    if iter == KVB_NULL_HANDLE {
        return KvbResult::Ok;
    }
    match with_handles(|h| h.iterators.remove(iter)) {
        Ok(entry) => {
            drop(entry);
            KvbResult::Ok
        }
        Err(e) => KvbResult::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{kvb_close, kvb_open_memory, kvb_put};

    fn seeded() -> KvbHandle {
        let mut db = KVB_NULL_HANDLE;
        unsafe {
            assert_eq!(kvb_open_memory(std::ptr::null(), &mut db), KvbResult::Ok);
            for key in [b"b", b"d", b"f"] {
                kvb_put(db, false, key.as_ptr(), 1, key.as_ptr(), 1);
            }
        }
        db
    }

    fn create(db: KvbHandle) -> KvbHandle {
        let mut iter = KVB_NULL_HANDLE;
        let result = unsafe { kvb_iter_create(db, true, KVB_NULL_HANDLE, &mut iter) };
        assert_eq!(result, KvbResult::Ok);
        iter
    }

    fn valid(iter: KvbHandle) -> bool {
        let mut valid = true;
        assert_eq!(unsafe { kvb_iter_valid(iter, &mut valid) }, KvbResult::Ok);
        valid
    }

    fn key(iter: KvbHandle) -> Option<Vec<u8>> {
        let mut buffer = KvbBuffer::absent();
        unsafe {
            assert_eq!(kvb_iter_key(iter, &mut buffer), KvbResult::Ok);
            buffer.into_option()
        }
    }

    #[test]
    fn forward_scan() {
        let db = seeded();
        let iter = create(db);
        assert!(!valid(iter));
        assert_eq!(key(iter), None);

        let mut keys = Vec::new();
        kvb_iter_seek_to_first(iter);
        while valid(iter) {
            keys.push(key(iter).unwrap());
            assert_eq!(kvb_iter_next(iter), KvbResult::Ok);
        }
        assert_eq!(keys, vec![b"b".to_vec(), b"d".to_vec(), b"f".to_vec()]);

        // Stepping past the end is a no-op.
        assert_eq!(kvb_iter_next(iter), KvbResult::Ok);
        assert!(!valid(iter));
        assert_eq!(kvb_iter_status(iter), KvbResult::Ok);

        assert_eq!(kvb_iter_free(iter), KvbResult::Ok);
        kvb_close(db);
    }

    #[test]
    fn seek_and_step_back() {
        let db = seeded();
        let iter = create(db);
        unsafe {
            assert_eq!(kvb_iter_seek(iter, b"c".as_ptr(), 1), KvbResult::Ok);
        }
        assert_eq!(key(iter), Some(b"d".to_vec()));

        kvb_iter_prev(iter);
        assert_eq!(key(iter), Some(b"b".to_vec()));

        kvb_iter_seek_to_last(iter);
        let mut value = KvbBuffer::absent();
        unsafe {
            assert_eq!(kvb_iter_value(iter, &mut value), KvbResult::Ok);
            assert_eq!(value.into_option(), Some(b"f".to_vec()));
        }

        kvb_iter_free(iter);
        kvb_close(db);
    }

    #[test]
    fn freed_iterator_is_invalid_handle() {
        let db = seeded();
        let iter = create(db);
        assert_eq!(kvb_iter_free(iter), KvbResult::Ok);
        assert_eq!(kvb_iter_free(iter), KvbResult::InvalidHandle);
        assert_eq!(kvb_iter_seek_to_first(iter), KvbResult::InvalidHandle);
        assert_eq!(kvb_iter_free(KVB_NULL_HANDLE), KvbResult::Ok);
        kvb_close(db);
    }

    #[test]
    fn close_releases_iterators() {
        let db = seeded();
        let iter = create(db);
        kvb_iter_seek_to_first(iter);

        assert_eq!(kvb_close(db), KvbResult::Ok);
        assert_eq!(kvb_iter_next(iter), KvbResult::InvalidHandle);
        assert_eq!(kvb_iter_free(iter), KvbResult::InvalidHandle);
    }

    #[test]
    fn database_token_is_not_an_iterator() {
        let db = seeded();
        assert_eq!(kvb_iter_seek_to_first(db), KvbResult::InvalidHandle);
        kvb_close(db);
    }

    #[test]
    fn status_reports_closed_owner() {
        let db = kvbridge_core::Database::open_in_memory(kvbridge_core::Options::default()).unwrap();
        let mut iter = db.new_iterator(ReadOptions::default()).unwrap();
        iter.seek_to_first().unwrap();
        db.close();

        let entry = Arc::new(IteratorEntry {
            owner: KVB_NULL_HANDLE,
            iter: Mutex::new(iter),
        });
        let token = with_handles(|h| h.iterators.insert(entry)).unwrap();

        assert_eq!(kvb_iter_status(token), KvbResult::Closed);
        assert!(!crate::error::kvb_get_last_error().is_null());
        assert_eq!(kvb_iter_seek_to_first(token), KvbResult::Closed);
        assert!(!valid(token));
        assert_eq!(kvb_iter_status(token), KvbResult::Closed);

        assert_eq!(kvb_iter_free(token), KvbResult::Ok);
    }
}
