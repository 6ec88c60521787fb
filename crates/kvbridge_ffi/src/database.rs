//! Database FFI functions.

use crate::buffer::{borrow_bytes, borrow_path, write_out, KvbBuffer};
use crate::error::{clear_last_error, fail, report, try_ffi, KvbResult};
use crate::handle::{self, with_handles, HandleError, KvbHandle, KVB_NULL_HANDLE};
use crate::types::{read_options, KvbOptions};
use kvbridge_core::{Database, ReadOptions, WriteOptions};
use std::ffi::c_char;
use std::sync::Arc;
use tracing::{debug, warn};

fn register(db: Database, out_handle: *mut KvbHandle) -> KvbResult {
    match with_handles(|h| h.databases.insert(Arc::new(db))) {
        Ok(token) => {
            // Safety: checked non-null by the caller
            unsafe { out_handle.write(token) };
            KvbResult::Ok
        }
        Err(e) => KvbResult::from(e),
    }
}

/// Opens a database.
///
/// # Arguments
///
/// * `path` - Null-terminated UTF-8 path of the database directory
/// * `options` - Open options, or null for the defaults
/// * `out_handle` - Output for the database handle
///
/// # Returns
///
/// `KvbResult::Ok` on success, error code otherwise. No handle is
/// produced on failure.
///
/// # Safety
///
/// - `path` must be a valid null-terminated string
/// - `options` must be null or point to a valid `KvbOptions`
/// - `out_handle` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn kvb_open(
    path: *const c_char,
    options: *const KvbOptions,
    out_handle: *mut KvbHandle,
) -> KvbResult {
    clear_last_error();

    if out_handle.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_handle.write(KVB_NULL_HANDLE);
    let path = try_ffi!(borrow_path(path));

    match Database::open(path, read_options(options)) {
        Ok(db) => register(db, out_handle),
        Err(e) => report(&e),
    }
}

/// Opens a database that lives only in memory.
///
/// # Safety
///
/// - `options` must be null or point to a valid `KvbOptions`
/// - `out_handle` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn kvb_open_memory(
    options: *const KvbOptions,
    out_handle: *mut KvbHandle,
) -> KvbResult {
    clear_last_error();

    if out_handle.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_handle.write(KVB_NULL_HANDLE);

    match Database::open_in_memory(read_options(options)) {
        Ok(db) => register(db, out_handle),
        Err(e) => report(&e),
    }
}

/// Closes a database.
///
/// Iterators and snapshots still registered against the database are
/// released with it and their handles become invalid. Closing the null
/// handle is a no-op; closing a closed handle returns
/// `KvbResult::InvalidHandle`.
#[no_mangle]
pub extern "C" fn kvb_close(handle: KvbHandle) -> KvbResult {
    clear_last_error();

    if handle == KVB_NULL_HANDLE {
        return KvbResult::Ok;
    }

    let removed = with_handles(|h| {
        let db = h.databases.remove(handle)?;
        let iterators = h.iterators.remove_where(|e| e.owner == handle);
        let snapshots = h.snapshots.remove_where(|e| e.owner == handle);
        Ok::<_, HandleError>((db, iterators, snapshots))
    });
    let (db, iterators, snapshots) = match removed {
        Ok(parts) => parts,
        Err(e) => return KvbResult::from(e),
    };

    if !iterators.is_empty() || !snapshots.is_empty() {
        warn!(
            handle,
            iterators = iterators.len(),
            snapshots = snapshots.len(),
            "releasing handles left open at close"
        );
    }
    drop(iterators);
    drop(snapshots);

    match Arc::try_unwrap(db) {
        Ok(db) => db.close(),
        // Another thread is mid-call; the session closes when it returns.
        Err(shared) => debug!(handle, refs = Arc::strong_count(&shared), "deferred close"),
    }
    KvbResult::Ok
}

/// Stores a value.
///
/// A null `value` with zero length stores the empty value.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes
/// - `value` must be valid for `value_len` bytes
#[no_mangle]
pub unsafe extern "C" fn kvb_put(
    handle: KvbHandle,
    sync: bool,
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> KvbResult {
    clear_last_error();

    let db = try_ffi!(handle::database(handle));
    let key = try_ffi!(borrow_bytes(key, key_len, "key"));
    let value = try_ffi!(borrow_bytes(value, value_len, "value"));

    match db.put(WriteOptions { sync }, key, value) {
        Ok(()) => KvbResult::Ok,
        Err(e) => report(&e),
    }
}

/// Deletes a key. Deleting a missing key succeeds.
///
/// # Safety
///
/// `key` must be valid for `key_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn kvb_delete(
    handle: KvbHandle,
    sync: bool,
    key: *const u8,
    key_len: usize,
) -> KvbResult {
    clear_last_error();

    let db = try_ffi!(handle::database(handle));
    let key = try_ffi!(borrow_bytes(key, key_len, "key"));

    match db.delete(WriteOptions { sync }, key) {
        Ok(()) => KvbResult::Ok,
        Err(e) => report(&e),
    }
}

/// Applies a write batch atomically.
///
/// The batch stays owned by the caller and can be reused.
#[no_mangle]
pub extern "C" fn kvb_write(handle: KvbHandle, sync: bool, batch: KvbHandle) -> KvbResult {
    clear_last_error();

    let db = try_ffi!(handle::database(handle));
    let batch = try_ffi!(handle::batch(batch));
    let batch = batch.lock();

    match db.write(WriteOptions { sync }, &batch) {
        Ok(()) => KvbResult::Ok,
        Err(e) => report(&e),
    }
}

/// Reads a value.
///
/// On `KvbResult::Ok`, `out_buffer` holds the value, or is absent (null
/// `data`) when the key does not exist. A missing key is not an error.
/// Pass `KVB_NULL_HANDLE` as `snapshot` to read the latest state.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes
/// - `out_buffer` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn kvb_get(
    handle: KvbHandle,
    snapshot: KvbHandle,
    key: *const u8,
    key_len: usize,
    out_buffer: *mut KvbBuffer,
) -> KvbResult {
    clear_last_error();

    if out_buffer.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_buffer.write(KvbBuffer::absent());

    let db = try_ffi!(handle::database(handle));
    let snapshot = try_ffi!(handle::snapshot_for(handle, snapshot));
    let key = try_ffi!(borrow_bytes(key, key_len, "key"));

    let options = match &snapshot {
        Some(entry) => ReadOptions::at(&entry.snapshot),
        None => ReadOptions::default(),
    };
    match db.get(options, key) {
        Ok(value) => write_out(out_buffer, KvbBuffer::from_option(value)),
        Err(e) => report(&e),
    }
}

/// Reads a diagnostic property.
///
/// Unknown properties leave `out_buffer` absent and return `KvbResult::Ok`.
///
/// # Safety
///
/// - `name` must be valid for `name_len` bytes
/// - `out_buffer` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn kvb_get_property(
    handle: KvbHandle,
    name: *const u8,
    name_len: usize,
    out_buffer: *mut KvbBuffer,
) -> KvbResult {
    clear_last_error();

    if out_buffer.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_buffer.write(KvbBuffer::absent());

    let db = try_ffi!(handle::database(handle));
    let name = try_ffi!(borrow_bytes(name, name_len, "name"));
    write_out(out_buffer, KvbBuffer::from_option(db.get_property(name)))
}

/// Removes the database at `path`. A missing path succeeds.
///
/// # Safety
///
/// `path` must be a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn kvb_destroy(path: *const c_char) -> KvbResult {
    clear_last_error();

    let path = try_ffi!(borrow_path(path));
    match Database::destroy(path) {
        Ok(()) => KvbResult::Ok,
        Err(e) => report(&e),
    }
}

/// Runs the engine's repair pass over the database at `path`.
///
/// # Safety
///
/// `path` must be a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn kvb_repair(path: *const c_char) -> KvbResult {
    clear_last_error();

    let path = try_ffi!(borrow_path(path));
    match Database::repair(path) {
        Ok(()) => KvbResult::Ok,
        Err(e) => report(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::kvb_free_buffer;
    use std::ffi::CString;

    fn open_memory() -> KvbHandle {
        let mut handle = KVB_NULL_HANDLE;
        let result = unsafe { kvb_open_memory(std::ptr::null(), &mut handle) };
        assert_eq!(result, KvbResult::Ok);
        assert_ne!(handle, KVB_NULL_HANDLE);
        handle
    }

    unsafe fn get(handle: KvbHandle, key: &[u8]) -> Option<Vec<u8>> {
        let mut buffer = KvbBuffer::absent();
        let result = kvb_get(handle, KVB_NULL_HANDLE, key.as_ptr(), key.len(), &mut buffer);
        assert_eq!(result, KvbResult::Ok);
        buffer.into_option()
    }

    #[test]
    fn open_memory_and_close() {
        let handle = open_memory();
        assert_eq!(kvb_close(handle), KvbResult::Ok);
        assert_eq!(kvb_close(handle), KvbResult::InvalidHandle);
        assert_eq!(kvb_close(KVB_NULL_HANDLE), KvbResult::Ok);
    }

    #[test]
    fn put_get_delete() {
        let handle = open_memory();
        unsafe {
            let result = kvb_put(handle, false, b"a".as_ptr(), 1, b"1".as_ptr(), 1);
            assert_eq!(result, KvbResult::Ok);
            assert_eq!(get(handle, b"a"), Some(b"1".to_vec()));

            assert_eq!(kvb_delete(handle, true, b"a".as_ptr(), 1), KvbResult::Ok);
            assert_eq!(get(handle, b"a"), None);
        }
        kvb_close(handle);
    }

    #[test]
    fn empty_value_round_trips() {
        let handle = open_memory();
        unsafe {
            let result = kvb_put(handle, false, b"k".as_ptr(), 1, std::ptr::null(), 0);
            assert_eq!(result, KvbResult::Ok);

            let mut buffer = KvbBuffer::absent();
            kvb_get(handle, KVB_NULL_HANDLE, b"k".as_ptr(), 1, &mut buffer);
            assert!(!buffer.is_absent());
            assert_eq!(buffer.len, 0);
            kvb_free_buffer(buffer);
        }
        kvb_close(handle);
    }

    #[test]
    fn null_value_with_length_is_invalid() {
        let handle = open_memory();
        let result = unsafe { kvb_put(handle, false, b"k".as_ptr(), 1, std::ptr::null(), 4) };
        assert_eq!(result, KvbResult::InvalidArgument);
        kvb_close(handle);
    }

    #[test]
    fn closed_handle_is_rejected() {
        let handle = open_memory();
        kvb_close(handle);
        let result = unsafe { kvb_put(handle, false, b"a".as_ptr(), 1, b"1".as_ptr(), 1) };
        assert_eq!(result, KvbResult::InvalidHandle);
        assert!(!crate::error::kvb_get_last_error().is_null());
    }

    #[test]
    fn null_database_handle() {
        let result = unsafe { kvb_delete(KVB_NULL_HANDLE, false, b"a".as_ptr(), 1) };
        assert_eq!(result, KvbResult::NullPointer);
    }

    #[test]
    fn property_lookup() {
        let handle = open_memory();
        unsafe {
            let name = b"kvbridge.num-entries";
            let mut buffer = KvbBuffer::absent();
            let result = kvb_get_property(handle, name.as_ptr(), name.len(), &mut buffer);
            assert_eq!(result, KvbResult::Ok);
            assert_eq!(buffer.into_option(), Some(b"0".to_vec()));

            let name = b"no.such.property";
            let mut buffer = KvbBuffer::absent();
            let result = kvb_get_property(handle, name.as_ptr(), name.len(), &mut buffer);
            assert_eq!(result, KvbResult::Ok);
            assert!(buffer.is_absent());
        }
        kvb_close(handle);
    }

    #[test]
    fn open_missing_without_create_is_io_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = CString::new(temp.path().join("missing").to_str().unwrap()).unwrap();
        let options = KvbOptions {
            create_if_missing: false,
            ..KvbOptions::default()
        };

        let mut handle = 42;
        let result = unsafe { kvb_open(path.as_ptr(), &options, &mut handle) };
        assert_eq!(result, KvbResult::IoError);
        assert_eq!(handle, KVB_NULL_HANDLE);
    }

    #[test]
    fn destroy_and_repair() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = CString::new(temp.path().join("db").to_str().unwrap()).unwrap();

        unsafe {
            let mut handle = KVB_NULL_HANDLE;
            assert_eq!(kvb_open(path.as_ptr(), std::ptr::null(), &mut handle), KvbResult::Ok);
            kvb_put(handle, true, b"k".as_ptr(), 1, b"v".as_ptr(), 1);
            assert_eq!(kvb_destroy(path.as_ptr()), KvbResult::IoError);
            kvb_close(handle);

            assert_eq!(kvb_repair(path.as_ptr()), KvbResult::Ok);
            assert_eq!(kvb_destroy(path.as_ptr()), KvbResult::Ok);
            assert_eq!(kvb_destroy(path.as_ptr()), KvbResult::Ok);
            assert_eq!(kvb_repair(path.as_ptr()), KvbResult::IoError);
            assert_eq!(kvb_destroy(std::ptr::null()), KvbResult::NullPointer);
        }
    }
}
