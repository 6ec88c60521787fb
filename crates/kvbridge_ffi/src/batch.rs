//! Write batch FFI functions.

use crate::buffer::borrow_bytes;
use crate::error::{clear_last_error, fail, try_ffi, KvbResult};
use crate::handle::{self, with_handles, KvbHandle, KVB_NULL_HANDLE};
use kvbridge_core::WriteBatch;
use parking_lot::Mutex;
use std::sync::Arc;

/// Creates an empty write batch.
///
/// # Safety
///
/// `out_batch` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvb_batch_create(out_batch: *mut KvbHandle) -> KvbResult {
    clear_last_error();

    if out_batch.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    out_batch.write(KVB_NULL_HANDLE);

    match with_handles(|h| h.batches.insert(Arc::new(Mutex::new(WriteBatch::new())))) {
        Ok(token) => {
            out_batch.write(token);
            KvbResult::Ok
        }
        Err(e) => KvbResult::from(e),
    }
}

/// Queues a put. Key and value are copied into the batch.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes
/// - `value` must be valid for `value_len` bytes
#[no_mangle]
pub unsafe extern "C" fn kvb_batch_put(
    batch: KvbHandle,
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> KvbResult {
    clear_last_error();

    let batch = try_ffi!(handle::batch(batch));
    let key = try_ffi!(borrow_bytes(key, key_len, "key"));
    let value = try_ffi!(borrow_bytes(value, value_len, "value"));
    batch.lock().put(key, value);
    KvbResult::Ok
}

/// Queues a delete.
///
/// # Safety
///
/// `key` must be valid for `key_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn kvb_batch_delete(batch: KvbHandle, key: *const u8, key_len: usize) -> KvbResult {
    clear_last_error();

    let batch = try_ffi!(handle::batch(batch));
    let key = try_ffi!(borrow_bytes(key, key_len, "key"));
    batch.lock().delete(key);
    KvbResult::Ok
}

/// Drops every queued operation.
#[no_mangle]
pub extern "C" fn kvb_batch_clear(batch: KvbHandle) -> KvbResult {
    clear_last_error();

    let batch = try_ffi!(handle::batch(batch));
    batch.lock().clear();
    KvbResult::Ok
}

/// Reports the number of queued operations.
///
/// # Safety
///
/// `out_count` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvb_batch_count(batch: KvbHandle, out_count: *mut usize) -> KvbResult {
    clear_last_error();

    if out_count.is_null() {
        return fail(KvbResult::NullPointer, "null pointer argument");
    }
    let batch = try_ffi!(handle::batch(batch));
    out_count.write(batch.lock().len());
    KvbResult::Ok
}

/// Frees a write batch. Freeing the null handle is a no-op.
#[no_mangle]
pub extern "C" fn kvb_batch_free(batch: KvbHandle) -> KvbResult {
    clear_last_error();

    if batch == KVB_NULL_HANDLE {
        return KvbResult::Ok;
    }
    match with_handles(|h| h.batches.remove(batch)) {
        Ok(entry) => {
            drop(entry);
            KvbResult::Ok
        }
        Err(e) => KvbResult::from(e),
    }
}
