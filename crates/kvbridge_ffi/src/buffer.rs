//! Buffer marshaling across the boundary.
//!
//! Outbound: every key, value, or property handed to the caller is a
//! Rust-owned [`KvbBuffer`] that the caller releases with
//! [`kvb_free_buffer`]. An absent value has a null `data` pointer; a
//! present but empty value has a non-null `data` pointer and `len == 0`.
//!
//! Inbound: caller pointers are borrowed for the duration of the call only
//! and copied before any data outlives it.

use crate::error::{fail, KvbResult};
use std::ffi::{c_char, CStr};

/// A byte buffer for FFI.
///
/// Memory is owned by Rust. Call `kvb_free_buffer` to release.
#[repr(C)]
#[derive(Debug)]
pub struct KvbBuffer {
    /// Pointer to data, null when the value is absent.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: usize,
    /// Capacity (for internal use).
    pub capacity: usize,
}

impl KvbBuffer {
    /// Creates a buffer from a Vec.
    ///
    /// An empty Vec yields a present, empty buffer.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        // A boxed empty slice still has a non-null, dangling pointer.
        let vec = Box::into_raw(vec.into_boxed_slice());
        let len = vec.len();
        Self {
            data: vec.cast::<u8>(),
            len,
            capacity: len,
        }
    }

    /// Creates a buffer from an optional value.
    pub fn from_option(value: Option<Vec<u8>>) -> Self {
        value.map_or_else(Self::absent, Self::from_vec)
    }

    /// The absent buffer.
    pub fn absent() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Returns true if the buffer holds no value.
    pub fn is_absent(&self) -> bool {
        self.data.is_null()
    }

    /// Converts back to an optional Vec, consuming the buffer.
    ///
    /// # Safety
    ///
    /// The buffer must have been created by this crate and not freed.
    pub unsafe fn into_option(self) -> Option<Vec<u8>> {
        if self.data.is_null() {
            return None;
        }
        let slice = std::ptr::slice_from_raw_parts_mut(self.data, self.len);
        Some(Box::from_raw(slice).into_vec())
    }
}

/// Frees a buffer allocated by kvbridge.
///
/// Freeing an absent buffer is a no-op.
///
/// # Safety
///
/// The buffer must have been allocated by kvbridge FFI functions and not
/// already freed.
#[no_mangle]
pub unsafe extern "C" fn kvb_free_buffer(buffer: KvbBuffer) {
    drop(buffer.into_option());
}

/// Borrows caller bytes for the duration of one call.
///
/// A null pointer with zero length is the empty slice.
///
/// # Safety
///
/// A non-null `ptr` must be valid for reads of `len` bytes.
pub(crate) unsafe fn borrow_bytes<'a>(
    ptr: *const u8,
    len: usize,
    what: &str,
) -> Result<&'a [u8], KvbResult> {
    if ptr.is_null() {
        if len == 0 {
            return Ok(&[]);
        }
        return Err(fail(
            KvbResult::InvalidArgument,
            format!("null {what} pointer with non-zero length"),
        ));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// Borrows a null-terminated UTF-8 path argument.
///
/// # Safety
///
/// A non-null `ptr` must point to a valid null-terminated string.
pub(crate) unsafe fn borrow_path<'a>(ptr: *const c_char) -> Result<&'a str, KvbResult> {
    if ptr.is_null() {
        return Err(fail(KvbResult::NullPointer, "null path"));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| fail(KvbResult::InvalidArgument, "invalid UTF-8 in path"))
}

/// Writes `buffer` through `out`, releasing it if `out` is null.
///
/// # Safety
///
/// A non-null `out` must be valid for writes.
pub(crate) unsafe fn write_out(out: *mut KvbBuffer, buffer: KvbBuffer) -> KvbResult {
    if out.is_null() {
        kvb_free_buffer(buffer);
        return fail(KvbResult::NullPointer, "null output buffer");
    }
    out.write(buffer);
    KvbResult::Ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_from_vec() {
        let data = vec![1u8, 2, 3, 4, 5];
        let buffer = KvbBuffer::from_vec(data.clone());

        assert!(!buffer.is_absent());
        assert_eq!(buffer.len, 5);

        // Safety: we just created it
        let recovered = unsafe { buffer.into_option() };
        assert_eq!(recovered, Some(data));
    }

    #[test]
    fn empty_value_is_present() {
        let buffer = KvbBuffer::from_vec(Vec::new());
        assert!(!buffer.is_absent());
        assert_eq!(buffer.len, 0);
        assert_eq!(unsafe { buffer.into_option() }, Some(Vec::new()));
    }

    #[test]
    fn absent_buffer() {
        let buffer = KvbBuffer::from_option(None);
        assert!(buffer.is_absent());
        assert_eq!(buffer.len, 0);
        unsafe { kvb_free_buffer(buffer) };
    }

    #[test]
    fn borrow_rules() {
        unsafe {
            assert_eq!(borrow_bytes(std::ptr::null(), 0, "key").unwrap(), b"");
            assert_eq!(
                borrow_bytes(std::ptr::null(), 3, "key").unwrap_err(),
                KvbResult::InvalidArgument
            );
            let data = b"abc";
            assert_eq!(borrow_bytes(data.as_ptr(), 2, "key").unwrap(), b"ab");
        }
    }

    #[test]
    fn path_must_be_utf8() {
        let bad = [0xffu8, 0];
        unsafe {
            assert_eq!(
                borrow_path(bad.as_ptr().cast()).unwrap_err(),
                KvbResult::InvalidArgument
            );
            assert_eq!(
                borrow_path(std::ptr::null()).unwrap_err(),
                KvbResult::NullPointer
            );
        }
    }
}
