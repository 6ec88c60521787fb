//! Error codes and result types.

use kvbridge_core::ErrorKind;
use std::cell::RefCell;
use std::ffi::CString;

/// Result code for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvbResult {
    /// Operation succeeded.
    Ok = 0,
    /// Generic engine error.
    Error = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// The engine reported a missing entity on a mutation path.
    NotFound = 3,
    /// Corruption detected.
    Corruption = 4,
    /// I/O error, including a database directory held by another session.
    IoError = 5,
    /// Null pointer or null handle.
    NullPointer = 6,
    /// Unknown, stale, or wrongly-typed handle.
    InvalidHandle = 7,
    /// The owning database has been closed.
    Closed = 8,
    /// A snapshot was used with a database that did not create it.
    OwnershipMismatch = 9,
}

impl KvbResult {
    /// Returns true if the result indicates success.
    pub fn is_ok(self) -> bool {
        self == KvbResult::Ok
    }

    /// Returns true if the result indicates an error.
    pub fn is_err(self) -> bool {
        self != KvbResult::Ok
    }
}

/// Error code type for C compatibility.
pub type ErrorCode = i32;

impl From<KvbResult> for ErrorCode {
    fn from(result: KvbResult) -> Self {
        result as ErrorCode
    }
}

impl From<ErrorCode> for KvbResult {
    fn from(code: ErrorCode) -> Self {
        match code {
            0 => KvbResult::Ok,
            2 => KvbResult::InvalidArgument,
            3 => KvbResult::NotFound,
            4 => KvbResult::Corruption,
            5 => KvbResult::IoError,
            6 => KvbResult::NullPointer,
            7 => KvbResult::InvalidHandle,
            8 => KvbResult::Closed,
            9 => KvbResult::OwnershipMismatch,
            _ => KvbResult::Error,
        }
    }
}

impl From<&kvbridge_core::Error> for KvbResult {
    fn from(err: &kvbridge_core::Error) -> Self {
        use kvbridge_core::Error;
        match err {
            Error::Closed { .. } => KvbResult::Closed,
            Error::SnapshotOwnership => KvbResult::OwnershipMismatch,
            Error::InvalidArgument { .. } => KvbResult::InvalidArgument,
            other => match other.kind() {
                ErrorKind::Io => KvbResult::IoError,
                ErrorKind::Corruption => KvbResult::Corruption,
                ErrorKind::NotFound => KvbResult::NotFound,
                ErrorKind::Generic | ErrorKind::Programming => KvbResult::Error,
            },
        }
    }
}

/// Unwraps a `Result<T, KvbResult>` or returns the code.
macro_rules! try_ffi {
    ($e:expr) => {
        match $e {
            Ok(value) => value,
            Err(code) => return code,
        }
    };
}
pub(crate) use try_ffi;

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let mut msg = message.into();
    msg.retain(|c| c != '\0');
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Records `err` as the last error and returns its code.
pub(crate) fn report(err: &kvbridge_core::Error) -> KvbResult {
    set_last_error(err.to_string());
    KvbResult::from(err)
}

/// Records `message` as the last error and returns `code`.
pub(crate) fn fail(code: KvbResult, message: impl Into<String>) -> KvbResult {
    set_last_error(message);
    code
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next FFI call on this thread.
#[no_mangle]
pub extern "C" fn kvb_get_last_error() -> *const std::ffi::c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn kvb_clear_error() {
    clear_last_error();
}
