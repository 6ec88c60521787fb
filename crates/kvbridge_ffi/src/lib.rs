//! # kvbridge FFI
//!
//! Stable C ABI for kvbridge.
//!
//! This crate provides:
//! - C-compatible function exports (`kvb_*`)
//! - Generation-checked `u64` handles for databases, iterators, snapshots
//!   and write batches
//! - Memory ownership conventions: every returned buffer is owned by
//!   Rust and released with `kvb_free_buffer`
//! - Error code mapping with a per-thread last error message
//! - A logging callback transport
//!
//! ## Conventions
//!
//! Every function returns a [`KvbResult`]. On failure,
//! `kvb_get_last_error` describes the problem until the next call on the
//! same thread. Handles are plain integers; `0` is the null handle and
//! means "none" where a handle is optional (snapshots) and "nothing to do"
//! for close/free/release.

#![warn(missing_docs)]

mod batch;
mod buffer;
mod database;
mod error;
mod handle;
mod iterator;
mod logging;
mod snapshot;
mod types;

pub use batch::*;
pub use buffer::{kvb_free_buffer, KvbBuffer};
pub use database::*;
pub use error::{clear_last_error, kvb_clear_error, kvb_get_last_error, set_last_error, ErrorCode, KvbResult};
pub use handle::{HandleError, HandleKind, KvbHandle, KVB_NULL_HANDLE};
pub use iterator::*;
pub use logging::{kvb_set_log_callback, CallbackMakeWriter, CallbackWriter, KvbLogCallback, KvbLogLevel};
pub use snapshot::*;
pub use types::{kvb_options_default, KvbOptions};

/// Returns the library version as a null-terminated string.
#[no_mangle]
pub extern "C" fn kvb_version() -> *const std::ffi::c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}
