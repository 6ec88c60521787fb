//! # kvbridge testkit
//!
//! Test utilities for kvbridge.
//!
//! This crate provides:
//! - Temporary database fixtures
//! - Property-based test generators using proptest
//! - Concurrent load helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvbridge_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_database() {
//!     with_temp_db(|db| {
//!         db.put(WriteOptions::default(), b"k", b"v").unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use kvbridge_core::{Database, Options, ReadOptions, WriteBatch, WriteOptions};
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
