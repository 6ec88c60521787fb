//! # kvbridge core
//!
//! Safe bridge over an embedded, ordered key-value engine.
//!
//! This crate owns every native resource the engine hands out and exposes
//! it through ownership-typed handles:
//!
//! - [`Database`]: a session owning the engine handle, block cache and logger
//! - [`DbIterator`]: a positioned cursor over a pinned view
//! - [`Snapshot`]: a point-in-time read view tied to its session
//! - [`WriteBatch`]: put/delete operations applied atomically
//!
//! Engine results flow through [`Status`] and the error mapper
//! ([`Error::from_status`]); a missing key on a read is `Ok(None)`, never
//! an error. Every key and value returned is an owned copy.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kvbridge_core::{Database, Options, ReadOptions, WriteBatch, WriteOptions};
//!
//! let db = Database::open("/tmp/db", Options::default())?;
//!
//! let mut batch = WriteBatch::new();
//! batch.put(b"a", b"1").delete(b"b");
//! db.write(WriteOptions::sync(), &batch)?;
//!
//! let snapshot = db.snapshot()?;
//! let mut iter = db.new_iterator(ReadOptions::at(&snapshot))?;
//! iter.seek_to_first()?;
//! while iter.valid() {
//!     println!("{:?}", iter.key());
//!     iter.next()?;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod database;
mod dir;
mod engine;
mod error;
mod iterator;
mod logger;
mod options;
pub mod property;
mod snapshot;
mod status;
mod write_batch;

pub use database::Database;
pub use error::{Error, ErrorKind, Result};
pub use iterator::{DbIterator, Entries, IteratorState};
pub use options::{Options, ReadOptions, WriteOptions};
pub use snapshot::Snapshot;
pub use status::{Status, StatusCode};
pub use write_batch::{BatchOp, WriteBatch};
