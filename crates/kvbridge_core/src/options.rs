//! Open, read, and write options.

use crate::snapshot::Snapshot;

/// Configuration for opening a database.
///
/// Size fields use `0` as the "engine default" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Whether to create the database if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fail if the database already exists.
    pub error_if_exists: bool,

    /// Whether to run the engine's integrity check while opening.
    pub paranoid_checks: bool,

    /// Block cache capacity in bytes (0 = no dedicated cache).
    pub cache_size: usize,

    /// Block size hint in bytes (0 = engine default).
    pub block_size: usize,

    /// Write buffer size hint in bytes (0 = engine default).
    pub write_buffer_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            paranoid_checks: false,
            cache_size: 0,
            block_size: 0,
            write_buffer_size: 0,
        }
    }
}

impl Options {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fail if the database exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether to verify the engine file while opening.
    #[must_use]
    pub const fn paranoid_checks(mut self, value: bool) -> Self {
        self.paranoid_checks = value;
        self
    }

    /// Sets the block cache capacity.
    #[must_use]
    pub const fn cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = bytes;
        self
    }

    /// Sets the block size hint.
    #[must_use]
    pub const fn block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    /// Sets the write buffer size hint.
    #[must_use]
    pub const fn write_buffer_size(mut self, bytes: usize) -> Self {
        self.write_buffer_size = bytes;
        self
    }

    /// Renders the options as `name: value` lines.
    pub(crate) fn describe(&self) -> String {
        format!(
            "create_if_missing: {}\nerror_if_exists: {}\nparanoid_checks: {}\n\
             cache_size: {}\nblock_size: {}\nwrite_buffer_size: {}\n",
            self.create_if_missing,
            self.error_if_exists,
            self.paranoid_checks,
            self.cache_size,
            self.block_size,
            self.write_buffer_size,
        )
    }
}

/// Options for a single read.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions<'a> {
    /// Whether blocks read for this call should populate the cache.
    pub fill_cache: bool,
    /// Point-in-time view to read from; `None` reads the latest state.
    pub snapshot: Option<&'a Snapshot>,
}

impl Default for ReadOptions<'_> {
    fn default() -> Self {
        Self {
            fill_cache: true,
            snapshot: None,
        }
    }
}

impl<'a> ReadOptions<'a> {
    /// Reads pinned to `snapshot`.
    #[must_use]
    pub fn at(snapshot: &'a Snapshot) -> Self {
        Self {
            fill_cache: true,
            snapshot: Some(snapshot),
        }
    }

    /// Sets whether reads populate the cache.
    #[must_use]
    pub const fn fill_cache(mut self, value: bool) -> Self {
        self.fill_cache = value;
        self
    }
}

/// Options for a single write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Wait for the write to be durable before returning.
    pub sync: bool,
}

impl WriteOptions {
    /// Durable (fsync) writes.
    #[must_use]
    pub const fn sync() -> Self {
        Self { sync: true }
    }
}
