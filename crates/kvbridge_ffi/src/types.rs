//! Type definitions for FFI.

use kvbridge_core::Options;

/// Configuration for opening a database.
///
/// Size fields use `0` as "engine default"; a zero `cache_size` allocates
/// no block cache.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KvbOptions {
    /// Whether to create the database if missing.
    pub create_if_missing: bool,
    /// Whether to fail if the database already exists.
    pub error_if_exists: bool,
    /// Whether to verify the engine file while opening.
    pub paranoid_checks: bool,
    /// Block cache capacity in bytes.
    pub cache_size: usize,
    /// Block size hint in bytes.
    pub block_size: usize,
    /// Write buffer size hint in bytes.
    pub write_buffer_size: usize,
}

impl Default for KvbOptions {
    fn default() -> Self {
        Options::default().into()
    }
}

impl From<Options> for KvbOptions {
    fn from(o: Options) -> Self {
        Self {
            create_if_missing: o.create_if_missing,
            error_if_exists: o.error_if_exists,
            paranoid_checks: o.paranoid_checks,
            cache_size: o.cache_size,
            block_size: o.block_size,
            write_buffer_size: o.write_buffer_size,
        }
    }
}

impl From<KvbOptions> for Options {
    fn from(o: KvbOptions) -> Self {
        Options::new()
            .create_if_missing(o.create_if_missing)
            .error_if_exists(o.error_if_exists)
            .paranoid_checks(o.paranoid_checks)
            .cache_size(o.cache_size)
            .block_size(o.block_size)
            .write_buffer_size(o.write_buffer_size)
    }
}

/// Returns the default open options.
#[no_mangle]
pub extern "C" fn kvb_options_default() -> KvbOptions {
    KvbOptions::default()
}

/// Reads caller options, using the defaults for a null pointer.
///
/// # Safety
///
/// A non-null `options` must point to a valid `KvbOptions`.
pub(crate) unsafe fn read_options(options: *const KvbOptions) -> Options {
    if options.is_null() {
        Options::default()
    } else {
        (*options).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core() {
        let options = kvb_options_default();
        assert!(options.create_if_missing);
        assert!(!options.error_if_exists);
        assert_eq!(options.cache_size, 0);
        assert_eq!(Options::from(options), Options::default());
    }

    #[test]
    fn null_options_are_default() {
        let options = unsafe { read_options(std::ptr::null()) };
        assert_eq!(options, Options::default());
    }

    #[test]
    fn fields_carry_over() {
        let raw = KvbOptions {
            create_if_missing: false,
            cache_size: 1 << 20,
            block_size: 4096,
            ..KvbOptions::default()
        };
        let options = unsafe { read_options(&raw) };
        assert!(!options.create_if_missing);
        assert_eq!(options.cache_size, 1 << 20);
        assert_eq!(options.block_size, 4096);
    }
}
