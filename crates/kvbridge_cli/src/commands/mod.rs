//! CLI command implementations.

pub mod inspect;
pub mod kv;
pub mod maintenance;
pub mod scan;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use kvbridge_core::{Database, Options};
use std::path::Path;
use thiserror::Error;

/// Errors reported by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// A command needs `--path`.
    #[error("database path required for {0}")]
    PathRequired(&'static str),

    /// The database reported an error.
    #[error(transparent)]
    Database(#[from] kvbridge_core::Error),

    /// A base64 argument did not decode.
    #[error("invalid base64 argument: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON output failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Refused to run without confirmation.
    #[error("{0}")]
    Refused(String),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// JSON.
    Json,
}

/// How keys and values are read from and written to the terminal.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    base64: bool,
}

impl Codec {
    /// Plain UTF-8, or base64 when `base64` is set.
    pub fn new(base64: bool) -> Self {
        Self { base64 }
    }

    /// Decodes a command-line argument.
    pub fn decode(&self, arg: &str) -> Result<Vec<u8>, CliError> {
        if self.base64 {
            Ok(STANDARD.decode(arg)?)
        } else {
            Ok(arg.as_bytes().to_vec())
        }
    }

    /// Renders bytes for text output.
    pub fn render(&self, bytes: &[u8]) -> String {
        if self.base64 {
            STANDARD.encode(bytes)
        } else {
            bytes.escape_ascii().to_string()
        }
    }
}

/// Opens an existing database.
pub fn open_existing(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(path, Options::default().create_if_missing(false))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_codec_escapes_binary() {
        let codec = Codec::new(false);
        assert_eq!(codec.decode("abc").unwrap(), b"abc");
        assert_eq!(codec.render(b"a\x00b"), "a\\x00b");
    }

    #[test]
    fn base64_codec() {
        let codec = Codec::new(true);
        assert_eq!(codec.decode("AP8=").unwrap(), vec![0x00, 0xff]);
        assert_eq!(codec.render(&[0x00, 0xff]), "AP8=");
        assert!(codec.decode("***").is_err());
    }

    #[test]
    fn open_existing_does_not_create() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("none");
        assert!(open_existing(&path).is_err());
        assert!(!path.exists());
    }
}
