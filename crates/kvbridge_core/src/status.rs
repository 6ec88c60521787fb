//! Engine status model.
//!
//! Every call into the engine produces a [`Status`]. It is the single source
//! of truth the error mapper in [`crate::error`] consumes: the bridge never
//! inspects engine error types anywhere else.

use std::fmt;
use std::io;

/// Status category reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The operation succeeded.
    Ok,
    /// The requested entity does not exist.
    NotFound,
    /// The filesystem or the lock layer failed.
    IoError,
    /// Persistent state failed validation.
    Corruption,
    /// Any other engine failure.
    Other,
}

/// Result of an engine call, with an optional diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: StatusCode,
    message: Option<String>,
}

impl Status {
    /// The success status.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
        }
    }

    /// Creates a `NotFound` status.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(StatusCode::NotFound, message)
    }

    /// Creates an `IoError` status.
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::with_message(StatusCode::IoError, message)
    }

    /// Creates a `Corruption` status.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::with_message(StatusCode::Corruption, message)
    }

    /// Creates a status for any other engine failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::with_message(StatusCode::Other, message)
    }

    fn with_message(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Translates an engine error into a status.
    ///
    /// Accepts every engine error type (database, transaction, table,
    /// storage, commit) through its conversion into `redb::Error`.
    pub fn from_engine(err: impl Into<redb::Error>) -> Self {
        match err.into() {
            redb::Error::Io(e) => Self::from(e),
            redb::Error::DatabaseAlreadyOpen => {
                Self::io_error("database file is already open by another handle")
            }
            redb::Error::Corrupted(message) => Self::corruption(message),
            redb::Error::TableDoesNotExist(name) => {
                Self::not_found(format!("table {name} does not exist"))
            }
            other => Self::other(other.to_string()),
        }
    }

    /// Returns the status category.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Returns the engine diagnostic, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true for the success status.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    /// Returns true for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == StatusCode::NotFound
    }

    /// Returns true for `IoError`.
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        self.code == StatusCode::IoError
    }

    /// Returns true for `Corruption`.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        self.code == StatusCode::Corruption
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl From<io::Error> for Status {
    fn from(err: io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.code {
            StatusCode::Ok => return f.write_str("OK"),
            StatusCode::NotFound => "NotFound: ",
            StatusCode::IoError => "IO error: ",
            StatusCode::Corruption => "Corruption: ",
            StatusCode::Other => "",
        };
        write!(f, "{prefix}{}", self.message.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status() {
        let status = Status::ok();
        assert!(status.is_ok());
        assert_eq!(status.message(), None);
        assert_eq!(status.to_string(), "OK");
    }

    #[test]
    fn display_prefixes() {
        assert_eq!(Status::not_found("k").to_string(), "NotFound: k");
        assert_eq!(Status::io_error("disk").to_string(), "IO error: disk");
        assert_eq!(Status::corruption("bad").to_string(), "Corruption: bad");
        assert_eq!(Status::other("odd").to_string(), "odd");
    }

    #[test]
    fn engine_io_maps_to_io_error() {
        let err = redb::Error::Io(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        let status = Status::from_engine(err);
        assert!(status.is_io_error());
        assert_eq!(status.message(), Some("no such file"));
    }

    #[test]
    fn engine_corruption_maps_to_corruption() {
        let status = Status::from_engine(redb::Error::Corrupted("checksum".into()));
        assert!(status.is_corruption());
        assert_eq!(status.message(), Some("checksum"));
    }

    #[test]
    fn engine_lock_maps_to_io_error() {
        let status = Status::from_engine(redb::Error::DatabaseAlreadyOpen);
        assert!(status.is_io_error());
    }

    #[test]
    fn missing_table_maps_to_not_found() {
        let status = Status::from_engine(redb::Error::TableDoesNotExist("data".into()));
        assert!(status.is_not_found());
    }
}
