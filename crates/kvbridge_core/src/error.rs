//! Error types and the engine status mapper.

use crate::status::{Status, StatusCode};
use thiserror::Error;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of error categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Filesystem, lock, or engine I/O failure.
    Io,
    /// Persistent state failed validation.
    Corruption,
    /// The engine reported a missing entity on a path where that is an error.
    NotFound,
    /// Any other engine failure.
    Generic,
    /// Misuse of the bridge: use after close, foreign handles, bad arguments.
    Programming,
}

/// Errors raised by the bridge.
///
/// Engine-originated variants carry the engine diagnostic verbatim.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// I/O error reported by the engine.
    #[error("IO error: {message}")]
    Io {
        /// Engine diagnostic.
        message: String,
    },

    /// Corruption reported by the engine.
    #[error("Corruption: {message}")]
    Corruption {
        /// Engine diagnostic.
        message: String,
    },

    /// NotFound reported by the engine on a mutation or maintenance path.
    #[error("NotFound: {message}")]
    NotFound {
        /// Engine diagnostic.
        message: String,
    },

    /// Any other engine failure.
    #[error("{message}")]
    Generic {
        /// Engine diagnostic.
        message: String,
    },

    /// The session (or a resource derived from it) has been closed.
    #[error("{resource} has been closed")]
    Closed {
        /// Which resource was closed.
        resource: &'static str,
    },

    /// A snapshot was used with a session that did not create it.
    #[error("snapshot is not owned by this database")]
    SnapshotOwnership,

    /// An argument is invalid for this operation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl Error {
    /// Maps an engine status to an error.
    ///
    /// Returns `None` for the success status.
    #[must_use]
    pub fn from_status(status: Status) -> Option<Self> {
        let message = status.message().unwrap_or_default().to_owned();
        match status.code() {
            StatusCode::Ok => None,
            StatusCode::NotFound => Some(Self::NotFound { message }),
            StatusCode::IoError => Some(Self::Io { message }),
            StatusCode::Corruption => Some(Self::Corruption { message }),
            StatusCode::Other => Some(Self::Generic { message }),
        }
    }

    /// Translates an engine error straight into a bridge error.
    pub fn from_engine(err: impl Into<redb::Error>) -> Self {
        let status = Status::from_engine(err);
        let message = status.message().unwrap_or_default().to_owned();
        Self::from_status(status).unwrap_or(Self::Generic { message })
    }

    /// Creates an I/O error raised by the bridge itself (directory, lock).
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a closed-resource error.
    #[must_use]
    pub const fn closed(resource: &'static str) -> Self {
        Self::Closed { resource }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Corruption { .. } => ErrorKind::Corruption,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Generic { .. } => ErrorKind::Generic,
            Self::Closed { .. } | Self::SnapshotOwnership | Self::InvalidArgument { .. } => {
                ErrorKind::Programming
            }
        }
    }

    /// Returns the diagnostic without the category prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Io { message }
            | Self::Corruption { message }
            | Self::NotFound { message }
            | Self::Generic { message }
            | Self::InvalidArgument { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl Status {
    /// Raises the mapped error for a non-ok status.
    pub fn into_result(self) -> Result<()> {
        match Error::from_status(self) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Read-path mapping: an engine `NotFound` is the absent value, not an error.
pub(crate) fn absent_on_not_found<T>(status: Status) -> Result<Option<T>> {
    if status.is_not_found() {
        return Ok(None);
    }
    status.into_result().map(|()| None)
}
