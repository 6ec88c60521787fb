//! Per-session diagnostic logger.
//!
//! The logger owns a `tracing` span naming the database, so every engine
//! diagnostic emitted through it carries the path. The transport behind
//! `tracing` is whatever subscriber the host installed.

use std::fmt::Display;
use tracing::{debug, info, warn, Span};

/// Forwards engine diagnostics for one session.
#[derive(Debug)]
pub(crate) struct SessionLogger {
    span: Span,
    name: String,
}

impl SessionLogger {
    /// Creates a logger for the database called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::debug_span!("kvbridge", db = %name);
        Self { span, name }
    }

    /// The database name this logger reports for.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self, message: impl Display) {
        let _entered = self.span.enter();
        debug!("{message}");
    }

    pub fn info(&self, message: impl Display) {
        let _entered = self.span.enter();
        info!("{message}");
    }

    pub fn warn(&self, message: impl Display) {
        let _entered = self.span.enter();
        warn!("{message}");
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        debug!(db = %self.name, "logger released");
    }
}
