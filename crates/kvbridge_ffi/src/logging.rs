//! Logging transport.
//!
//! The bridge logs through `tracing`. A host that wants those diagnostics
//! installs a callback; each formatted event is handed over as C strings.
//! The bridge does not interpret the content.

use crate::error::{clear_last_error, fail, KvbResult};
use std::ffi::{c_char, CString};
use std::io;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Severity passed to the log callback.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KvbLogLevel {
    /// Errors.
    Error = 1,
    /// Warnings, including degraded iterators and handles released at close.
    Warn = 2,
    /// Lifecycle events.
    Info = 3,
    /// Engine detail.
    Debug = 4,
    /// Everything.
    Trace = 5,
}

impl From<&Level> for KvbLogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }
}

impl KvbLogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Host log callback: `(level, target, message)`.
///
/// Both strings are only valid for the duration of the call.
pub type KvbLogCallback = extern "C" fn(KvbLogLevel, *const c_char, *const c_char);

/// Buffers one formatted event and forwards it on drop.
pub struct CallbackWriter {
    callback: KvbLogCallback,
    level: KvbLogLevel,
    target: String,
    line: Vec<u8>,
}

impl io::Write for CallbackWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.line.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for CallbackWriter {
    fn drop(&mut self) {
        while self.line.last().is_some_and(u8::is_ascii_whitespace) {
            self.line.pop();
        }
        if self.line.is_empty() {
            return;
        }
        self.line.retain(|b| *b != 0);
        let message = CString::new(std::mem::take(&mut self.line)).unwrap_or_default();
        let target = CString::new(self.target.replace('\0', "")).unwrap_or_default();
        (self.callback)(self.level, target.as_ptr(), message.as_ptr());
    }
}

/// Creates a [`CallbackWriter`] per event.
#[derive(Clone, Copy)]
pub struct CallbackMakeWriter {
    callback: KvbLogCallback,
}

impl CallbackMakeWriter {
    /// Wraps `callback`.
    pub fn new(callback: KvbLogCallback) -> Self {
        Self { callback }
    }
}

impl<'a> MakeWriter<'a> for CallbackMakeWriter {
    type Writer = CallbackWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CallbackWriter {
            callback: self.callback,
            level: KvbLogLevel::Info,
            target: String::new(),
            line: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        CallbackWriter {
            callback: self.callback,
            level: meta.level().into(),
            target: meta.target().to_owned(),
            line: Vec::new(),
        }
    }
}

/// Installs the process-wide log callback.
///
/// Events at `max_level` and above are forwarded; `RUST_LOG`, when set,
/// takes precedence. Installing twice returns `KvbResult::Error`.
#[no_mangle]
pub extern "C" fn kvb_set_log_callback(
    callback: Option<KvbLogCallback>,
    max_level: KvbLogLevel,
) -> KvbResult {
    clear_last_error();

    let Some(callback) = callback else {
        return fail(KvbResult::NullPointer, "null log callback");
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(max_level.directive()));

    let installed = tracing_subscriber::fmt()
        .with_writer(CallbackMakeWriter::new(callback))
        .with_env_filter(filter)
        .with_ansi(false)
        .with_level(false)
        .with_target(false)
        .without_time()
        .try_init();
    match installed {
        Ok(()) => KvbResult::Ok,
        Err(e) => fail(KvbResult::Error, format!("log callback already installed: {e}")),
    }
}
