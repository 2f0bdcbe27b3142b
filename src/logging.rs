//! # Logging
//!
//! A leveled text sink with runtime-overridable channels.
//!
//! ## Overview
//!
//! The library itself only talks to the [`log`] facade. This module provides
//! the sink an application installs behind it:
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`LogSink`] | Anything that accepts leveled messages |
//! | [`LogFunctions`] | Per-channel overrides, passed in explicitly |
//! | [`StandardLogger`] | Default sink; also a [`log::Log`] implementation |
//!
//! Channels without an override print one line per message: `trace` and
//! `standard` to stdout, `warning`, `error` and `fatal` to stderr. Each line is
//! written under the stream's lock, so messages from different threads never
//! interleave.
//!
//! ## Example
//!
//! ```rust
//! use lockfs::logging::{LogFunctions, LogSink, StandardLogger};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let logger = StandardLogger::new(
//!     LogFunctions::new().all(move |msg: &str| sink.lock().unwrap().push(msg.to_owned())),
//! );
//!
//! logger.warning("disk almost full");
//! assert_eq!(seen.lock().unwrap().as_slice(), ["disk almost full"]);
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Severity channel of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Fine-grained diagnostics.
    Trace,
    /// Normal operational messages.
    Standard,
    /// Something unexpected that was handled.
    Warning,
    /// An operation failed.
    Error,
    /// The application cannot continue.
    Fatal,
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace | log::Level::Debug => Level::Trace,
            log::Level::Info => Level::Standard,
            log::Level::Warn => Level::Warning,
            log::Level::Error => Level::Error,
        }
    }
}

/// A sink accepting leveled text messages.
///
/// Only [`log`](LogSink::log) is required; the per-channel methods forward to
/// it.
pub trait LogSink: Send + Sync {
    /// Emit `msg` on the `level` channel.
    fn log(&self, level: Level, msg: &str);

    /// Emit on the trace channel.
    fn trace(&self, msg: &str) {
        self.log(Level::Trace, msg);
    }

    /// Emit on the standard channel.
    fn standard(&self, msg: &str) {
        self.log(Level::Standard, msg);
    }

    /// Emit on the warning channel.
    fn warning(&self, msg: &str) {
        self.log(Level::Warning, msg);
    }

    /// Emit on the error channel.
    fn error(&self, msg: &str) {
        self.log(Level::Error, msg);
    }

    /// Emit on the fatal channel.
    fn fatal(&self, msg: &str) {
        self.log(Level::Fatal, msg);
    }
}

/// A function receiving formatted messages.
pub type LogFunction = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-channel overrides for a [`StandardLogger`].
///
/// `all`, when set, receives every message regardless of channel.
#[derive(Clone, Default)]
pub struct LogFunctions {
    trace: Option<LogFunction>,
    standard: Option<LogFunction>,
    warning: Option<LogFunction>,
    error: Option<LogFunction>,
    fatal: Option<LogFunction>,
    all: Option<LogFunction>,
}

impl LogFunctions {
    /// No overrides; every channel uses its default stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every channel to `f`.
    pub fn all(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.all = Some(Arc::new(f));
        self
    }

    /// Route one channel to `f`.
    pub fn channel(mut self, level: Level, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        let f: LogFunction = Arc::new(f);
        match level {
            Level::Trace => self.trace = Some(f),
            Level::Standard => self.standard = Some(f),
            Level::Warning => self.warning = Some(f),
            Level::Error => self.error = Some(f),
            Level::Fatal => self.fatal = Some(f),
        }
        self
    }

    fn get(&self, level: Level) -> Option<&LogFunction> {
        let channel = match level {
            Level::Trace => &self.trace,
            Level::Standard => &self.standard,
            Level::Warning => &self.warning,
            Level::Error => &self.error,
            Level::Fatal => &self.fatal,
        };
        self.all.as_ref().or(channel.as_ref())
    }
}

impl fmt::Debug for LogFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFunctions")
            .field("trace", &self.trace.is_some())
            .field("standard", &self.standard.is_some())
            .field("warning", &self.warning.is_some())
            .field("error", &self.error.is_some())
            .field("fatal", &self.fatal.is_some())
            .field("all", &self.all.is_some())
            .finish()
    }
}

/// Default [`LogSink`], configured by a [`LogFunctions`].
#[derive(Debug, Clone, Default)]
pub struct StandardLogger {
    functions: LogFunctions,
}

impl StandardLogger {
    /// A logger using `functions` for its overrides.
    pub fn new(functions: LogFunctions) -> Self {
        Self { functions }
    }

    /// Install as the process-wide [`log`] backend.
    ///
    /// Meant to be called once from the application's composition root.
    pub fn install(self, max_level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl LogSink for StandardLogger {
    fn log(&self, level: Level, msg: &str) {
        if let Some(f) = self.functions.get(level) {
            f(msg);
            return;
        }
        // A logger has nowhere to report its own write failures.
        let _ = match level {
            Level::Trace | Level::Standard => writeln!(io::stdout().lock(), "{msg}"),
            Level::Warning | Level::Error | Level::Fatal => writeln!(io::stderr().lock(), "{msg}"),
        };
    }
}

impl Log for StandardLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let msg = record.args().to_string();
        LogSink::log(self, record.level().into(), &msg);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
