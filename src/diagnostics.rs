// src/diagnostics.rs - Leveled, labeled diagnostic messages
//! Diagnostics sink used by the sampler, setpoint tracker, range guard and
//! hysteresis controller.
//!
//! Lines are either `"<label>"` or `"<label>=<value>"`. Every line is
//! stamped with the controller clock in milliseconds, so a transcript reads
//! `"<ms> ms LEVEL: <line>"` whether the loop runs in real time or on a
//! simulated clock. A disabled [`Diagnostics`] never formats anything: labels
//! with runtime content are passed as closures and only built once the
//! message is known to be emitted.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Matching `tracing` level, used to configure the subscriber.
    pub fn to_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"<ms> ms LEVEL: <line>"`
pub fn stamp_line(at_ms: u32, level: LogLevel, line: &str) -> String {
    format!("{} ms {}: {}", at_ms, level, line)
}

/// Destination for formatted diagnostic lines. `at_ms` is the controller clock.
pub trait DiagnosticSink {
    fn emit(&mut self, at_ms: u32, level: LogLevel, line: &str);
}

/// Forwards diagnostics to the `tracing` subscriber, with the controller clock as `at_ms`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, at_ms: u32, level: LogLevel, line: &str) {
        match level {
            LogLevel::Error => tracing::error!(at_ms, "{}", line),
            LogLevel::Warn => tracing::warn!(at_ms, "{}", line),
            LogLevel::Info => tracing::info!(at_ms, "{}", line),
            LogLevel::Debug => tracing::debug!(at_ms, "{}", line),
        }
    }
}

/// Keeps every emitted line in memory. Handy for tests and for replaying a run.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub lines: Vec<(LogLevel, String)>,
    /// Same lines in transcript form, see [`stamp_line`].
    pub stamped: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines emitted at exactly `level`, oldest first.
    pub fn at(&self, level: LogLevel) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(lv, _)| *lv == level)
            .map(|(_, line)| line.as_str())
            .collect()
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.lines.iter().filter(|(_, line)| line.contains(needle)).count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.stamped.clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, at_ms: u32, level: LogLevel, line: &str) {
        self.lines.push((level, line.to_string()));
        self.stamped.push(stamp_line(at_ms, level, line));
    }
}

/// Gate in front of a [`DiagnosticSink`]: global enable flag plus a maximum verbosity.
#[derive(Debug, Clone)]
pub struct Diagnostics<S: DiagnosticSink> {
    enabled: bool,
    max_level: LogLevel,
    now_ms: u32,
    sink: S,
}

impl<S: DiagnosticSink> Diagnostics<S> {
    pub fn new(config: &crate::config::LoggingConfig, sink: S) -> Self {
        Self {
            enabled: config.enabled,
            max_level: config.level,
            now_ms: 0,
            sink,
        }
    }

    /// Clock reading stamped on every following line.
    pub fn set_now(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
    }

    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.enabled && level <= self.max_level
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Emit a bare `"<label>"` line.
    pub fn message(&mut self, level: LogLevel, label: &str) {
        if !self.is_enabled(level) {
            return;
        }
        self.sink.emit(self.now_ms, level, label);
    }

    /// Emit `"<label>=<value>"` with two decimals.
    pub fn value(&mut self, level: LogLevel, label: &str, value: f32) {
        if !self.is_enabled(level) {
            return;
        }
        let line = format!("{}={:.2}", label, value);
        self.sink.emit(self.now_ms, level, &line);
    }

    /// Emit a label built at call time. `build` is not invoked when the level is filtered out.
    pub fn message_with<F>(&mut self, level: LogLevel, build: F)
    where
        F: FnOnce() -> String,
    {
        if !self.is_enabled(level) {
            return;
        }
        let line = build();
        self.sink.emit(self.now_ms, level, &line);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
