//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` and `severity` first, then fields in key order
//! - ERROR and FATAL go to stderr, everything else to stdout
//! - Synchronous, no buffering

use std::fmt;
use std::io::{self, Write};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn to_stderr(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Logs an event; the stream is chosen by severity
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let line = Self::render(severity, event, fields);
        if severity.to_stderr() {
            Self::write_line(&mut io::stderr(), &line);
        } else {
            Self::write_line(&mut io::stdout(), &line);
        }
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    /// Renders one JSON line, newline included
    pub fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(key, _)| *key);

        let mut line = String::with_capacity(128);
        line.push_str("{\"event\":");
        line.push_str(&quote(event));
        line.push_str(",\"severity\":");
        line.push_str(&quote(severity.as_str()));
        for (key, value) in sorted {
            line.push(',');
            line.push_str(&quote(key));
            line.push(':');
            line.push_str(&quote(value));
        }
        line.push_str("}\n");
        line
    }

    // Logging failures are swallowed
    fn write_line<W: Write>(writer: &mut W, line: &str) {
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
