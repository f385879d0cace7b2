//! Severities and per-request logging levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a request log line
///
/// Ordered from least to most important; [`Severity::Off`] sorts last and
/// means "do not log".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    /// Finest detail
    Trace,
    /// Debugging detail
    Debug,
    /// Normal request log
    Info,
    /// Noteworthy request
    Warn,
    /// Failed request
    Error,
    /// Not logged at all
    Off,
}

impl Severity {
    /// Upper-case label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Off => "OFF",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised severity name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity `{0}`")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "off" | "none" => Ok(Severity::Off),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = ParseSeverityError;

    fn try_from(value: String) -> Result<Self, ParseSeverityError> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_ascii_lowercase()
    }
}

/// How one request is logged: at which severity and whether the body goes
/// into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoggingLevel {
    severity: Severity,
    log_body: bool,
}

impl LoggingLevel {
    /// Baseline used when nothing else applies: not logged, no body
    pub const OFF: LoggingLevel = LoggingLevel {
        severity: Severity::Off,
        log_body: false,
    };

    /// Create a level
    pub const fn new(severity: Severity, log_body: bool) -> Self {
        Self { severity, log_body }
    }

    /// Severity of the line
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether the request body is included
    pub fn log_body(&self) -> bool {
        self.log_body
    }

    /// Whether anything is logged at all
    pub fn is_enabled(&self) -> bool {
        self.severity != Severity::Off
    }
}
