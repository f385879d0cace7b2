//! Logging filter configuration and the resolved per-request policy

use super::level::{LoggingLevel, Severity};
use super::pattern::{MethodPattern, PathPattern, RuleError};
use super::rules::{Rule, RuleTable};
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Category attached to request log lines unless configured otherwise
pub const DEFAULT_CATEGORY: &str = "httpfilter.logging";

fn default_severity() -> Severity {
    Severity::Info
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn any_pattern() -> String {
    "*".to_string()
}

/// Options block of a `logging` filter.
///
/// ```json
/// {
///   "level": "trace",
///   "log_body": false,
///   "rules": [
///     { "method": "GET", "path": "/_bulk", "level": "info" },
///     { "method": "POST", "path": "/_search", "log_body": true }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingFilterSettings {
    /// Severity of the default rule
    #[serde(default = "default_severity")]
    pub level: Severity,
    /// Body flag of the default rule
    #[serde(default)]
    pub log_body: bool,
    /// Category attached to every message
    #[serde(default = "default_category")]
    pub category: String,
    /// Declared rules, in precedence tie-break order
    #[serde(default)]
    pub rules: Vec<RuleSettings>,
}

impl Default for LoggingFilterSettings {
    fn default() -> Self {
        Self {
            level: default_severity(),
            log_body: false,
            category: default_category(),
            rules: Vec::new(),
        }
    }
}

/// One rule entry. Missing `level` or `log_body` inherit the filter defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSettings {
    /// `*` or an HTTP method
    #[serde(default = "any_pattern")]
    pub method: String,
    /// Path pattern
    #[serde(default = "any_pattern")]
    pub path: String,
    /// Severity for matching requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Severity>,
    /// Whether matching requests log their body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_body: Option<bool>,
}

impl RuleSettings {
    /// Rule entry for a method and path, inheriting level and body flag
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            level: None,
            log_body: None,
        }
    }

    /// Set the severity
    pub fn level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the body flag
    pub fn log_body(mut self, log_body: bool) -> Self {
        self.log_body = Some(log_body);
        self
    }
}

/// Resolved logging policy of one filter instance
///
/// Built once from [`LoggingFilterSettings`]; read-only afterwards, so
/// concurrent lookups need no synchronization.
#[derive(Debug, Clone)]
pub struct RequestLoggingSettings {
    table: RuleTable,
    category: Arc<str>,
}

impl RequestLoggingSettings {
    /// Compile the configured rules
    pub fn from_settings(settings: &LoggingFilterSettings) -> Result<Self, RuleError> {
        let default = LoggingLevel::new(settings.level, settings.log_body);
        let rules = settings
            .rules
            .iter()
            .map(|entry| -> Result<Rule, RuleError> {
                Ok(Rule::new(
                    MethodPattern::parse(&entry.method)?,
                    PathPattern::parse(&entry.path)?,
                    LoggingLevel::new(
                        entry.level.unwrap_or(settings.level),
                        entry.log_body.unwrap_or(settings.log_body),
                    ),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            table: RuleTable::new(rules, default),
            category: Arc::from(settings.category.as_str()),
        })
    }

    /// Level for a request
    pub fn logging_level(&self, method: &Method, path: &str) -> LoggingLevel {
        self.table.resolve(method, path)
    }

    /// Level of the default rule
    pub fn default_level(&self) -> LoggingLevel {
        self.table.default_level()
    }

    /// Category attached to messages
    pub fn category(&self) -> &Arc<str> {
        &self.category
    }

    /// The compiled rules
    pub fn rules(&self) -> &RuleTable {
        &self.table
    }
}

impl Default for RequestLoggingSettings {
    /// Every request at INFO, without body
    fn default() -> Self {
        Self {
            table: RuleTable::new(Vec::new(), LoggingLevel::new(Severity::Info, false)),
            category: Arc::from(DEFAULT_CATEGORY),
        }
    }
}
