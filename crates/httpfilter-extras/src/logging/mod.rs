//! Policy-driven request logging
//!
//! A `logging` filter resolves a [`LoggingLevel`] for every request from an
//! ordered set of (method, path) rules and, when the level is enabled, hands a
//! single formatted line to a [`LogSink`] once the response is known:
//!
//! ```text
//! INFO:[server1] POST /_search - 200 OK - {"query":{"match":{"user":"kimchy"}}}
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use httpfilter_extras::logging::{self, MemoryLogSink};
//!
//! let sink = Arc::new(MemoryLogSink::new());
//! let mut registry = FilterRegistry::new();
//! logging::register(&mut registry, sink.clone());
//! ```

mod filter;
mod level;
mod pattern;
mod rules;
mod settings;
mod sink;

pub use filter::{register, LoggingFilter, FILTER_TYPE};
pub use level::{LoggingLevel, ParseSeverityError, Severity};
pub use pattern::{MethodPattern, PathMatch, PathPattern, RuleError};
pub use rules::{Rule, RuleTable};
pub use settings::{LoggingFilterSettings, RequestLoggingSettings, RuleSettings, DEFAULT_CATEGORY};
pub use sink::{LogMessage, LogSink, MemoryLogSink, TracingLogSink, DEFAULT_CAPACITY};
