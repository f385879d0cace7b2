//! # httpfilter-extras
//!
//! Filters for httpfilter chains, opt-in via Cargo feature flags.
//!
//! ## Features
//!
//! - `logging` - policy-driven request logging filter and log sinks
//! - `timeout` - request timeout filter
//! - `config` - environment configuration with `.env` file support
//! - `full` - All features enabled
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! httpfilter-extras = { version = "0.1", features = ["logging", "timeout"] }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Request logging filter
#[cfg(feature = "logging")]
pub mod logging;

// Request timeout filter
#[cfg(feature = "timeout")]
pub mod timeout;

// Configuration management module
#[cfg(feature = "config")]
pub mod config;

// Re-exports for convenience
#[cfg(feature = "logging")]
pub use logging::{
    LogMessage, LogSink, LoggingFilter, LoggingFilterSettings, LoggingLevel, MemoryLogSink,
    RequestLoggingSettings, RuleSettings, Severity, TracingLogSink,
};

#[cfg(feature = "timeout")]
pub use timeout::{TimeoutFilter, TimeoutSettings};

#[cfg(feature = "config")]
pub use config::{
    body_limit_from_env, env_or, load_dotenv, load_dotenv_from, node_name_from_env, Config,
    ConfigError, SinkConfig,
};
