//! # httpfilter
//!
//! Pluggable filter chains in front of an HTTP request handler.
//!
//! A chain is an ordered list of named filters, each one wrapping the next and
//! the innermost wrapping the real handler. Filters are built from a settings
//! snapshot through a registry of constructors, so what runs is decided by
//! configuration alone. The `logging` filter decides per request, from
//! (method, path) rules, whether to log it, at which severity and with or
//! without its body.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use httpfilter::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> httpfilter::Result<()> {
//!     let sink = Arc::new(TracingLogSink::new(Severity::Info));
//!     let registry = httpfilter::default_registry(sink);
//!
//!     let settings = ChainSettings::from_value(serde_json::json!({
//!         "node_name": "server1",
//!         "chain": ["timeout", "logging"],
//!         "filters": {
//!             "timeout": { "timeout_ms": 5000 },
//!             "logging": {
//!                 "level": "trace",
//!                 "rules": [{ "method": "GET", "path": "/_bulk", "level": "info" }]
//!             }
//!         }
//!     }))
//!     .map_err(|e| FilterError::invalid_settings("chain", e))?;
//!
//!     let handler = handler_fn(|req: Request| async move {
//!         format!("hello {}", req.path()).into_response()
//!     });
//!     let transport = FilterHttpServerTransport::new(&settings, &registry, handler)?;
//!     Server::new(Arc::new(transport)).run("127.0.0.1:9200").await
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `logging` (default) - request logging filter and log sinks
//! - `timeout` (default) - request timeout filter
//! - `config` - sink and node configuration from the environment
//! - `full` - All optional features enabled

// Re-export core functionality
pub use httpfilter_core::*;

// Re-export extras (feature-gated)
#[cfg(feature = "logging")]
pub use httpfilter_extras::logging;
#[cfg(feature = "logging")]
pub use httpfilter_extras::{
    LogMessage, LogSink, LoggingFilter, LoggingFilterSettings, LoggingLevel, MemoryLogSink,
    RequestLoggingSettings, RuleSettings, Severity, TracingLogSink,
};

#[cfg(feature = "timeout")]
pub use httpfilter_extras::timeout;
#[cfg(feature = "timeout")]
pub use httpfilter_extras::{TimeoutFilter, TimeoutSettings};

#[cfg(feature = "config")]
pub use httpfilter_extras::config;
#[cfg(feature = "config")]
pub use httpfilter_extras::{
    body_limit_from_env, env_or, load_dotenv, load_dotenv_from, node_name_from_env, Config,
    ConfigError, SinkConfig,
};

/// Registry with every bundled filter type, logging filters writing to `sink`
#[cfg(feature = "logging")]
pub fn default_registry(sink: std::sync::Arc<dyn LogSink>) -> FilterRegistry {
    let mut registry = FilterRegistry::new();
    logging::register(&mut registry, sink);
    #[cfg(feature = "timeout")]
    timeout::register(&mut registry);
    registry
}

/// Prelude module - import everything you need with `use httpfilter::prelude::*`
pub mod prelude {
    pub use httpfilter_core::{
        handler_fn, BoxFuture, BoxedNext, ChainSettings, ErrorDetail, FilterAdapter, FilterError,
        FilterHttpServerTransport, FilterRegistry, FilterSettings, IntoResponse, Request,
        Response, Result, Server,
    };

    #[cfg(feature = "logging")]
    pub use httpfilter_extras::{
        LogSink, LoggingFilter, LoggingLevel, MemoryLogSink, Severity, TracingLogSink,
    };

    #[cfg(feature = "timeout")]
    pub use httpfilter_extras::TimeoutFilter;

    #[cfg(feature = "config")]
    pub use httpfilter_extras::{load_dotenv, node_name_from_env, SinkConfig};

    // Re-export commonly used external types
    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, trace, warn};
}

#[cfg(all(test, feature = "logging", feature = "timeout"))]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn default_registry_knows_bundled_types() {
        let registry = default_registry(Arc::new(MemoryLogSink::new()));
        assert_eq!(registry.list(), vec!["logging", "timeout"]);
    }
}
