//! Configuration from the process environment
//!
//! Settings files describe the chain; the environment describes the process:
//! which node this is and how the production log sink is sized.
//!
//! | Variable                     | Meaning                       | Default |
//! |------------------------------|-------------------------------|---------|
//! | `HTTPFILTER_NODE_NAME`       | node name stamped on requests | `node`  |
//! | `HTTPFILTER_BODY_LIMIT`      | request body limit in bytes   | `1048576` |
//! | `HTTPFILTER_SINK_CAPACITY`   | sink queue capacity           | `1024`  |
//! | `HTTPFILTER_SINK_LEVEL`      | lowest severity delivered     | `info`  |
//! | `HTTPFILTER_SINK_PREFIX`     | category prefix               | none    |
//!
//! # Example
//!
//! ```ignore
//! use httpfilter_extras::config::{load_dotenv, SinkConfig};
//!
//! load_dotenv();
//! let sink = SinkConfig::from_env()?.build();
//! ```

use crate::logging::{Severity, TracingLogSink, DEFAULT_CAPACITY};
use httpfilter_core::settings::DEFAULT_NODE_NAME;
use httpfilter_core::DEFAULT_BODY_LIMIT;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Prefix shared by every variable this crate reads
pub const ENV_PREFIX: &str = "HTTPFILTER";

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable could not be deserialized
    #[error("configuration error: {0}")]
    Envy(#[from] envy::Error),

    /// A variable is present but unusable
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: String,
        /// What was wrong
        reason: String,
    },
}

/// Typed view of environment variables
///
/// Field names map to SCREAMING_SNAKE_CASE variable names.
#[derive(Debug, Clone)]
pub struct Config<T>(pub T);

impl<T: DeserializeOwned> Config<T> {
    /// Load from variables starting with `<prefix>_`
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        envy::prefixed(format!("{}_", prefix))
            .from_env::<T>()
            .map(Config)
            .map_err(ConfigError::from)
    }

    /// Get the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Load variables from `.env` in the working directory, if present.
///
/// Variables already set in the environment win.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }
}

/// Load variables from a specific file, if present
pub fn load_dotenv_from<P: AsRef<std::path::Path>>(path: P) {
    let _ = dotenvy::from_path(path);
}

/// Read a variable with a fallback
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Node name from `HTTPFILTER_NODE_NAME`, `node` when unset
pub fn node_name_from_env() -> String {
    env_or(&format!("{ENV_PREFIX}_NODE_NAME"), DEFAULT_NODE_NAME)
}

/// Request body limit from `HTTPFILTER_BODY_LIMIT`, 1MB when unset
pub fn body_limit_from_env() -> Result<usize, ConfigError> {
    let var = format!("{ENV_PREFIX}_BODY_LIMIT");
    let Ok(raw) = std::env::var(&var) else {
        return Ok(DEFAULT_BODY_LIMIT);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            reason: "limit must be positive".to_string(),
        }),
        Ok(limit) => Ok(limit),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_level() -> Severity {
    Severity::Info
}

/// Sizing of the production [`TracingLogSink`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SinkConfig {
    /// Queue capacity
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Lowest severity delivered
    #[serde(default = "default_level")]
    pub level: Severity,
    /// Category prefix
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            level: default_level(),
            prefix: None,
        }
    }
}

impl SinkConfig {
    /// Read `HTTPFILTER_SINK_*`
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::<SinkConfig>::from_env_prefixed(&format!("{ENV_PREFIX}_SINK"))?.into_inner();
        if config.capacity == 0 {
            return Err(ConfigError::Invalid {
                var: format!("{ENV_PREFIX}_SINK_CAPACITY"),
                reason: "capacity must be positive".to_string(),
            });
        }
        Ok(config)
    }

    /// Start a sink with this configuration
    pub fn build(self) -> TracingLogSink {
        TracingLogSink::with_prefix(self.capacity, self.level, self.prefix)
    }
}
