//! Request timeout filter
//!
//! Enforces a deadline on everything inside it in the chain. A request that
//! takes longer is answered with `408 Request Timeout` and a JSON error body;
//! the response carries an [`ErrorDetail`] so outer filters can report why.
//!
//! ```json
//! { "type": "timeout", "timeout_ms": 5000 }
//! ```

use http::StatusCode;
use httpfilter_core::{
    json_response, BoxFuture, BoxedNext, ErrorDetail, FilterAdapter, FilterError, FilterRegistry,
    Request, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Type identifier the timeout filter registers under
pub const FILTER_TYPE: &str = "timeout";

/// Deadline used when `timeout_ms` is not configured
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Options block of a `timeout` filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Filter that answers 408 when the rest of the chain is too slow
#[derive(Debug, Clone)]
pub struct TimeoutFilter {
    timeout: Duration,
}

impl TimeoutFilter {
    /// Create a filter with the given deadline
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Create a filter with a deadline in milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Create a filter from the options block of the filter named `name`
    pub fn from_options(name: &str, options: &Value) -> Result<Self> {
        let settings: TimeoutSettings = serde_json::from_value(options.clone())
            .map_err(|e| FilterError::invalid_settings(name, e))?;
        if settings.timeout_ms == 0 {
            return Err(FilterError::invalid_settings(name, "timeout_ms must be positive"));
        }
        Ok(Self::from_millis(settings.timeout_ms))
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl FilterAdapter for TimeoutFilter {
    fn handle(&self, req: Request, next: BoxedNext) -> BoxFuture {
        let timeout = self.timeout;

        Box::pin(async move {
            match tokio::time::timeout(timeout, next(req)).await {
                Ok(response) => response,
                Err(_) => {
                    let message = format!("request exceeded timeout of {}ms", timeout.as_millis());
                    debug!(timeout_ms = timeout.as_millis() as u64, "request timed out");
                    let mut response = json_response(
                        StatusCode::REQUEST_TIMEOUT,
                        &json!({
                            "error": {
                                "type": "request_timeout",
                                "message": &message,
                            }
                        }),
                    );
                    response.extensions_mut().insert(ErrorDetail::new(message));
                    response
                }
            }
        })
    }
}

/// Register the `timeout` type
pub fn register(registry: &mut FilterRegistry) {
    registry.register(FILTER_TYPE, |ctx, options| {
        let filter = TimeoutFilter::from_options(ctx.name, options)?;
        debug!(
            filter = ctx.name,
            timeout_ms = filter.timeout().as_millis() as u64,
            "timeout filter configured"
        );
        Ok(Arc::new(filter) as Arc<dyn FilterAdapter>)
    });
}
