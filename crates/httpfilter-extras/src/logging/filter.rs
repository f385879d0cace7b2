//! The request logging filter

use super::level::{LoggingLevel, Severity};
use super::settings::{LoggingFilterSettings, RequestLoggingSettings};
use super::sink::{LogMessage, LogSink};
use bytes::Bytes;
use http::Method;
use httpfilter_core::{
    BoxFuture, BoxedNext, FilterAdapter, FilterError, FilterRegistry, Request, Response,
    ResponseContext, Result,
};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Type identifier the logging filter registers under
pub const FILTER_TYPE: &str = "logging";

/// Logs one line per request whose resolved level is enabled
///
/// The level is resolved from the request's method and path before the
/// request moves on. Requests resolving to OFF, or to a severity the sink
/// would discard, go straight to `next` with no capture at all.
pub struct LoggingFilter {
    settings: RequestLoggingSettings,
    sink: Arc<dyn LogSink>,
}

impl LoggingFilter {
    /// Create a filter from resolved settings
    pub fn new(settings: RequestLoggingSettings, sink: Arc<dyn LogSink>) -> Self {
        Self { settings, sink }
    }

    /// Create a filter from the options block of the filter named `name`
    pub fn from_options(name: &str, options: &Value, sink: Arc<dyn LogSink>) -> Result<Self> {
        let parsed: LoggingFilterSettings = serde_json::from_value(options.clone())
            .map_err(|e| FilterError::invalid_settings(name, e))?;
        let settings = RequestLoggingSettings::from_settings(&parsed)
            .map_err(|e| FilterError::invalid_settings(name, e))?;
        Ok(Self::new(settings, sink))
    }

    /// The resolved policy
    pub fn settings(&self) -> &RequestLoggingSettings {
        &self.settings
    }
}

impl std::fmt::Debug for LoggingFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingFilter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// What is kept of a request while it is being handled
struct Captured {
    severity: Severity,
    method: Method,
    path: String,
    node: Option<Arc<str>>,
    received_at: SystemTime,
    body: Option<Bytes>,
}

impl Captured {
    fn of(req: &Request, level: LoggingLevel) -> Self {
        Self {
            severity: level.severity(),
            method: req.method().clone(),
            path: req.path().to_string(),
            node: req.node().cloned(),
            received_at: req.received_at(),
            body: level.log_body().then(|| req.body().clone()),
        }
    }

    fn line(&self, response: &ResponseContext) -> String {
        let mut line = format!(
            "{}:[{}] {} {} - {}",
            self.severity,
            self.node.as_deref().unwrap_or("-"),
            self.method,
            self.path,
            response.status.as_u16(),
        );
        if !response.status_text.is_empty() {
            let _ = write!(line, " {}", response.status_text);
        }
        if let Some(body) = self.body.as_ref().filter(|b| !b.is_empty()) {
            let _ = write!(line, " - {}", String::from_utf8_lossy(body));
        }
        if let Some(detail) = &response.error {
            let _ = write!(line, " - error: {detail}");
        }
        line
    }
}

/// Line of one in-flight request. Submitted on drop, so a request whose
/// future is abandoned (outer timeout, client gone) is still logged, as
/// `499 Client Closed Request`.
struct PendingLine {
    captured: Captured,
    category: Arc<str>,
    sink: Arc<dyn LogSink>,
    outcome: Option<ResponseContext>,
}

impl PendingLine {
    fn complete(mut self, response: &Response) {
        self.outcome = Some(ResponseContext::of(response));
    }
}

impl Drop for PendingLine {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(ResponseContext::cancelled);
        self.sink.submit(LogMessage {
            severity: self.captured.severity,
            category: Arc::clone(&self.category),
            line: self.captured.line(&outcome),
            timestamp: self.captured.received_at,
        });
    }
}

impl FilterAdapter for LoggingFilter {
    fn handle(&self, req: Request, next: BoxedNext) -> BoxFuture {
        let level = self.settings.logging_level(req.method(), req.path());
        if !level.is_enabled() || !self.sink.enabled(level.severity()) {
            return next(req);
        }

        let pending = PendingLine {
            captured: Captured::of(&req, level),
            category: Arc::clone(self.settings.category()),
            sink: Arc::clone(&self.sink),
            outcome: None,
        };

        Box::pin(async move {
            let response = next(req).await;
            pending.complete(&response);
            response
        })
    }
}

/// Register the `logging` type, wiring every instance to `sink`
pub fn register(registry: &mut FilterRegistry, sink: Arc<dyn LogSink>) {
    registry.register(FILTER_TYPE, move |ctx, options| {
        let filter = LoggingFilter::from_options(ctx.name, options, Arc::clone(&sink))?;
        debug!(
            filter = ctx.name,
            node = ctx.node_name,
            rules = filter.settings().rules().len(),
            "logging filter configured"
        );
        Ok(Arc::new(filter) as Arc<dyn FilterAdapter>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::sink::MemoryLogSink;
    use http::StatusCode;
    use httpfilter_core::{handler_fn, ErrorDetail, IntoResponse};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn filter(options: Value, sink: &Arc<MemoryLogSink>) -> LoggingFilter {
        LoggingFilter::from_options("logging", &options, sink.clone()).unwrap()
    }

    fn request(method: Method, path: &str, body: &'static str) -> Request {
        let mut req = Request::build(method, path, body).unwrap();
        req.set_node_name(Arc::from("server1"));
        req
    }

    fn echo_body() -> BoxedNext {
        handler_fn(|req: Request| async move {
            String::from_utf8_lossy(req.body()).into_owned().into_response()
        })
    }

    #[tokio::test]
    async fn logs_status_line_and_leaves_body_for_handler() {
        let sink = Arc::new(MemoryLogSink::new());
        let filter = filter(json!({ "log_body": true }), &sink);

        let response = filter
            .handle(request(Method::POST, "/_search", r#"{"q":"user:kimchy"}"#), echo_body())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let message = sink.next_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            message.line,
            r#"INFO:[server1] POST /_search - 200 OK - {"q":"user:kimchy"}"#
        );
        assert_eq!(message.severity, Severity::Info);
        assert_eq!(&*message.category, "httpfilter.logging");
    }

    #[tokio::test]
    async fn body_flag_only_changes_the_body_segment() {
        let sink = Arc::new(MemoryLogSink::new());
        let filter = filter(json!({}), &sink);

        filter
            .handle(request(Method::POST, "/_search", "user:kimchy"), echo_body())
            .await;

        let message = sink.next_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(message.line, "INFO:[server1] POST /_search - 200 OK");
    }

    #[tokio::test]
    async fn off_requests_skip_the_sink() {
        let sink = Arc::new(MemoryLogSink::new());
        let filter = filter(
            json!({ "rules": [{ "path": "/_cluster/health", "level": "off" }] }),
            &sink,
        );

        let response = filter
            .handle(request(Method::GET, "/_cluster/health", ""), echo_body())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sink.next_message(Duration::from_millis(50)).await.is_none());
    }

    #[tokio::test]
    async fn severities_below_the_sink_threshold_are_skipped() {
        let sink = Arc::new(MemoryLogSink::with_threshold(Severity::Info));
        let filter = filter(json!({ "level": "trace" }), &sink);

        filter.handle(request(Method::GET, "/", ""), echo_body()).await;
        assert!(sink.try_next_message().is_none());
    }

    #[tokio::test]
    async fn failures_are_logged_with_their_detail() {
        let sink = Arc::new(MemoryLogSink::new());
        let filter = filter(json!({ "level": "warn" }), &sink);
        let failing = handler_fn(|_req: Request| async move {
            let mut response: Response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            response
                .extensions_mut()
                .insert(ErrorDetail::new("no master"));
            response
        });

        let response = filter.handle(request(Method::GET, "/idx", ""), failing).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let message = sink.next_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            message.line,
            "WARN:[server1] GET /idx - 503 Service Unavailable - error: no master"
        );
    }

    #[tokio::test]
    async fn missing_node_is_rendered_as_dash() {
        let sink = Arc::new(MemoryLogSink::new());
        let filter = filter(json!({}), &sink);
        let req = Request::build(Method::DELETE, "/idx", "").unwrap();

        filter.handle(req, echo_body()).await;
        let message = sink.next_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(message.line, "INFO:[-] DELETE /idx - 200 OK");
    }

    #[tokio::test]
    async fn full_sink_never_fails_the_request() {
        let sink = Arc::new(MemoryLogSink::with_capacity(1, Severity::Trace));
        let filter = filter(json!({}), &sink);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = calls.clone();
            handler_fn(move |_req: Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { "ok".into_response() }
            })
        };

        for _ in 0..3 {
            let response = filter.handle(request(Method::GET, "/", ""), counted.clone()).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sink.dropped(), 2);
    }

    #[tokio::test]
    async fn abandoned_requests_are_logged_as_client_closed() {
        let sink = Arc::new(MemoryLogSink::new());
        let filter = filter(json!({ "level": "warn" }), &sink);
        let stalled = handler_fn(|_req: Request| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late".into_response()
        });

        let fut = filter.handle(request(Method::GET, "/_search", ""), stalled);
        assert!(tokio::time::timeout(Duration::from_millis(20), fut).await.is_err());

        let message = sink.next_message(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            message.line,
            "WARN:[server1] GET /_search - 499 Client Closed Request - error: request cancelled"
        );
        assert!(sink.try_next_message().is_none());
    }

    #[tokio::test]
    async fn completed_requests_are_logged_once() {
        let sink = Arc::new(MemoryLogSink::new());
        let filter = filter(json!({}), &sink);

        filter.handle(request(Method::GET, "/", ""), echo_body()).await;
        assert_eq!(sink.drain().len(), 1);
    }

    #[test]
    fn bad_options_are_configuration_errors() {
        let sink: Arc<dyn LogSink> = Arc::new(MemoryLogSink::new());
        let err = LoggingFilter::from_options(
            "audit",
            &json!({ "rules": [{ "path": "no-slash" }] }),
            sink.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidSettings { ref name, .. } if name == "audit"));

        assert!(LoggingFilter::from_options("audit", &json!({ "lvl": "info" }), sink).is_err());
    }

    #[test]
    fn registers_under_logging() {
        let mut registry = FilterRegistry::new();
        register(&mut registry, Arc::new(MemoryLogSink::new()));
        assert!(registry.contains(FILTER_TYPE));
    }
}
