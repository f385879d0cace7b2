//! Response types for httpfilter
//!
//! [`Response`] is a plain `http::Response` over a buffered body. Filters that
//! want to explain a failure attach an [`ErrorDetail`] extension; the
//! [`ResponseContext`] view gathers status code, reason phrase and that detail
//! for anything that reports on a finished request.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    /// Convert self into a Response
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        http::Response::new(Full::new(Bytes::new()))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        text_response(StatusCode::OK, Bytes::from_static(self.as_bytes()))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        text_response(StatusCode::OK, Bytes::from(self))
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = self;
        response
    }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }
}

fn text_response(status: StatusCode, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// JSON response with the given status
///
/// Serialization failures degrade to an empty 500 instead of panicking.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = http::Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Failure explanation attached to a response as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail(pub String);

impl ErrorDetail {
    /// Create a new error detail
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }

    /// The detail text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request the server refused before its handler could see it, such as an
/// oversized or unreadable body
///
/// Travels as a request extension: the chain still runs, and the transport
/// answers with the rejection in place of the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    status: StatusCode,
    reason: String,
}

impl Rejection {
    /// Create a rejection with a status and a reason
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }

    /// `413 Payload Too Large` for a body over `limit` bytes
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("request body exceeds limit of {limit} bytes"),
        )
    }

    /// Status the request is answered with
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Why the request was refused
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = json_response(
            self.status,
            &serde_json::json!({
                "error": {
                    "type": "request_rejected",
                    "message": &self.reason,
                }
            }),
        );
        response.extensions_mut().insert(ErrorDetail::new(self.reason));
        response
    }
}

/// Read-only summary of a finished response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    /// HTTP status code
    pub status: StatusCode,
    /// Canonical reason phrase, empty for unregistered codes
    pub status_text: &'static str,
    /// Error detail attached by a filter or handler
    pub error: Option<String>,
}

impl ResponseContext {
    /// Observe a response without touching its body
    pub fn of(response: &Response) -> Self {
        let status = response.status();
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or(""),
            error: response
                .extensions()
                .get::<ErrorDetail>()
                .map(|detail| detail.0.clone()),
        }
    }

    /// Outcome of a request abandoned before any response was produced,
    /// reported as `499 Client Closed Request`
    pub fn cancelled() -> Self {
        Self {
            status: StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::REQUEST_TIMEOUT),
            status_text: "Client Closed Request",
            error: Some("request cancelled".to_string()),
        }
    }
}

/// Non-standard status recorded for requests dropped mid-flight
pub const CLIENT_CLOSED_REQUEST: u16 = 499;
