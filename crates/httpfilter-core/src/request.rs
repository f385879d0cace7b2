//! Request types for httpfilter

use bytes::Bytes;
use http::{request::Parts, Extensions, HeaderMap, Method, Uri, Version};
use std::sync::Arc;
use std::time::SystemTime;

/// HTTP Request wrapper
///
/// Carries everything a filter may look at while a request travels down the
/// chain: the request head, the fully buffered body, the name of the node that
/// received it and the time it was received.
///
/// The body is stored as [`Bytes`], so reading it (or cloning it for a log
/// line) never consumes it: the terminal handler always sees the same payload
/// the first filter saw.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Bytes,
    pub(crate) node: Option<Arc<str>>,
    pub(crate) received_at: SystemTime,
}

impl Request {
    /// Create a new request from parts and a buffered body
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self {
            parts,
            body,
            node: None,
            received_at: SystemTime::now(),
        }
    }

    /// Create a request from an `http::Request` head and a body
    pub fn from_http_request(req: http::Request<()>, body: Bytes) -> Self {
        let (parts, _) = req.into_parts();
        Self::new(parts, body)
    }

    /// Shorthand used by hosts and tests: build a request from a method, a
    /// path (optionally with a query string) and a body.
    pub fn build(method: Method, uri: &str, body: impl Into<Bytes>) -> crate::Result<Self> {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .map_err(|e| crate::FilterError::InvalidRequest(e.to_string()))?;
        Ok(Self::from_http_request(req, body.into()))
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the HTTP version
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get request extensions
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get the query string
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Borrow the buffered body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the body, returning the previous one
    pub fn replace_body(&mut self, body: Bytes) -> Bytes {
        std::mem::replace(&mut self.body, body)
    }

    /// Name of the node that received this request, once the transport has
    /// stamped it.
    pub fn node_name(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// Shared handle to the receiving node's name
    pub fn node(&self) -> Option<&Arc<str>> {
        self.node.as_ref()
    }

    /// Stamp the receiving node's name on the request
    pub fn set_node_name(&mut self, node: Arc<str>) {
        self.node = Some(node);
    }

    /// Time the request entered the chain
    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    /// Split the request into its head and body
    pub fn into_parts(self) -> (Parts, Bytes) {
        (self.parts, self.body)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .field("node", &self.node)
            .field("body_len", &self.body.len())
            .finish()
    }
}
