//! Filter adapters and their composition into a chain
//!
//! A filter sees every request before the terminal handler does and every
//! response after it. The chain nests filters so that the first one in
//! configuration order is the outermost.

use crate::request::Request;
use crate::response::Response;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by filters and handlers
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A boxed next function for filter chains
///
/// The terminal request handler has the same shape, so a chain entry point and
/// a bare handler are interchangeable.
pub type BoxedNext = Arc<dyn Fn(Request) -> BoxFuture + Send + Sync>;

/// Wrap an async function as a [`BoxedNext`] handler
pub fn handler_fn<F, Fut>(f: F) -> BoxedNext
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req: Request| Box::pin(f(req)) as BoxFuture)
}

/// Type-erasure helper so chains can hand back concrete filter types
pub trait AsAny: Any + Send + Sync {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared filter into a shared `Any`
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A unit in the request-processing chain
///
/// An adapter may return a response without calling `next` (short-circuit),
/// call `next` and transform what comes back, or pass straight through.
/// Adapters are shared between concurrent requests and must keep per-request
/// state inside the future they return.
pub trait FilterAdapter: AsAny {
    /// Handle a request, calling `next` to continue the chain
    fn handle(&self, req: Request, next: BoxedNext) -> BoxFuture;
}

/// A filter instance together with the name it was configured under
#[derive(Clone)]
pub struct NamedFilter {
    name: Arc<str>,
    filter: Arc<dyn FilterAdapter>,
}

impl NamedFilter {
    /// Pair a filter with its configured name
    pub fn new(name: impl Into<Arc<str>>, filter: Arc<dyn FilterAdapter>) -> Self {
        Self {
            name: name.into(),
            filter,
        }
    }

    /// Configured name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filter instance
    pub fn filter(&self) -> &Arc<dyn FilterAdapter> {
        &self.filter
    }
}

impl std::fmt::Debug for NamedFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NamedFilter").field(&self.name).finish()
    }
}

/// An ordered stack of filters
#[derive(Clone, Default, Debug)]
pub struct FilterChain {
    filters: Vec<NamedFilter>,
}

impl FilterChain {
    /// Create a new empty chain
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the chain
    ///
    /// Filters run in the order they are added (outermost first).
    pub fn push(&mut self, name: impl Into<Arc<str>>, filter: Arc<dyn FilterAdapter>) {
        self.filters.push(NamedFilter::new(name, filter));
    }

    /// Look up a filter by its configured name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn FilterAdapter>> {
        self.filters
            .iter()
            .find(|f| f.name() == name)
            .map(NamedFilter::filter)
    }

    /// Configured names, outermost first
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(NamedFilter::name).collect()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get the number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Compose the chain around `handler`, producing a single entry point
    ///
    /// The returned function can be called for any number of requests; the
    /// nesting is done once here rather than per request.
    pub fn into_service(&self, handler: BoxedNext) -> BoxedNext {
        // Build the chain from inside out
        let mut next = handler;

        for named in self.filters.iter().rev() {
            let filter = Arc::clone(named.filter());
            let inner = next;
            next = Arc::new(move |req: Request| filter.handle(req, Arc::clone(&inner)));
        }

        next
    }

    /// Execute the chain with a final handler
    pub fn execute(&self, req: Request, handler: BoxedNext) -> BoxFuture {
        if self.filters.is_empty() {
            return handler(req);
        }
        self.into_service(handler)(req)
    }
}
