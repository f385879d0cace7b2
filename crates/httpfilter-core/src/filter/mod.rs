//! Filter chain infrastructure for httpfilter
//!
//! Filters are built from configuration through a [`FilterRegistry`] and
//! composed into a [`FilterChain`] that wraps the host's request handler.
//!
//! # Example
//!
//! ```rust,ignore
//! use httpfilter_core::filter::{BoxFuture, BoxedNext, FilterAdapter};
//! use httpfilter_core::Request;
//!
//! struct Passthrough;
//!
//! impl FilterAdapter for Passthrough {
//!     fn handle(&self, req: Request, next: BoxedNext) -> BoxFuture {
//!         next(req)
//!     }
//! }
//! ```

mod chain;
mod registry;

pub use chain::{
    handler_fn, AsAny, BoxFuture, BoxedNext, FilterAdapter, FilterChain, NamedFilter,
};
pub use registry::{FilterConstructor, FilterContext, FilterRegistry};
