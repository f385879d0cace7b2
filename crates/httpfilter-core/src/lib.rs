//! # httpfilter Core
//!
//! Core library providing the foundational types for httpfilter: the request
//! and response wrappers, the filter chain protocol, the registry that turns
//! configuration into filter instances, and the transport the host server
//! dispatches into.
//!
//! This crate is not meant to be used directly. Use `httpfilter` instead.

mod error;
pub mod filter;
mod request;
mod response;
mod server;
pub mod settings;
mod transport;

// Public API
pub use error::{FilterError, Result};
pub use filter::{
    handler_fn, BoxFuture, BoxedNext, FilterAdapter, FilterChain, FilterContext, FilterRegistry,
};
pub use request::Request;
pub use response::{
    json_response, ErrorDetail, IntoResponse, Rejection, Response, ResponseContext,
    CLIENT_CLOSED_REQUEST,
};
pub use server::{init_tracing, Server, DEFAULT_BODY_LIMIT};
pub use settings::{ChainSettings, FilterSettings};
pub use transport::FilterHttpServerTransport;
