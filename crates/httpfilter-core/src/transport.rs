//! The filtering server transport
//!
//! [`FilterHttpServerTransport`] is the object the host's request dispatch
//! calls into. It owns the configured chain wrapped around the host handler
//! and keeps the composition behind an atomic pointer so a reload swaps the
//! whole chain at once.

use crate::error::{FilterError, Result};
use crate::filter::{
    AsAny, BoxFuture, BoxedNext, FilterAdapter, FilterChain, FilterContext, FilterRegistry,
};
use crate::request::Request;
use crate::response::{IntoResponse, Rejection, Response};
use crate::settings::ChainSettings;
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one chain generation needs; replaced wholesale on reload
struct ChainState {
    node: Arc<str>,
    chain: FilterChain,
    entry: BoxedNext,
}

/// Outermost adapter between the host server and its request handler
pub struct FilterHttpServerTransport {
    state: ArcSwap<ChainState>,
    handler: BoxedNext,
}

impl FilterHttpServerTransport {
    /// Build the chain described by `settings` around `handler`.
    ///
    /// # Errors
    ///
    /// Fails when a chain entry names an unregistered filter type, appears
    /// twice, or its constructor rejects the settings block. Nothing is served
    /// with a partially built chain.
    pub fn new(settings: &ChainSettings, registry: &FilterRegistry, handler: BoxedNext) -> Result<Self> {
        let state = build_state(settings, registry, &handler)?;
        Ok(Self {
            state: ArcSwap::new(Arc::new(state)),
            handler,
        })
    }

    /// Run a request through the chain and the handler
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let state = self.state.load_full();
        req.set_node_name(Arc::clone(&state.node));
        (state.entry)(req).await
    }

    /// Look up an active filter by its configured name
    pub fn filter(&self, name: &str) -> Option<Arc<dyn FilterAdapter>> {
        self.state.load().chain.get(name).cloned()
    }

    /// Look up an active filter and downcast it to its concrete type
    pub fn filter_as<T: FilterAdapter>(&self, name: &str) -> Option<Arc<T>> {
        let filter = self.filter(name)?;
        AsAny::into_any_arc(filter).downcast::<T>().ok()
    }

    /// Configured filter names, outermost first
    pub fn filter_names(&self) -> Vec<String> {
        self.state
            .load()
            .chain
            .names()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Name of the node requests are stamped with
    pub fn node_name(&self) -> Arc<str> {
        Arc::clone(&self.state.load().node)
    }

    /// Rebuild the chain from new settings and swap it in atomically.
    ///
    /// Requests already in flight finish on the chain they started with. On
    /// error the current chain stays active.
    pub fn reload(&self, settings: &ChainSettings, registry: &FilterRegistry) -> Result<()> {
        let state = build_state(settings, registry, &self.handler)?;
        self.state.store(Arc::new(state));
        info!(node = %settings.node_name, "filter chain reloaded");
        Ok(())
    }
}

impl std::fmt::Debug for FilterHttpServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("FilterHttpServerTransport")
            .field("node", &state.node)
            .field("chain", &state.chain.names())
            .finish()
    }
}

fn build_state(settings: &ChainSettings, registry: &FilterRegistry, handler: &BoxedNext) -> Result<ChainState> {
    let mut chain = FilterChain::new();
    let mut seen = HashSet::new();

    for name in &settings.chain {
        if !seen.insert(name.as_str()) {
            return Err(FilterError::DuplicateFilter(name.clone()));
        }

        let filter_type = settings.filter_type(name);
        let constructor = registry
            .get(filter_type)
            .ok_or_else(|| FilterError::UnknownFilterType {
                name: name.clone(),
                filter_type: filter_type.to_string(),
            })?;

        let ctx = FilterContext {
            name,
            node_name: &settings.node_name,
        };
        let filter = constructor(&ctx, &settings.options(name))?;
        debug!(filter = %name, filter_type = %filter_type, "filter constructed");
        chain.push(name.as_str(), filter);
    }

    for name in settings.filters.keys() {
        if !seen.contains(name.as_str()) {
            warn!(filter = %name, "settings block for a filter that is not in the chain");
        }
    }

    info!(node = %settings.node_name, chain = ?chain.names(), "filter chain built");

    let entry = chain.into_service(answer_rejections(Arc::clone(handler)));
    Ok(ChainState {
        node: Arc::from(settings.node_name.as_str()),
        chain,
        entry,
    })
}

/// Innermost step: requests carrying a [`Rejection`] get it as their response
/// and never reach the handler
fn answer_rejections(handler: BoxedNext) -> BoxedNext {
    Arc::new(move |req: Request| -> BoxFuture {
        match req.extensions().get::<Rejection>() {
            Some(rejection) => {
                let response = rejection.clone().into_response();
                Box::pin(std::future::ready(response))
            }
            None => handler(req),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{handler_fn, BoxFuture};
    use crate::response::IntoResponse;
    use crate::settings::FilterSettings;
    use http::{HeaderValue, Method, StatusCode};
    use serde_json::Value;

    /// Appends its tag to the `x-trail` response header
    struct TagFilter {
        tag: String,
    }

    impl FilterAdapter for TagFilter {
        fn handle(&self, req: Request, next: BoxedNext) -> BoxFuture {
            let tag = self.tag.clone();
            Box::pin(async move {
                let mut response = next(req).await;
                let trail = match response.headers().get("x-trail") {
                    Some(existing) => format!("{},{}", existing.to_str().unwrap_or(""), tag),
                    None => tag,
                };
                if let Ok(value) = HeaderValue::from_str(&trail) {
                    response.headers_mut().insert("x-trail", value);
                }
                response
            })
        }
    }

    fn registry() -> FilterRegistry {
        let mut registry = FilterRegistry::new();
        registry.register("tag", |ctx: &FilterContext<'_>, options: &Value| {
            let tag = options
                .get("tag")
                .and_then(Value::as_str)
                .unwrap_or(ctx.name)
                .to_string();
            Ok(Arc::new(TagFilter { tag }) as Arc<dyn FilterAdapter>)
        });
        registry.register("strict", |ctx: &FilterContext<'_>, _: &Value| {
            Err(FilterError::invalid_settings(ctx.name, "always rejects"))
        });
        registry
    }

    fn echo_node_handler() -> BoxedNext {
        handler_fn(|req: Request| async move {
            req.node_name().unwrap_or("none").to_string().into_response()
        })
    }

    fn tag_settings() -> ChainSettings {
        ChainSettings::new("server1")
            .filter_with("outer", FilterSettings::of_type("tag"))
            .filter_with("inner", FilterSettings::of_type("tag"))
    }

    #[tokio::test]
    async fn dispatch_runs_chain_in_order_and_stamps_node() {
        let transport =
            FilterHttpServerTransport::new(&tag_settings(), &registry(), echo_node_handler()).unwrap();

        let response = transport
            .dispatch(Request::build(Method::GET, "/_cluster/health", "").unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        // Responses travel back innermost first
        assert_eq!(response.headers().get("x-trail").unwrap(), "inner,outer");
        assert_eq!(transport.filter_names(), vec!["outer", "inner"]);
        assert_eq!(&*transport.node_name(), "server1");
    }

    #[tokio::test]
    async fn rejected_requests_pass_the_chain_but_skip_the_handler() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counted = {
            let calls = calls.clone();
            handler_fn(move |_req: Request| {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { "handled".into_response() }
            })
        };
        let transport = FilterHttpServerTransport::new(&tag_settings(), &registry(), counted).unwrap();

        let mut req = Request::build(Method::POST, "/idx/_bulk", "").unwrap();
        req.extensions_mut().insert(Rejection::payload_too_large(16));
        let response = transport.dispatch(req).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers().get("x-trail").unwrap(), "inner,outer");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_filter_type_refuses_to_start() {
        let settings = ChainSettings::new("server1").filter("audit");
        let err = FilterHttpServerTransport::new(&settings, &registry(), echo_node_handler()).unwrap_err();
        assert!(matches!(
            err,
            FilterError::UnknownFilterType { ref name, ref filter_type } if name == "audit" && filter_type == "audit"
        ));
    }

    #[test]
    fn duplicate_chain_entry_refuses_to_start() {
        let settings = ChainSettings::new("server1")
            .filter_with("t", FilterSettings::of_type("tag"))
            .filter("t");
        let err = FilterHttpServerTransport::new(&settings, &registry(), echo_node_handler()).unwrap_err();
        assert!(matches!(err, FilterError::DuplicateFilter(ref name) if name == "t"));
    }

    #[test]
    fn constructor_errors_propagate() {
        let settings = ChainSettings::new("server1").filter("strict");
        let err = FilterHttpServerTransport::new(&settings, &registry(), echo_node_handler()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidSettings { .. }));
    }

    #[test]
    fn filter_lookup_downcasts() {
        let transport =
            FilterHttpServerTransport::new(&tag_settings(), &registry(), echo_node_handler()).unwrap();

        let inner = transport.filter_as::<TagFilter>("inner").unwrap();
        assert_eq!(inner.tag, "inner");
        assert!(transport.filter("missing").is_none());
        assert!(transport.filter_as::<TagFilter>("missing").is_none());
    }

    #[tokio::test]
    async fn reload_swaps_chain_and_keeps_old_one_on_error() {
        let transport =
            FilterHttpServerTransport::new(&tag_settings(), &registry(), echo_node_handler()).unwrap();

        let bad = ChainSettings::new("server2").filter("audit");
        assert!(transport.reload(&bad, &registry()).is_err());
        assert_eq!(transport.filter_names(), vec!["outer", "inner"]);

        let good = ChainSettings::new("server2").filter_with(
            "only",
            FilterSettings::of_type("tag").option("tag", "solo"),
        );
        transport.reload(&good, &registry()).unwrap();

        let response = transport
            .dispatch(Request::build(Method::GET, "/", "").unwrap())
            .await;
        assert_eq!(response.headers().get("x-trail").unwrap(), "solo");
        assert_eq!(transport.filter_names(), vec!["only"]);
        assert_eq!(&*transport.node_name(), "server2");
    }
}
