//! Registry of filter constructors keyed by type identifier

use super::chain::FilterAdapter;
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a constructor knows about the filter it is building
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Name the filter is configured under
    pub name: &'a str,
    /// Name of the node the chain runs on
    pub node_name: &'a str,
}

/// Builds a filter instance from its settings block
pub type FilterConstructor =
    Arc<dyn Fn(&FilterContext<'_>, &Value) -> Result<Arc<dyn FilterAdapter>> + Send + Sync>;

/// Constructors for every filter type a chain may reference.
///
/// Populated once at process start and read-only afterwards. Constructors that
/// need collaborators (a log sink, a clock) capture them when registered.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    constructors: HashMap<String, FilterConstructor>,
}

impl FilterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor under a type identifier.
    ///
    /// Registering the same identifier again replaces the earlier constructor.
    pub fn register<F>(&mut self, filter_type: impl Into<String>, constructor: F)
    where
        F: Fn(&FilterContext<'_>, &Value) -> Result<Arc<dyn FilterAdapter>> + Send + Sync + 'static,
    {
        let filter_type = filter_type.into();
        tracing::debug!(filter_type = %filter_type, "registered filter type");
        self.constructors.insert(filter_type, Arc::new(constructor));
    }

    /// Get a constructor by type identifier
    pub fn get(&self, filter_type: &str) -> Option<&FilterConstructor> {
        self.constructors.get(filter_type)
    }

    /// Whether a type identifier is known
    pub fn contains(&self, filter_type: &str) -> bool {
        self.constructors.contains_key(filter_type)
    }

    /// Registered type identifiers, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("types", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{BoxFuture, BoxedNext};
    use crate::request::Request;

    struct PassFilter;

    impl FilterAdapter for PassFilter {
        fn handle(&self, req: Request, next: BoxedNext) -> BoxFuture {
            next(req)
        }
    }

    fn pass_constructor(_: &FilterContext<'_>, _: &Value) -> Result<Arc<dyn FilterAdapter>> {
        Ok(Arc::new(PassFilter))
    }

    #[test]
    fn empty_registry() {
        let reg = FilterRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn register_and_get() {
        let mut reg = FilterRegistry::new();
        reg.register("pass", pass_constructor);
        assert_eq!(reg.len(), 1);
        assert!(reg.contains("pass"));

        let ctx = FilterContext {
            name: "pass",
            node_name: "node",
        };
        let ctor = reg.get("pass").unwrap();
        assert!(ctor(&ctx, &Value::Null).is_ok());
    }

    #[test]
    fn register_overwrite_keeps_one_entry() {
        let mut reg = FilterRegistry::new();
        reg.register("pass", pass_constructor);
        reg.register("pass", pass_constructor);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn list_is_sorted() {
        let mut reg = FilterRegistry::default();
        for name in ["timeout", "logging", "audit"] {
            reg.register(name, pass_constructor);
        }
        assert_eq!(reg.list(), vec!["audit", "logging", "timeout"]);
    }
}
