//! Resolved configuration model for a filter chain
//!
//! Hosts parse their settings files however they like and hand over a
//! [`ChainSettings`] snapshot. The snapshot is never mutated by the chain;
//! reloading means building a new one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Node name used when the settings do not carry one
pub const DEFAULT_NODE_NAME: &str = "node";

fn default_node_name() -> String {
    DEFAULT_NODE_NAME.to_string()
}

/// Chain composition and per-filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Name of the node, stamped on every request
    #[serde(default = "default_node_name")]
    pub node_name: String,
    /// Filter names in execution order, outermost first
    #[serde(default)]
    pub chain: Vec<String>,
    /// Settings blocks keyed by filter name
    #[serde(default)]
    pub filters: HashMap<String, FilterSettings>,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            chain: Vec::new(),
            filters: HashMap::new(),
        }
    }
}

impl ChainSettings {
    /// Empty chain for the given node
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            ..Self::default()
        }
    }

    /// Append a filter to the chain; its type defaults to its name
    pub fn filter(mut self, name: impl Into<String>) -> Self {
        self.chain.push(name.into());
        self
    }

    /// Append a filter to the chain together with its settings block
    pub fn filter_with(mut self, name: impl Into<String>, settings: FilterSettings) -> Self {
        let name = name.into();
        self.filters.insert(name.clone(), settings);
        self.chain.push(name);
        self
    }

    /// Deserialize from an already-parsed settings tree
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Type identifier for a chain entry
    pub fn filter_type<'a>(&'a self, name: &'a str) -> &'a str {
        self.filters
            .get(name)
            .and_then(|s| s.filter_type.as_deref())
            .unwrap_or(name)
    }

    /// Options block for a chain entry, `{}` when absent
    pub fn options(&self, name: &str) -> Value {
        self.filters
            .get(name)
            .map(|s| Value::Object(s.options.clone()))
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Settings block for one named filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Registered type identifier; the filter name is used when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    /// Filter specific options
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl FilterSettings {
    /// Settings block with an explicit type
    pub fn of_type(filter_type: impl Into<String>) -> Self {
        Self {
            filter_type: Some(filter_type.into()),
            options: Map::new(),
        }
    }

    /// Set one option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
