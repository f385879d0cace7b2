//! Ordered logging rules and most-specific-wins resolution

use super::level::LoggingLevel;
use super::pattern::{MethodPattern, PathMatch, PathPattern};
use http::Method;
use std::collections::HashMap;

/// One configured mapping from (method, path) to a logging level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Method the rule applies to
    pub method: MethodPattern,
    /// Path the rule applies to
    pub path: PathPattern,
    /// Level used when the rule wins
    pub level: LoggingLevel,
}

impl Rule {
    /// Create a rule
    pub fn new(method: MethodPattern, path: PathPattern, level: LoggingLevel) -> Self {
        Self {
            method,
            path,
            level,
        }
    }

    /// The catch-all rule every table ends with
    pub fn fallback(level: LoggingLevel) -> Self {
        Self::new(MethodPattern::Any, PathPattern::any(), level)
    }
}

/// Immutable rule set, indexed by method.
///
/// Rules keep their declaration order; the default rule is always last.
/// Rules bound to a concrete method live in a per-method index, wildcard
/// method rules in a separate one, so a lookup only visits candidates.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
    by_method: HashMap<Method, Vec<usize>>,
    any_method: Vec<usize>,
}

impl RuleTable {
    /// Build a table from declared rules plus the default level
    pub fn new(declared: impl IntoIterator<Item = Rule>, default: LoggingLevel) -> Self {
        let mut rules: Vec<Rule> = declared.into_iter().collect();
        rules.push(Rule::fallback(default));

        let mut by_method: HashMap<Method, Vec<usize>> = HashMap::new();
        let mut any_method = Vec::new();
        for (position, rule) in rules.iter().enumerate() {
            match &rule.method {
                MethodPattern::Exact(method) => by_method.entry(method.clone()).or_default().push(position),
                MethodPattern::Any => any_method.push(position),
            }
        }

        Self {
            rules,
            by_method,
            any_method,
        }
    }

    /// Level of the most specific rule matching `method` and `path`.
    ///
    /// A rule bound to the request's method always beats a wildcard method
    /// rule; within each group the stronger path match wins and declaration
    /// order breaks ties. Returns [`LoggingLevel::OFF`] if nothing matches.
    pub fn resolve(&self, method: &Method, path: &str) -> LoggingLevel {
        self.by_method
            .get(method)
            .and_then(|candidates| self.best_of(candidates, path))
            .or_else(|| self.best_of(&self.any_method, path))
            .map(|rule| rule.level)
            .unwrap_or(LoggingLevel::OFF)
    }

    fn best_of(&self, candidates: &[usize], path: &str) -> Option<&Rule> {
        let mut best: Option<(PathMatch, &Rule)> = None;
        for &position in candidates {
            let rule = &self.rules[position];
            let Some(strength) = rule.path.matches(path) else {
                continue;
            };
            // Candidates are in declaration order, so only a strictly stronger
            // match replaces the current best.
            if best.map_or(true, |(current, _)| strength > current) {
                best = Some((strength, rule));
            }
        }
        best.map(|(_, rule)| rule)
    }

    /// All rules in declaration order, default last
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The default rule's level
    pub fn default_level(&self) -> LoggingLevel {
        self.rules
            .last()
            .map(|rule| rule.level)
            .unwrap_or(LoggingLevel::OFF)
    }

    /// Number of rules, default included
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always false: the default rule is always present
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
