//! Method and path patterns used by logging rules

use http::Method;
use std::fmt;

/// Rule configuration that cannot be turned into a pattern
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// Method is neither `*` nor a standard HTTP method
    #[error("unknown HTTP method `{0}`")]
    UnknownMethod(String),

    /// Path pattern is malformed
    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPath {
        /// Pattern as configured
        pattern: String,
        /// What was wrong
        reason: &'static str,
    },
}

const STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::TRACE,
    Method::CONNECT,
];

/// Which requests a rule applies to by method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    /// Matches every method
    Any,
    /// Matches one method
    Exact(Method),
}

impl MethodPattern {
    /// Parse `*` (or an empty string) or a standard method name, ignoring case
    pub fn parse(raw: &str) -> Result<Self, RuleError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(MethodPattern::Any);
        }
        let upper = trimmed.to_ascii_uppercase();
        STANDARD_METHODS
            .iter()
            .find(|m| m.as_str() == upper)
            .map(|m| MethodPattern::Exact(m.clone()))
            .ok_or_else(|| RuleError::UnknownMethod(raw.to_string()))
    }

    /// Whether `method` is covered
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodPattern::Any => true,
            MethodPattern::Exact(m) => m == method,
        }
    }
}

impl fmt::Display for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodPattern::Any => f.write_str("*"),
            MethodPattern::Exact(m) => f.write_str(m.as_str()),
        }
    }
}

/// How strongly a path pattern matched, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathMatch {
    /// Wildcard pattern
    Any,
    /// `/prefix/*` pattern
    Prefix,
    /// Pattern with a placeholder segment standing in for an index name
    Scoped,
    /// Literal equality
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    Any,
    /// Stored with its trailing slash, e.g. `/_cluster/`
    Prefix(String),
    Template(Vec<Segment>),
    /// `scoped` is set for a single segment starting with `_`
    Literal { path: String, scoped: bool },
}

/// Which requests a rule applies to by path
///
/// * `*` or an empty pattern matches every path.
/// * `/_cluster/*` matches `/_cluster` and everything below it.
/// * `/{index}/_bulk` or `/*/_bulk` matches any single segment in place of the
///   placeholder.
/// * `/_bulk` matches itself exactly, and because it is a single segment
///   starting with `_` it also matches `/<index>/_bulk` as a scoped match.
/// * Longer literals such as `/_cluster/health` are global: they match only
///   themselves. Write `/{index}/_search/template` for a scoped multi-segment
///   path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    shape: Shape,
}

impl PathPattern {
    /// The wildcard pattern
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            shape: Shape::Any,
        }
    }

    /// Parse a configured pattern
    pub fn parse(raw: &str) -> Result<Self, RuleError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        let invalid = |reason| RuleError::InvalidPath {
            pattern: raw.to_string(),
            reason,
        };

        if !trimmed.starts_with('/') {
            return Err(invalid("must start with `/`"));
        }

        let (body, prefix) = match trimmed.strip_suffix("/*") {
            Some(head) => (head, true),
            None => (trimmed, false),
        };
        let normalized = normalize(body);

        let mut segments = Vec::new();
        for segment in normalized.split('/').skip(1).filter(|_| normalized != "/") {
            segments.push(parse_segment(segment).map_err(invalid)?);
        }

        let has_placeholder = segments.iter().any(|s| *s == Segment::Placeholder);
        let shape = if prefix {
            if has_placeholder {
                return Err(invalid("placeholders are not allowed in a prefix pattern"));
            }
            let mut stem = normalized.to_string();
            if !stem.ends_with('/') {
                stem.push('/');
            }
            Shape::Prefix(stem)
        } else if has_placeholder {
            Shape::Template(segments)
        } else {
            let scoped = matches!(segments.as_slice(), [Segment::Literal(s)] if s.starts_with('_'));
            Shape::Literal {
                path: normalized.to_string(),
                scoped,
            }
        };

        Ok(Self {
            raw: trimmed.to_string(),
            shape,
        })
    }

    /// Pattern as configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, reporting the strength of the match
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let path = normalize(path);
        match &self.shape {
            Shape::Any => Some(PathMatch::Any),
            Shape::Prefix(stem) => {
                let bare = stem.strip_suffix('/').unwrap_or(stem);
                (path.starts_with(stem.as_str()) || path == bare || stem == "/")
                    .then_some(PathMatch::Prefix)
            }
            Shape::Template(segments) => {
                let mut parts = path.split('/').skip(1);
                let matched = segments.iter().all(|segment| match (segment, parts.next()) {
                    (Segment::Placeholder, Some(part)) => !part.is_empty(),
                    (Segment::Literal(lit), Some(part)) => lit == part,
                    (_, None) => false,
                });
                (matched && parts.next().is_none()).then_some(PathMatch::Scoped)
            }
            Shape::Literal { path: literal, scoped } => {
                if path == literal.as_str() {
                    return Some(PathMatch::Exact);
                }
                if !scoped {
                    return None;
                }
                let rest = path.strip_prefix('/')?;
                let (index, tail) = rest.split_once('/')?;
                let is_index = !index.is_empty() && !index.starts_with('_');
                (is_index && literal.strip_prefix('/') == Some(tail)).then_some(PathMatch::Scoped)
            }
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(segment: &str) -> Result<Segment, &'static str> {
    if segment.is_empty() {
        return Err("empty path segment");
    }
    if segment == "*" {
        return Ok(Segment::Placeholder);
    }
    if let Some(inner) = segment.strip_prefix('{') {
        return match inner.strip_suffix('}') {
            Some(name) if !name.is_empty() && !name.contains(['{', '}']) => Ok(Segment::Placeholder),
            _ => Err("unbalanced or empty placeholder"),
        };
    }
    if segment.contains(['*', '{', '}']) {
        return Err("wildcards must span a whole segment");
    }
    Ok(Segment::Literal(segment.to_string()))
}

/// Strip trailing slashes, keeping a lone `/`
fn normalize(path: &str) -> &str {
    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() {
        "/"
    } else {
        stripped
    }
}
