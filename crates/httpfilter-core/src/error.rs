//! Error types for httpfilter

/// Result type alias for httpfilter operations
pub type Result<T, E = FilterError> = std::result::Result<T, E>;

/// Errors raised while building a filter chain or serving requests.
///
/// Every configuration problem surfaces at chain construction time; nothing in
/// this enum is produced on the per-request path.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The chain names a filter whose type has no registered constructor.
    #[error("filter `{name}` has unknown type `{filter_type}`")]
    UnknownFilterType {
        /// Filter name as written in the chain
        name: String,
        /// Type identifier that failed to resolve
        filter_type: String,
    },

    /// The same filter name appears twice in the chain.
    #[error("filter `{0}` appears more than once in the chain")]
    DuplicateFilter(String),

    /// A filter rejected its settings block.
    #[error("invalid settings for filter `{name}`: {reason}")]
    InvalidSettings {
        /// Filter name
        name: String,
        /// What was wrong
        reason: String,
    },

    /// A request could not be assembled from the given parts.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Socket level failure in the serving loop.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilterError {
    /// Shorthand for [`FilterError::InvalidSettings`]
    pub fn invalid_settings(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidSettings {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
