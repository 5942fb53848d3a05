use std::io;

/// Errors that can occur while resolving or discovering connector configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Path collision: '{path}' overlaps with '{conflict}'")]
    PathCollision { path: String, conflict: String },

    #[error("Invalid field path: '{0}'")]
    InvalidPath(String),

    #[error("Failed to evaluate '{field}': {message}")]
    SchemaEvaluation { field: String, message: String },

    #[error("Duplicate parameter id: '{0}'")]
    DuplicateParameter(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Discovery failed: {0}")]
    DiscoveryTransport(String),

    #[error("Discovery for '{connector}' timed out after {waited_ms}ms")]
    DiscoveryTimeout { connector: String, waited_ms: u64 },

    #[error("Discovery for '{0}' was cancelled")]
    DiscoveryCancelled(String),

    #[error("Poll misuse: {0}")]
    PollMisuse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    /// Whether a retry of the same operation could reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::DiscoveryTimeout { .. } | Error::DiscoveryCancelled(_)
        )
    }
}

/// Result type alias for connector-forms operations
pub type Result<T> = std::result::Result<T, Error>;
