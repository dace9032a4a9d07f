//! Error types for Guardpost

/// Result type alias using Guardpost's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Guardpost operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The classification model failed to load or run; no verdict is possible
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Classifier produced unusable output
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Alert store unreachable or a write/query was rejected
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Notification rendering or transport failed
    #[error("notification error: {0}")]
    Notification(String),

    /// Client-supplied detection timestamp could not be parsed
    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a new notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
