//! Error types for ViralScope

/// Result type alias using ViralScope's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ViralScope operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request input, surfaced to the caller as-is
    #[error("validation error: {0}")]
    Validation(String),

    /// No prediction facade has been constructed yet
    #[error("prediction service is not ready")]
    ServiceNotReady,

    /// No classifier is loaded; callers fall back to formula scoring
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Requested artifact version does not exist in the archive
    #[error("artifact not found: {version}")]
    ArtifactNotFound { version: String },

    /// Some items of a batch failed while the rest completed
    #[error("{failed} of {total} batch items failed")]
    PartialBatchFailure { failed: usize, total: usize },

    /// Classifier execution errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Model store errors (promotion gate, layout problems)
    #[error("model store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// File system errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new artifact-not-found error
    pub fn artifact_not_found(version: impl Into<String>) -> Self {
        Self::ArtifactNotFound {
            version: version.into(),
        }
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new model store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error is the caller's fault rather than a service fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::ArtifactNotFound { .. })
    }
}
