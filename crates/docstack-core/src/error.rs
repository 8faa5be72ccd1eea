//! Error types for the docstack core.

/// Core error type for docstack infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum DocstackError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for docstack operations.
pub type DocstackResult<T> = Result<T, DocstackError>;
