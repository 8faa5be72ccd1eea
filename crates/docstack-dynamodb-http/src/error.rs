//! Client error types.

use docstack_auth::SignError;
use docstack_dynamodb_core::CompileError;
use docstack_dynamodb_model::DynamoDBError;

/// Failure to exchange bytes with the endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response arrived in time.
    #[error("request timed out")]
    Timeout,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    /// Connection failures and timeouts are worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout)
    }
}

/// Errors returned by [`crate::DynamoDBClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured endpoint is not an absolute URI.
    #[error("invalid endpoint: {0:?}")]
    InvalidEndpoint(String),

    /// The request could not be signed.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// The request body could not be built.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The request never reached the service.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with an error.
    #[error(transparent)]
    Service(#[from] DynamoDBError),

    /// A transaction was cancelled. `reasons` has one slot per entry pushed
    /// to the builder; `None` marks an entry that did not fail.
    #[error("transaction cancelled: {source}")]
    TransactionCanceled {
        /// Failure code per caller entry.
        reasons: Vec<Option<String>>,
        /// The service error.
        #[source]
        source: DynamoDBError,
    },

    /// The request body could not be encoded or the response decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Every attempt failed with a retryable error.
    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        #[source]
        last: Box<ClientError>,
    },
}

impl ClientError {
    /// Whether sending the same request again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Service(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Per-entry reasons of a cancelled transaction.
    #[must_use]
    pub fn cancellation_reasons(&self) -> Option<&[Option<String>]> {
        match self {
            Self::TransactionCanceled { reasons, .. } => Some(reasons),
            _ => None,
        }
    }
}
