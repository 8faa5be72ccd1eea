//! Error types for SigV4 signing.

/// Errors that can occur while signing a request.
///
/// None of these are transient: a request that fails to sign must not be
/// retried with the same inputs.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// No access key or secret key is available.
    #[error("Missing credentials: access key and secret key are required for signing")]
    MissingCredentials,

    /// A header name or value cannot be represented in the canonical request.
    #[error("Invalid header for signing: {0}")]
    InvalidHeader(String),
}
