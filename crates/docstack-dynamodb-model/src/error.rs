//! DynamoDB error types.
//!
//! DynamoDB errors use JSON format with a `__type` field containing the
//! fully-qualified error type name. This module turns such responses back into
//! a typed [`DynamoDBError`] and classifies them for the retry loop.

use std::fmt;
use std::sync::LazyLock;

use http::StatusCode;
use regex::Regex;
use serde::Deserialize;

static CANCELLATION_REASONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"reasons \[([^\]]*)\]").expect("valid regex"));

static THROTTLING_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)throttl|rate exceeded|too many requests|request limit exceeded")
        .expect("valid regex")
});

/// HTTP statuses that are always worth another attempt.
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Well-known DynamoDB error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DynamoDBErrorCode {
    /// Table not found.
    ResourceNotFoundException,
    /// Condition check failed.
    ConditionalCheckFailedException,
    /// Transaction canceled.
    TransactionCanceledException,
    /// Transaction conflict.
    TransactionConflictException,
    /// Transaction in progress.
    TransactionInProgressException,
    /// Idempotent parameter mismatch.
    IdempotentParameterMismatchException,
    /// Item collection size limit exceeded.
    ItemCollectionSizeLimitExceededException,
    /// Provisioned throughput exceeded.
    ProvisionedThroughputExceededException,
    /// Request limit exceeded.
    RequestLimitExceeded,
    /// Generic throttling.
    ThrottlingException,
    /// Validation error.
    ValidationException,
    /// Serialization error.
    SerializationException,
    /// Internal server error.
    InternalServerError,
    /// Service unavailable.
    ServiceUnavailable,
    /// Access denied.
    AccessDeniedException,
    /// Unknown or missing credentials.
    UnrecognizedClientException,
    /// The request signature did not match.
    InvalidSignatureException,
    /// A `__type` this crate does not model.
    #[default]
    Unknown,
}

impl DynamoDBErrorCode {
    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ConditionalCheckFailedException => "ConditionalCheckFailedException",
            Self::TransactionCanceledException => "TransactionCanceledException",
            Self::TransactionConflictException => "TransactionConflictException",
            Self::TransactionInProgressException => "TransactionInProgressException",
            Self::IdempotentParameterMismatchException => "IdempotentParameterMismatchException",
            Self::ItemCollectionSizeLimitExceededException => {
                "ItemCollectionSizeLimitExceededException"
            }
            Self::ProvisionedThroughputExceededException => {
                "ProvisionedThroughputExceededException"
            }
            Self::RequestLimitExceeded => "RequestLimitExceeded",
            Self::ThrottlingException => "ThrottlingException",
            Self::ValidationException => "ValidationException",
            Self::SerializationException => "SerializationException",
            Self::InternalServerError => "InternalServerError",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::AccessDeniedException => "AccessDeniedException",
            Self::UnrecognizedClientException => "UnrecognizedClientException",
            Self::InvalidSignatureException => "InvalidSignatureException",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a `__type` value. Both the bare name and the namespaced form
    /// (`com.amazonaws.dynamodb.v20120810#Name`) are accepted.
    #[must_use]
    pub fn from_type(error_type: &str) -> Self {
        let name = error_type.rsplit('#').next().unwrap_or(error_type);
        match name {
            "ResourceNotFoundException" => Self::ResourceNotFoundException,
            "ConditionalCheckFailedException" => Self::ConditionalCheckFailedException,
            "TransactionCanceledException" => Self::TransactionCanceledException,
            "TransactionConflictException" => Self::TransactionConflictException,
            "TransactionInProgressException" => Self::TransactionInProgressException,
            "IdempotentParameterMismatchException" => Self::IdempotentParameterMismatchException,
            "ItemCollectionSizeLimitExceededException" => {
                Self::ItemCollectionSizeLimitExceededException
            }
            "ProvisionedThroughputExceededException" => {
                Self::ProvisionedThroughputExceededException
            }
            "RequestLimitExceeded" => Self::RequestLimitExceeded,
            "ThrottlingException" => Self::ThrottlingException,
            "ValidationException" => Self::ValidationException,
            "SerializationException" => Self::SerializationException,
            "InternalServerError" | "InternalFailure" => Self::InternalServerError,
            "ServiceUnavailable" | "ServiceUnavailableException" => Self::ServiceUnavailable,
            "AccessDeniedException" => Self::AccessDeniedException,
            "UnrecognizedClientException" => Self::UnrecognizedClientException,
            "InvalidSignatureException" => Self::InvalidSignatureException,
            _ => Self::Unknown,
        }
    }

    /// Codes that signal throttling or a transient server fault.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProvisionedThroughputExceededException
                | Self::RequestLimitExceeded
                | Self::ThrottlingException
                | Self::InternalServerError
                | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for DynamoDBErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DynamoDB error response.
#[derive(Debug)]
pub struct DynamoDBError {
    /// The error code.
    pub code: DynamoDBErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code.
    pub status_code: StatusCode,
    /// Per-item reasons from a `CancellationReasons` array, when the response
    /// carried one.
    pub reasons: Vec<Option<String>>,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DynamoDBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamoDBError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for DynamoDBError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
    #[serde(rename = "CancellationReasons", default)]
    cancellation_reasons: Vec<CancellationReason>,
}

#[derive(Deserialize)]
struct CancellationReason {
    #[serde(rename = "Code", default)]
    code: Option<String>,
}

impl DynamoDBError {
    /// Create a new `DynamoDBError` with a custom message.
    #[must_use]
    pub fn with_message(
        code: DynamoDBErrorCode,
        status_code: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            status_code,
            reasons: Vec::new(),
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Parse a non-2xx response. Bodies that are not a JSON error envelope
    /// become [`DynamoDBErrorCode::Unknown`] with the raw body as message.
    #[must_use]
    pub fn from_response(status_code: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let reasons = envelope
                    .cancellation_reasons
                    .into_iter()
                    .map(|r| r.code.filter(|c| c != "None"))
                    .collect();
                Self {
                    code: DynamoDBErrorCode::from_type(&envelope.error_type),
                    message: envelope.message,
                    status_code,
                    reasons,
                    source: None,
                }
            }
            Err(e) => Self::with_message(
                DynamoDBErrorCode::Unknown,
                status_code,
                String::from_utf8_lossy(body).into_owned(),
            )
            .with_source(e),
        }
    }

    /// Whether the request may succeed if sent again. Only throttling and
    /// transient server faults qualify; a failed condition never does.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.code {
            DynamoDBErrorCode::ConditionalCheckFailedException
            | DynamoDBErrorCode::TransactionCanceledException => false,
            code if code.is_transient() => true,
            _ => {
                RETRYABLE_STATUSES.contains(&self.status_code.as_u16())
                    || THROTTLING_BODY.is_match(&self.message)
            }
        }
    }

    /// Per-item cancellation reasons, positionally aligned with the request's
    /// transact items. `None` marks an item that did not fail.
    #[must_use]
    pub fn cancellation_reasons(&self) -> Option<Vec<Option<String>>> {
        if !self.reasons.is_empty() {
            return Some(self.reasons.clone());
        }
        parse_cancellation_reasons(&self.message)
    }
}

/// Parse the `reasons [A, None, B]` list embedded in a cancellation message.
#[must_use]
pub fn parse_cancellation_reasons(message: &str) -> Option<Vec<Option<String>>> {
    let captures = CANCELLATION_REASONS.captures(message)?;
    let list = captures.get(1)?.as_str();
    Some(
        list.split(',')
            .map(str::trim)
            .map(|code| match code {
                "" | "None" => None,
                other => Some(other.to_owned()),
            })
            .collect(),
    )
}
