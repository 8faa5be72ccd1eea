//! Configuration management for docstack clients.
//!
//! All configuration is driven by environment variables, using the standard
//! AWS variable names where one exists.

use std::env;

use crate::error::{DocstackError, DocstackResult};
use crate::types::AwsRegion;

/// Global configuration for a docstack client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocstackConfig {
    /// Region requests are signed for.
    pub default_region: AwsRegion,
    /// Endpoint override (local emulators, VPC endpoints). Derived from the
    /// region when unset.
    pub endpoint: Option<String>,
    /// Log level filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_base_delay_ms: u64,
    /// Capacity of the derived signing-key cache.
    pub signing_key_cache_capacity: usize,
}

impl Default for DocstackConfig {
    fn default() -> Self {
        Self {
            default_region: AwsRegion::default(),
            endpoint: None,
            log_level: "info".to_owned(),
            max_attempts: 3,
            retry_base_delay_ms: 50,
            signing_key_cache_capacity: 25,
        }
    }
}

impl DocstackConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`DocstackError::Config`] when a numeric variable cannot be parsed.
    pub fn from_env() -> DocstackResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("AWS_REGION").or_else(|_| env::var("AWS_DEFAULT_REGION")) {
            config.default_region = AwsRegion::new(v);
        }
        if let Ok(v) = env::var("DYNAMODB_ENDPOINT") {
            config.endpoint = Some(v);
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = env::var("DOCSTACK_MAX_ATTEMPTS") {
            config.max_attempts = parse_number("DOCSTACK_MAX_ATTEMPTS", &v)?;
        }
        if let Ok(v) = env::var("DOCSTACK_RETRY_BASE_DELAY_MS") {
            config.retry_base_delay_ms = parse_number("DOCSTACK_RETRY_BASE_DELAY_MS", &v)?;
        }

        tracing::debug!(
            region = %config.default_region,
            endpoint = %config.endpoint(),
            max_attempts = config.max_attempts,
            "loaded configuration from environment"
        );
        Ok(config)
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.default_region.dynamodb_endpoint())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> DocstackResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DocstackError::Config(format!("{key} must be a number, got {value:?}")))
}
