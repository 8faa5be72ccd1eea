//! AWS Signature Version 4 request signing for docstack.
//!
//! This crate implements the signing side of SigV4: given an outgoing HTTP
//! request, a set of credentials, and a timestamp, it stamps the date and
//! payload headers, builds the canonical request and string to sign, derives
//! the scoped signing key through the four-stage HMAC chain, and writes the
//! `Authorization` header.
//!
//! Derived keys are cached in a [`SigningKeyCache`] owned by the caller (one
//! per client), bounded to 25 entries with first-in-first-out eviction.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::{TimeZone, Utc};
//! use docstack_auth::{Credentials, SignableRequest, Signer, SigningKeyCache};
//!
//! let signer = Signer::new("us-east-1", "dynamodb", Arc::new(SigningKeyCache::new()));
//! let credentials = Credentials::new("AKIDEXAMPLE", "secret", None);
//! let mut headers = http::HeaderMap::new();
//!
//! let output = signer
//!     .sign(
//!         SignableRequest {
//!             method: "POST",
//!             host: "dynamodb.us-east-1.amazonaws.com",
//!             path: "/",
//!             body: b"{}",
//!             headers: &mut headers,
//!         },
//!         &credentials,
//!         Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
//!     )
//!     .unwrap();
//!
//! assert!(output.authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240102/"));
//! assert!(headers.contains_key(http::header::AUTHORIZATION));
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Bounded cache of derived signing keys
//! - [`canonical`] - Canonical request construction per the SigV4 specification
//! - [`credentials`] - Credentials and credential providers
//! - [`error`] - Signing error types
//! - [`sigv4`] - The signer itself

pub mod cache;
pub mod canonical;
pub mod credentials;
pub mod error;
pub mod sigv4;

pub use cache::SigningKeyCache;
pub use credentials::{
    CredentialProvider, Credentials, EnvCredentialProvider, StaticCredentialProvider,
};
pub use error::SignError;
pub use sigv4::{CredentialScope, SignableRequest, Signer, SigningOutput, hash_payload};
