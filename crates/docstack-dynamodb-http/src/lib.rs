//! DynamoDB JSON client for docstack.
//!
//! This crate sends compiled request bodies over the `awsJson1_0` protocol:
//!
//! - **Transport**: the [`Transport`] trait is the seam to the network;
//!   [`HyperTransport`] covers plain-HTTP endpoints
//! - **Client**: [`DynamoDBClient`] sets `X-Amz-Target`, signs immediately
//!   before every attempt and decodes typed outputs
//! - **Retry**: [`RetryPolicy`] bounds attempts and backs off exponentially
//! - **Errors**: [`ClientError`] separates signing, transport, service and
//!   transaction-cancellation failures
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod retry;
pub mod transport;

pub use client::{DynamoDBClient, TransactOutput};
pub use error::{ClientError, TransportError};
pub use retry::RetryPolicy;
pub use transport::{HyperTransport, Transport};
