//! Core types, configuration, and tracing setup for docstack.
//!
//! This crate provides the building blocks shared by the signing, model,
//! compiler, and client crates: process configuration read from the
//! environment, the AWS region newtype, and the core error type.

mod config;
mod error;
pub mod telemetry;
mod types;

pub use config::DocstackConfig;
pub use error::{DocstackError, DocstackResult};
pub use types::AwsRegion;
