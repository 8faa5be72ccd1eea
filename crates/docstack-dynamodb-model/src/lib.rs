//! DynamoDB model types for docstack.
//!
//! Hand-written serde types for the DynamoDB JSON protocol, the native
//! [`Value`] type callers build items and conditions from, and the [`codec`]
//! that converts between the two.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod codec;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;
pub mod value;

pub use attribute_value::{AttributeMap, AttributeValue};
pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::DynamoDBOperation;
pub use value::{Item, Value};
