//! Request compilation for docstack's DynamoDB client.
//!
//! Turns native items and declarative condition trees into the bodies of
//! DynamoDB requests:
//!
//! - [`expression`]: placeholder tables and the condition, update and
//!   projection compilers.
//! - [`request`]: single-item, query and scan builders.
//! - [`transaction`]: transactional batches with cancellation-reason
//!   correlation.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod expression;
pub mod key;
pub mod request;
pub mod transaction;

pub use error::CompileError;
pub use expression::{
    Condition, ConditionOptions, ConditionTree, Join, Operator, PlaceholderTable, UpdateAction,
    UpdateOptions,
};
pub use key::{KeySchema, Target};
pub use request::{ItemOptions, QueryOptions, ScanOptions};
pub use transaction::{
    TransactEntry, TransactOp, TransactRequest, Transaction, TransactionBuilder,
};
