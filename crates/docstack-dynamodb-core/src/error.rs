//! Structural errors raised while building requests.
//!
//! Malformed conditions are not errors: the compilers drop them. These variants
//! cover inputs no request can be built from.

/// Error building a request body.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A transaction mixes `get` entries with writes.
    #[error("a transaction cannot mix reads and writes")]
    MixedTransaction,

    /// An item lacks one of its table's key attributes.
    #[error("item for table {table} is missing key attribute {attribute}")]
    MissingKey {
        /// Table the item targets.
        table: String,
        /// The absent attribute.
        attribute: String,
    },

    /// A query compiled to an empty key condition.
    #[error("query on table {table} has no usable key condition")]
    MissingKeyCondition {
        /// Table being queried.
        table: String,
    },

    /// A textual operator, action, join or transaction op was not recognised.
    #[error("unknown {kind}: {name}")]
    Unknown {
        /// What was being parsed.
        kind: &'static str,
        /// The rejected input.
        name: String,
    },
}
