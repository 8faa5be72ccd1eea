//! Compilation of declarative conditions and updates into DynamoDB's textual
//! expression language.
//!
//! Every compiler writes into a [`PlaceholderTable`] owned by the request being
//! built:
//!
//! 1. **Placeholders**: attribute names that are reserved or not plain
//!    identifiers become `#nN`, values become `:vN`.
//! 2. **Conditions**: condition, filter and key-condition expressions from a
//!    [`ConditionTree`].
//! 3. **Updates**: `SET`/`REMOVE`/`ADD`/`DELETE` from an item and per-field
//!    actions.
//! 4. **Projections**: attribute path lists.

pub mod condition;
pub mod placeholder;
pub mod projection;
pub mod reserved;
pub mod update;

pub use condition::{
    Condition, ConditionNode, ConditionOptions, ConditionTree, Join, Operator, compile_condition,
    compile_key_condition,
};
pub use placeholder::PlaceholderTable;
pub use projection::compile_projection;
pub use update::{UpdateAction, UpdateOptions, compile_update};
