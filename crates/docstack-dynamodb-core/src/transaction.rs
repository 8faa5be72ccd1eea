//! Transactional batches.
//!
//! A [`TransactionBuilder`] collects entries in caller order and compiles each
//! with the single-item builders. Entries that compile to nothing and entries
//! with an unknown op are left out of the request, so the builder records, for
//! every request position, the caller index it came from. Cancellation reasons
//! reported by the store are positional over the request and are mapped back
//! through that table.

use std::str::FromStr;

use docstack_dynamodb_model::error::parse_cancellation_reasons;
use docstack_dynamodb_model::input::{
    ConditionCheck, Delete, Get, Put, TransactGetItem, TransactGetItemsInput, TransactWriteItem,
    TransactWriteItemsInput, Update,
};
use docstack_dynamodb_model::types::ReturnValuesOnConditionCheckFailure;
use docstack_dynamodb_model::{Item, Value};
use tracing::debug;

use crate::error::CompileError;
use crate::expression::{PlaceholderTable, compile_condition};
use crate::key::Target;
use crate::request::{
    ItemOptions, add_item, delete_item, get_item, incr_item, put_item, update_item,
};

/// Attribute set on a caller item whose transact entry failed.
pub const ERROR_CODE_FIELD: &str = "errorCode";

/// Kind of a transaction entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactOp {
    /// Read an item.
    Get,
    /// Evaluate a condition without writing.
    Check,
    /// Update whose fields increment by default.
    Incr,
    /// Update existing attributes.
    Update,
    /// Put that requires the item to be new.
    Add,
    /// Put that replaces the item.
    Put,
    /// Delete the item.
    Delete,
}

impl TransactOp {
    /// Returns `true` for reads.
    #[must_use]
    pub fn is_read(self) -> bool {
        matches!(self, Self::Get)
    }
}

impl FromStr for TransactOp {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "get" => Self::Get,
            "check" => Self::Check,
            "incr" => Self::Incr,
            "update" => Self::Update,
            "add" => Self::Add,
            "put" => Self::Put,
            "del" | "delete" => Self::Delete,
            other => {
                return Err(CompileError::Unknown {
                    kind: "transaction op",
                    name: other.to_owned(),
                });
            }
        };
        Ok(op)
    }
}

/// One entry of a transaction.
#[derive(Debug, Clone)]
pub struct TransactEntry {
    /// What to do.
    pub op: TransactOp,
    /// Table and key schema.
    pub target: Target,
    /// The item, or at least its key for `get`, `check` and `del`.
    pub item: Item,
    /// Condition, update actions and return values.
    pub options: ItemOptions,
}

impl TransactEntry {
    /// An entry with default options.
    #[must_use]
    pub fn new(op: TransactOp, target: Target, item: Item) -> Self {
        Self {
            op,
            target,
            item,
            options: ItemOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: ItemOptions) -> Self {
        self.options = options;
        self
    }
}

/// The body of a compiled transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactRequest {
    /// `TransactWriteItems`.
    Write(TransactWriteItemsInput),
    /// `TransactGetItems`.
    Get(TransactGetItemsInput),
}

/// A compiled transaction and its position table.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Request body.
    pub request: TransactRequest,
    positions: Vec<usize>,
    entry_count: usize,
}

impl Transaction {
    /// Caller index of every request position.
    #[must_use]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of entries pushed to the builder, dropped ones included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Map request-ordered reasons onto caller indices. The result has one slot
    /// per pushed entry; entries that were dropped or did not fail are `None`.
    #[must_use]
    pub fn correlate(&self, reasons: &[Option<String>]) -> Vec<Option<String>> {
        let mut correlated = vec![None; self.entry_count];
        for (reason, &index) in reasons.iter().zip(&self.positions) {
            if let Some(code) = reason {
                correlated[index] = Some(code.clone());
            }
        }
        correlated
    }

    /// [`Transaction::correlate`] over the `reasons [..]` list of a
    /// cancellation message. `None` when the message carries no list.
    #[must_use]
    pub fn correlate_message(&self, message: &str) -> Option<Vec<Option<String>>> {
        parse_cancellation_reasons(message).map(|reasons| self.correlate(&reasons))
    }

    /// Set [`ERROR_CODE_FIELD`] on every caller item whose entry failed.
    /// `items` is the caller's list in push order.
    pub fn annotate(&self, items: &mut [Item], reasons: &[Option<String>]) {
        for (item, reason) in items.iter_mut().zip(self.correlate(reasons)) {
            if let Some(code) = reason {
                item.insert(ERROR_CODE_FIELD.to_owned(), Value::String(code));
            }
        }
    }
}

/// Collects entries and compiles them into one atomic request.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    entries: Vec<(usize, TransactEntry)>,
    pushed: usize,
    client_request_token: Option<String>,
}

impl TransactionBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotency token sent with a write transaction.
    #[must_use]
    pub fn with_client_request_token(mut self, token: impl Into<String>) -> Self {
        self.client_request_token = Some(token.into());
        self
    }

    /// Append an entry.
    pub fn push(&mut self, entry: TransactEntry) -> &mut Self {
        self.entries.push((self.pushed, entry));
        self.pushed += 1;
        self
    }

    /// Append an entry named by a textual op. An unknown op still takes a
    /// caller index but is left out of the request. Returns whether the entry
    /// was kept.
    pub fn push_raw(&mut self, op: &str, target: Target, item: Item, options: ItemOptions) -> bool {
        match op.parse::<TransactOp>() {
            Ok(op) => {
                self.push(TransactEntry::new(op, target, item).with_options(options));
                true
            }
            Err(_) => {
                debug!(op, index = self.pushed, "dropping transaction entry with unknown op");
                self.pushed += 1;
                false
            }
        }
    }

    /// Number of entries pushed, dropped ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pushed
    }

    /// Returns `true` if nothing was pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pushed == 0
    }

    /// Compile every entry. `Ok(None)` when no entry produced a request.
    ///
    /// # Errors
    ///
    /// [`CompileError::MixedTransaction`] when reads and writes are mixed and
    /// [`CompileError::MissingKey`] when an entry lacks its key.
    pub fn build(&self) -> Result<Option<Transaction>, CompileError> {
        let reads = self.entries.iter().filter(|(_, e)| e.op.is_read()).count();
        if reads > 0 && reads < self.entries.len() {
            return Err(CompileError::MixedTransaction);
        }
        if self.entries.is_empty() {
            return Ok(None);
        }

        let mut positions = Vec::with_capacity(self.entries.len());
        let request = if reads > 0 {
            let mut transact_items = Vec::with_capacity(self.entries.len());
            for (index, entry) in &self.entries {
                let input = get_item(&entry.target, &entry.item, &entry.options)?;
                transact_items.push(TransactGetItem {
                    get: Get {
                        table_name: input.table_name,
                        key: input.key,
                        projection_expression: input.projection_expression,
                        expression_attribute_names: input.expression_attribute_names,
                    },
                });
                positions.push(*index);
            }
            TransactRequest::Get(TransactGetItemsInput {
                transact_items,
                ..TransactGetItemsInput::default()
            })
        } else {
            let mut transact_items = Vec::with_capacity(self.entries.len());
            for (index, entry) in &self.entries {
                match compile_write(entry)? {
                    Some(item) => {
                        transact_items.push(item);
                        positions.push(*index);
                    }
                    None => debug!(
                        index,
                        table = %entry.target.table,
                        op = ?entry.op,
                        "dropping transaction entry that compiles to nothing"
                    ),
                }
            }
            if transact_items.is_empty() {
                return Ok(None);
            }
            TransactRequest::Write(TransactWriteItemsInput {
                transact_items,
                client_request_token: self.client_request_token.clone(),
                ..TransactWriteItemsInput::default()
            })
        };

        Ok(Some(Transaction {
            request,
            positions,
            entry_count: self.pushed,
        }))
    }
}

fn compile_write(entry: &TransactEntry) -> Result<Option<TransactWriteItem>, CompileError> {
    let TransactEntry {
        op,
        target,
        item,
        options,
    } = entry;
    let on_failure = options
        .return_values
        .and_then(|r| r.on_condition_check_failure());

    let compiled = match op {
        TransactOp::Get => return Ok(None),
        TransactOp::Check => check(target, item, options, on_failure)?,
        TransactOp::Put | TransactOp::Add => {
            let input = if *op == TransactOp::Add {
                add_item(target, item, options)?
            } else {
                put_item(target, item, options)?
            };
            Some(TransactWriteItem::Put(Put {
                table_name: input.table_name,
                item: input.item,
                condition_expression: input.condition_expression,
                expression_attribute_names: input.expression_attribute_names,
                expression_attribute_values: input.expression_attribute_values,
                return_values_on_condition_check_failure: on_failure,
            }))
        }
        TransactOp::Update | TransactOp::Incr => {
            let input = if *op == TransactOp::Incr {
                incr_item(target, item, options)?
            } else {
                update_item(target, item, options)?
            };
            input.and_then(|input| {
                Some(TransactWriteItem::Update(Update {
                    table_name: input.table_name,
                    key: input.key,
                    update_expression: input.update_expression?,
                    condition_expression: input.condition_expression,
                    expression_attribute_names: input.expression_attribute_names,
                    expression_attribute_values: input.expression_attribute_values,
                    return_values_on_condition_check_failure: on_failure,
                }))
            })
        }
        TransactOp::Delete => {
            let input = delete_item(target, item, options)?;
            Some(TransactWriteItem::Delete(Delete {
                table_name: input.table_name,
                key: input.key,
                condition_expression: input.condition_expression,
                expression_attribute_names: input.expression_attribute_names,
                expression_attribute_values: input.expression_attribute_values,
                return_values_on_condition_check_failure: on_failure,
            }))
        }
    };
    Ok(compiled)
}

/// A check without a condition has nothing to check and is dropped.
fn check(
    target: &Target,
    item: &Item,
    options: &ItemOptions,
    on_failure: Option<ReturnValuesOnConditionCheckFailure>,
) -> Result<Option<TransactWriteItem>, CompileError> {
    let key = target.key(item)?;
    let mut table = PlaceholderTable::new();
    let Some(condition) = compile_condition(&options.condition, &options.condition_options, &mut table)
    else {
        return Ok(None);
    };
    let (names, values) = table.into_parts();
    Ok(Some(TransactWriteItem::ConditionCheck(ConditionCheck {
        table_name: target.table.clone(),
        key,
        condition_expression: condition,
        expression_attribute_names: names,
        expression_attribute_values: values,
        return_values_on_condition_check_failure: on_failure,
    })))
}

#[cfg(test)]
mod tests {
    use docstack_dynamodb_model::types::ReturnValue;

    use super::*;
    use crate::expression::{ConditionTree, Operator};
    use crate::key::KeySchema;

    fn users() -> Target {
        Target::new("users", KeySchema::new("pk"))
    }

    fn keyed(pk: &str) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_owned(), Value::from(pk));
        item
    }

    fn with_field(pk: &str, field: &str, value: impl Into<Value>) -> Item {
        let mut item = keyed(pk);
        item.insert(field.to_owned(), value.into());
        item
    }

    fn write_items(tx: &Transaction) -> &[TransactWriteItem] {
        match &tx.request {
            TransactRequest::Write(input) => &input.transact_items,
            TransactRequest::Get(_) => panic!("expected a write transaction"),
        }
    }

    #[test]
    fn test_should_compile_each_write_op() {
        let mut builder = TransactionBuilder::new();
        builder
            .push(TransactEntry::new(TransactOp::Put, users(), keyed("a")))
            .push(TransactEntry::new(TransactOp::Add, users(), keyed("b")))
            .push(TransactEntry::new(
                TransactOp::Update,
                users(),
                with_field("c", "age", 3),
            ))
            .push(TransactEntry::new(
                TransactOp::Incr,
                users(),
                with_field("d", "visits", 1),
            ))
            .push(TransactEntry::new(TransactOp::Delete, users(), keyed("e")))
            .push(
                TransactEntry::new(TransactOp::Check, users(), keyed("f")).with_options(
                    ItemOptions {
                        condition: ConditionTree::new().op("age", Operator::Gt, 18),
                        ..ItemOptions::default()
                    },
                ),
            );
        let tx = builder.build().unwrap().unwrap();
        let items = write_items(&tx);
        assert_eq!(items.len(), 6);
        assert!(matches!(items[0], TransactWriteItem::Put(ref p) if p.condition_expression.is_none()));
        assert!(matches!(
            items[1],
            TransactWriteItem::Put(ref p)
                if p.condition_expression.as_deref() == Some("attribute_not_exists(pk)")
        ));
        assert!(matches!(
            items[2],
            TransactWriteItem::Update(ref u)
                if u.update_expression == "SET age = :v0"
                    && u.condition_expression.as_deref() == Some("attribute_exists(pk)")
        ));
        assert!(matches!(
            items[3],
            TransactWriteItem::Update(ref u)
                if u.update_expression == "SET visits = if_not_exists(visits, :v0) + :v1"
        ));
        assert!(matches!(items[4], TransactWriteItem::Delete(_)));
        assert!(matches!(
            items[5],
            TransactWriteItem::ConditionCheck(ref c) if c.condition_expression == "age > :v0"
        ));
        assert_eq!(tx.positions(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_should_rewrite_return_values_for_transactions() {
        let mut builder = TransactionBuilder::new();
        builder.push(
            TransactEntry::new(TransactOp::Put, users(), keyed("a")).with_options(ItemOptions {
                return_values: Some(ReturnValue::AllNew),
                ..ItemOptions::default()
            }),
        );
        let tx = builder.build().unwrap().unwrap();
        let TransactWriteItem::Put(put) = &write_items(&tx)[0] else {
            panic!("expected put");
        };
        assert_eq!(
            put.return_values_on_condition_check_failure,
            Some(ReturnValuesOnConditionCheckFailure::AllOld)
        );
    }

    #[test]
    fn test_should_correlate_reasons_to_failing_item_only() {
        let mut builder = TransactionBuilder::new();
        for pk in ["a", "b", "c"] {
            builder.push(TransactEntry::new(TransactOp::Put, users(), keyed(pk)));
        }
        let tx = builder.build().unwrap().unwrap();
        let reasons = tx
            .correlate_message(
                "Transaction cancelled, please refer cancellation reasons for specific reasons [None, ConditionalCheckFailed, None]",
            )
            .unwrap();
        let mut items = vec![keyed("a"), keyed("b"), keyed("c")];
        let raw = vec![None, Some("ConditionalCheckFailed".to_owned()), None];
        tx.annotate(&mut items, &raw);

        assert_eq!(reasons, raw);
        assert!(!items[0].contains_key(ERROR_CODE_FIELD));
        assert_eq!(
            items[1][ERROR_CODE_FIELD],
            Value::from("ConditionalCheckFailed")
        );
        assert!(!items[2].contains_key(ERROR_CODE_FIELD));
    }

    #[test]
    fn test_should_skip_dropped_entries_when_correlating() {
        let mut builder = TransactionBuilder::new();
        assert!(builder.push_raw("put", users(), keyed("a"), ItemOptions::default()));
        assert!(!builder.push_raw("merge", users(), keyed("b"), ItemOptions::default()));
        assert!(builder.push_raw("update", users(), keyed("c"), ItemOptions::default()));
        assert!(builder.push_raw("del", users(), keyed("d"), ItemOptions::default()));
        assert_eq!(builder.len(), 4);

        let tx = builder.build().unwrap().unwrap();
        // the unknown op and the no-op update are not sent
        assert_eq!(tx.positions(), &[0, 3]);
        assert_eq!(
            tx.correlate(&[None, Some("ConditionalCheckFailed".to_owned())]),
            vec![None, None, None, Some("ConditionalCheckFailed".to_owned())]
        );
    }

    #[test]
    fn test_should_reject_mixed_reads_and_writes() {
        let mut builder = TransactionBuilder::new();
        builder
            .push(TransactEntry::new(TransactOp::Get, users(), keyed("a")))
            .push(TransactEntry::new(TransactOp::Put, users(), keyed("b")));
        assert!(matches!(builder.build(), Err(CompileError::MixedTransaction)));
    }

    #[test]
    fn test_should_compile_read_transaction() {
        let mut builder = TransactionBuilder::new();
        builder.push(
            TransactEntry::new(TransactOp::Get, users(), keyed("a")).with_options(ItemOptions {
                projection: vec!["name".to_owned()],
                ..ItemOptions::default()
            }),
        );
        let tx = builder.build().unwrap().unwrap();
        let TransactRequest::Get(input) = &tx.request else {
            panic!("expected a read transaction");
        };
        assert_eq!(input.transact_items[0].get.projection_expression.as_deref(), Some("#n0"));
    }

    #[test]
    fn test_should_build_nothing_from_empty_or_noop_entries() {
        assert!(TransactionBuilder::new().build().unwrap().is_none());

        let mut builder = TransactionBuilder::new();
        builder.push(TransactEntry::new(TransactOp::Check, users(), keyed("a")));
        assert!(builder.build().unwrap().is_none());
    }

    #[test]
    fn test_should_propagate_missing_key() {
        let mut builder = TransactionBuilder::new();
        builder.push(TransactEntry::new(TransactOp::Put, users(), Item::new()));
        assert!(matches!(builder.build(), Err(CompileError::MissingKey { .. })));
    }

    #[test]
    fn test_should_recompile_identically() {
        let mut builder = TransactionBuilder::new().with_client_request_token("t-1");
        builder.push(TransactEntry::new(
            TransactOp::Update,
            users(),
            with_field("a", "name", "x"),
        ));
        assert_eq!(builder.build().unwrap(), builder.build().unwrap());
    }
}
