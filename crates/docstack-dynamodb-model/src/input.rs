//! Request bodies for the operations this client issues.
//!
//! All input structs use `PascalCase` JSON field naming to match the DynamoDB
//! wire protocol (`awsJson1_0`). Optional fields are omitted when `None` and
//! empty maps are omitted. Every top-level input carries an `extra` map that is
//! flattened into the body, for store parameters not modelled here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attribute_value::{AttributeMap, AttributeValue};
use crate::types::{
    ReturnConsumedCapacity, ReturnValue, ReturnValuesOnConditionCheckFailure, Select,
};

/// Additional top-level body parameters, passed through verbatim.
pub type ExtraParams = serde_json::Map<String, serde_json::Value>;

/// Substitution tokens for attribute names.
pub type ExpressionNames = IndexMap<String, String>;

/// Substitution tokens for attribute values.
pub type ExpressionValues = IndexMap<String, AttributeValue>;

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Input for the `PutItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The name of the table to contain the item.
    pub table_name: String,

    /// A map of attribute name/value pairs, one for each attribute.
    pub item: AttributeMap,

    /// A condition that must be satisfied for the put to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Substitution tokens for attribute names in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,

    /// Substitution tokens for attribute values in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,

    /// Use `ReturnValues` to get the item attributes as they appeared before
    /// they were updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,

    /// Determines the level of detail about provisioned throughput consumption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

/// Input for the `GetItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The name of the table containing the requested item.
    pub table_name: String,

    /// The primary key of the item to retrieve.
    pub key: AttributeMap,

    /// A string that identifies one or more attributes to retrieve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitution tokens for attribute names in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,

    /// If `true`, a strongly consistent read is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

/// Input for the `UpdateItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    /// The name of the table containing the item to update.
    pub table_name: String,

    /// The primary key of the item to be updated.
    pub key: AttributeMap,

    /// An expression that defines attributes to be updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,

    /// A condition that must be satisfied for the update to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Substitution tokens for attribute names in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,

    /// Substitution tokens for attribute values in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,

    /// Determines what values are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,

    /// Determines the level of detail about provisioned throughput consumption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

/// Input for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// The name of the table from which to delete the item.
    pub table_name: String,

    /// The primary key of the item to delete.
    pub key: AttributeMap,

    /// A condition that must be satisfied for the delete to succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Substitution tokens for attribute names in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,

    /// Substitution tokens for attribute values in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,

    /// Determines what values are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Input for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The name of the table containing the requested items.
    pub table_name: String,

    /// The name of a secondary index to query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// The condition that specifies the key values for items to be retrieved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// A string that contains conditions for filtering the query results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// A string that identifies the attributes to retrieve from the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitution tokens for attribute names in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,

    /// Substitution tokens for attribute values in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,

    /// `true` (default) for ascending, `false` for descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// The maximum number of items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    /// The primary key of the first item that this operation will evaluate.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub exclusive_start_key: AttributeMap,

    /// The attributes to be returned in the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Select>,

    /// If `true`, a strongly consistent read is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

/// Input for the `Scan` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// The name of the table to scan.
    pub table_name: String,

    /// The name of a secondary index to scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// A string that contains conditions for filtering the scan results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// A string that identifies the attributes to retrieve from the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitution tokens for attribute names in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,

    /// Substitution tokens for attribute values in an expression.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,

    /// The maximum number of items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    /// The primary key of the first item that this operation will evaluate.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub exclusive_start_key: AttributeMap,

    /// The attributes to be returned in the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Select>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Input for the `TransactWriteItems` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsInput {
    /// The ordered actions; the store reports cancellation reasons in this order.
    pub transact_items: Vec<TransactWriteItem>,

    /// Idempotency token for retried submissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,

    /// Determines the level of detail about provisioned throughput consumption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

/// One action of a transactional write. Exactly one member is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactWriteItem {
    /// Check a condition without writing.
    ConditionCheck(ConditionCheck),
    /// Put an item.
    Put(Put),
    /// Update an item.
    Update(Update),
    /// Delete an item.
    Delete(Delete),
}

impl TransactWriteItem {
    /// Name of the table the action targets.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::ConditionCheck(c) => &c.table_name,
            Self::Put(p) => &p.table_name,
            Self::Update(u) => &u.table_name,
            Self::Delete(d) => &d.table_name,
        }
    }
}

/// A condition evaluated as part of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConditionCheck {
    /// Target table.
    pub table_name: String,
    /// Primary key of the checked item.
    pub key: AttributeMap,
    /// The condition that must hold.
    pub condition_expression: String,
    /// Substitution tokens for attribute names.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,
    /// Substitution tokens for attribute values.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,
    /// Whether to return the item when the condition fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values_on_condition_check_failure: Option<ReturnValuesOnConditionCheckFailure>,
}

/// A put inside a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Put {
    /// Target table.
    pub table_name: String,
    /// The full item.
    pub item: AttributeMap,
    /// Optional guard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Substitution tokens for attribute names.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,
    /// Substitution tokens for attribute values.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,
    /// Whether to return the item when the condition fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values_on_condition_check_failure: Option<ReturnValuesOnConditionCheckFailure>,
}

/// An update inside a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Update {
    /// Target table.
    pub table_name: String,
    /// Primary key of the updated item.
    pub key: AttributeMap,
    /// The update directive.
    pub update_expression: String,
    /// Optional guard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Substitution tokens for attribute names.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,
    /// Substitution tokens for attribute values.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,
    /// Whether to return the item when the condition fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values_on_condition_check_failure: Option<ReturnValuesOnConditionCheckFailure>,
}

/// A delete inside a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Delete {
    /// Target table.
    pub table_name: String,
    /// Primary key of the deleted item.
    pub key: AttributeMap,
    /// Optional guard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Substitution tokens for attribute names.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,
    /// Substitution tokens for attribute values.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_values: ExpressionValues,
    /// Whether to return the item when the condition fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values_on_condition_check_failure: Option<ReturnValuesOnConditionCheckFailure>,
}

/// Input for the `TransactGetItems` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactGetItemsInput {
    /// The ordered reads.
    pub transact_items: Vec<TransactGetItem>,

    /// Pass-through parameters.
    #[serde(flatten)]
    pub extra: ExtraParams,
}

/// One read of a transactional get.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactGetItem {
    /// The read itself.
    pub get: Get,
}

/// A single-item read inside a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Get {
    /// Target table.
    pub table_name: String,
    /// Primary key of the item.
    pub key: AttributeMap,
    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Substitution tokens for attribute names.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expression_attribute_names: ExpressionNames,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_omit_empty_fields() {
        let mut key = AttributeMap::new();
        key.insert("pk".to_owned(), AttributeValue::S("a".to_owned()));
        let input = GetItemInput {
            table_name: "users".to_owned(),
            key,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"TableName": "users", "Key": {"pk": {"S": "a"}}})
        );
    }

    #[test]
    fn test_should_flatten_extra_params() {
        let mut extra = ExtraParams::new();
        extra.insert("ReturnItemCollectionMetrics".to_owned(), json!("SIZE"));
        let input = PutItemInput {
            table_name: "t".to_owned(),
            extra,
            ..Default::default()
        };
        let body = serde_json::to_value(&input).unwrap();
        assert_eq!(body["ReturnItemCollectionMetrics"], json!("SIZE"));
        assert_eq!(body["Item"], json!({}));
    }

    #[test]
    fn test_should_serialize_transact_item_with_single_member() {
        let item = TransactWriteItem::ConditionCheck(ConditionCheck {
            table_name: "t".to_owned(),
            condition_expression: "attribute_exists(pk)".to_owned(),
            return_values_on_condition_check_failure: Some(
                ReturnValuesOnConditionCheckFailure::AllOld,
            ),
            ..Default::default()
        });
        let body = serde_json::to_value(&item).unwrap();
        assert_eq!(body["ConditionCheck"]["TableName"], json!("t"));
        assert_eq!(
            body["ConditionCheck"]["ReturnValuesOnConditionCheckFailure"],
            json!("ALL_OLD")
        );
        assert_eq!(item.table_name(), "t");
    }
}
