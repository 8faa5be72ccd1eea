//! Response bodies for the operations this client issues.

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeMap;
use crate::codec;
use crate::value::Item;

/// Output for the `GetItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The item, absent when no item matched the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<AttributeMap>,
}

impl GetItemOutput {
    /// The item decoded to native values.
    #[must_use]
    pub fn decoded(&self) -> Option<Item> {
        self.item.as_ref().map(codec::from_item)
    }
}

/// Output for `PutItem`, `UpdateItem` and `DeleteItem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteItemOutput {
    /// Attributes selected by `ReturnValues`.
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub attributes: AttributeMap,
}

/// Output for `Query` and `Scan`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsOutput {
    /// Matching items.
    #[serde(default)]
    pub items: Vec<AttributeMap>,

    /// Number of items returned.
    #[serde(default)]
    pub count: i32,

    /// Number of items evaluated before the filter was applied.
    #[serde(default)]
    pub scanned_count: i32,

    /// Key to resume from; empty when the result set is exhausted.
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub last_evaluated_key: AttributeMap,
}

impl ItemsOutput {
    /// The items decoded to native values.
    #[must_use]
    pub fn decoded(&self) -> Vec<Item> {
        self.items.iter().map(codec::from_item).collect()
    }
}

/// Output for the `TransactGetItems` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactGetItemsOutput {
    /// One response per requested read, in request order.
    #[serde(default)]
    pub responses: Vec<ItemResponse>,
}

/// One read result of a transactional get.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemResponse {
    /// The item, absent when no item matched the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<AttributeMap>,
}

/// Output for the `TransactWriteItems` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsOutput {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_should_decode_query_page() {
        let body = r#"{"Items":[{"pk":{"S":"a"},"n":{"N":"3"}}],"Count":1,"ScannedCount":4,
            "LastEvaluatedKey":{"pk":{"S":"a"}}}"#;
        let out: ItemsOutput = serde_json::from_str(body).unwrap();
        assert_eq!(out.count, 1);
        assert_eq!(out.scanned_count, 4);
        assert!(!out.last_evaluated_key.is_empty());
        assert_eq!(out.decoded()[0]["n"], Value::Int(3));
    }

    #[test]
    fn test_should_handle_missing_item() {
        let out: GetItemOutput = serde_json::from_str("{}").unwrap();
        assert!(out.decoded().is_none());
    }
}
