//! Enumerations shared by the request and response shapes.

use serde::{Deserialize, Serialize};

/// Determines what values are returned by write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnValue {
    /// Nothing is returned.
    #[default]
    #[serde(rename = "NONE")]
    None,
    /// Returns all attributes of the item as they appeared before the operation.
    #[serde(rename = "ALL_OLD")]
    AllOld,
    /// Returns only the updated attributes as they appeared before the operation.
    #[serde(rename = "UPDATED_OLD")]
    UpdatedOld,
    /// Returns all attributes of the item as they appear after the operation.
    #[serde(rename = "ALL_NEW")]
    AllNew,
    /// Returns only the updated attributes as they appear after the operation.
    #[serde(rename = "UPDATED_NEW")]
    UpdatedNew,
}

impl ReturnValue {
    /// Returns the DynamoDB wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AllOld => "ALL_OLD",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::AllNew => "ALL_NEW",
            Self::UpdatedNew => "UPDATED_NEW",
        }
    }

    /// Inside a transaction only the old image of a failed condition can be
    /// returned; any request for changed values maps to `ALL_OLD`.
    #[must_use]
    pub fn on_condition_check_failure(&self) -> Option<ReturnValuesOnConditionCheckFailure> {
        match self {
            Self::None => None,
            _ => Some(ReturnValuesOnConditionCheckFailure::AllOld),
        }
    }
}

impl std::fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a transactional write returns for an item whose condition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnValuesOnConditionCheckFailure {
    /// Return the item as it was before the failed write.
    #[serde(rename = "ALL_OLD")]
    AllOld,
    /// Return nothing (default).
    #[default]
    #[serde(rename = "NONE")]
    None,
}

impl ReturnValuesOnConditionCheckFailure {
    /// Returns the DynamoDB wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllOld => "ALL_OLD",
            Self::None => "NONE",
        }
    }
}

impl std::fmt::Display for ReturnValuesOnConditionCheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controls whether consumed capacity information is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReturnConsumedCapacity {
    /// Return consumed capacity for the table and any indexes involved.
    #[serde(rename = "INDEXES")]
    Indexes,
    /// Return only the total consumed capacity.
    #[serde(rename = "TOTAL")]
    Total,
    /// Do not return consumed capacity (default).
    #[default]
    #[serde(rename = "NONE")]
    None,
}

/// Attributes to retrieve in a `Query` or `Scan` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Select {
    /// All attributes of the item.
    #[default]
    #[serde(rename = "ALL_ATTRIBUTES")]
    AllAttributes,
    /// All projected attributes (for index queries).
    #[serde(rename = "ALL_PROJECTED_ATTRIBUTES")]
    AllProjectedAttributes,
    /// Only the attributes specified in `ProjectionExpression`.
    #[serde(rename = "SPECIFIC_ATTRIBUTES")]
    SpecificAttributes,
    /// Only the count of matching items (no item data).
    #[serde(rename = "COUNT")]
    Count,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_return_values_for_transactions() {
        assert_eq!(ReturnValue::None.on_condition_check_failure(), None);
        assert_eq!(
            ReturnValue::UpdatedNew.on_condition_check_failure(),
            Some(ReturnValuesOnConditionCheckFailure::AllOld)
        );
    }

    #[test]
    fn test_should_serialize_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReturnValue::AllNew).unwrap(),
            r#""ALL_NEW""#
        );
        assert_eq!(serde_json::to_string(&Select::Count).unwrap(), r#""COUNT""#);
        assert_eq!(ReturnValuesOnConditionCheckFailure::AllOld.to_string(), "ALL_OLD");
    }
}
