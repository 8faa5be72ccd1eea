//! DynamoDB operation enum.

use std::fmt;

/// Prefix of the `X-Amz-Target` header for the 2012-08-10 API.
pub const TARGET_PREFIX: &str = "DynamoDB_20120810.";

/// Content type of every request and response body.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Operations this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamoDBOperation {
    /// Put (insert or replace) an item.
    PutItem,
    /// Get an item by primary key.
    GetItem,
    /// Update an item.
    UpdateItem,
    /// Delete an item by primary key.
    DeleteItem,
    /// Query items by key condition.
    Query,
    /// Scan all items in a table.
    Scan,
    /// Atomic multi-item write.
    TransactWriteItems,
    /// Atomic multi-item read.
    TransactGetItems,
}

impl DynamoDBOperation {
    /// Returns the AWS operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PutItem => "PutItem",
            Self::GetItem => "GetItem",
            Self::UpdateItem => "UpdateItem",
            Self::DeleteItem => "DeleteItem",
            Self::Query => "Query",
            Self::Scan => "Scan",
            Self::TransactWriteItems => "TransactWriteItems",
            Self::TransactGetItems => "TransactGetItems",
        }
    }

    /// Parse an operation name string into a `DynamoDBOperation`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PutItem" => Some(Self::PutItem),
            "GetItem" => Some(Self::GetItem),
            "UpdateItem" => Some(Self::UpdateItem),
            "DeleteItem" => Some(Self::DeleteItem),
            "Query" => Some(Self::Query),
            "Scan" => Some(Self::Scan),
            "TransactWriteItems" => Some(Self::TransactWriteItems),
            "TransactGetItems" => Some(Self::TransactGetItems),
            _ => None,
        }
    }

    /// The `X-Amz-Target` header value for this operation.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{TARGET_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for DynamoDBOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_target_header() {
        assert_eq!(
            DynamoDBOperation::TransactWriteItems.target(),
            "DynamoDB_20120810.TransactWriteItems"
        );
    }

    #[test]
    fn test_should_parse_operation_names() {
        assert_eq!(
            DynamoDBOperation::from_name("Query"),
            Some(DynamoDBOperation::Query)
        );
        assert_eq!(DynamoDBOperation::from_name("CreateTable"), None);
    }
}
