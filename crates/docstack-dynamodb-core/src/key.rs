//! Primary key schema and key extraction.

use docstack_dynamodb_model::codec;
use docstack_dynamodb_model::{AttributeMap, Item};

use crate::error::CompileError;

/// Names of a table's primary key attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition (hash) key attribute.
    pub partition_key: String,
    /// Sort (range) key attribute, for composite keys.
    pub sort_key: Option<String>,
}

impl KeySchema {
    /// A schema with only a partition key.
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Returns `true` if `field` is one of the key attributes.
    #[must_use]
    pub fn is_key_field(&self, field: &str) -> bool {
        self.partition_key == field || self.sort_key.as_deref() == Some(field)
    }

    /// Pull the encoded key out of an item.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingKey`] when a key attribute is absent or
    /// null.
    pub fn extract(&self, table: &str, item: &Item) -> Result<AttributeMap, CompileError> {
        let mut key = AttributeMap::new();
        for attribute in std::iter::once(&self.partition_key).chain(self.sort_key.as_ref()) {
            match item.get(attribute) {
                Some(value) if !value.is_null() => {
                    key.insert(attribute.clone(), codec::to_attribute_value(value));
                }
                _ => {
                    return Err(CompileError::MissingKey {
                        table: table.to_owned(),
                        attribute: attribute.clone(),
                    });
                }
            }
        }
        Ok(key)
    }
}

/// A table and its key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Table name.
    pub table: String,
    /// Primary key attributes.
    pub key_schema: KeySchema,
}

impl Target {
    /// Create a target.
    pub fn new(table: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            table: table.into(),
            key_schema,
        }
    }

    /// Pull the encoded key out of an item destined for this table.
    ///
    /// # Errors
    ///
    /// See [`KeySchema::extract`].
    pub fn key(&self, item: &Item) -> Result<AttributeMap, CompileError> {
        self.key_schema.extract(&self.table, item)
    }
}
