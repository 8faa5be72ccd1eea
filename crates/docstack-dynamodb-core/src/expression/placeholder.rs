//! Name aliases (`#nN`) and value references (`:vN`) for one compiled request.
//!
//! A table is created per request and shared by every expression of that
//! request (key condition, filter, projection, update, condition), so the
//! numbering never collides inside one body.

use std::collections::HashMap;
use std::sync::LazyLock;

use docstack_dynamodb_model::codec;
use docstack_dynamodb_model::input::{ExpressionNames, ExpressionValues};
use docstack_dynamodb_model::{AttributeValue, Value};
use regex::Regex;

use super::reserved::is_reserved;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));

/// `name`, `name[0]`, `name[0][2]`.
static INDEXED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]+)((?:\[\d+\])*)$").expect("valid regex"));

/// Append-only placeholder maps with independent counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderTable {
    names: ExpressionNames,
    aliases: HashMap<String, String>,
    values: ExpressionValues,
}

impl PlaceholderTable {
    /// An empty table; the first alias is `#n0`, the first reference `:v0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The expression form of an attribute path.
    ///
    /// Plain identifiers that are not reserved are returned unchanged. Dotted
    /// paths are aliased segment by segment and list indexes are kept as is,
    /// so `tags[0].name` becomes `tags[0].#n0`. A raw name seen before reuses
    /// its alias.
    pub fn alias_for(&mut self, raw: &str) -> String {
        if Self::is_plain(raw) {
            return raw.to_owned();
        }
        if raw.contains('.') {
            return raw
                .split('.')
                .map(|segment| self.alias_segment(segment))
                .collect::<Vec<_>>()
                .join(".");
        }
        self.alias_segment(raw)
    }

    /// Store an encoded value and return its fresh reference. Equal values are
    /// never merged.
    pub fn value_ref(&mut self, value: &Value) -> String {
        self.value_ref_raw(codec::to_attribute_value(value))
    }

    /// Store an already encoded value and return its fresh reference.
    pub fn value_ref_raw(&mut self, value: AttributeValue) -> String {
        let reference = format!(":v{}", self.values.len());
        self.values.insert(reference.clone(), value);
        reference
    }

    /// Alias to raw-name map, in minting order.
    #[must_use]
    pub fn names(&self) -> &ExpressionNames {
        &self.names
    }

    /// Reference to value map, in minting order.
    #[must_use]
    pub fn values(&self) -> &ExpressionValues {
        &self.values
    }

    /// Returns `true` if nothing has been minted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    /// Consume the table into the two request maps.
    #[must_use]
    pub fn into_parts(self) -> (ExpressionNames, ExpressionValues) {
        (self.names, self.values)
    }

    fn is_plain(name: &str) -> bool {
        IDENTIFIER.is_match(name) && !is_reserved(name)
    }

    fn alias_segment(&mut self, segment: &str) -> String {
        // Nothing to alias between two dots or after a trailing one.
        if segment.is_empty() {
            return String::new();
        }
        let (ident, suffix) = match INDEXED_SEGMENT.captures(segment) {
            Some(caps) => (
                caps.get(1).map_or(segment, |m| m.as_str()),
                caps.get(2).map_or("", |m| m.as_str()),
            ),
            None => (segment, ""),
        };
        if Self::is_plain(ident) {
            return format!("{ident}{suffix}");
        }
        let alias = match self.aliases.get(ident) {
            Some(alias) => alias.clone(),
            None => {
                let alias = format!("#n{}", self.names.len());
                self.names.insert(alias.clone(), ident.to_owned());
                self.aliases.insert(ident.to_owned(), alias.clone());
                alias
            }
        };
        format!("{alias}{suffix}")
    }
}
