//! Conversion between native [`Value`]s and wire [`AttributeValue`]s.
//!
//! Encoding never fails: types the wire format has no tag for are expected to
//! arrive as [`Value::String`] (see [`Value::text`]). Set collapsing only
//! applies to the top level of a value; arrays nested in lists and maps always
//! become `L`.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::attribute_value::{AttributeMap, AttributeValue};
use crate::value::{Item, Value};

/// Encode a top-level value. Homogeneous number or string arrays collapse to
/// `NS` / `SS`.
#[must_use]
pub fn to_attribute_value(value: &Value) -> AttributeValue {
    encode(value, 0)
}

/// Encode a value that will be nested inside a list or map, so arrays stay
/// `L` even when homogeneous.
#[must_use]
pub fn to_nested_attribute_value(value: &Value) -> AttributeValue {
    encode(value, 1)
}

/// Encode every attribute of an item.
#[must_use]
pub fn to_item(item: &Item) -> AttributeMap {
    item.iter()
        .map(|(k, v)| (k.clone(), to_attribute_value(v)))
        .collect()
}

/// Decode a wire value back to its native form.
#[must_use]
pub fn from_attribute_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::B(b) => Value::Binary(b.clone()),
        AttributeValue::Ss(items) => Value::List(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::List(items.iter().map(|n| parse_number(n)).collect()),
        AttributeValue::Bs(items) => Value::List(items.iter().cloned().map(Value::Binary).collect()),
        AttributeValue::L(items) => Value::List(items.iter().map(from_attribute_value).collect()),
        AttributeValue::M(m) => Value::Map(decode_map(m)),
    }
}

/// Decode an untagged top-level map such as an `Item` payload.
#[must_use]
pub fn from_item(item: &AttributeMap) -> Item {
    decode_map(item)
}

/// Wire form of a number. `NaN` and infinities have no representation and are
/// stored as `0`.
#[must_use]
pub fn format_number(f: f64) -> String {
    if f.is_finite() {
        f.to_string()
    } else {
        "0".to_owned()
    }
}

fn encode(value: &Value, level: usize) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Int(i) => AttributeValue::N(i.to_string()),
        Value::Float(f) => AttributeValue::N(format_number(*f)),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Binary(b) => AttributeValue::B(b.clone()),
        Value::Date(d) => AttributeValue::N(d.timestamp().to_string()),
        Value::List(items) => {
            if level == 0 {
                if let Some(set) = collapse_to_set(items) {
                    return set;
                }
            }
            AttributeValue::L(items.iter().map(|v| encode(v, level + 1)).collect())
        }
        Value::Map(m) => AttributeValue::M(
            m.iter()
                .map(|(k, v)| (k.clone(), encode(v, level + 1)))
                .collect(),
        ),
    }
}

/// Sets may not be empty or hold duplicates. An array with repeated elements
/// stays a list so decoding gives back every element.
fn collapse_to_set(items: &[Value]) -> Option<AttributeValue> {
    if items.is_empty() {
        return None;
    }
    if items.iter().all(Value::is_number) {
        let numbers: Vec<String> = items
            .iter()
            .filter_map(|v| match v {
                Value::Int(i) => Some(i.to_string()),
                Value::Float(f) => Some(format_number(*f)),
                _ => None,
            })
            .collect();
        return all_distinct(&numbers).then_some(AttributeValue::Ns(numbers));
    }
    if items.iter().all(|v| matches!(v, Value::String(_))) {
        let strings: Vec<String> = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect();
        return all_distinct(&strings).then_some(AttributeValue::Ss(strings));
    }
    None
}

fn all_distinct(items: &[String]) -> bool {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().all(|item| seen.insert(item.as_str()))
}

fn decode_map(m: &AttributeMap) -> IndexMap<String, Value> {
    m.iter()
        .map(|(k, v)| (k.clone(), from_attribute_value(v)))
        .collect()
}

fn parse_number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Int(i);
    }
    match n.parse::<f64>() {
        Ok(f) => Value::Float(f),
        Err(_) => Value::String(n.to_owned()),
    }
}
