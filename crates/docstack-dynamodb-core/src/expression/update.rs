//! Update-expression compilation.
//!
//! Each field of an item maps to one action. Clauses collect into the four
//! buckets of the update grammar and are emitted in the fixed order `SET`,
//! `REMOVE`, `ADD`, `DELETE`, each bucket only when it holds a clause.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use docstack_dynamodb_model::codec;
use docstack_dynamodb_model::{AttributeValue, Item, Value};
use tracing::debug;

use super::placeholder::PlaceholderTable;
use crate::error::CompileError;
use crate::key::KeySchema;

/// What an update does to one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateAction {
    /// Overwrite.
    #[default]
    Set,
    /// Delete the attribute.
    Remove,
    /// Add to a number, starting from zero when absent.
    Incr,
    /// Union into a set.
    Add,
    /// Subtract from a set.
    Delete,
    /// Append to a list; numbers accumulate like [`UpdateAction::Incr`].
    Append,
    /// Prepend to a list; numbers accumulate like [`UpdateAction::Incr`].
    Prepend,
    /// Write only when the attribute is absent.
    IfAbsent,
}

impl FromStr for UpdateAction {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s.trim().to_ascii_lowercase().as_str() {
            "set" => Self::Set,
            "remove" | "unset" => Self::Remove,
            "incr" => Self::Incr,
            "add" => Self::Add,
            "del" | "delete" => Self::Delete,
            "append" => Self::Append,
            "prepend" => Self::Prepend,
            "if_absent" | "not_exists" | "if_not_exists" => Self::IfAbsent,
            other => {
                return Err(CompileError::Unknown {
                    kind: "update action",
                    name: other.to_owned(),
                });
            }
        };
        Ok(action)
    }
}

/// Per-request update settings.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOptions {
    /// Explicit action per field.
    pub actions: HashMap<String, UpdateAction>,
    /// Action for fields without an entry in `actions`.
    pub default_action: UpdateAction,
    /// Guard intermediate map segments of deep paths with
    /// `p = if_not_exists(p, {})`.
    pub materialize_paths: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            actions: HashMap::new(),
            default_action: UpdateAction::Set,
            materialize_paths: true,
        }
    }
}

impl UpdateOptions {
    /// Set the action for `field`.
    #[must_use]
    pub fn with_action(mut self, field: impl Into<String>, action: UpdateAction) -> Self {
        self.actions.insert(field.into(), action);
        self
    }
}

#[derive(Default)]
struct Buckets {
    set: Vec<String>,
    remove: Vec<String>,
    add: Vec<String>,
    delete: Vec<String>,
}

impl Buckets {
    fn render(self) -> Option<String> {
        let parts: Vec<String> = [
            ("SET", self.set),
            ("REMOVE", self.remove),
            ("ADD", self.add),
            ("DELETE", self.delete),
        ]
        .into_iter()
        .filter(|(_, clauses)| !clauses.is_empty())
        .map(|(keyword, clauses)| format!("{keyword} {}", clauses.join(", ")))
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Compile an update expression. Key attributes are skipped; a null, empty
/// string or empty list value removes the attribute whatever its action.
/// `None` means the update changes nothing.
pub fn compile_update(
    item: &Item,
    key_schema: &KeySchema,
    options: &UpdateOptions,
    table: &mut PlaceholderTable,
) -> Option<String> {
    let mut buckets = Buckets::default();
    let mut guarded = HashSet::new();

    for (field, value) in item {
        if key_schema.is_key_field(field) {
            continue;
        }
        let action = if value.is_removal() {
            UpdateAction::Remove
        } else {
            options
                .actions
                .get(field)
                .copied()
                .unwrap_or(options.default_action)
        };
        if action != UpdateAction::Remove && options.materialize_paths {
            guard_intermediate_paths(field, &mut guarded, &mut buckets, table);
        }

        let path = table.alias_for(field);
        match action {
            UpdateAction::Set => {
                let v = table.value_ref(value);
                buckets.set.push(format!("{path} = {v}"));
            }
            UpdateAction::IfAbsent => {
                let v = table.value_ref(value);
                buckets.set.push(format!("{path} = if_not_exists({path}, {v})"));
            }
            UpdateAction::Remove => buckets.remove.push(path),
            UpdateAction::Incr => {
                if value.is_number() {
                    buckets.set.push(increment(&path, value, table));
                } else {
                    debug!(field = %field, "incr on a non-number, writing the value instead");
                    let v = table.value_ref(value);
                    buckets.set.push(format!("{path} = {v}"));
                }
            }
            UpdateAction::Append | UpdateAction::Prepend => {
                let clause = if value.is_number() {
                    increment(&path, value, table)
                } else {
                    list_concat(&path, value, action == UpdateAction::Prepend, table)
                };
                buckets.set.push(clause);
            }
            UpdateAction::Add => match set_operand(value) {
                Some(set) => {
                    let v = table.value_ref_raw(set);
                    buckets.add.push(format!("{path} {v}"));
                }
                None => buckets.set.push(list_concat(&path, value, false, table)),
            },
            UpdateAction::Delete => match set_operand(value) {
                Some(set) => {
                    let v = table.value_ref_raw(set);
                    buckets.delete.push(format!("{path} {v}"));
                }
                None => debug!(field = %field, "dropping delete whose value cannot form a set"),
            },
        }
    }

    buckets.render()
}

/// `a.b.c` needs `a.b` to exist as a map before `a.b.c` can be set.
fn guard_intermediate_paths(
    field: &str,
    guarded: &mut HashSet<String>,
    buckets: &mut Buckets,
    table: &mut PlaceholderTable,
) {
    let segments: Vec<&str> = field.split('.').collect();
    for depth in 1..segments.len().saturating_sub(1) {
        let prefix = segments[..=depth].join(".");
        if guarded.insert(prefix.clone()) {
            let path = table.alias_for(&prefix);
            let empty = table.value_ref_raw(AttributeValue::empty_map());
            buckets
                .set
                .push(format!("{path} = if_not_exists({path}, {empty})"));
        }
    }
}

fn increment(path: &str, value: &Value, table: &mut PlaceholderTable) -> String {
    let zero = table.value_ref(&Value::Int(0));
    let v = table.value_ref(value);
    format!("{path} = if_not_exists({path}, {zero}) + {v}")
}

fn list_concat(path: &str, value: &Value, prepend: bool, table: &mut PlaceholderTable) -> String {
    let elements = match value {
        Value::List(items) => items.iter().map(codec::to_nested_attribute_value).collect(),
        other => vec![codec::to_nested_attribute_value(other)],
    };
    let empty = table.value_ref_raw(AttributeValue::empty_list());
    let list = table.value_ref_raw(AttributeValue::L(elements));
    let existing = format!("if_not_exists({path}, {empty})");
    if prepend {
        format!("{path} = list_append({list}, {existing})")
    } else {
        format!("{path} = list_append({existing}, {list})")
    }
}

/// The value as a string or number set, wrapping scalars. Repeated elements
/// collapse since set operands are unions.
fn set_operand(value: &Value) -> Option<AttributeValue> {
    let mut members: Vec<Value> = Vec::new();
    match value {
        Value::List(items) => {
            for item in items {
                if !members.contains(item) {
                    members.push(item.clone());
                }
            }
        }
        other => members.push(other.clone()),
    }
    let encoded = codec::to_attribute_value(&Value::List(members));
    encoded.is_set().then_some(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(entries: &[(&str, Value)]) -> Item {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn compile(item: &Item, options: &UpdateOptions) -> (Option<String>, PlaceholderTable) {
        let mut table = PlaceholderTable::new();
        let expr = compile_update(item, &KeySchema::new("pk"), options, &mut table);
        (expr, table)
    }

    #[test]
    fn test_should_compile_incr_to_single_set_clause() {
        let options = UpdateOptions::default().with_action("counter", UpdateAction::Incr);
        let (expr, table) = compile(&item(&[("counter", Value::Int(1))]), &options);
        assert_eq!(
            expr.as_deref(),
            Some("SET #n0 = if_not_exists(#n0, :v0) + :v1")
        );
        assert_eq!(table.names()["#n0"], "counter");
        assert_eq!(table.values()[":v0"], AttributeValue::N("0".to_owned()));
        assert_eq!(table.values()[":v1"], AttributeValue::N("1".to_owned()));
    }

    #[test]
    fn test_should_compile_null_to_remove_only() {
        let options = UpdateOptions::default().with_action("counter", UpdateAction::Incr);
        let (expr, table) = compile(&item(&[("counter", Value::Null)]), &options);
        assert_eq!(expr.as_deref(), Some("REMOVE #n0"));
        assert!(table.values().is_empty());
    }

    #[test]
    fn test_should_order_buckets() {
        let options = UpdateOptions::default()
            .with_action("tags", UpdateAction::Add)
            .with_action("legacy", UpdateAction::Delete);
        let (expr, _) = compile(
            &item(&[
                ("legacy", Value::from(vec!["a"])),
                ("tags", Value::from(vec!["x", "y"])),
                ("x", Value::from("")),
                ("name", Value::from("bob")),
            ]),
            &options,
        );
        assert_eq!(
            expr.as_deref(),
            Some("SET #n0 = :v2 REMOVE x ADD tags :v1 DELETE legacy :v0")
        );
    }

    #[test]
    fn test_should_skip_key_fields() {
        let (expr, table) = compile(
            &item(&[("pk", Value::from("user#1")), ("age", Value::Int(3))]),
            &UpdateOptions::default(),
        );
        assert_eq!(expr.as_deref(), Some("SET age = :v0"));
        assert_eq!(table.values().len(), 1);
    }

    #[test]
    fn test_should_return_none_when_nothing_changes() {
        let (expr, table) = compile(
            &item(&[("pk", Value::from("user#1"))]),
            &UpdateOptions::default(),
        );
        assert_eq!(expr, None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_should_guard_intermediate_maps_once() {
        let (expr, table) = compile(
            &item(&[
                ("profile.address.city", Value::from("x")),
                ("profile.address.zip", Value::from("y")),
            ]),
            &UpdateOptions::default(),
        );
        assert_eq!(
            expr.as_deref(),
            Some(
                "SET profile.address = if_not_exists(profile.address, :v0), profile.address.city = :v1, profile.address.zip = :v2"
            )
        );
        assert_eq!(table.values()[":v0"], AttributeValue::empty_map());
    }

    #[test]
    fn test_should_not_guard_when_disabled_or_shallow() {
        let options = UpdateOptions {
            materialize_paths: false,
            ..UpdateOptions::default()
        };
        let (expr, _) = compile(&item(&[("a.b.c", Value::Int(1))]), &options);
        assert_eq!(expr.as_deref(), Some("SET a.b.c = :v0"));

        let (expr, _) = compile(&item(&[("a.b", Value::Int(1))]), &UpdateOptions::default());
        assert_eq!(expr.as_deref(), Some("SET a.b = :v0"));
    }

    #[test]
    fn test_should_append_and_prepend_lists() {
        let options = UpdateOptions::default()
            .with_action("tags", UpdateAction::Append)
            .with_action("history", UpdateAction::Prepend);
        let (expr, table) = compile(
            &item(&[("tags", Value::from("a")), ("history", Value::from(vec![1, 2]))]),
            &options,
        );
        assert_eq!(
            expr.as_deref(),
            Some(
                "SET tags = list_append(if_not_exists(tags, :v0), :v1), history = list_append(:v3, if_not_exists(history, :v2))"
            )
        );
        assert_eq!(
            table.values()[":v1"],
            AttributeValue::L(vec![AttributeValue::S("a".to_owned())])
        );
        assert!(matches!(table.values()[":v3"], AttributeValue::L(ref l) if l.len() == 2));
    }

    #[test]
    fn test_should_accumulate_numbers_on_append() {
        let options = UpdateOptions::default().with_action("total", UpdateAction::Append);
        let (expr, _) = compile(&item(&[("total", Value::Float(2.5))]), &options);
        assert_eq!(
            expr.as_deref(),
            Some("SET #n0 = if_not_exists(#n0, :v0) + :v1")
        );
    }

    #[test]
    fn test_should_fall_back_to_list_append_for_mixed_add() {
        let options = UpdateOptions::default().with_action("tags", UpdateAction::Add);
        let (expr, _) = compile(
            &item(&[("tags", Value::List(vec![Value::Int(1), Value::from("a")]))]),
            &options,
        );
        assert_eq!(
            expr.as_deref(),
            Some("SET tags = list_append(if_not_exists(tags, :v0), :v1)")
        );
    }

    #[test]
    fn test_should_union_repeated_values_into_one_set() {
        let options = UpdateOptions::default().with_action("tags", UpdateAction::Add);
        let (expr, table) = compile(&item(&[("tags", Value::from(vec!["a", "a", "b"]))]), &options);
        assert_eq!(expr.as_deref(), Some("ADD tags :v0"));
        assert_eq!(
            table.values()[":v0"],
            AttributeValue::Ss(vec!["a".to_owned(), "b".to_owned()])
        );
    }

    #[test]
    fn test_should_compile_if_absent() {
        let options = UpdateOptions::default().with_action("created", UpdateAction::IfAbsent);
        let (expr, _) = compile(&item(&[("created", Value::Int(5))]), &options);
        assert_eq!(
            expr.as_deref(),
            Some("SET created = if_not_exists(created, :v0)")
        );
    }

    #[test]
    fn test_should_recompile_identically() {
        let options = UpdateOptions::default().with_action("n", UpdateAction::Incr);
        let input = item(&[("n", Value::Int(1)), ("a.b.c", Value::from("x"))]);
        let first = compile(&input, &options);
        let second = compile(&input, &options);
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_should_parse_action_hints() {
        assert_eq!("unset".parse::<UpdateAction>().unwrap(), UpdateAction::Remove);
        assert_eq!("del".parse::<UpdateAction>().unwrap(), UpdateAction::Delete);
        assert_eq!(
            "not_exists".parse::<UpdateAction>().unwrap(),
            UpdateAction::IfAbsent
        );
        assert!("merge".parse::<UpdateAction>().is_err());
    }
}
