//! Condition, filter and key-condition compilation.
//!
//! A [`ConditionTree`] is a list of field conditions and nested groups. The
//! compiler walks it once, resolving every attribute through a
//! [`PlaceholderTable`] and emitting lowercase clause keywords joined by
//! `AND`/`OR`. Malformed conditions (a `between` with one bound, an `in` with
//! no usable members, a blank comparison value) are dropped rather than
//! reported, so an input that is not empty may still compile to nothing.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use docstack_dynamodb_model::Value;
use indexmap::IndexMap;
use tracing::debug;

use super::placeholder::PlaceholderTable;
use crate::error::CompileError;

/// Comparison and predicate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    /// `=`
    #[default]
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `between :a and :b`
    Between,
    /// `not … between :a and :b`
    NotBetween,
    /// `in (:a,:b)`
    In,
    /// `not … in (:a,:b)`
    NotIn,
    /// Every given element is a member of the attribute.
    AllIn,
    /// `contains(path, :v)`
    Contains,
    /// `not contains(path, :v)`
    NotContains,
    /// `begins_with(path, :v)`
    BeginsWith,
    /// `not begins_with(path, :v)`
    NotBeginsWith,
    /// The attribute is absent: `attribute_not_exists(path)`.
    Null,
    /// The attribute is present: `attribute_exists(path)`.
    NotNull,
}

impl Operator {
    /// The canonical operator name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::AllIn => "all_in",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::BeginsWith => "begins_with",
            Self::NotBeginsWith => "not_begins_with",
            Self::Null => "null",
            Self::NotNull => "not_null",
        }
    }

    /// Symbol for the plain comparison operators.
    fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Ne => Some("<>"),
            Self::Lt => Some("<"),
            Self::Le => Some("<="),
            Self::Gt => Some(">"),
            Self::Ge => Some(">="),
            _ => None,
        }
    }

    /// Operators a key condition accepts.
    fn allowed_in_key_condition(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Between | Self::BeginsWith
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CompileError;

    /// Accepts the canonical names plus the usual symbolic and short aliases,
    /// ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => Self::Eq,
            "<>" | "!=" | "ne" | "neq" => Self::Ne,
            "<" | "lt" => Self::Lt,
            "<=" | "le" | "lte" => Self::Le,
            ">" | "gt" => Self::Gt,
            ">=" | "ge" | "gte" => Self::Ge,
            "between" => Self::Between,
            "not_between" => Self::NotBetween,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "all_in" => Self::AllIn,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "begins_with" => Self::BeginsWith,
            "not_begins_with" => Self::NotBeginsWith,
            "null" | "not_exists" => Self::Null,
            "not_null" | "exists" => Self::NotNull,
            other => {
                return Err(CompileError::Unknown {
                    kind: "operator",
                    name: other.to_owned(),
                });
            }
        };
        Ok(op)
    }
}

/// Logical connective between clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Join {
    /// Logical AND.
    #[default]
    And,
    /// Logical OR.
    Or,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

impl FromStr for Join {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(CompileError::Unknown {
                kind: "join",
                name: other.to_owned(),
            }),
        }
    }
}

/// One field test.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Attribute path, possibly dotted.
    pub field: String,
    /// Explicit operator; falls back to [`ConditionOptions::ops`] then `eq`.
    pub operator: Option<Operator>,
    /// Operand. Lists expand per element for most operators.
    pub value: Value,
    /// Join for the per-element expansion of this field.
    pub join: Option<Join>,
}

impl Condition {
    /// A condition whose operator comes from the options or defaults to `eq`.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: None,
            value: value.into(),
            join: None,
        }
    }

    /// A condition with an explicit operator.
    pub fn with_operator(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            operator: Some(operator),
            ..Self::new(field, value)
        }
    }

    /// Override the join used when the value expands to several clauses.
    #[must_use]
    pub fn joined_by(mut self, join: Join) -> Self {
        self.join = Some(join);
        self
    }
}

/// A node of a [`ConditionTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    /// A single field test.
    Field(Condition),
    /// A parenthesised group with its own join.
    Group {
        /// Join between the group's members.
        join: Join,
        /// Members of the group.
        conditions: Vec<ConditionNode>,
    },
}

/// Ordered conditions joined by [`ConditionOptions::join`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionTree {
    /// Top-level nodes.
    pub nodes: Vec<ConditionNode>,
}

impl ConditionTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a field condition.
    #[must_use]
    pub fn with(mut self, condition: Condition) -> Self {
        self.nodes.push(ConditionNode::Field(condition));
        self
    }

    /// Append `field = value`, or whatever operator the options name.
    #[must_use]
    pub fn field(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Condition::new(field, value))
    }

    /// Append a field condition with an explicit operator.
    #[must_use]
    pub fn op(self, field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.with(Condition::with_operator(field, operator, value))
    }

    /// Append a parenthesised group.
    #[must_use]
    pub fn group(mut self, join: Join, tree: ConditionTree) -> Self {
        self.nodes.push(ConditionNode::Group {
            join,
            conditions: tree.nodes,
        });
        self
    }

    /// Build a tree from a query object.
    ///
    /// Keys starting with `$or` or `$and` (`$or`, `$or_2`, `$and_tags`) hold a
    /// nested query object that becomes a group. A value that is a map with an
    /// `op` entry naming a known operator is read as `{op, value, join}`; any
    /// other value is an operand whose operator comes from the options.
    #[must_use]
    pub fn from_query(query: &IndexMap<String, Value>) -> Self {
        let mut tree = Self::new();
        for (key, value) in query {
            let group_join = if key.starts_with("$or") {
                Some(Join::Or)
            } else if key.starts_with("$and") {
                Some(Join::And)
            } else {
                None
            };
            match (group_join, value) {
                (Some(join), Value::Map(nested)) => {
                    tree = tree.group(join, Self::from_query(nested));
                }
                (Some(_), _) => {
                    debug!(key = %key, "ignoring group key without nested object");
                }
                (None, value) => tree.nodes.push(ConditionNode::Field(inline_condition(key, value))),
            }
        }
        tree
    }
}

fn inline_condition(field: &str, value: &Value) -> Condition {
    if let Value::Map(spec) = value {
        let operator = spec
            .get("op")
            .and_then(Value::as_str)
            .and_then(|op| op.parse::<Operator>().ok());
        if let Some(operator) = operator {
            let join = spec
                .get("join")
                .and_then(Value::as_str)
                .and_then(|j| j.parse::<Join>().ok());
            return Condition {
                field: field.to_owned(),
                operator: Some(operator),
                value: spec.get("value").cloned().unwrap_or(Value::Null),
                join,
            };
        }
    }
    Condition::new(field, value.clone())
}

/// Per-field overrides applied while compiling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionOptions {
    /// Operator per field, used when a condition carries none.
    pub ops: HashMap<String, Operator>,
    /// Join for per-element expansion, per field.
    pub joins: HashMap<String, Join>,
    /// Attribute path to use in place of a field name.
    pub aliases: HashMap<String, String>,
    /// Join between top-level nodes.
    pub join: Join,
}

impl ConditionOptions {
    /// Options joining top-level nodes with `join`.
    #[must_use]
    pub fn joined_by(join: Join) -> Self {
        Self {
            join,
            ..Self::default()
        }
    }

    /// Set the default operator for `field`.
    #[must_use]
    pub fn with_op(mut self, field: impl Into<String>, operator: Operator) -> Self {
        self.ops.insert(field.into(), operator);
        self
    }

    /// Set the expansion join for `field`.
    #[must_use]
    pub fn with_join(mut self, field: impl Into<String>, join: Join) -> Self {
        self.joins.insert(field.into(), join);
        self
    }

    /// Store `field` under a different attribute path.
    #[must_use]
    pub fn with_alias(mut self, field: impl Into<String>, path: impl Into<String>) -> Self {
        self.aliases.insert(field.into(), path.into());
        self
    }
}

/// Compile a condition or filter expression. `None` means "no condition".
pub fn compile_condition(
    tree: &ConditionTree,
    options: &ConditionOptions,
    table: &mut PlaceholderTable,
) -> Option<String> {
    let clauses = compile_nodes(&tree.nodes, options, table, false);
    join_clauses(&clauses, options.join)
}

/// Compile a key-condition expression. Nodes are always joined by `AND` and
/// operators a key condition cannot use are dropped.
pub fn compile_key_condition(
    tree: &ConditionTree,
    options: &ConditionOptions,
    table: &mut PlaceholderTable,
) -> Option<String> {
    let clauses = compile_nodes(&tree.nodes, options, table, true);
    join_clauses(&clauses, Join::And)
}

fn join_clauses(clauses: &[String], join: Join) -> Option<String> {
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(&format!(" {join} ")))
    }
}

fn compile_nodes(
    nodes: &[ConditionNode],
    options: &ConditionOptions,
    table: &mut PlaceholderTable,
    key_only: bool,
) -> Vec<String> {
    let mut clauses = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            ConditionNode::Field(condition) => {
                if let Some(clause) = compile_field(condition, options, table, key_only) {
                    clauses.push(clause);
                }
            }
            ConditionNode::Group { join, conditions } => {
                let inner = compile_nodes(conditions, options, table, key_only);
                if let Some(joined) = join_clauses(&inner, *join) {
                    clauses.push(format!("({joined})"));
                }
            }
        }
    }
    clauses
}

fn compile_field(
    condition: &Condition,
    options: &ConditionOptions,
    table: &mut PlaceholderTable,
    key_only: bool,
) -> Option<String> {
    let field = condition.field.as_str();
    let path = options.aliases.get(field).map_or(field, String::as_str);
    let join = condition
        .join
        .or_else(|| options.joins.get(field).copied())
        .unwrap_or_default();
    let mut operator = condition
        .operator
        .or_else(|| options.ops.get(field).copied())
        .unwrap_or_default();
    let value = &condition.value;
    if value.is_null() && !matches!(operator, Operator::Null | Operator::NotNull) {
        operator = Operator::Null;
    }
    if key_only && !operator.allowed_in_key_condition() {
        debug!(field, operator = %operator, "dropping operator not usable in a key condition");
        return None;
    }

    let clause = match operator {
        Operator::Between | Operator::NotBetween => between(path, operator, value, table),
        Operator::Null => Some(format!("attribute_not_exists({})", table.alias_for(path))),
        Operator::NotNull => Some(format!("attribute_exists({})", table.alias_for(path))),
        Operator::In | Operator::NotIn => membership(path, operator, value, table),
        Operator::AllIn => {
            let elements = elements(value);
            let name = table.alias_for(path);
            let clauses = elements
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| format!("{} in ({name})", table.value_ref(v)))
                .collect::<Vec<_>>();
            group_expansion(&clauses, join)
        }
        Operator::Contains | Operator::NotContains => {
            let negate = if operator == Operator::NotContains { "not " } else { "" };
            expand(path, value, join, table, Value::is_blank, |name, v| {
                format!("{negate}contains({name}, {v})")
            })
        }
        Operator::BeginsWith | Operator::NotBeginsWith => {
            let negate = if operator == Operator::NotBeginsWith { "not " } else { "" };
            let skip = |v: &Value| v.is_blank() || (v.is_number() && !v.is_truthy());
            expand(path, value, join, table, skip, |name, v| {
                format!("{negate}begins_with({name}, {v})")
            })
        }
        Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
            let symbol = operator.symbol().unwrap_or("=");
            expand(path, value, join, table, Value::is_blank, |name, v| {
                format!("{name} {symbol} {v}")
            })
        }
    };
    if clause.is_none() {
        debug!(field, operator = %operator, "dropping condition that compiles to nothing");
    }
    clause
}

fn between(
    path: &str,
    operator: Operator,
    value: &Value,
    table: &mut PlaceholderTable,
) -> Option<String> {
    let [low, high, ..] = value.as_list()? else {
        return None;
    };
    let name = table.alias_for(path);
    let low = table.value_ref(low);
    let high = table.value_ref(high);
    let negate = if operator == Operator::NotBetween { "not " } else { "" };
    Some(format!("{negate}{name} between {low} and {high}"))
}

fn membership(
    path: &str,
    operator: Operator,
    value: &Value,
    table: &mut PlaceholderTable,
) -> Option<String> {
    let Some(items) = value.as_list() else {
        // A scalar degrades to (in)equality.
        if value.is_blank() {
            return None;
        }
        let symbol = if operator == Operator::NotIn { "<>" } else { "=" };
        let name = table.alias_for(path);
        return Some(format!("{name} {symbol} {}", table.value_ref(value)));
    };
    let members: Vec<&Value> = items.iter().filter(|v| v.is_truthy()).collect();
    if members.is_empty() {
        return None;
    }
    let name = table.alias_for(path);
    let refs = members
        .into_iter()
        .map(|v| table.value_ref(v))
        .collect::<Vec<_>>()
        .join(",");
    let negate = if operator == Operator::NotIn { "not " } else { "" };
    Some(format!("{negate}{name} in ({refs})"))
}

/// One clause per element for list operands, one clause for scalars.
fn expand(
    path: &str,
    value: &Value,
    join: Join,
    table: &mut PlaceholderTable,
    skip: impl Fn(&Value) -> bool,
    render: impl Fn(&str, &str) -> String,
) -> Option<String> {
    let operands: Vec<&Value> = elements(value).into_iter().filter(|&v| !skip(v)).collect();
    if operands.is_empty() {
        return None;
    }
    let name = table.alias_for(path);
    let clauses = operands
        .into_iter()
        .map(|v| {
            let reference = table.value_ref(v);
            render(&name, &reference)
        })
        .collect::<Vec<_>>();
    group_expansion(&clauses, join)
}

fn elements(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn group_expansion(clauses: &[String], join: Join) -> Option<String> {
    match clauses {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(format!("({})", many.join(&format!(" {join} ")))),
    }
}
