//! Single-item and query request builders.
//!
//! Each builder owns one [`PlaceholderTable`] for the whole request, so the
//! update, condition, key-condition, filter and projection expressions of one
//! body never reuse a placeholder.

use docstack_dynamodb_model::codec;
use docstack_dynamodb_model::input::{
    DeleteItemInput, ExtraParams, GetItemInput, PutItemInput, QueryInput, ScanInput,
    UpdateItemInput,
};
use docstack_dynamodb_model::types::{ReturnValue, Select};
use docstack_dynamodb_model::{AttributeMap, Item, Value};
use tracing::debug;

use crate::error::CompileError;
use crate::expression::{
    Condition, ConditionOptions, ConditionTree, Operator, PlaceholderTable, UpdateAction,
    UpdateOptions, compile_condition, compile_key_condition, compile_projection, compile_update,
};
use crate::key::Target;

/// Options for the single-item builders.
#[derive(Debug, Clone, Default)]
pub struct ItemOptions {
    /// Condition the write or check must satisfy.
    pub condition: ConditionTree,
    /// Overrides applied while compiling `condition`.
    pub condition_options: ConditionOptions,
    /// Per-field update actions.
    pub update: UpdateOptions,
    /// Let `update_item` create the item when it does not exist.
    pub upsert: bool,
    /// What a write returns. Inside a transaction any value other than `NONE`
    /// becomes `ReturnValuesOnConditionCheckFailure: ALL_OLD`.
    pub return_values: Option<ReturnValue>,
    /// Attributes `get_item` returns; empty returns all.
    pub projection: Vec<String>,
    /// Strongly consistent read for `get_item`.
    pub consistent_read: Option<bool>,
    /// Pass-through body parameters.
    pub extra: ExtraParams,
}

/// Options for [`query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Key condition; must compile to at least one clause.
    pub key_condition: ConditionTree,
    /// Filter applied after the key condition.
    pub filter: ConditionTree,
    /// Overrides applied to both the key condition and the filter.
    pub condition_options: ConditionOptions,
    /// Secondary index to query.
    pub index_name: Option<String>,
    /// `false` for descending order.
    pub scan_index_forward: Option<bool>,
    /// Page size.
    pub limit: Option<i32>,
    /// `LastEvaluatedKey` of the previous page.
    pub exclusive_start_key: AttributeMap,
    /// Attributes to return; empty returns all.
    pub projection: Vec<String>,
    /// Which attributes to return.
    pub select: Option<Select>,
    /// Strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Pass-through body parameters.
    pub extra: ExtraParams,
}

/// Options for [`scan`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Filter applied to every evaluated item.
    pub filter: ConditionTree,
    /// Overrides applied to the filter.
    pub condition_options: ConditionOptions,
    /// Secondary index to scan.
    pub index_name: Option<String>,
    /// Page size.
    pub limit: Option<i32>,
    /// `LastEvaluatedKey` of the previous page.
    pub exclusive_start_key: AttributeMap,
    /// Attributes to return; empty returns all.
    pub projection: Vec<String>,
    /// Which attributes to return.
    pub select: Option<Select>,
    /// Pass-through body parameters.
    pub extra: ExtraParams,
}

/// Replace an item.
///
/// # Errors
///
/// [`CompileError::MissingKey`] when the item lacks a key attribute.
pub fn put_item(
    target: &Target,
    item: &Item,
    options: &ItemOptions,
) -> Result<PutItemInput, CompileError> {
    target.key(item)?;
    let mut table = PlaceholderTable::new();
    let condition = guarded_condition(None, options, &mut table);
    let (names, values) = table.into_parts();
    Ok(PutItemInput {
        table_name: target.table.clone(),
        item: codec::to_item(item),
        condition_expression: condition,
        expression_attribute_names: names,
        expression_attribute_values: values,
        return_values: options.return_values,
        return_consumed_capacity: None,
        extra: options.extra.clone(),
    })
}

/// Insert an item that must not exist yet.
///
/// # Errors
///
/// [`CompileError::MissingKey`] when the item lacks a key attribute.
pub fn add_item(
    target: &Target,
    item: &Item,
    options: &ItemOptions,
) -> Result<PutItemInput, CompileError> {
    target.key(item)?;
    let mut table = PlaceholderTable::new();
    let guard = Condition::with_operator(
        target.key_schema.partition_key.clone(),
        Operator::Null,
        Value::Null,
    );
    let condition = guarded_condition(Some(guard), options, &mut table);
    let (names, values) = table.into_parts();
    Ok(PutItemInput {
        table_name: target.table.clone(),
        item: codec::to_item(item),
        condition_expression: condition,
        expression_attribute_names: names,
        expression_attribute_values: values,
        return_values: options.return_values,
        return_consumed_capacity: None,
        extra: options.extra.clone(),
    })
}

/// Update the non-key attributes of an item. Unless `upsert` is set the item
/// must already exist. `Ok(None)` means the update changes nothing and no
/// request should be sent.
///
/// # Errors
///
/// [`CompileError::MissingKey`] when the item lacks a key attribute.
pub fn update_item(
    target: &Target,
    item: &Item,
    options: &ItemOptions,
) -> Result<Option<UpdateItemInput>, CompileError> {
    let key = target.key(item)?;
    let mut table = PlaceholderTable::new();
    let Some(update) = compile_update(item, &target.key_schema, &options.update, &mut table)
    else {
        debug!(table = %target.table, "update compiles to nothing, skipping");
        return Ok(None);
    };
    let guard = (!options.upsert).then(|| {
        Condition::with_operator(
            target.key_schema.partition_key.clone(),
            Operator::NotNull,
            Value::Null,
        )
    });
    let condition = guarded_condition(guard, options, &mut table);
    let (names, values) = table.into_parts();
    Ok(Some(UpdateItemInput {
        table_name: target.table.clone(),
        key,
        update_expression: Some(update),
        condition_expression: condition,
        expression_attribute_names: names,
        expression_attribute_values: values,
        return_values: options.return_values,
        return_consumed_capacity: None,
        extra: options.extra.clone(),
    }))
}

/// [`update_item`] whose fields increment unless an explicit action says
/// otherwise.
///
/// # Errors
///
/// [`CompileError::MissingKey`] when the item lacks a key attribute.
pub fn incr_item(
    target: &Target,
    item: &Item,
    options: &ItemOptions,
) -> Result<Option<UpdateItemInput>, CompileError> {
    let mut options = options.clone();
    options.update.default_action = UpdateAction::Incr;
    update_item(target, item, &options)
}

/// Delete the item whose key `item` carries.
///
/// # Errors
///
/// [`CompileError::MissingKey`] when the item lacks a key attribute.
pub fn delete_item(
    target: &Target,
    item: &Item,
    options: &ItemOptions,
) -> Result<DeleteItemInput, CompileError> {
    let key = target.key(item)?;
    let mut table = PlaceholderTable::new();
    let condition = guarded_condition(None, options, &mut table);
    let (names, values) = table.into_parts();
    Ok(DeleteItemInput {
        table_name: target.table.clone(),
        key,
        condition_expression: condition,
        expression_attribute_names: names,
        expression_attribute_values: values,
        return_values: options.return_values,
        extra: options.extra.clone(),
    })
}

/// Read the item whose key `item` carries.
///
/// # Errors
///
/// [`CompileError::MissingKey`] when the item lacks a key attribute.
pub fn get_item(
    target: &Target,
    item: &Item,
    options: &ItemOptions,
) -> Result<GetItemInput, CompileError> {
    let key = target.key(item)?;
    let mut table = PlaceholderTable::new();
    let projection = compile_projection(options.projection.as_slice(), &mut table);
    let (names, _) = table.into_parts();
    Ok(GetItemInput {
        table_name: target.table.clone(),
        key,
        projection_expression: projection,
        expression_attribute_names: names,
        consistent_read: options.consistent_read,
        extra: options.extra.clone(),
    })
}

/// Query one partition.
///
/// # Errors
///
/// [`CompileError::MissingKeyCondition`] when the key condition compiles to
/// nothing.
pub fn query(table_name: &str, options: &QueryOptions) -> Result<QueryInput, CompileError> {
    let mut table = PlaceholderTable::new();
    let key_condition =
        compile_key_condition(&options.key_condition, &options.condition_options, &mut table)
            .ok_or_else(|| CompileError::MissingKeyCondition {
                table: table_name.to_owned(),
            })?;
    let filter = compile_condition(&options.filter, &options.condition_options, &mut table);
    let projection = compile_projection(options.projection.as_slice(), &mut table);
    let (names, values) = table.into_parts();
    Ok(QueryInput {
        table_name: table_name.to_owned(),
        index_name: options.index_name.clone(),
        key_condition_expression: Some(key_condition),
        filter_expression: filter,
        projection_expression: projection,
        expression_attribute_names: names,
        expression_attribute_values: values,
        scan_index_forward: options.scan_index_forward,
        limit: options.limit,
        exclusive_start_key: options.exclusive_start_key.clone(),
        select: options.select,
        consistent_read: options.consistent_read,
        extra: options.extra.clone(),
    })
}

/// Scan a table or index.
#[must_use]
pub fn scan(table_name: &str, options: &ScanOptions) -> ScanInput {
    let mut table = PlaceholderTable::new();
    let filter = compile_condition(&options.filter, &options.condition_options, &mut table);
    let projection = compile_projection(options.projection.as_slice(), &mut table);
    let (names, values) = table.into_parts();
    ScanInput {
        table_name: table_name.to_owned(),
        index_name: options.index_name.clone(),
        filter_expression: filter,
        projection_expression: projection,
        expression_attribute_names: names,
        expression_attribute_values: values,
        limit: options.limit,
        exclusive_start_key: options.exclusive_start_key.clone(),
        select: options.select,
        extra: options.extra.clone(),
    }
}

/// The caller's condition, prefixed by an existence guard on the partition key
/// when one is given. The guard always joins with `AND`.
pub(crate) fn guarded_condition(
    guard: Option<Condition>,
    options: &ItemOptions,
    table: &mut PlaceholderTable,
) -> Option<String> {
    let guard = guard.and_then(|g| {
        compile_condition(
            &ConditionTree::new().with(g),
            &ConditionOptions::default(),
            table,
        )
    });
    let user = compile_condition(&options.condition, &options.condition_options, table);
    match (guard, user) {
        (Some(guard), Some(user)) => Some(format!("{guard} AND ({user})")),
        (guard, user) => guard.or(user),
    }
}

#[cfg(test)]
mod tests {
    use docstack_dynamodb_model::AttributeValue;
    use docstack_dynamodb_model::input::ExpressionNames;

    use super::*;
    use crate::key::KeySchema;

    fn users() -> Target {
        Target::new("users", KeySchema::new("pk"))
    }

    fn item(entries: &[(&str, Value)]) -> Item {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn test_should_build_put_item() {
        let input = put_item(
            &users(),
            &item(&[("pk", Value::from("u1")), ("tags", Value::from(vec!["a", "b"]))]),
            &ItemOptions::default(),
        )
        .unwrap();
        assert_eq!(input.table_name, "users");
        assert_eq!(
            input.item["tags"],
            AttributeValue::Ss(vec!["a".to_owned(), "b".to_owned()])
        );
        assert_eq!(input.condition_expression, None);
        assert!(input.expression_attribute_values.is_empty());
    }

    #[test]
    fn test_should_guard_add_item_against_existing_key() {
        let options = ItemOptions {
            condition: ConditionTree::new().field("status", "new"),
            ..ItemOptions::default()
        };
        let input = add_item(&users(), &item(&[("pk", Value::from("u1"))]), &options).unwrap();
        assert_eq!(
            input.condition_expression.as_deref(),
            Some("attribute_not_exists(pk) AND (#n0 = :v0)")
        );
        assert_eq!(input.expression_attribute_names["#n0"], "status");
    }

    #[test]
    fn test_should_share_placeholders_between_update_and_condition() {
        let options = ItemOptions {
            condition: ConditionTree::new().op("name", Operator::Ne, "x"),
            ..ItemOptions::default()
        };
        let input = update_item(
            &users(),
            &item(&[("pk", Value::from("u1")), ("name", Value::from("bob"))]),
            &options,
        )
        .unwrap()
        .unwrap();
        assert_eq!(input.update_expression.as_deref(), Some("SET #n0 = :v0"));
        assert_eq!(
            input.condition_expression.as_deref(),
            Some("attribute_exists(pk) AND (#n0 <> :v1)")
        );
        let mut expected = ExpressionNames::new();
        expected.insert("#n0".to_owned(), "name".to_owned());
        assert_eq!(input.expression_attribute_names, expected);
        assert_eq!(input.key["pk"], AttributeValue::S("u1".to_owned()));
    }

    #[test]
    fn test_should_skip_existence_guard_on_upsert() {
        let options = ItemOptions {
            upsert: true,
            ..ItemOptions::default()
        };
        let input = update_item(
            &users(),
            &item(&[("pk", Value::from("u1")), ("age", Value::Int(3))]),
            &options,
        )
        .unwrap()
        .unwrap();
        assert_eq!(input.condition_expression, None);
    }

    #[test]
    fn test_should_return_none_for_empty_update() {
        let result = update_item(
            &users(),
            &item(&[("pk", Value::from("u1"))]),
            &ItemOptions::default(),
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_should_default_incr_item_fields_to_increment() {
        let input = incr_item(
            &users(),
            &item(&[("pk", Value::from("u1")), ("visits", Value::Int(1))]),
            &ItemOptions::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            input.update_expression.as_deref(),
            Some("SET visits = if_not_exists(visits, :v0) + :v1")
        );
    }

    #[test]
    fn test_should_reject_missing_key() {
        let err = delete_item(&users(), &item(&[("name", Value::from("x"))]), &ItemOptions::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::MissingKey { .. }));
    }

    #[test]
    fn test_should_build_get_item_with_projection() {
        let options = ItemOptions {
            projection: vec!["pk".to_owned(), "name".to_owned()],
            consistent_read: Some(true),
            ..ItemOptions::default()
        };
        let input = get_item(&users(), &item(&[("pk", Value::from("u1"))]), &options).unwrap();
        assert_eq!(input.projection_expression.as_deref(), Some("pk, #n0"));
        assert_eq!(input.consistent_read, Some(true));
    }

    #[test]
    fn test_should_build_query_with_shared_table() {
        let options = QueryOptions {
            key_condition: ConditionTree::new()
                .field("pk", "u1")
                .op("sk", Operator::BeginsWith, "order#"),
            filter: ConditionTree::new().op("status", Operator::In, vec!["open", "paid"]),
            projection: vec!["status".to_owned()],
            scan_index_forward: Some(false),
            limit: Some(10),
            ..QueryOptions::default()
        };
        let input = query("orders", &options).unwrap();
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("pk = :v0 AND begins_with(sk, :v1)")
        );
        assert_eq!(input.filter_expression.as_deref(), Some("#n0 in (:v2,:v3)"));
        assert_eq!(input.projection_expression.as_deref(), Some("#n0"));
        assert_eq!(input.expression_attribute_values.len(), 4);
        assert_eq!(input.scan_index_forward, Some(false));
    }

    #[test]
    fn test_should_reject_query_without_key_condition() {
        let options = QueryOptions {
            key_condition: ConditionTree::new().op("pk", Operator::Contains, "x"),
            ..QueryOptions::default()
        };
        assert!(matches!(
            query("orders", &options),
            Err(CompileError::MissingKeyCondition { .. })
        ));
    }

    #[test]
    fn test_should_build_scan_with_filter() {
        let options = ScanOptions {
            filter: ConditionTree::new().op("age", Operator::Gt, 21),
            ..ScanOptions::default()
        };
        let input = scan("users", &options);
        assert_eq!(input.filter_expression.as_deref(), Some("age > :v0"));
        assert_eq!(input.projection_expression, None);
    }
}
