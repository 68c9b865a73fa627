//! SELECT Execution Tests
//!
//! Tests for execution semantics:
//! - Streaming keeps source order and original fields
//! - Projections rename fields and keep nulls
//! - Grouping and ordering buffer, then honor skip and limit
//! - Every target kind resolves to the right records

use aeroql::executor::{CollectingListener, SortDirection, Target};
use aeroql::{
    CallableRegistry, Expr, MemoryStore, Parameters, QueryExecutor, Record, RecordStore, SelectQuery, Value,
};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn cars() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_json("Car", &json!({"name": "tempo", "size": 250})).unwrap();
    store.insert_json("Car", &json!({"name": "fiesta", "size": 160})).unwrap();
    store.insert_json("Car", &json!({"name": null, "size": 260})).unwrap();
    store.insert_json("Car", &json!({"name": "supreme", "size": 310})).unwrap();
    store
}

fn sales() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_json("Sale", &json!({"brand": "ford", "amount": 10})).unwrap();
    store.insert_json("Sale", &json!({"brand": "fiat", "amount": 5})).unwrap();
    store.insert_json("Sale", &json!({"brand": "ford", "amount": 7})).unwrap();
    store.insert_json("Sale", &json!({"brand": "bmw", "amount": 30})).unwrap();
    store
}

fn run(store: &MemoryStore, query: &SelectQuery) -> Vec<Record> {
    QueryExecutor::new(store)
        .execute_collect(query, &Parameters::new())
        .unwrap()
}

fn column(records: &[Record], field: &str) -> Vec<Value> {
    records
        .iter()
        .map(|r| r.field(field).cloned().unwrap_or_default())
        .collect()
}

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

// =============================================================================
// Streaming Tests
// =============================================================================

/// Filtered records come back in source order with all their fields.
#[test]
fn test_filter_keeps_order_and_fields() {
    let store = cars();
    let query = SelectQuery::from_class("Car").filter(Expr::gt(Expr::name("size"), Expr::literal(200)));
    let rows = run(&store, &query);

    assert_eq!(
        column(&rows, "name"),
        vec![Value::from("tempo"), Value::Null, Value::from("supreme")]
    );
    assert_eq!(column(&rows, "size"), vec![Value::Integer(250), Value::Integer(260), Value::Integer(310)]);
    assert!(rows.iter().all(|r| r.len() == 2));
}

/// Null tests combine with nested OR.
#[test]
fn test_not_null_and_nested_or() {
    let store = cars();
    let filter = Expr::and(
        Expr::is_not_null(Expr::name("name")),
        Expr::or(
            Expr::lt(Expr::name("size"), Expr::literal(200)),
            Expr::eq(Expr::name("name"), Expr::literal("tempo")),
        ),
    );
    let rows = run(&store, &SelectQuery::from_class("Car").filter(filter));
    assert_eq!(column(&rows, "name"), strings(&["tempo", "fiesta"]));
}

/// An aliased projection is the only output field and keeps nulls.
#[test]
fn test_alias_projection_keeps_nulls() {
    let store = cars();
    let query = SelectQuery::from_class("Car").project(Expr::name("name").with_alias("brand"));
    let rows = run(&store, &query);

    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.field_names() == vec!["brand"]));
    assert_eq!(rows[2].field("brand"), Some(&Value::Null));
    assert_eq!(rows[2].id(), None);
}

/// Skip counts matching records, not scanned ones.
#[test]
fn test_streaming_skip_and_limit() {
    let store = cars();
    let query = SelectQuery::from_class("Car")
        .filter(Expr::gt(Expr::name("size"), Expr::literal(200)))
        .skip(1)
        .limit(1);
    let mut listener = CollectingListener::new();
    let stats = QueryExecutor::new(&store)
        .execute(&query, &Parameters::new(), &mut listener)
        .unwrap();

    assert_eq!(column(&listener.records, "size"), vec![Value::Integer(260)]);
    assert!(stats.limit_reached);
    assert_eq!(stats.scanned, 3);
}

/// A limit of zero returns nothing without scanning.
#[test]
fn test_zero_limit() {
    let store = cars();
    let mut listener = CollectingListener::new();
    let stats = QueryExecutor::new(&store)
        .execute(&SelectQuery::from_class("Car").limit(0), &Parameters::new(), &mut listener)
        .unwrap();
    assert!(listener.records.is_empty());
    assert_eq!(stats.scanned, 0);
}

/// Positional parameters bind into the filter.
#[test]
fn test_parameters_bind_per_execution() {
    let store = cars();
    let query = SelectQuery::from_class("Car").filter(Expr::eq(Expr::name("name"), Expr::param()));
    let executor = QueryExecutor::new(&store);

    let first = executor.execute_collect(&query, &Parameters::new().push("fiesta")).unwrap();
    let second = executor.execute_collect(&query, &Parameters::new().push("supreme")).unwrap();
    assert_eq!(column(&first, "size"), vec![Value::Integer(160)]);
    assert_eq!(column(&second, "size"), vec![Value::Integer(310)]);
}

/// Query variables are visible to the filter.
#[test]
fn test_query_variables() {
    let store = cars();
    let query = SelectQuery::from_class("Car")
        .variable("min", 300)
        .filter(Expr::gt(Expr::name("size"), Expr::variable("min")));
    assert_eq!(column(&run(&store, &query), "name"), strings(&["supreme"]));
}

// =============================================================================
// Ordering and Grouping Tests
// =============================================================================

/// Skip drops matches in source order before sorting; limit cuts the sorted rows.
#[test]
fn test_order_by_with_skip_and_limit() {
    let store = cars();
    let query = SelectQuery::from_class("Car")
        .order_by(Expr::name("name"), SortDirection::Asc)
        .skip(1)
        .limit(2);
    let rows = run(&store, &query);
    assert_eq!(column(&rows, "name"), vec![Value::Null, Value::from("fiesta")]);
}

/// Descending order puts nulls last.
#[test]
fn test_order_by_desc() {
    let store = cars();
    let query = SelectQuery::from_class("Car")
        .project(Expr::name("name"))
        .order_by(Expr::name("name"), SortDirection::Desc);
    let rows = run(&store, &query);
    assert_eq!(
        column(&rows, "name"),
        vec![Value::from("tempo"), Value::from("supreme"), Value::from("fiesta"), Value::Null]
    );
}

/// Group-by folds each bucket separately, then orders output rows.
#[test]
fn test_group_by_with_aggregate_and_order() {
    let store = sales();
    let registry = CallableRegistry::with_builtins();
    let query = SelectQuery::from_class("Sale")
        .project(Expr::name("brand"))
        .project(
            Expr::function(&registry, "sum", vec![Expr::name("amount")])
                .unwrap()
                .with_alias("total"),
        )
        .group_by(Expr::name("brand"))
        .order_by(Expr::name("total"), SortDirection::Desc);
    let rows = run(&store, &query);

    assert_eq!(column(&rows, "brand"), strings(&["bmw", "ford", "fiat"]));
    assert_eq!(
        column(&rows, "total"),
        vec![Value::Integer(30), Value::Integer(17), Value::Integer(5)]
    );
}

/// Group-by without projections keeps one record per bucket.
#[test]
fn test_group_by_without_projections() {
    let store = sales();
    let query = SelectQuery::from_class("Sale").group_by(Expr::name("brand"));
    let rows = run(&store, &query);
    assert_eq!(column(&rows, "brand"), strings(&["ford", "fiat", "bmw"]));
    assert_eq!(rows[0].field("amount"), Some(&Value::Integer(10)));
}

/// A whole-source aggregate yields one row.
#[test]
fn test_aggregate_without_group_by() {
    let store = sales();
    let registry = CallableRegistry::with_builtins();
    let query = SelectQuery::from_class("Sale")
        .project(Expr::function(&registry, "count", vec![Expr::name("brand")]).unwrap());
    let rows = run(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].field("count"), Some(&Value::Integer(4)));
}

/// Grouping and ordering over an empty source return nothing.
#[test]
fn test_empty_source_with_group_and_order() {
    let mut store = MemoryStore::new();
    store.create_class("Sale", None).unwrap();
    let registry = CallableRegistry::with_builtins();
    let query = SelectQuery::from_class("Sale")
        .project(Expr::function(&registry, "count", vec![Expr::name("brand")]).unwrap())
        .group_by(Expr::name("brand"))
        .order_by(Expr::name("brand"), SortDirection::Asc);
    assert!(run(&store, &query).is_empty());
}

// =============================================================================
// Target Tests
// =============================================================================

/// A sub-query feeds the outer query.
#[test]
fn test_sub_query_target() {
    let store = cars();
    let inner = SelectQuery::from_class("Car").filter(Expr::gt(Expr::name("size"), Expr::literal(200)));
    let query = SelectQuery::from(Target::SubQuery(Box::new(inner)))
        .project(Expr::name("name"))
        .filter(Expr::is_not_null(Expr::name("name")));
    assert_eq!(column(&run(&store, &query), "name"), strings(&["tempo", "supreme"]));
}

/// Clusters and dictionary keys resolve to stored records.
#[test]
fn test_cluster_and_dictionary_targets() {
    let mut store = cars();
    let rids: Vec<_> = store.browse_class("Car").unwrap().map(|r| r.unwrap()).collect();
    store.put_dictionary("smallest", rids[1]);

    let by_cluster = run(&store, &SelectQuery::from(Target::Clusters(vec!["car".into()])));
    assert_eq!(by_cluster.len(), 4);

    let by_key = run(
        &store,
        &SelectQuery::from(Target::Dictionary(vec!["smallest".into(), "missing".into()])),
    );
    assert_eq!(column(&by_key, "name"), strings(&["fiesta"]));
}

/// Deleted identities in a record target are skipped.
#[test]
fn test_record_target_skips_deleted() {
    let mut store = cars();
    let rids: Vec<_> = store.browse_class("Car").unwrap().map(|r| r.unwrap()).collect();
    store.delete(rids[0]);
    let rows = run(&store, &SelectQuery::from(Target::Records(vec![rids[0], rids[3]])));
    assert_eq!(column(&rows, "name"), strings(&["supreme"]));
}

/// A missing class is an error.
#[test]
fn test_unknown_class_fails() {
    let store = cars();
    let err = QueryExecutor::new(&store)
        .execute_collect(&SelectQuery::from_class("Boat"), &Parameters::new())
        .unwrap_err();
    assert_eq!(err.code(), "AERO_QUERY_STORAGE");
}

/// A filter that can never be a condition fails before any record is read.
#[test]
fn test_malformed_filter_is_rejected() {
    let store = cars();
    let executor = QueryExecutor::new(&store);
    let mut listener = CollectingListener::new();
    let err = executor
        .execute(
            &SelectQuery::from_class("Car").filter(Expr::literal("tempo")),
            &Parameters::new(),
            &mut listener,
        )
        .unwrap_err();

    assert_eq!(err.code(), "AERO_QUERY_MALFORMED_PREDICATE");
    assert!(err.is_definition_error());
    assert!(listener.records.is_empty());
    assert_eq!(executor.metrics().snapshot().records_scanned, 0);
}
