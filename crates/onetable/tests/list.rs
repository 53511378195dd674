use onetable::{CounterSink, Error, ErrorKind, ErrorOrigin, Store};
use onetable_core::{
    client::ClientError,
    query::{KeyOp, ListQuery},
    table::Table,
    testing::{
        MemoryClient,
        fixtures::{Order, User, open_table, open_table_with, table_config},
    },
    value::AttributeValue,
};
use std::sync::Arc;

fn order(id: &str, kind: &str, created_at: &str, status: &str, total: i64) -> Order {
    Order {
        tenant_id: "t1".into(),
        kind: kind.into(),
        created_at: created_at.into(),
        id: id.into(),
        status: status.into(),
        total,
        ..Order::default()
    }
}

fn profile(id: &str) -> User {
    User {
        id: id.into(),
        email: "ada@example.com".into(),
        tenant: "acme".into(),
        name: "Ada".into(),
        ..User::default()
    }
}

fn seeded(client: Arc<MemoryClient>) -> Table {
    let table = open_table(client);
    seed(&table);
    table
}

fn seed(table: &Table) {
    for record in [
        order("o1", "order", "2024-01-01", "open", 10),
        order("o2", "order", "2024-01-02", "closed", 20),
        order("o3", "order", "2024-01-03", "open", 30),
        order("r1", "refund", "2024-01-02", "open", 5),
        Order {
            tenant_id: "t2".into(),
            ..order("x1", "order", "2024-01-01", "open", 10)
        },
    ] {
        table.create(&record).expect("seed order");
    }
}

fn ids(query: &ListQuery) -> Vec<&str> {
    query.records::<Order>().map(|o| o.id.as_str()).collect()
}

fn list(table: &Table, mut query: ListQuery) -> ListQuery {
    table.list(&mut query).expect("list");
    query
}

#[test]
fn leading_sort_field_lists_one_kind_in_order() {
    let client = Arc::new(MemoryClient::new());
    let table = seeded(client.clone());

    let query = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("kind", "order"),
    );
    assert_eq!(ids(&query), vec!["o1", "o2", "o3"]);
    assert_eq!(query.next_page_token, None);

    let request = client.queries().pop().expect("query sent");
    assert_eq!(request.index_name, None);
    assert_eq!(
        request.key_condition_expression,
        "pk=:pk AND begins_with(sk,:sk)"
    );
    assert_eq!(
        request.expression_attribute_values.get(":sk"),
        Some(&AttributeValue::text("order:"))
    );
}

#[test]
fn descending_lists_newest_first() {
    let table = seeded(Arc::new(MemoryClient::new()));

    let query = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("kind", "order")
            .ascending(false),
    );
    assert_eq!(ids(&query), vec!["o3", "o2", "o1"]);
}

#[test]
fn listed_records_recover_key_fields() {
    let table = seeded(Arc::new(MemoryClient::new()));

    let query = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("kind", "order"),
    );
    let first = query.records::<Order>().next().expect("one order");
    assert_eq!(first.created_at, "2024-01-01");
    assert_eq!(first.total, 10);
}

#[test]
fn other_types_in_the_partition_do_not_fail_the_page() {
    let table = open_table(Arc::new(MemoryClient::new()));
    table.create(&profile("t1")).expect("create user");
    table
        .create(&order("o1", "order", "2024-01-01", "open", 10))
        .expect("create order");

    let query = list(&table, ListQuery::of::<Order>().field("tenant_id", "t1"));
    assert_eq!(query.items.len(), 2);

    let listed = query
        .records::<Order>()
        .find(|o| o.id == "o1")
        .expect("order listed");
    assert_eq!(listed.kind, "order");
    assert_eq!(listed.created_at, "2024-01-01");
}

#[test]
fn type_discriminator_keeps_types_apart_in_one_partition() {
    let client = Arc::new(MemoryClient::new());
    let table = open_table_with(table_config().type_discriminator(true), client.clone());
    table.create(&profile("t1")).expect("create user");
    for record in [
        order("o1", "order", "2024-01-01", "open", 10),
        order("o2", "order", "2024-01-02", "open", 20),
    ] {
        table.create(&record).expect("create order");
    }

    let sort_keys: Vec<String> = client
        .items()
        .iter()
        .filter_map(|item| item.get("sk").and_then(AttributeValue::as_key_text))
        .collect();
    assert!(sort_keys.contains(&"Order:order:2024-01-01".to_string()));
    assert!(sort_keys.contains(&"Profile".to_string()));

    let query = list(&table, ListQuery::of::<Order>().field("tenant_id", "t1"));
    assert_eq!(query.items.len(), 2);
    assert_eq!(ids(&query), vec!["o1", "o2"]);
    let first = query.records::<Order>().next().expect("order");
    assert_eq!(first.kind, "order");
    assert_eq!(first.created_at, "2024-01-01");

    let request = client.queries().pop().expect("query sent");
    assert_eq!(
        request.key_condition_expression,
        "pk=:pk AND begins_with(sk,:sk)"
    );
    assert_eq!(
        request.expression_attribute_values.get(":sk"),
        Some(&AttributeValue::text("Order:"))
    );
}

#[test]
fn reserved_filter_field_is_aliased() {
    let client = Arc::new(MemoryClient::new());
    let table = seeded(client.clone());

    let query = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("status", "open"),
    );
    assert_eq!(ids(&query), vec!["o1", "o3", "r1"]);

    let request = client.queries().pop().expect("query sent");
    assert_eq!(request.filter_expression.as_deref(), Some("#a0=:f0"));
    assert_eq!(
        request.expression_attribute_names.get("#a0"),
        Some(&"status".to_string())
    );
}

#[test]
fn numeric_filters_compare_numbers() {
    let table = seeded(Arc::new(MemoryClient::new()));

    let query = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("total", 20_i64),
    );
    assert_eq!(ids(&query), vec!["o2"]);
}

#[test]
fn range_hint_bounds_a_complete_sort_key() {
    let table = seeded(Arc::new(MemoryClient::new()));

    let query = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("kind", "order")
            .field("created_at", "2024-01-02")
            .key_op(KeyOp::Lte),
    );
    assert_eq!(ids(&query), vec!["o1", "o2"]);
}

#[test]
fn wildcard_is_a_prefix_match() {
    let table = seeded(Arc::new(MemoryClient::new()));

    let query = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("kind", "re*"),
    );
    assert_eq!(ids(&query), vec!["r1"]);
}

#[test]
fn wildcard_with_range_hint_is_a_configuration_error() {
    let table = seeded(Arc::new(MemoryClient::new()));

    let mut query = ListQuery::of::<Order>()
        .field("tenant_id", "t1")
        .field("kind", "re*")
        .key_op(KeyOp::Gt);
    let err = Error::from(table.list(&mut query).expect_err("ambiguous"));
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn global_index_serves_id_lookups() {
    let client = Arc::new(MemoryClient::new());
    let table = seeded(client.clone());

    let query = list(&table, ListQuery::of::<Order>().field("id", "o2"));
    assert_eq!(ids(&query), vec!["o2"]);
    assert_eq!(
        query.records::<Order>().next().map(|o| o.kind.as_str()),
        Some("order")
    );

    let request = client.queries().pop().expect("query sent");
    assert_eq!(request.index_name.as_deref(), Some("gsi1"));
    assert_eq!(request.key_condition_expression, "gsi1pk=:pk");
    assert!(!request.consistent_read);
}

#[test]
fn pages_follow_the_continuation_token() {
    let client = Arc::new(MemoryClient::new());
    let table = seeded(client.clone());
    let base = || {
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .field("kind", "order")
            .page_size(2)
    };

    let first = list(&table, base());
    assert_eq!(ids(&first), vec!["o1", "o2"]);
    let token = first.next_page_token.clone().expect("more pages");
    assert!(!token.contains("order"));

    let second = list(&table, base().page_token(token));
    assert_eq!(ids(&second), vec!["o3"]);
    assert_eq!(second.next_page_token, None);

    let limits: Vec<_> = client.queries().iter().map(|q| q.limit).collect();
    assert_eq!(limits, vec![2, 2]);
}

#[test]
fn page_size_is_capped_at_the_configured_maximum() {
    let client = Arc::new(MemoryClient::new());
    let table = seeded(client.clone());

    list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .page_size(5_000),
    );
    list(&table, ListQuery::of::<Order>().field("tenant_id", "t1"));

    let limits: Vec<_> = client.queries().iter().map(|q| q.limit).collect();
    assert_eq!(limits, vec![100, 25]);
}

#[test]
fn token_is_bound_to_the_query_shape() {
    let sink = Arc::new(CounterSink::new());
    let client = Arc::new(MemoryClient::new());
    let table = open_table_with(table_config().metrics(sink.clone()), client);
    seed(&table);

    let first = list(
        &table,
        ListQuery::of::<Order>()
            .field("tenant_id", "t1")
            .page_size(1),
    );
    let token = first.next_page_token.expect("more pages");

    // same filters plus `id` moves the query to gsi1
    let mut moved = ListQuery::of::<Order>()
        .field("tenant_id", "t1")
        .field("id", "o1")
        .page_token(token);
    let err = Error::from(table.list(&mut moved).expect_err("shape changed"));
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(err.origin, ErrorOrigin::Cursor);

    let mut forged = ListQuery::of::<Order>()
        .field("tenant_id", "t1")
        .page_token("not-a-token");
    let err = Error::from(table.list(&mut forged).expect_err("forged"));
    assert_eq!(err.origin, ErrorOrigin::Cursor);

    assert_eq!(sink.report().tokens_rejected, 2);
}

#[test]
fn unregistered_type_is_a_configuration_error() {
    let table = open_table(Arc::new(MemoryClient::new()));

    let mut query = ListQuery::new("Ghost").field("tenant_id", "t1");
    let err = Error::from(table.list(&mut query).expect_err("unknown type"));
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn missing_index_is_unprocessable() {
    let client = Arc::new(MemoryClient::new());
    let table = open_table(client.clone());
    client.push_page(Err(ClientError::ResourceNotFound("gone".into())));

    let mut query = ListQuery::of::<Order>().field("tenant_id", "t1");
    let err = Error::from(table.list(&mut query).expect_err("gone"));
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert!(err.message.contains("unprocessable table 'app'"));
}
