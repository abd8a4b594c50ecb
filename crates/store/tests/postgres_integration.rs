//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and are
//! serialized because every test truncates the shared tables.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{ProductId, SessionId};
use domain::{Cart, CartLine, Money, NewProduct, OrderStatus, Product};
use serial_test::serial;
use sqlx::PgPool;
use store::{CatalogStore, OrderLedger, OrderLedgerExt, PostgresStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run the schema migration using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/001_create_shop_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE order_items, orders, products RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

async fn add(store: &PostgresStore, name: &str, cents: i64) -> Product {
    let product =
        NewProduct::new(name, format!("{name} description"), Money::from_cents(cents)).unwrap();
    store.add_product(product).await.unwrap()
}

fn cart(lines: &[(ProductId, i32)]) -> Cart {
    Cart::new(lines.iter().map(|(id, q)| CartLine::new(*id, *q)).collect())
}

async fn count(store: &PostgresStore, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn add_and_list_products() {
    let store = get_test_store().await;
    add(&store, "Smart Watch Pro", 34999).await;
    add(&store, "Portable Power Bank", 4999).await;

    let products = store.list_products().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Portable Power Bank");
    assert_eq!(products[0].price, Money::from_cents(4999));

    let fetched = store.get_product(products[1].id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Smart Watch Pro");
    assert!(store.get_product(ProductId::new(99999)).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn place_order_writes_order_and_items() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;
    let b = add(&store, "B", 500).await;
    let session = SessionId::new("cs_test_scenario");

    let order = store
        .place_order(&session, &cart(&[(a.id, 1), (b.id, 2)]), OrderStatus::Paid)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.total_amount, Money::from_cents(2000));
    assert_eq!(order.items.len(), 2);

    let loaded = store.get_order_by_session(&session).await.unwrap().unwrap();
    assert_eq!(loaded.id, order.id);
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].product_id, a.id);
    assert_eq!(loaded.items[0].price, Money::from_cents(1000));
    assert_eq!(loaded.items[1].quantity, 2);
    assert_eq!(loaded.items[1].price, Money::from_cents(500));
    assert!(store.has_order_for_session(&session).await.unwrap());
}

#[tokio::test]
#[serial]
async fn unique_constraint_rejects_second_order_for_session() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;
    let session = SessionId::new("cs_dup");

    store
        .place_order(&session, &cart(&[(a.id, 1)]), OrderStatus::Paid)
        .await
        .unwrap();
    let result = store
        .place_order(&session, &cart(&[(a.id, 5)]), OrderStatus::Paid)
        .await;

    assert!(matches!(result, Err(StoreError::DuplicateSession(_))));
    assert_eq!(count(&store, "orders").await, 1);
    assert_eq!(count(&store, "order_items").await, 1);
}

#[tokio::test]
#[serial]
async fn concurrent_placements_produce_one_order() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;
    let session = SessionId::new("cs_race");
    let the_cart = cart(&[(a.id, 1)]);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let store = store.clone();
            let session = session.clone();
            let the_cart = the_cart.clone();
            tokio::spawn(async move {
                store
                    .place_order(&session, &the_cart, OrderStatus::Paid)
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::DuplicateSession(_)) => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 4);
    assert_eq!(count(&store, "orders").await, 1);
    assert_eq!(count(&store, "order_items").await, 1);
}

#[tokio::test]
#[serial]
async fn missing_product_rolls_back_everything() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;

    let result = store
        .place_order(
            &SessionId::new("cs_missing"),
            &cart(&[(a.id, 1), (ProductId::new(99999), 1)]),
            OrderStatus::Paid,
        )
        .await;

    assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
    assert_eq!(count(&store, "orders").await, 0);
    assert_eq!(count(&store, "order_items").await, 0);
}

#[tokio::test]
#[serial]
async fn item_price_is_a_snapshot() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;
    let session = SessionId::new("cs_snapshot");
    store
        .place_order(&session, &cart(&[(a.id, 3)]), OrderStatus::Paid)
        .await
        .unwrap();

    let updated = store.update_price(a.id, Money::from_cents(1299)).await.unwrap();
    assert_eq!(updated.price, Money::from_cents(1299));

    let order = store.get_order_by_session(&session).await.unwrap().unwrap();
    assert_eq!(order.items[0].price, Money::from_cents(1000));
    assert_eq!(order.total_amount, Money::from_cents(3000));
}

#[tokio::test]
#[serial]
async fn referenced_product_delete_is_blocked_and_order_delete_cascades() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;
    let order = store
        .place_order(&SessionId::new("cs_fk"), &cart(&[(a.id, 1)]), OrderStatus::Paid)
        .await
        .unwrap();

    assert!(matches!(
        store.delete_product(a.id).await,
        Err(StoreError::ProductInUse(_))
    ));

    assert!(store.delete_order(order.id).await.unwrap());
    assert_eq!(count(&store, "order_items").await, 0);
    store.delete_product(a.id).await.unwrap();
    assert!(matches!(
        store.delete_product(a.id).await,
        Err(StoreError::ProductNotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn paid_orders_are_listed_newest_first() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;

    for (session, status) in [
        ("cs_1", OrderStatus::Paid),
        ("cs_2", OrderStatus::Failed),
        ("cs_3", OrderStatus::Paid),
    ] {
        store
            .place_order(&SessionId::new(session), &cart(&[(a.id, 1)]), status)
            .await
            .unwrap();
    }

    let paid = store.paid_orders().await.unwrap();
    assert_eq!(paid.len(), 2);
    assert_eq!(paid[0].session_id.as_str(), "cs_3");
    assert_eq!(paid[0].items.len(), 1);
    assert_eq!(paid[0].items[0].product_name, "A");

    let all = store.list_orders(None).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
#[serial]
async fn non_positive_price_rejected() {
    let store = get_test_store().await;
    let a = add(&store, "A", 1000).await;
    assert!(matches!(
        store.update_price(a.id, Money::zero()).await,
        Err(StoreError::Order(_))
    ));
}
