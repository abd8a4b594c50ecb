use std::collections::HashMap;

use async_trait::async_trait;
use common::{OrderId, ProductId, SessionId};
use domain::{
    Cart, Money, NewOrder, NewOrderItem, NewProduct, Order, OrderItem, OrderStatus, Product,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{CatalogStore, OrderLedger},
};

/// Unique constraint guaranteeing one order per payment session.
pub const SESSION_UNIQUE_CONSTRAINT: &str = "orders_session_id_key";

/// Foreign key that blocks deleting products referenced by order items.
pub const PRODUCT_FK_CONSTRAINT: &str = "order_items_product_fk";

/// PostgreSQL-backed catalog and order ledger.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::new(row.try_get::<Decimal, _>("price")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            session_id: SessionId::new(row.try_get::<String, _>("session_id")?),
            status: status.parse()?,
            total_amount: Money::new(row.try_get::<Decimal, _>("total_amount")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items: Vec::new(),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            price: Money::new(row.try_get::<Decimal, _>("price")?),
        })
    }

    /// Loads the items for a set of orders and attaches them in id order.
    async fn attach_items(&self, orders: &mut [Order]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let rows = sqlx::query(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let item = Self::row_to_item(row)?;
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in orders.iter_mut() {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }
}

fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err
        && db_err.constraint() == Some(constraint)
    {
        return true;
    }
    false
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, created_at, updated_at
            FROM products
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, name, description, price, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn add_product(&self, product: NewProduct) -> Result<Product> {
        product.price.ensure_valid_price()?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price, created_at, updated_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn update_price(&self, id: ProductId, price: Money) -> Result<Product> {
        price.ensure_valid_price()?;

        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE products SET price = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price, created_at, updated_at
            "#,
        )
        .bind(id.as_i64())
        .bind(price.amount())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product)
            .transpose()?
            .ok_or(StoreError::ProductNotFound(id))
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if violates(&e, PRODUCT_FK_CONSTRAINT) {
                    return StoreError::ProductInUse(id);
                }
                StoreError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderLedger for PostgresStore {
    async fn has_order_for_session(&self, session_id: &SessionId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE session_id = $1)")
                .bind(session_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn get_order_by_session(&self, session_id: &SessionId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, session_id, status, total_amount, created_at, updated_at
            FROM orders
            WHERE session_id = $1
            "#,
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut orders = [Self::row_to_order(&row)?];
        self.attach_items(&mut orders).await?;
        let [order] = orders;
        Ok(Some(order))
    }

    async fn place_order(
        &self,
        session_id: &SessionId,
        cart: &Cart,
        status: OrderStatus,
    ) -> Result<Order> {
        // Start a transaction; dropping it without commit rolls everything back
        let mut tx = self.pool.begin().await?;

        // Re-resolve products and capture their prices inside the transaction
        let mut items = Vec::with_capacity(cart.len());
        for line in cart {
            let row: Option<PgRow> = sqlx::query(
                r#"
                SELECT id, name, description, price, created_at, updated_at
                FROM products
                WHERE id = $1
                FOR SHARE
                "#,
            )
            .bind(line.product_id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;

            let product = row
                .map(Self::row_to_product)
                .transpose()?
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            items.push(NewOrderItem::priced(&product, line.quantity)?);
        }
        let new_order = NewOrder::new(session_id.clone(), status, items)?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (session_id, status, total_amount)
            VALUES ($1, $2, $3)
            RETURNING id, session_id, status, total_amount, created_at, updated_at
            "#,
        )
        .bind(new_order.session_id().as_str())
        .bind(new_order.status().as_str())
        .bind(new_order.total_amount().amount())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // The loser of a concurrent confirmation race lands here
            if violates(&e, SESSION_UNIQUE_CONSTRAINT) {
                return StoreError::DuplicateSession(session_id.clone());
            }
            StoreError::Database(e)
        })?;
        let mut order = Self::row_to_order(&row)?;

        for item in new_order.items() {
            let item_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(order.id.as_i64())
            .bind(item.product_id.as_i64())
            .bind(item.quantity)
            .bind(item.price.amount())
            .fetch_one(&mut *tx)
            .await?;

            order.items.push(OrderItem {
                id: item_id,
                order_id: order.id,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                price: item.price,
            });
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, status, total_amount, created_at, updated_at
            FROM orders
            WHERE $1::VARCHAR IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let mut orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        self.attach_items(&mut orders).await?;
        Ok(orders)
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
