use async_trait::async_trait;
use common::{OrderId, ProductId, SessionId};
use domain::{Cart, Money, NewProduct, Order, OrderStatus, Product};

use crate::Result;

/// Read-mostly catalog of products.
///
/// The checkout flow only reads from it; the mutating operations exist for
/// seeding and operator tooling.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Lists every product, ordered by name.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Looks up a product by id.
    ///
    /// Returns None if it doesn't exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Adds a product and returns it with its assigned id.
    async fn add_product(&self, product: NewProduct) -> Result<Product>;

    /// Changes a product's price.
    ///
    /// Existing order items keep the price they were placed at.
    async fn update_price(&self, id: ProductId, price: Money) -> Result<Product>;

    /// Deletes a product.
    ///
    /// Fails with `ProductInUse` while any order item references it.
    async fn delete_product(&self, id: ProductId) -> Result<()>;
}

/// Ledger of finalized orders.
///
/// Implementations must enforce "at most one order per session" at the
/// storage layer, so that two concurrent writers for the same session can
/// never both succeed.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Returns true if an order has been recorded for the session.
    async fn has_order_for_session(&self, session_id: &SessionId) -> Result<bool>;

    /// Loads the order recorded for a session, with its items.
    async fn get_order_by_session(&self, session_id: &SessionId) -> Result<Option<Order>>;

    /// Prices a cart against the current catalog and records it as one order.
    ///
    /// Product lookups, the order row and every item row are written in a
    /// single transaction: either all succeed or none are visible. Each item's
    /// price is the catalog price read inside that transaction.
    ///
    /// Fails with `DuplicateSession` if the session already has an order,
    /// `ProductNotFound` if a product vanished, and `Order(NoItems)` for an
    /// empty cart.
    async fn place_order(
        &self,
        session_id: &SessionId,
        cart: &Cart,
        status: OrderStatus,
    ) -> Result<Order>;

    /// Lists orders with their items, newest first.
    ///
    /// If `status` is set, only orders in that status are returned.
    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>>;

    /// Deletes an order together with its items.
    ///
    /// Returns false if the order didn't exist.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;
}

/// A backend providing both the catalog and the order ledger.
pub trait ShopStore: CatalogStore + OrderLedger {}

// Blanket implementation for every backend that implements both halves
impl<T: CatalogStore + OrderLedger + ?Sized> ShopStore for T {}

/// Extension trait providing convenience methods for order ledgers.
#[async_trait]
pub trait OrderLedgerExt: OrderLedger {
    /// Lists orders whose payment has been confirmed.
    async fn paid_orders(&self) -> Result<Vec<Order>> {
        self.list_orders(Some(OrderStatus::Paid)).await
    }
}

impl<T: OrderLedger + ?Sized> OrderLedgerExt for T {}

/// Extension trait providing convenience methods for catalogs.
#[async_trait]
pub trait CatalogStoreExt: CatalogStore {
    /// Seeds the catalog with the default products if it is empty.
    ///
    /// Returns the number of products inserted.
    async fn seed_defaults(&self) -> Result<usize> {
        if !self.list_products().await?.is_empty() {
            return Ok(0);
        }
        let defaults = NewProduct::defaults();
        let count = defaults.len();
        for product in defaults {
            self.add_product(product).await?;
        }
        tracing::info!(count, "seeded catalog with default products");
        Ok(count)
    }
}

impl<T: CatalogStore + ?Sized> CatalogStoreExt for T {}
