use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, SessionId};
use domain::{
    Cart, Money, NewOrder, NewOrderItem, NewProduct, Order, OrderItem, OrderStatus, Product,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{CatalogStore, OrderLedger},
};

#[derive(Debug, Default)]
struct ShopState {
    products: BTreeMap<ProductId, Product>,
    orders: Vec<Order>,
    next_product_id: i64,
    next_order_id: i64,
    next_item_id: i64,
}

/// In-memory catalog and order ledger for testing and local runs.
///
/// This implementation keeps everything behind one lock and enforces the
/// same rules as the PostgreSQL implementation: one order per session,
/// all-or-nothing order placement, and no deleting referenced products.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<ShopState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of order items stored.
    pub async fn order_item_count(&self) -> usize {
        self.state
            .read()
            .await
            .orders
            .iter()
            .map(|o| o.items.len())
            .sum()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn add_product(&self, product: NewProduct) -> Result<Product> {
        product.price.ensure_valid_price()?;

        let mut state = self.state.write().await;
        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_product_id),
            name: product.name,
            description: product.description,
            price: product.price,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_price(&self, id: ProductId, price: Money) -> Result<Product> {
        price.ensure_valid_price()?;

        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.price = price;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&id) {
            return Err(StoreError::ProductNotFound(id));
        }

        let referenced = state
            .orders
            .iter()
            .flat_map(|o| o.items.iter())
            .any(|item| item.product_id == id);
        if referenced {
            return Err(StoreError::ProductInUse(id));
        }

        state.products.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderLedger for InMemoryStore {
    async fn has_order_for_session(&self, session_id: &SessionId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.orders.iter().any(|o| &o.session_id == session_id))
    }

    async fn get_order_by_session(&self, session_id: &SessionId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| &o.session_id == session_id)
            .cloned())
    }

    async fn place_order(
        &self,
        session_id: &SessionId,
        cart: &Cart,
        status: OrderStatus,
    ) -> Result<Order> {
        let mut state = self.state.write().await;

        // Unique constraint simulation
        if state.orders.iter().any(|o| &o.session_id == session_id) {
            return Err(StoreError::DuplicateSession(session_id.clone()));
        }

        // Price everything before touching state so a failure leaves nothing behind
        let mut items = Vec::with_capacity(cart.len());
        for line in cart {
            let product = state
                .products
                .get(&line.product_id)
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            items.push(NewOrderItem::priced(product, line.quantity)?);
        }
        let new_order = NewOrder::new(session_id.clone(), status, items)?;

        state.next_order_id += 1;
        let order_id = OrderId::new(state.next_order_id);
        let mut order_items = Vec::with_capacity(new_order.items().len());
        for item in new_order.items() {
            state.next_item_id += 1;
            order_items.push(OrderItem {
                id: state.next_item_id,
                order_id,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                price: item.price,
            });
        }

        let now = Utc::now();
        let order = Order {
            id: order_id,
            session_id: new_order.session_id().clone(),
            status: new_order.status(),
            total_amount: new_order.total_amount(),
            created_at: now,
            updated_at: now,
            items: order_items,
        };
        state.orders.push(order.clone());

        Ok(order)
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        // Insertion order is creation order; newest first
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect())
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.orders.len();
        state.orders.retain(|o| o.id != id);
        Ok(state.orders.len() != before)
    }
}
