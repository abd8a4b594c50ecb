//! Persisted order records and the write model used to create them.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, SessionId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderStatus};
use crate::catalog::Product;

/// A line of a persisted order.
///
/// `price` is the unit price captured when the order was placed and is never
/// re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub price: Money,
}

impl OrderItem {
    /// Returns `quantity × price`.
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// A persisted order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub session_id: SessionId,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Returns the sum of item subtotals.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

/// An order line priced against the catalog, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub price: Money,
}

impl NewOrderItem {
    /// Prices `quantity` units of `product` at its current catalog price.
    pub fn priced(product: &Product, quantity: i32) -> Result<Self, OrderError> {
        if quantity < 1 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        Ok(Self {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            price: product.price,
        })
    }

    /// Returns `quantity × price`.
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Write model for an order and its items, inserted as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    session_id: SessionId,
    status: OrderStatus,
    items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Creates a new order from priced items. At least one item is required.
    pub fn new(
        session_id: SessionId,
        status: OrderStatus,
        items: Vec<NewOrderItem>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        Ok(Self {
            session_id,
            status,
            items,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[NewOrderItem] {
        &self.items
    }

    /// Returns the order total: Σ(price × quantity).
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(NewOrderItem::subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;

    fn product(id: i64, name: &str, cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_order_total_sums_line_subtotals() {
        let a = product(1, "A", 1000);
        let b = product(2, "B", 500);
        let order = NewOrder::new(
            SessionId::new("cs_1"),
            OrderStatus::Paid,
            vec![
                NewOrderItem::priced(&a, 1).unwrap(),
                NewOrderItem::priced(&b, 2).unwrap(),
            ],
        )
        .unwrap();

        assert_eq!(order.total_amount(), Money::from_cents(2000));
        assert_eq!(order.items()[1].subtotal(), Money::from_cents(1000));
    }

    #[test]
    fn test_new_order_requires_items() {
        let result = NewOrder::new(SessionId::new("cs_1"), OrderStatus::Paid, vec![]);
        assert!(matches!(result, Err(OrderError::NoItems)));
    }

    #[test]
    fn test_priced_item_rejects_zero_quantity() {
        let a = product(1, "A", 1000);
        assert!(matches!(
            NewOrderItem::priced(&a, 0),
            Err(OrderError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_order_item_subtotal() {
        let item = OrderItem {
            id: 1,
            order_id: OrderId::new(1),
            product_id: ProductId::new(2),
            product_name: "B".to_string(),
            quantity: 3,
            price: Money::from_cents(499),
        };
        assert_eq!(item.subtotal(), Money::from_cents(1497));
    }
}
