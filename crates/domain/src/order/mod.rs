//! Orders, order items, carts and money.

mod model;
mod state;
mod value_objects;

pub use model::{NewOrder, NewOrderItem, Order, OrderItem};
pub use state::OrderStatus;
pub use value_objects::{Cart, CartLine, MONEY_SCALE, Money};

use thiserror::Error;

/// Errors that can occur while building orders and carts.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Invalid quantity.
    #[error("Quantity must be at least 1 (got {quantity})")]
    InvalidQuantity { quantity: i32 },

    /// Invalid price.
    #[error("Invalid price: {price} (must be at least $0.01)")]
    InvalidPrice { price: Money },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Stored status is not one of the known values.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
