//! Domain layer for the storefront.
//!
//! This crate provides the record types shared by the catalog, the order
//! ledger and the checkout flow:
//! - `Money`, a two-decimal fixed-point amount
//! - `Product` and `NewProduct` for the catalog
//! - `Cart` and `CartLine` for client-submitted carts and session snapshots
//! - `Order`, `OrderItem` and the `NewOrder` write model

pub mod catalog;
pub mod order;

pub use catalog::{NewProduct, Product};
pub use order::{
    Cart, CartLine, Money, NewOrder, NewOrderItem, Order, OrderError, OrderItem, OrderStatus,
};
