//! Paid order listing endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use domain::{Money, Order, OrderItem};
use serde::Serialize;
use store::OrderLedgerExt;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub session_id: String,
    pub status: String,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub price: Money,
    pub subtotal: Money,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            subtotal: item.subtotal(),
            product_id: item.product_id.as_i64(),
            product_name: item.product_name,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.as_i64(),
            session_id: order.session_id.to_string(),
            status: order.status.to_string(),
            total_amount: order.total_amount,
            created_at: order.created_at,
            items: order.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// GET /orders — paid orders with their items, newest first.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.store.paid_orders().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}
