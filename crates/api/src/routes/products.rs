//! Catalog listing endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::{Money, Product};
use serde::Serialize;
use store::CatalogStore;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub price_cents: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.as_i64(),
            price_cents: product.price.to_minor_units(),
            price: product.price,
            name: product.name,
            description: product.description,
        }
    }
}

/// GET / and GET /products — all products, ordered by name.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.store.list_products().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}
