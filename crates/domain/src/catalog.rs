//! Catalog products.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::order::{Money, OrderError};

/// Longest product name accepted by the catalog.
pub const MAX_NAME_LEN: usize = 200;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a product to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
}

impl NewProduct {
    /// Creates a new product after checking its price.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
    ) -> Result<Self, OrderError> {
        price.ensure_valid_price()?;
        let mut name: String = name.into();
        if name.chars().count() > MAX_NAME_LEN {
            name = name.chars().take(MAX_NAME_LEN).collect();
        }
        Ok(Self {
            name,
            description: description.into(),
            price,
        })
    }

    /// The products the catalog is seeded with on a fresh install.
    pub fn defaults() -> Vec<NewProduct> {
        vec![
            NewProduct {
                name: "Premium Wireless Headphones".to_string(),
                description: "High-quality wireless headphones with active noise cancellation and 30-hour battery life.".to_string(),
                price: Money::from_cents(19999),
            },
            NewProduct {
                name: "Smart Watch Pro".to_string(),
                description: "Advanced fitness tracking, heart rate monitoring, GPS, and water resistance up to 50m.".to_string(),
                price: Money::from_cents(34999),
            },
            NewProduct {
                name: "Portable Power Bank".to_string(),
                description: "20,000mAh high-capacity power bank with fast charging and dual USB ports.".to_string(),
                price: Money::from_cents(4999),
            },
        ]
    }
}
