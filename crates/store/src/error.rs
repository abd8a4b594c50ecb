use common::{ProductId, SessionId};
use domain::OrderError;
use thiserror::Error;

/// Errors that can occur when interacting with the catalog or order ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product does not exist in the catalog.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// The product is referenced by order items and cannot be deleted.
    #[error("Product {0} is referenced by existing orders")]
    ProductInUse(ProductId),

    /// An order already exists for this payment session.
    #[error("An order already exists for session {0}")]
    DuplicateSession(SessionId),

    /// An order or cart rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
