use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A conditional stock decrement would have gone negative; the whole
    /// order-creation transaction was aborted.
    #[error("Out of stock: {name}")]
    OutOfStock {
        product_id: ProductId,
        name: String,
    },

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The payment attempt was not found.
    #[error("Payment attempt not found: {0}")]
    AttemptNotFound(String),

    /// A status transition was requested from an incompatible status.
    #[error(transparent)]
    Order(#[from] domain::OrderError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored enum column held a value this build does not recognize.
    #[error("Unrecognized {column} value: {value}")]
    UnrecognizedValue {
        column: &'static str,
        value: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
