//! Shared identifier types for the storefront crates.

mod types;

pub use types::{OrderId, ProductId, UserId};
