//! Catalog product as seen by the checkout core.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A purchasable product.
///
/// The wider catalog is managed elsewhere; checkout reads the price for line
/// snapshots and holds the authoritative stock count. `count_in_stock` is
/// decremented only by successful order creation, never by payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    pub name: String,

    #[serde(default)]
    pub image: String,

    pub price: Money,

    pub count_in_stock: u32,

    #[serde(default)]
    pub seller_name: String,
}

impl Product {
    /// Returns true if the requested quantity can currently be fulfilled.
    pub fn can_fulfill(&self, quantity: u32) -> bool {
        quantity <= self.count_in_stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_fulfill() {
        let product = Product {
            id: ProductId::new(),
            name: "Kikoy beach towel".to_string(),
            image: String::new(),
            price: Money::from_cents(1_800),
            count_in_stock: 3,
            seller_name: "Coast Crafts".to_string(),
        };
        assert!(product.can_fulfill(3));
        assert!(!product.can_fulfill(4));
        assert!(product.can_fulfill(0));
    }
}
