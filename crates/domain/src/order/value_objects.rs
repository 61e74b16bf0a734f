//! Value objects for the order domain.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::commission::CommissionSplit;
use crate::money::Money;

/// How the buyer intends to settle the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card checkout handled by an external redirect flow.
    Card,

    /// Mobile-money STK push confirmed asynchronously by the provider.
    MobileMoney,

    /// PayPal redirect flow.
    Paypal,

    /// Settled in cash when the order is handed over.
    CashOnDelivery,
}

impl PaymentMethod {
    /// Returns the method name as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    /// Parses a stored method name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "card" => Some(PaymentMethod::Card),
            "mobile_money" => Some(PaymentMethod::MobileMoney),
            "paypal" => Some(PaymentMethod::Paypal),
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the order reaches the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Courier delivery to the shipping address.
    #[default]
    Delivery,

    /// Buyer collects from a pickup branch.
    Pickup,
}

/// Structured shipping details captured at checkout.
///
/// Serialized as a single JSON document both in storage and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,

    #[serde(default)]
    pub phone: String,

    pub address: String,

    pub city: String,

    #[serde(default)]
    pub delivery_method: DeliveryMethod,

    /// Pickup branch reference, only meaningful for [`DeliveryMethod::Pickup`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_branch: Option<String>,
}

/// The price components of an order.
///
/// Declared by the client, verified against server-side line snapshots
/// before the order is accepted, then persisted as-is for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderTotals {
    pub items_price: Money,
    pub tax_price: Money,
    pub shipping_price: Money,
    pub discount_price: Money,
    pub total_price: Money,
}

impl OrderTotals {
    /// Recomputes the grand total from the components, clamped at zero.
    pub fn computed_total(&self) -> Money {
        (self.items_price + self.tax_price + self.shipping_price - self.discount_price).clamp_zero()
    }
}

/// A single line of an order.
///
/// `unit_price`, `name` and `image` are snapshots of the product taken at
/// order-creation time and are never recomputed from the live catalog; later
/// price changes must not affect settled orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,

    pub name: String,

    #[serde(default)]
    pub image: String,

    /// Price per unit frozen at purchase time.
    pub unit_price: Money,

    pub quantity: u32,
}

impl OrderLine {
    /// Returns the gross amount for this line (unit price times quantity).
    pub fn gross_amount(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Returns the platform/seller split of this line's gross amount.
    pub fn commission(&self) -> CommissionSplit {
        CommissionSplit::of(self.gross_amount())
    }
}
