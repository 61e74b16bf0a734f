//! Candidate orders submitted at checkout, before server-side pricing.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{
    OrderError, OrderLine, OrderTotals, PaymentMethod, ShippingAddress, TOTALS_TOLERANCE,
};
use crate::money::Money;

/// The already-verified identity of an authenticated buyer, as supplied by
/// the upstream auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    pub id: UserId,
    pub email: String,
}

/// A requested line before pricing: only the product reference and quantity
/// are taken from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A candidate order as submitted by the client.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// Authenticated buyer, or `None` for guest checkout.
    pub buyer: Option<Buyer>,

    /// Mandatory for guest checkout; ignored when a buyer is present.
    pub guest_email: Option<String>,

    pub lines: Vec<DraftLine>,

    pub shipping_address: ShippingAddress,

    pub payment_method: PaymentMethod,

    /// Client-declared totals, persisted as-is once verified.
    pub declared: OrderTotals,
}

impl OrderDraft {
    /// Validates the draft's shape before any storage work happens.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::NoItems);
        }

        for line in &self.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
        }

        if self.buyer.is_none() && self.receipt_email().is_none() {
            return Err(OrderError::GuestEmailRequired);
        }

        Ok(())
    }

    /// Returns the address receipts go to: the buyer's verified email, or the
    /// declared guest email.
    pub fn receipt_email(&self) -> Option<&str> {
        if let Some(buyer) = &self.buyer {
            return Some(buyer.email.as_str());
        }
        self.guest_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Verifies the declared totals against the server-side items total.
    ///
    /// The declared items price must match the sum of frozen line snapshots,
    /// and the declared grand total must match the component identity, each
    /// within [`TOTALS_TOLERANCE`] to absorb client-side decimal rounding.
    pub fn check_declared_totals(&self, computed_items: Money) -> Result<(), OrderError> {
        if self.declared.items_price.abs_diff(computed_items) > TOTALS_TOLERANCE {
            return Err(OrderError::DeclaredTotalMismatch {
                field: "itemsPrice",
                declared: self.declared.items_price,
                computed: computed_items,
            });
        }

        let computed_total = self.declared.computed_total();
        if self.declared.total_price.abs_diff(computed_total) > TOTALS_TOLERANCE {
            return Err(OrderError::DeclaredTotalMismatch {
                field: "totalPrice",
                declared: self.declared.total_price,
                computed: computed_total,
            });
        }

        Ok(())
    }
}

/// A fully priced order ready for the store's atomic creation transaction:
/// lines carry server-side price snapshots and the receipt address is
/// resolved.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub is_guest: bool,
    pub guest_email: String,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub totals: OrderTotals,
    pub lines: Vec<OrderLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::DeliveryMethod;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Wanjiku Kamau".to_string(),
            phone: "0712345678".to_string(),
            address: "Haile Selassie Ave 8".to_string(),
            city: "Mombasa".to_string(),
            delivery_method: DeliveryMethod::Delivery,
            pickup_branch: None,
        }
    }

    fn draft(lines: Vec<DraftLine>) -> OrderDraft {
        OrderDraft {
            buyer: None,
            guest_email: Some("buyer@example.com".to_string()),
            lines,
            shipping_address: address(),
            payment_method: PaymentMethod::MobileMoney,
            declared: OrderTotals::default(),
        }
    }

    #[test]
    fn test_empty_lines_rejected() {
        let draft = draft(vec![]);
        assert!(matches!(draft.validate(), Err(OrderError::NoItems)));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let draft = draft(vec![DraftLine {
            product_id: ProductId::new(),
            quantity: 0,
        }]);
        assert!(matches!(
            draft.validate(),
            Err(OrderError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_guest_without_email_rejected() {
        let mut draft = draft(vec![DraftLine {
            product_id: ProductId::new(),
            quantity: 1,
        }]);
        draft.guest_email = Some("   ".to_string());
        assert!(matches!(
            draft.validate(),
            Err(OrderError::GuestEmailRequired)
        ));
    }

    #[test]
    fn test_buyer_email_wins_over_guest_email() {
        let mut draft = draft(vec![DraftLine {
            product_id: ProductId::new(),
            quantity: 1,
        }]);
        draft.buyer = Some(Buyer {
            id: UserId::new(),
            email: "account@example.com".to_string(),
        });
        assert_eq!(draft.receipt_email(), Some("account@example.com"));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_declared_totals_within_tolerance_accepted() {
        let mut draft = draft(vec![DraftLine {
            product_id: ProductId::new(),
            quantity: 1,
        }]);
        draft.declared = OrderTotals {
            items_price: Money::from_cents(10_050),
            tax_price: Money::zero(),
            shipping_price: Money::zero(),
            discount_price: Money::zero(),
            total_price: Money::from_cents(10_050),
        };
        // One shilling off from the server-computed figure still passes.
        assert!(draft.check_declared_totals(Money::from_cents(10_000)).is_ok());
    }

    #[test]
    fn test_declared_items_mismatch_rejected() {
        let mut draft = draft(vec![DraftLine {
            product_id: ProductId::new(),
            quantity: 1,
        }]);
        draft.declared.items_price = Money::from_cents(1);
        let result = draft.check_declared_totals(Money::from_cents(10_000));
        assert!(matches!(
            result,
            Err(OrderError::DeclaredTotalMismatch {
                field: "itemsPrice",
                ..
            })
        ));
    }

    #[test]
    fn test_declared_total_identity_enforced() {
        let mut draft = draft(vec![DraftLine {
            product_id: ProductId::new(),
            quantity: 1,
        }]);
        draft.declared = OrderTotals {
            items_price: Money::from_cents(10_000),
            tax_price: Money::from_cents(1_600),
            shipping_price: Money::from_cents(500),
            discount_price: Money::zero(),
            total_price: Money::from_cents(9_000),
        };
        let result = draft.check_declared_totals(Money::from_cents(10_000));
        assert!(matches!(
            result,
            Err(OrderError::DeclaredTotalMismatch {
                field: "totalPrice",
                ..
            })
        ));
    }
}
