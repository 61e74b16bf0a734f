//! Commission split applied to each order line.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Fraction of gross line revenue retained by the platform, in basis points.
pub const PLATFORM_COMMISSION_RATE_BPS: i64 = 1_000;

/// The platform/seller split of a line's gross amount.
///
/// Invariant: `platform_fee + seller_earning == gross` exactly. The fee is
/// rounded half-up at cent precision and the earning is the remainder, so no
/// rounding drift can accumulate across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// Share of the gross amount retained by the platform.
    pub platform_fee: Money,

    /// Remainder paid out to the seller.
    pub seller_earning: Money,
}

impl CommissionSplit {
    /// Splits a non-negative gross amount at the platform commission rate.
    pub fn of(gross: Money) -> Self {
        Self::with_rate(gross, PLATFORM_COMMISSION_RATE_BPS)
    }

    /// Splits a non-negative gross amount at an explicit rate in basis points.
    ///
    /// The split is computed once per line and never re-aggregated and
    /// re-rounded at the order level.
    pub fn with_rate(gross: Money, rate_bps: i64) -> Self {
        // Integer round-half-up: truncation floors the non-negative quotient.
        let fee_cents = (gross.cents() * rate_bps + 5_000) / 10_000;
        let platform_fee = Money::from_cents(fee_cents);

        Self {
            platform_fee,
            seller_earning: gross - platform_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_percent_split() {
        let split = CommissionSplit::of(Money::from_cents(10_000));
        assert_eq!(split.platform_fee.cents(), 1_000);
        assert_eq!(split.seller_earning.cents(), 9_000);
    }

    #[test]
    fn test_split_sums_to_gross_exactly() {
        for cents in 0..5_000 {
            let gross = Money::from_cents(cents);
            let split = CommissionSplit::of(gross);
            assert_eq!(
                split.platform_fee + split.seller_earning,
                gross,
                "drift at {cents} cents"
            );
        }
    }

    #[test]
    fn test_fee_rounds_half_up() {
        // 10% of 105 cents is 10.5 cents, which rounds up to 11.
        let split = CommissionSplit::of(Money::from_cents(105));
        assert_eq!(split.platform_fee.cents(), 11);
        assert_eq!(split.seller_earning.cents(), 94);

        // 10% of 104 cents is 10.4 cents, which rounds down to 10.
        let split = CommissionSplit::of(Money::from_cents(104));
        assert_eq!(split.platform_fee.cents(), 10);
    }

    #[test]
    fn test_zero_gross() {
        let split = CommissionSplit::of(Money::zero());
        assert_eq!(split.platform_fee, Money::zero());
        assert_eq!(split.seller_earning, Money::zero());
    }

    #[test]
    fn test_custom_rate() {
        // 2.5% of 10.00
        let split = CommissionSplit::with_rate(Money::from_cents(1_000), 250);
        assert_eq!(split.platform_fee.cents(), 25);
        assert_eq!(split.seller_earning.cents(), 975);
    }
}
