//! Cost Breakdown
//!
//! Derives the itemized lines and total payable from a sale. The renderer
//! consumes this structure; nothing here is stored.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::model::MembershipSale;

pub const LABEL_ORDINARY: &str = "Ordinary membership";
pub const LABEL_FRIEND: &str = "Friend of the museum";
pub const LABEL_ASSOCIATE: &str = "Associate membership";
pub const LABEL_ASSOCIATE_FRIEND: &str = "Associate friend of the museum";
pub const LABEL_DONATION_SOCIETY: &str = "Donation to the society";
pub const LABEL_DONATION_MUSEUM: &str = "Donation to the museum";

/// One row of the cost table shown before checkout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LineItem {
    pub label: &'static str,
    pub amount: Decimal,
}

/// Ordered cost lines plus the total payable. The ordinary membership line
/// is always present; every other line appears only when it is charged.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub lines: Vec<LineItem>,
    pub total: Decimal,
}

impl CostBreakdown {
    pub fn for_sale(sale: &MembershipSale) -> Self {
        let mut lines = vec![LineItem {
            label: LABEL_ORDINARY,
            amount: sale.full_member_fee,
        }];
        if sale.full_member_is_friend {
            lines.push(LineItem {
                label: LABEL_FRIEND,
                amount: sale.full_member_friend_fee,
            });
        }
        if sale.has_associate() {
            lines.push(LineItem {
                label: LABEL_ASSOCIATE,
                amount: sale.associate_member_fee,
            });
            if sale.associate_member_is_friend {
                lines.push(LineItem {
                    label: LABEL_ASSOCIATE_FRIEND,
                    amount: sale.associate_member_friend_fee,
                });
            }
        }
        if sale.donation_to_society > Decimal::ZERO {
            lines.push(LineItem {
                label: LABEL_DONATION_SOCIETY,
                amount: sale.donation_to_society,
            });
        }
        if sale.donation_to_museum > Decimal::ZERO {
            lines.push(LineItem {
                label: LABEL_DONATION_MUSEUM,
                amount: sale.donation_to_museum,
            });
        }
        Self {
            lines,
            total: sale.total_payment(),
        }
    }
}

/// Convert a pound amount to integer pence, rounding halves up, as the
/// gateway expects. Saturates on amounts beyond the i64 range.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::FeeCatalog;
    use rust_decimal_macros::dec;

    fn fees() -> FeeCatalog {
        FeeCatalog {
            ordinary: dec!(24.00),
            associate: dec!(6.00),
            friend: dec!(5.00),
        }
    }

    #[test]
    fn test_full_member_with_donations() {
        let sale = MembershipSale::for_renewal(
            2025,
            fees(),
            42,
            true,
            None,
            dec!(1.5),
            dec!(2.5),
            "Stripe",
        );
        let breakdown = CostBreakdown::for_sale(&sale);

        let labels: Vec<&str> = breakdown.lines.iter().map(|l| l.label).collect();
        assert_eq!(
            labels,
            vec![
                LABEL_ORDINARY,
                LABEL_FRIEND,
                LABEL_DONATION_SOCIETY,
                LABEL_DONATION_MUSEUM,
            ]
        );
        assert_eq!(breakdown.total, dec!(33.00));
    }

    #[test]
    fn test_family_sale_lines() {
        let sale = MembershipSale::for_renewal(
            2025,
            fees(),
            42,
            true,
            Some((77, false)),
            Decimal::ZERO,
            Decimal::ZERO,
            "Stripe",
        );
        let breakdown = CostBreakdown::for_sale(&sale);

        let labels: Vec<&str> = breakdown.lines.iter().map(|l| l.label).collect();
        assert_eq!(labels, vec![LABEL_ORDINARY, LABEL_FRIEND, LABEL_ASSOCIATE]);
        assert_eq!(breakdown.total, dec!(35.00));
        assert_eq!(to_minor_units(breakdown.total), 3500);
    }

    #[test]
    fn test_associate_friend_line() {
        let sale = MembershipSale::for_renewal(
            2025,
            fees(),
            42,
            false,
            Some((77, true)),
            Decimal::ZERO,
            Decimal::ZERO,
            "Stripe",
        );
        let breakdown = CostBreakdown::for_sale(&sale);

        let labels: Vec<&str> = breakdown.lines.iter().map(|l| l.label).collect();
        assert_eq!(
            labels,
            vec![LABEL_ORDINARY, LABEL_ASSOCIATE, LABEL_ASSOCIATE_FRIEND]
        );
    }

    #[test]
    fn test_minor_units_rounds_halves_up() {
        assert_eq!(to_minor_units(dec!(33.00)), 3300);
        assert_eq!(to_minor_units(dec!(10.005)), 1001);
        assert_eq!(to_minor_units(dec!(10.004)), 1000);
        assert_eq!(to_minor_units(Decimal::ZERO), 0);
    }
}
