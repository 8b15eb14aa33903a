//! Domain Models
//!
//! Members and membership sales for the renewal flow.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fees::FeeCatalog;

/// Renewals taken on or after 1 November buy the following calendar year.
pub const RENEWAL_CUTOVER_MONTH: u32 = 11;

/// The calendar year a renewal taken at `now` pays for.
pub fn membership_year(now: DateTime<Utc>) -> i32 {
    if now.month() >= RENEWAL_CUTOVER_MONTH {
        now.year() + 1
    } else {
        now.year()
    }
}

/// Last day of the given membership year; a renewed member is paid up to it.
pub fn end_of_year(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// A society member as stored in the members table.
///
/// Members pre-exist any sale; the renewal flow only ever updates them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Stable identifier, always > 0.
    pub member_id: i64,

    pub first_name: String,

    pub last_name: String,

    pub email: String,

    /// Last day of the year the member is paid up to.
    pub end_date: NaiveDate,

    /// When the member last paid, if ever.
    pub date_last_paid: Option<DateTime<Utc>>,

    /// Amount of the most recent payment.
    pub last_payment: Decimal,

    pub donation_to_society: Decimal,

    pub donation_to_museum: Decimal,

    pub is_friend_of_museum: bool,

    /// 1, or 2 when an associate shares the address.
    pub members_at_address: i32,

    /// How many friends of the museum live at this address (0..=2).
    pub friends_at_address: i32,
}

impl Member {
    /// A member with the given identity and no renewal history yet.
    pub fn new(
        member_id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            member_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            end_date: NaiveDate::default(),
            date_last_paid: None,
            last_payment: Decimal::ZERO,
            donation_to_society: Decimal::ZERO,
            donation_to_museum: Decimal::ZERO,
            is_friend_of_museum: false,
            members_at_address: 1,
            friends_at_address: 0,
        }
    }
}

/// Payment state of a sale. `Complete` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Complete,
    Cancelled,
}

impl PaymentStatus {
    /// Form stored in the database and shown in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Inverse of [`as_str`](Self::as_str); `None` for anything unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Complete" => Some(Self::Complete),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// One renewal transaction covering a full member and optionally an
/// associate member at the same address.
///
/// The sale id is the client reference threaded through the payment
/// gateway, which is how the completion callback finds its way back to
/// this record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MembershipSale {
    /// Assigned by the store on creation; 0 until then.
    pub sale_id: i64,

    /// Calendar year being paid for.
    pub membership_year: i32,

    pub full_member_id: i64,

    pub full_member_fee: Decimal,

    pub full_member_is_friend: bool,

    /// Friend add-on for the full member; zero unless they are a friend.
    pub full_member_friend_fee: Decimal,

    /// 0 when no associate is included in the sale.
    pub associate_member_id: i64,

    pub associate_member_fee: Decimal,

    pub associate_member_is_friend: bool,

    pub associate_member_friend_fee: Decimal,

    pub donation_to_society: Decimal,

    pub donation_to_museum: Decimal,

    /// Tag of the gateway the sale goes through, e.g. "Stripe".
    pub payment_service: String,

    pub payment_status: PaymentStatus,

    /// Gateway session id; empty until the sale completes.
    pub payment_session_id: String,
}

impl MembershipSale {
    /// Build a `Pending` sale for one or two members at the given tariffs.
    ///
    /// `associate` is `(member_id, is_friend)` when a second member at the
    /// same address renews in the same sale. Friend fees are only charged
    /// for members with the friend tickbox set; associate fields stay
    /// zeroed when there is no associate.
    #[allow(clippy::too_many_arguments)]
    pub fn for_renewal(
        membership_year: i32,
        fees: FeeCatalog,
        full_member_id: i64,
        full_member_is_friend: bool,
        associate: Option<(i64, bool)>,
        donation_to_society: Decimal,
        donation_to_museum: Decimal,
        payment_service: impl Into<String>,
    ) -> Self {
        let (associate_member_id, associate_member_is_friend) = match associate {
            Some((id, is_friend)) if id > 0 => (id, is_friend),
            _ => (0, false),
        };
        Self {
            sale_id: 0,
            membership_year,
            full_member_id,
            full_member_fee: fees.ordinary,
            full_member_is_friend,
            full_member_friend_fee: if full_member_is_friend {
                fees.friend
            } else {
                Decimal::ZERO
            },
            associate_member_id,
            associate_member_fee: if associate_member_id > 0 {
                fees.associate
            } else {
                Decimal::ZERO
            },
            associate_member_is_friend,
            associate_member_friend_fee: if associate_member_is_friend {
                fees.friend
            } else {
                Decimal::ZERO
            },
            donation_to_society,
            donation_to_museum,
            payment_service: payment_service.into(),
            payment_status: PaymentStatus::Pending,
            payment_session_id: String::new(),
        }
    }

    pub fn has_associate(&self) -> bool {
        self.associate_member_id > 0
    }

    /// Everything payable for this sale: both membership fees, both friend
    /// add-ons, both donations.
    pub fn total_payment(&self) -> Decimal {
        let mut total = self.full_member_fee + self.donation_to_society + self.donation_to_museum;
        if self.full_member_is_friend {
            total += self.full_member_friend_fee;
        }
        if self.has_associate() {
            total += self.associate_member_fee;
            if self.associate_member_is_friend {
                total += self.associate_member_friend_fee;
            }
        }
        total
    }

    /// How many members live at the address after this renewal (1 or 2).
    pub fn members_count(&self) -> i32 {
        if self.has_associate() { 2 } else { 1 }
    }

    /// How many friends of the museum live at the address (0..=2).
    pub fn friends_count(&self) -> i32 {
        i32::from(self.full_member_is_friend) + i32::from(self.associate_member_is_friend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn fees() -> FeeCatalog {
        FeeCatalog {
            ordinary: dec!(24.00),
            associate: dec!(6.00),
            friend: dec!(5.00),
        }
    }

    #[test]
    fn test_membership_year_cutover() {
        let oct = Utc.with_ymd_and_hms(2025, 10, 31, 23, 59, 59).unwrap();
        let nov = Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();
        let dec = Utc.with_ymd_and_hms(2025, 12, 25, 12, 0, 0).unwrap();
        let jan = Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap();

        assert_eq!(membership_year(oct), 2025);
        assert_eq!(membership_year(nov), 2026);
        assert_eq!(membership_year(dec), 2026);
        assert_eq!(membership_year(jan), 2026);
    }

    #[test]
    fn test_end_of_year() {
        assert_eq!(
            end_of_year(2025),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_full_only_sale() {
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

        assert_eq!(sale.full_member_fee, dec!(24.00));
        assert_eq!(sale.full_member_friend_fee, dec!(5.00));
        assert_eq!(sale.associate_member_id, 0);
        assert_eq!(sale.associate_member_fee, Decimal::ZERO);
        assert!(!sale.associate_member_is_friend);
        assert_eq!(sale.total_payment(), dec!(33.00));
        assert_eq!(sale.members_count(), 1);
        assert_eq!(sale.friends_count(), 1);
        assert_eq!(sale.payment_status, PaymentStatus::Pending);
        assert!(sale.payment_session_id.is_empty());
    }

    #[test]
    fn test_sale_with_associate() {
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

        assert_eq!(sale.associate_member_id, 77);
        assert_eq!(sale.associate_member_fee, dec!(6.00));
        assert_eq!(sale.associate_member_friend_fee, Decimal::ZERO);
        assert_eq!(sale.total_payment(), dec!(35.00));
        assert_eq!(sale.members_count(), 2);
        assert_eq!(sale.friends_count(), 1);
    }

    #[test]
    fn test_friend_fee_only_when_friend() {
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

        assert_eq!(sale.full_member_friend_fee, Decimal::ZERO);
        assert_eq!(sale.associate_member_friend_fee, dec!(5.00));
        assert_eq!(sale.total_payment(), dec!(35.00));
        assert_eq!(sale.friends_count(), 1);
    }

    #[test]
    fn test_non_positive_associate_is_absent() {
        let sale = MembershipSale::for_renewal(
            2025,
            fees(),
            42,
            false,
            Some((0, true)),
            Decimal::ZERO,
            Decimal::ZERO,
            "Stripe",
        );

        assert!(!sale.has_associate());
        assert!(!sale.associate_member_is_friend);
        assert_eq!(sale.associate_member_fee, Decimal::ZERO);
        assert_eq!(sale.members_count(), 1);
    }

    #[test]
    fn test_friends_count_bounds() {
        let both = MembershipSale::for_renewal(
            2025,
            fees(),
            1,
            true,
            Some((2, true)),
            Decimal::ZERO,
            Decimal::ZERO,
            "Stripe",
        );
        assert_eq!(both.friends_count(), 2);
        assert!(both.friends_count() <= both.members_count());

        let neither = MembershipSale::for_renewal(
            2025,
            fees(),
            1,
            false,
            None,
            Decimal::ZERO,
            Decimal::ZERO,
            "Stripe",
        );
        assert_eq!(neither.friends_count(), 0);
    }

    #[test]
    fn test_payment_status_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Complete,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("paid"), None);
        assert_eq!(PaymentStatus::parse(""), None);
    }
}
