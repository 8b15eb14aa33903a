//! Sale Coordinator
//!
//! Drives a renewal through its three steps: confirm the submitted form,
//! open a pending sale plus gateway session, and apply the completion
//! callback. The coordinator owns the ordering and atomicity rules; the
//! HTTP handlers only translate between it and the wire.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use renewal_core::{
    is_checked, membership_year, to_minor_units, CostBreakdown, FeeCatalog, FormInput,
    MembershipSale, MembershipStore, PaymentStatus, RenewalForm,
};
use renewal_payments::{PaymentGateway, SessionRequest};

use crate::error::AppError;

/// Longest gateway session id the completion callback will look up.
const MAX_SESSION_ID_LEN: usize = 128;

/// Hidden fields posted back by the cost-breakdown page. All optional:
/// the page only emits the ones the sale actually needs.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CheckoutFields {
    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub friend: String,

    #[serde(default)]
    pub assoc_user_id: String,

    #[serde(default)]
    pub assoc_friend: String,

    #[serde(default)]
    pub donation_to_society: String,

    #[serde(default)]
    pub donation_to_museum: String,
}

/// Outcome of the form submission.
pub enum Confirmation {
    /// Validation failed; the form goes back out with its messages.
    Rejected(Box<RenewalForm>),

    /// The sale as it would be charged, not yet persisted.
    Confirmed {
        sale: MembershipSale,
        breakdown: CostBreakdown,
    },
}

/// Outcome of the checkout POST.
pub enum Checkout {
    /// Hidden fields missing or tampered with; the member gets a fresh
    /// form instead of an error.
    Bypass,

    /// Pending sale stored, gateway session open.
    Redirect { sale_id: i64, redirect_url: String },
}

/// Outcome of the completion callback.
#[derive(Debug)]
pub struct Completion {
    pub sale: MembershipSale,

    /// True when the sale was already complete and nothing was written.
    pub replayed: bool,
}

/// The renewal state machine around one store and one gateway.
pub struct SaleCoordinator {
    store: Arc<dyn MembershipStore>,
    gateway: Arc<dyn PaymentGateway>,
    fees: FeeCatalog,
    base_url: String,
}

impl SaleCoordinator {
    pub fn new(
        store: Arc<dyn MembershipStore>,
        gateway: Arc<dyn PaymentGateway>,
        fees: FeeCatalog,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            fees,
            base_url: base_url.into(),
        }
    }

    /// Tag of the gateway sales go through, e.g. "Stripe".
    pub fn payment_service(&self) -> &'static str {
        self.gateway.service_name()
    }

    /// Run both validation phases over a submitted form. No sale is
    /// persisted here; the member still has to confirm the costs.
    pub async fn confirm(&self, input: FormInput) -> Result<Confirmation, AppError> {
        let mut form = RenewalForm::validate(input);
        form.resolve_members(self.store.as_ref()).await?;
        if !form.valid {
            return Ok(Confirmation::Rejected(Box::new(form)));
        }

        let sale = self.sale_from_form(&form);
        let breakdown = CostBreakdown::for_sale(&sale);
        Ok(Confirmation::Confirmed { sale, breakdown })
    }

    /// Persist a pending sale and open the hosted-checkout session for it.
    ///
    /// The hidden fields come back from the member's browser, so anything
    /// missing or unparseable is treated as a bypass of the form, not as a
    /// server fault.
    pub async fn begin_checkout(&self, fields: CheckoutFields) -> Result<Checkout, AppError> {
        let Some(mut sale) = self.sale_from_fields(&fields) else {
            tracing::warn!(
                user_id = %fields.user_id,
                "checkout posted without a confirmed sale, reissuing the form"
            );
            return Ok(Checkout::Bypass);
        };

        let sale_id = self.store.create_sale(&sale).await?;
        sale.sale_id = sale_id;

        let request = SessionRequest {
            amount_minor: to_minor_units(sale.total_payment()),
            currency: "gbp".into(),
            description: format!("Membership renewal {}", sale.membership_year),
            client_reference: sale_id.to_string(),
            success_url: format!(
                "{}/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.base_url
            ),
            cancel_url: format!("{}/cancel", self.base_url),
            invoice: true,
        };
        let session = self.gateway.create_session(request).await?;

        tracing::info!(
            sale_id,
            session_id = %session.session_id,
            total = %sale.total_payment(),
            "pending sale created, redirecting to {}",
            self.gateway.service_name()
        );
        Ok(Checkout::Redirect {
            sale_id,
            redirect_url: session.redirect_url,
        })
    }

    /// Apply the completion callback for a gateway session.
    ///
    /// All member and sale updates land in one transaction behind a row
    /// lock on the sale, so concurrent callbacks for the same session
    /// serialize and replays see `Complete` and write nothing.
    pub async fn complete(&self, session_id: &str) -> Result<Completion, AppError> {
        if !plausible_session_id(session_id) {
            return Err(AppError::BadCallback("implausible session id"));
        }

        let session = self.gateway.get_session(session_id).await?;
        let sale_id = session
            .client_reference
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(AppError::BadCallback("client reference is not a sale id"))?;

        let mut tx = self.store.begin().await?;
        let mut sale = tx.lock_sale(sale_id).await?;

        match sale.payment_status {
            PaymentStatus::Complete => {
                tracing::info!(sale_id, "completion replayed, sale already complete");
                return Ok(Completion {
                    sale,
                    replayed: true,
                });
            }
            PaymentStatus::Cancelled => return Err(AppError::SaleCancelled(sale_id)),
            PaymentStatus::Pending => {}
        }

        let year = sale.membership_year;
        let full = sale.full_member_id;

        tx.set_end_date(full, year).await?;
        tx.set_date_last_paid(full, Utc::now()).await?;
        tx.set_friend_tickbox(full, sale.full_member_is_friend).await?;
        if sale.has_associate() {
            let assoc = sale.associate_member_id;
            tx.set_end_date(assoc, year).await?;
            tx.set_friend_tickbox(assoc, sale.associate_member_is_friend)
                .await?;
            tx.set_members_at_address(assoc, sale.members_count()).await?;
            tx.set_friends_at_address(assoc, sale.friends_count()).await?;
        }
        tx.set_members_at_address(full, sale.members_count()).await?;
        tx.set_friends_at_address(full, sale.friends_count()).await?;
        tx.set_last_payment(full, sale.total_payment()).await?;
        tx.set_donation_to_society(full, sale.donation_to_society)
            .await?;
        tx.set_donation_to_museum(full, sale.donation_to_museum)
            .await?;
        tx.update_sale(sale_id, PaymentStatus::Complete, &session.session_id)
            .await?;
        tx.commit().await?;

        sale.payment_status = PaymentStatus::Complete;
        sale.payment_session_id = session.session_id;
        tracing::info!(
            sale_id,
            total = %sale.total_payment(),
            "membership sale complete"
        );
        Ok(Completion {
            sale,
            replayed: false,
        })
    }

    fn sale_from_form(&self, form: &RenewalForm) -> MembershipSale {
        let associate = (form.associate_member_id > 0)
            .then_some((form.associate_member_id, form.assoc_friend));
        MembershipSale::for_renewal(
            membership_year(Utc::now()),
            self.fees,
            form.full_member_id,
            form.friend,
            associate,
            form.donation_to_society,
            form.donation_to_museum,
            self.gateway.service_name(),
        )
    }

    /// Rebuild the sale from the hidden fields; `None` on anything that a
    /// confirmed breakdown page would never have emitted.
    fn sale_from_fields(&self, fields: &CheckoutFields) -> Option<MembershipSale> {
        let full_member_id = parse_member_id(&fields.user_id)?;
        let associate = if fields.assoc_user_id.is_empty() {
            None
        } else {
            let id = parse_member_id(&fields.assoc_user_id)?;
            Some((id, is_checked(&fields.assoc_friend)))
        };
        Some(MembershipSale::for_renewal(
            membership_year(Utc::now()),
            self.fees,
            full_member_id,
            is_checked(&fields.friend),
            associate,
            parse_amount(&fields.donation_to_society)?,
            parse_amount(&fields.donation_to_museum)?,
            self.gateway.service_name(),
        ))
    }
}

fn parse_member_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

// Absent means zero here: the breakdown page omits zero donations.
fn parse_amount(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return Some(Decimal::ZERO);
    }
    raw.parse::<Decimal>().ok().filter(|d| !d.is_sign_negative())
}

/// Cheap sanity check before the session id is sent to the gateway.
fn plausible_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
