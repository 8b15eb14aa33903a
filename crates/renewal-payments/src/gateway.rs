//! Payment Gateway Contract
//!
//! Gateway-neutral hosted-checkout operations. The coordinator only ever
//! talks to this trait; Stripe is one implementation, the in-memory mock
//! another.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Everything needed to open one hosted-checkout session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Total in minor units (pence for GBP).
    pub amount_minor: i64,

    /// Lowercase ISO currency code, e.g. "gbp".
    pub currency: String,

    /// Single product line shown on the gateway's payment page.
    pub description: String,

    /// Round-tripped by the gateway so the callback can re-find the sale.
    pub client_reference: String,

    /// Where the gateway sends the user after payment. May contain the
    /// literal `{CHECKOUT_SESSION_ID}` placeholder the gateway substitutes.
    pub success_url: String,

    /// Where the gateway sends the user who backs out.
    pub cancel_url: String,

    /// Whether the gateway should issue its own invoice for the payment.
    pub invoice: bool,
}

/// A freshly created hosted-checkout session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatedSession {
    /// Gateway's opaque session id.
    pub session_id: String,

    /// Hosted payment page to redirect the user to.
    pub redirect_url: String,
}

/// What the completion callback needs from a retrieved session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionDetails {
    pub session_id: String,

    /// The client reference given at creation.
    pub client_reference: String,
}

/// Hosted-checkout gateway (Strategy pattern)
///
/// Implement this per payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted-checkout session and return where to send the user.
    async fn create_session(&self, request: SessionRequest) -> Result<CreatedSession>;

    /// Retrieve a session by id, typically from the success callback.
    async fn get_session(&self, session_id: &str) -> Result<SessionDetails>;

    /// Tag recorded on sales paid through this gateway, e.g. "Stripe".
    fn service_name(&self) -> &'static str;
}
