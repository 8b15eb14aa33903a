//! # renewal-payments
//!
//! Hosted-checkout payment gateway contract and its Stripe implementation.
//!
//! ## Hosted checkout
//!
//! The renewal service never touches card data. It opens a session with
//! the gateway, sends the user to the gateway's own payment pages, and
//! learns the outcome when the gateway redirects the user back:
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────┐
//! │ Renewal Site │────▶│  Stripe Hosted  │────▶│ Renewal Site │
//! │ (breakdown)  │     │  Checkout Page  │     │  (/success)  │
//! └──────────────┘     └─────────────────┘     └──────────────┘
//! ```
//!
//! The sale id travels out in the session's `client_reference` and comes
//! back when the session is retrieved on the success callback; that string
//! is the only correlation between the sale record and the payment.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use renewal_payments::{PaymentGateway, SessionRequest, StripeGateway};
//!
//! let gateway = StripeGateway::from_env()?;
//!
//! let session = gateway.create_session(SessionRequest {
//!     amount_minor: 3500,                  // £35.00 in pence
//!     currency: "gbp".into(),
//!     description: "Membership renewal 2025".into(),
//!     client_reference: sale_id.to_string(),
//!     success_url: "https://renewals.example/success?session_id={CHECKOUT_SESSION_ID}".into(),
//!     cancel_url: "https://renewals.example/cancel".into(),
//!     invoice: true,
//! }).await?;
//!
//! // Redirect the user to: session.redirect_url
//! ```

mod checkout;
mod error;
mod gateway;
mod mock;

pub use checkout::StripeGateway;
pub use error::{GatewayError, Result};
pub use gateway::{CreatedSession, PaymentGateway, SessionDetails, SessionRequest};
pub use mock::MockGateway;
