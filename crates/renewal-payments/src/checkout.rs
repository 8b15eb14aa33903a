//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach: one payment-mode
//! session per membership sale, with the sale id riding in
//! `client_reference_id` so the success callback can find its way back.

use async_trait::async_trait;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionId, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionInvoiceCreation, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    Currency,
};

use crate::error::{GatewayError, Result};
use crate::gateway::{CreatedSession, PaymentGateway, SessionDetails, SessionRequest};

/// Stripe hosted-checkout gateway
pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| GatewayError::Config("STRIPE_SECRET_KEY not set".into()))?;

        Ok(Self::new(&secret_key))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(&self, request: SessionRequest) -> Result<CreatedSession> {
        let currency = request
            .currency
            .parse::<Currency>()
            .map_err(|_| GatewayError::Stripe(format!("unknown currency {:?}", request.currency)))?;

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.client_reference_id = Some(&request.client_reference);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.invoice_creation = Some(CreateCheckoutSessionInvoiceCreation {
            enabled: request.invoice,
            ..Default::default()
        });

        // One line item carrying the whole sale.
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency,
                unit_amount: Some(request.amount_minor),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.description.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| GatewayError::Stripe(e.to_string()))?;

        let redirect_url = session.url.ok_or(GatewayError::MissingField("url"))?;

        tracing::info!(
            session_id = %session.id,
            client_reference = %request.client_reference,
            amount_minor = request.amount_minor,
            "created Stripe checkout session"
        );

        Ok(CreatedSession {
            session_id: session.id.to_string(),
            redirect_url,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionDetails> {
        let id = session_id
            .parse::<CheckoutSessionId>()
            .map_err(|_| GatewayError::BadSessionId(session_id.to_string()))?;

        let session = StripeCheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| GatewayError::Stripe(e.to_string()))?;

        let client_reference = session
            .client_reference_id
            .ok_or(GatewayError::MissingField("client_reference_id"))?;

        Ok(SessionDetails {
            session_id: session.id.to_string(),
            client_reference,
        })
    }

    fn service_name(&self) -> &'static str {
        "Stripe"
    }
}
