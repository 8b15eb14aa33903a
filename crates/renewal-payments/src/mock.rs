//! Mock Payment Gateway
//!
//! For tests and local development. Sessions live in memory, ids are a
//! deterministic `cs_test_N` sequence, and every create request is
//! recorded for assertions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{GatewayError, Result};
use crate::gateway::{CreatedSession, PaymentGateway, SessionDetails, SessionRequest};

#[derive(Default)]
struct MockInner {
    next_id: u64,
    sessions: HashMap<String, SessionRequest>,
    requests: Vec<SessionRequest>,
}

/// In-memory gateway with deterministic session ids
pub struct MockGateway {
    redirect_base: String,
    inner: Mutex<MockInner>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            redirect_base: "https://checkout.mock.invalid/pay".into(),
            inner: Mutex::new(MockInner::default()),
        }
    }

    /// Every create request seen so far, oldest first.
    pub async fn requests(&self) -> Vec<SessionRequest> {
        let inner = self.inner.lock().await;
        inner.requests.clone()
    }

    pub async fn session_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.sessions.len()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_session(&self, request: SessionRequest) -> Result<CreatedSession> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let session_id = format!("cs_test_{}", inner.next_id);
        let redirect_url = format!("{}/{session_id}", self.redirect_base);

        inner.sessions.insert(session_id.clone(), request.clone());
        inner.requests.push(request);

        Ok(CreatedSession {
            session_id,
            redirect_url,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionDetails> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .get(session_id)
            .map(|request| SessionDetails {
                session_id: session_id.to_string(),
                client_reference: request.client_reference.clone(),
            })
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))
    }

    fn service_name(&self) -> &'static str {
        "MockGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(reference: &str) -> SessionRequest {
        SessionRequest {
            amount_minor: 3500,
            currency: "gbp".into(),
            description: "Membership renewal 2025".into(),
            client_reference: reference.into(),
            success_url: "http://renewals.test/success?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "http://renewals.test/cancel".into(),
            invoice: true,
        }
    }

    #[tokio::test]
    async fn test_sessions_are_deterministic_and_retrievable() {
        let gateway = MockGateway::new();

        let first = gateway.create_session(request("1")).await.unwrap();
        let second = gateway.create_session(request("2")).await.unwrap();
        assert_eq!(first.session_id, "cs_test_1");
        assert_eq!(second.session_id, "cs_test_2");
        assert!(first.redirect_url.ends_with("/cs_test_1"));

        let details = gateway.get_session("cs_test_2").await.unwrap();
        assert_eq!(details.client_reference, "2");
        assert_eq!(gateway.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_an_error() {
        let gateway = MockGateway::new();
        let err = gateway.get_session("cs_test_404").await.unwrap_err();
        assert!(matches!(err, GatewayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_requests_are_recorded_in_order() {
        let gateway = MockGateway::new();
        gateway.create_session(request("9")).await.unwrap();

        let requests = gateway.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].client_reference, "9");
        assert_eq!(requests[0].amount_minor, 3500);
    }
}
