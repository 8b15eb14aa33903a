//! Membership Renewal Server
//!
//! HTTP surface of the renewal service: the form, the cost-breakdown page,
//! the checkout redirect, and the gateway's success and cancel callbacks.
//! All renewal semantics live in [`coordinator::SaleCoordinator`]; the
//! router and handlers only move pages and form posts.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod state;
pub mod templates;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{cancel, checkout, confirm, health_check, show_form, success};
use crate::state::AppState;

/// Assemble the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Renewal flow
        .route("/", get(show_form))
        .route("/displayPaymentForm", get(show_form).post(confirm))
        .route("/checkout", post(checkout))
        // Gateway callbacks
        .route("/success", get(success))
        .route("/cancel", get(cancel))
        // Health & info
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
