//! HTTP Handlers
//!
//! Thin translation between the wire and the coordinator. Every page goes
//! out as HTML; failures become the error page with the matching status.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use renewal_core::{FormInput, RenewalForm};

use crate::coordinator::{Checkout, CheckoutFields, Confirmation};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payment_service: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SuccessParams {
    /// Substituted by the gateway into the success URL; empty when the
    /// callback is hit without one.
    #[serde(default)]
    pub session_id: String,
}

type PageResult = Result<Html<String>, (StatusCode, Html<String>)>;

// ============================================================================
// Handlers
// ============================================================================

/// The renewal form, empty apart from the first-visit markers
pub async fn show_form(State(state): State<AppState>) -> PageResult {
    let form = RenewalForm::validate(FormInput::default());
    render_form_page(&state, &form)
}

/// Validate a submission: costs page on success, form with messages otherwise
pub async fn confirm(
    State(state): State<AppState>,
    Form(input): Form<FormInput>,
) -> PageResult {
    match state.coordinator.confirm(input).await {
        Ok(Confirmation::Confirmed { sale, breakdown }) => state
            .templates
            .render_breakdown(&sale, &breakdown)
            .map(Html)
            .map_err(|err| state.error_response(&err.into())),
        Ok(Confirmation::Rejected(form)) => render_form_page(&state, &form),
        Err(err) => Err(state.error_response(&err)),
    }
}

/// Create the pending sale and send the member to the hosted payment page
pub async fn checkout(
    State(state): State<AppState>,
    Form(fields): Form<CheckoutFields>,
) -> Result<Response, (StatusCode, Html<String>)> {
    match state.coordinator.begin_checkout(fields).await {
        Ok(Checkout::Redirect { redirect_url, .. }) => {
            Ok(Redirect::to(&redirect_url).into_response())
        }
        Ok(Checkout::Bypass) => {
            let form = RenewalForm::validate(FormInput::default());
            render_form_page(&state, &form).map(IntoResponse::into_response)
        }
        Err(err) => Err(state.error_response(&err)),
    }
}

/// Apply the completion callback and show the receipt
pub async fn success(
    State(state): State<AppState>,
    Query(params): Query<SuccessParams>,
) -> PageResult {
    let completion = state
        .coordinator
        .complete(&params.session_id)
        .await
        .map_err(|err| state.error_response(&err))?;
    state
        .templates
        .render_receipt(&completion.sale)
        .map(Html)
        .map_err(|err| state.error_response(&err.into()))
}

/// Cancellation page; the sale stays pending
pub async fn cancel(State(state): State<AppState>) -> PageResult {
    state
        .templates
        .render_cancelled()
        .map(Html)
        .map_err(|err| state.error_response(&err.into()))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payment_service: state.coordinator.payment_service(),
    })
}

fn render_form_page(state: &AppState, form: &RenewalForm) -> PageResult {
    state
        .templates
        .render_form(form)
        .map(Html)
        .map_err(|err| state.error_response(&err.into()))
}
