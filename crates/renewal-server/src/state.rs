//! Application State

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Html;

use crate::coordinator::SaleCoordinator;
use crate::error::AppError;
use crate::templates::TemplateRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The renewal state machine
    pub coordinator: Arc<SaleCoordinator>,

    /// Parsed pages, read-only after startup
    pub templates: Arc<TemplateRegistry>,
}

impl AppState {
    /// Log a failed request and render the member-facing error page.
    pub fn error_response(&self, err: &AppError) -> (StatusCode, Html<String>) {
        tracing::error!(status = %err.status(), "request failed: {err}");
        (
            err.status(),
            Html(self.templates.render_error(&err.user_message())),
        )
    }
}
