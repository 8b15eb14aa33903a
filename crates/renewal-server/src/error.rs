//! Error Types

use axum::http::StatusCode;
use renewal_core::StoreError;
use renewal_payments::GatewayError;
use thiserror::Error;

use crate::templates::TemplateError;

/// Anything that can abort a renewal request.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store failure: lookup misses surface as form messages, so this is
    /// connectivity, SQL, or a vanished row.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Payment gateway failure.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Page could not be rendered.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The success callback carried a session id we refuse to use.
    #[error("bad completion callback: {0}")]
    BadCallback(&'static str),

    /// Completion was attempted on a sale already cancelled.
    #[error("membership sale {0} is cancelled")]
    SaleCancelled(i64),
}

impl AppError {
    /// HTTP status the error page is served with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadCallback(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::SaleNotFound(_)) => StatusCode::NOT_FOUND,
            Self::SaleCancelled(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown on the error page. Gateway and database internals
    /// stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(StoreError::SaleNotFound(_)) => {
                "We could not find this renewal. Please start again.".into()
            }
            Self::Store(_) => {
                "The membership records are unavailable right now. Please try again later.".into()
            }
            Self::Gateway(_) => {
                "The payment service could not be reached. Please try again later.".into()
            }
            Self::Template(_) => "This page could not be displayed.".into(),
            Self::BadCallback(_) => {
                "This payment confirmation link is not valid.".into()
            }
            Self::SaleCancelled(_) => {
                "This payment was cancelled, so the renewal was not completed.".into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadCallback("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Store(StoreError::SaleNotFound(7)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::SaleCancelled(7).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Store(StoreError::MemberNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::Store(StoreError::backend("connection refused on 10.0.0.3"));
        assert!(!err.user_message().contains("10.0.0.3"));
    }
}
