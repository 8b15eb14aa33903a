//! Gateway Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Payment-gateway errors. Opaque to callers: the coordinator treats any
/// of these as fatal for the request that hit them.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// A session id that cannot belong to this gateway
    #[error("malformed session id: {0:?}")]
    BadSessionId(String),

    /// The gateway answered without a field we need
    #[error("gateway response missing {0}")]
    MissingField(&'static str),

    /// No session with this id
    #[error("checkout session not found: {0}")]
    SessionNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
