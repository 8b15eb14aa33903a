//! Server Configuration
//!
//! Everything the binary reads from the environment, validated once at
//! startup. A misconfigured tariff or TLS pair stops the server before it
//! binds a port.

use std::net::SocketAddr;
use std::path::PathBuf;

use renewal_core::{FeeCatalog, FeeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("membership fee: {0}")]
    Fee(#[from] FeeError),
}

/// Paths of the PEM certificate chain and private key for HTTPS.
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Runtime configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// The three membership tariffs.
    pub fees: FeeCatalog,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Stripe secret key (sk_...).
    pub stripe_secret_key: String,

    /// Address the server binds, default 0.0.0.0:8080.
    pub bind_addr: SocketAddr,

    /// Host (and optional port) the gateway redirects back to,
    /// e.g. "renewals.example.org".
    pub public_host: String,

    /// HTTPS material; plain HTTP when absent.
    pub tls: Option<TlsConfig>,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let fees = FeeCatalog::parse(
            &require("MEMBERSHIP_FEE_ORDINARY")?,
            &require("MEMBERSHIP_FEE_ASSOCIATE")?,
            &require("MEMBERSHIP_FEE_FRIEND")?,
        )?;

        let bind_raw =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
        let bind_addr = bind_raw
            .parse()
            .map_err(|err| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: format!("{err} ({bind_raw:?})"),
            })?;

        // The redirect URLs handed to the gateway must point at a host the
        // member's browser can reach; falling back to the bind address only
        // suits local runs.
        let public_host = optional("PUBLIC_HOST").unwrap_or_else(|| bind_raw.clone());

        let tls = match (optional("TLS_CERT_PATH"), optional("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    name: "TLS_KEY_PATH",
                    reason: "TLS_CERT_PATH is set without it".into(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    name: "TLS_CERT_PATH",
                    reason: "TLS_KEY_PATH is set without it".into(),
                });
            }
        };

        Ok(Self {
            fees,
            database_url: require("DATABASE_URL")?,
            stripe_secret_key: require("STRIPE_SECRET_KEY")?,
            bind_addr,
            public_host,
            tls,
        })
    }

    /// Origin the gateway redirects back to. The scheme follows the TLS
    /// setting so success and cancel URLs always match how the server is
    /// actually reachable.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls.is_some() { "https" } else { "http" };
        format!("{scheme}://{}", self.public_host)
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config(tls: Option<TlsConfig>) -> Config {
        Config {
            fees: FeeCatalog {
                ordinary: dec!(24.00),
                associate: dec!(6.00),
                friend: dec!(5.00),
            },
            database_url: "postgres://localhost/renewals".into(),
            stripe_secret_key: "sk_test_x".into(),
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            public_host: "renewals.example.org".into(),
            tls,
        }
    }

    #[test]
    fn test_base_url_plain_http() {
        assert_eq!(config(None).base_url(), "http://renewals.example.org");
    }

    #[test]
    fn test_base_url_with_tls() {
        let tls = TlsConfig {
            cert_path: PathBuf::from("certs/server.pem"),
            key_path: PathBuf::from("certs/server.key"),
        };
        assert_eq!(
            config(Some(tls)).base_url(),
            "https://renewals.example.org"
        );
    }
}
