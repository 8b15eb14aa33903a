//! Fee Catalog
//!
//! The three membership tariffs, parsed once at startup and read-only
//! afterwards. A bad tariff string must stop the server from starting.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeeError {
    #[error("fee {0} is not set")]
    Missing(&'static str),

    #[error("fee {name} is not a decimal amount: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("fee {name} must not be negative: {value}")]
    Negative { name: &'static str, value: Decimal },
}

/// Annual tariffs: ordinary membership, associate membership for a second
/// member at the same address, and the friend-of-the-museum add-on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeCatalog {
    pub ordinary: Decimal,
    pub associate: Decimal,
    pub friend: Decimal,
}

impl FeeCatalog {
    /// Parse the catalog from the three configuration strings.
    pub fn parse(ordinary: &str, associate: &str, friend: &str) -> Result<Self, FeeError> {
        Ok(Self {
            ordinary: parse_fee("ordinary", ordinary)?,
            associate: parse_fee("associate", associate)?,
            friend: parse_fee("friend", friend)?,
        })
    }
}

fn parse_fee(name: &'static str, raw: &str) -> Result<Decimal, FeeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FeeError::Missing(name));
    }
    let value = Decimal::from_str(raw).map_err(|_| FeeError::Invalid {
        name,
        value: raw.to_string(),
    })?;
    if value.is_sign_negative() {
        return Err(FeeError::Negative { name, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_catalog() {
        let fees = FeeCatalog::parse("24.00", " 6.00 ", "5").unwrap();
        assert_eq!(fees.ordinary, dec!(24.00));
        assert_eq!(fees.associate, dec!(6.00));
        assert_eq!(fees.friend, dec!(5));
    }

    #[test]
    fn test_missing_fee_fails() {
        let err = FeeCatalog::parse("24.00", "", "5.00").unwrap_err();
        assert!(matches!(err, FeeError::Missing("associate")));
    }

    #[test]
    fn test_unparseable_fee_fails() {
        let err = FeeCatalog::parse("twenty", "6.00", "5.00").unwrap_err();
        assert!(matches!(err, FeeError::Invalid { name: "ordinary", .. }));
    }

    #[test]
    fn test_negative_fee_fails() {
        let err = FeeCatalog::parse("24.00", "6.00", "-5.00").unwrap_err();
        assert!(matches!(err, FeeError::Negative { name: "friend", .. }));
    }
}
