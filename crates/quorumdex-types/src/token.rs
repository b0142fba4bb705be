//! Token definitions.
//!
//! A token is issued once by an `IssueToken` transaction and never mutated
//! afterwards; its total supply is credited to the issuer in full.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_TOKEN_DECIMALS;
use crate::{DexError, Result, TokenId};

/// Immutable token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Case-insensitively unique ticker symbol.
    pub symbol: String,
    /// Decimal places of one whole token; quantities are in base units.
    pub decimals: u8,
    /// Total supply in base units.
    pub total_units: u64,
}

impl TokenInfo {
    #[must_use]
    pub fn new(symbol: impl Into<String>, decimals: u8, total_units: u64) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            total_units,
        }
    }

    /// Structural validation applied before a token can be issued.
    pub fn validate(&self) -> Result<()> {
        if self.decimals > MAX_TOKEN_DECIMALS {
            return Err(DexError::InvalidTokenInfo {
                reason: format!("decimals must be <= {MAX_TOKEN_DECIMALS}"),
            });
        }
        Ok(())
    }

    /// The canonical (upper-cased) form used for uniqueness checks.
    #[must_use]
    pub fn canonical_symbol(&self) -> String {
        self.symbol.to_ascii_uppercase()
    }
}

/// A registered token: id plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub info: TokenInfo,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.info.symbol, self.id.0)
    }
}
