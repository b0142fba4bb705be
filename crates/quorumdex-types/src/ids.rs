//! Identifiers used throughout quorumdex.
//!
//! Token ids are assigned monotonically by the state transition; addresses
//! are derived from ed25519 public keys; order ids are unique within their
//! market's book.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::constants::ADDR_LEN;

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// Monotonically assigned token identifier. The first issued token gets 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Addr
// ---------------------------------------------------------------------------

/// Account address: the first 20 bytes of the SHA-3-256 digest of the
/// owner's ed25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Addr(pub [u8; ADDR_LEN]);

impl Addr {
    /// Derive the address of a raw ed25519 public key.
    #[must_use]
    pub fn from_pubkey(pk: &[u8; 32]) -> Self {
        let digest = Sha3_256::digest(pk);
        let mut addr = [0u8; ADDR_LEN];
        addr.copy_from_slice(&digest[..ADDR_LEN]);
        Self(addr)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDR_LEN] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// MarketSymbol
// ---------------------------------------------------------------------------

/// A trading pair of token ids. Quantities are in base-token units, prices
/// quote the amount of quote token per base token.
///
/// Markets order canonically by `(base, quote)` so that any iteration over
/// a market-keyed map is deterministic across nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketSymbol {
    pub base: TokenId,
    pub quote: TokenId,
}

impl MarketSymbol {
    #[must_use]
    pub fn new(base: TokenId, quote: TokenId) -> Self {
        Self { base, quote }
    }

    /// A market is valid only when its two legs differ.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.base != self.quote
    }
}

impl fmt::Display for MarketSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base.0, self.quote.0)
    }
}

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Identifies one order: the market it lives in plus the id assigned by
/// that market's book. Book-assigned ids are strictly increasing, so an
/// `OrderId` is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId {
    pub market: MarketSymbol,
    pub id: u64,
}

impl OrderId {
    #[must_use]
    pub fn new(market: MarketSymbol, id: u64) -> Self {
        Self { market, id }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.market, self.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_derivation_is_stable() {
        let pk = [7u8; 32];
        let a = Addr::from_pubkey(&pk);
        let b = Addr::from_pubkey(&pk);
        assert_eq!(a, b);
    }

    #[test]
    fn addr_differs_by_pubkey() {
        let a = Addr::from_pubkey(&[1u8; 32]);
        let b = Addr::from_pubkey(&[2u8; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn market_validity() {
        assert!(MarketSymbol::new(TokenId(0), TokenId(1)).valid());
        assert!(!MarketSymbol::new(TokenId(3), TokenId(3)).valid());
    }

    #[test]
    fn market_ordering_is_by_base_then_quote() {
        let a = MarketSymbol::new(TokenId(0), TokenId(2));
        let b = MarketSymbol::new(TokenId(0), TokenId(3));
        let c = MarketSymbol::new(TokenId(1), TokenId(0));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn serde_roundtrips() {
        let id = OrderId::new(MarketSymbol::new(TokenId(1), TokenId(2)), 42);
        let json = serde_json::to_string(&id).unwrap();
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let addr = Addr::from_pubkey(&[9u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Addr = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
