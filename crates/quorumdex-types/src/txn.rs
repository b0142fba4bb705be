//! Transaction variants, canonical encoding, and the block-payload codec.
//!
//! A transaction is a tagged union decoded exactly once; dispatch over the
//! variants is an exhaustive match, so adding a variant is a compile-time
//! signal. The canonical byte form is the deterministic bincode encoding
//! of the signed transaction; its SHA-3-256 digest is the content address
//! the mempool keys on.
//!
//! A block payload is the RLP encoding of the list of raw transaction
//! byte-strings, in application order.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::{Addr, DexError, MarketSymbol, OrderId, Result, TokenId, TokenInfo};

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Place a limit order on a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderTxn {
    pub market: MarketSymbol,
    pub sell_side: bool,
    pub quant: u64,
    pub price: u64,
    /// Round at which the unfilled remainder is cancelled; 0 = never.
    pub expire_round: u64,
}

/// Cancel a pending order in full. Partial cancel is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderTxn {
    pub id: OrderId,
}

/// Issue a new token; the full supply is credited to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTokenTxn {
    pub info: TokenInfo,
}

/// Transfer available balance to another public key, creating the
/// recipient account if needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTokenTxn {
    pub token_id: TokenId,
    pub to: [u8; 32],
    pub quant: u64,
}

/// Time-lock available balance until a future round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeTokenTxn {
    pub token_id: TokenId,
    pub quant: u64,
    pub available_round: u64,
}

/// The decoded transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnBody {
    PlaceOrder(PlaceOrderTxn),
    CancelOrder(CancelOrderTxn),
    IssueToken(IssueTokenTxn),
    SendToken(SendTokenTxn),
    FreezeToken(FreezeTokenTxn),
}

// ---------------------------------------------------------------------------
// TxnHash
// ---------------------------------------------------------------------------

/// SHA-3-256 digest of a raw transaction byte-string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TxnHash(pub [u8; 32]);

impl TxnHash {
    /// Content address of raw transaction bytes.
    #[must_use]
    pub fn of(raw: &[u8]) -> Self {
        let digest = Sha3_256::digest(raw);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        Self(hash)
    }
}

impl fmt::Display for TxnHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// SignedTxn
// ---------------------------------------------------------------------------

/// A transaction with its common fields: sender key, account nonce, and
/// ed25519 signature over the canonical unsigned bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTxn {
    pub body: TxnBody,
    pub nonce: u64,
    /// Raw ed25519 public key of the sender.
    pub sender: [u8; 32],
    /// Ed25519 signature over [`SignedTxn::signing_payload`].
    pub signature: Vec<u8>,
}

impl SignedTxn {
    /// Build and sign a transaction with the given key.
    #[must_use]
    pub fn sign(body: TxnBody, nonce: u64, key: &SigningKey) -> Self {
        let sender = key.verifying_key().to_bytes();
        let mut txn = Self {
            body,
            nonce,
            sender,
            signature: Vec::new(),
        };
        let sig = key.sign(&txn.signing_payload());
        txn.signature = sig.to_bytes().to_vec();
        txn
    }

    /// The canonical bytes the signature covers: the bincode encoding of
    /// `(body, nonce, sender)`.
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        bincode::serialize(&(&self.body, self.nonce, &self.sender))
            .expect("signing payload serialization cannot fail")
    }

    /// Verify the transaction signature against the sender key.
    #[must_use]
    pub fn verify_signature(&self) -> bool {
        verify_detached(&self.sender, &self.signing_payload(), &self.signature)
    }

    /// Canonical serialized form; this is what the mempool stores and
    /// hashes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("txn serialization cannot fail")
    }

    /// Decode the canonical form.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        bincode::deserialize(raw).map_err(|e| DexError::MalformedTxn(e.to_string()))
    }

    /// Content address of the canonical form.
    #[must_use]
    pub fn hash(&self) -> TxnHash {
        TxnHash::of(&self.encode())
    }

    /// Address of the sender key.
    #[must_use]
    pub fn sender_addr(&self) -> Addr {
        Addr::from_pubkey(&self.sender)
    }
}

/// Verify a detached ed25519 signature. Malformed keys or signatures
/// simply fail verification.
#[must_use]
pub fn verify_detached(pk: &[u8; 32], msg: &[u8], sig: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(pk) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(sig) else {
        return false;
    };
    key.verify_strict(msg, &sig).is_ok()
}

// ---------------------------------------------------------------------------
// Block payload codec
// ---------------------------------------------------------------------------

/// RLP-encode an ordered list of raw transaction byte-strings.
#[must_use]
pub fn encode_payload(raw_txns: &[Vec<u8>]) -> Vec<u8> {
    rlp::encode_list::<Vec<u8>, _>(raw_txns).to_vec()
}

/// Decode a block payload back into raw transaction byte-strings.
pub fn decode_payload(payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    rlp::Rlp::new(payload)
        .as_list::<Vec<u8>>()
        .map_err(|e| DexError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn sample_txn() -> SignedTxn {
        SignedTxn::sign(
            TxnBody::SendToken(SendTokenTxn {
                token_id: TokenId(0),
                to: [9u8; 32],
                quant: 100,
            }),
            3,
            &key(1),
        )
    }

    #[test]
    fn signature_verifies() {
        assert!(sample_txn().verify_signature());
    }

    #[test]
    fn tampered_body_fails_verification() {
        let mut txn = sample_txn();
        txn.nonce += 1;
        assert!(!txn.verify_signature());
    }

    #[test]
    fn wrong_sender_fails_verification() {
        let mut txn = sample_txn();
        txn.sender = key(2).verifying_key().to_bytes();
        assert!(!txn.verify_signature());
    }

    #[test]
    fn encode_decode_roundtrip() {
        let txn = sample_txn();
        let raw = txn.encode();
        let back = SignedTxn::decode(&raw).unwrap();
        assert_eq!(txn, back);
    }

    #[test]
    fn decode_garbage_is_malformed() {
        assert!(matches!(
            SignedTxn::decode(&[0xff; 3]),
            Err(DexError::MalformedTxn(_))
        ));
    }

    #[test]
    fn hash_is_stable() {
        let txn = sample_txn();
        assert_eq!(txn.hash(), txn.hash());
        assert_eq!(txn.hash(), TxnHash::of(&txn.encode()));
    }

    #[test]
    fn hash_differs_by_content() {
        let a = sample_txn();
        let b = SignedTxn::sign(
            TxnBody::CancelOrder(CancelOrderTxn {
                id: OrderId::new(MarketSymbol::new(TokenId(0), TokenId(1)), 1),
            }),
            3,
            &key(1),
        );
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn payload_roundtrip() {
        let txns = vec![sample_txn().encode(), sample_txn().encode(), vec![1, 2, 3]];
        let payload = encode_payload(&txns);
        let back = decode_payload(&payload).unwrap();
        assert_eq!(txns, back);
    }

    #[test]
    fn empty_payload_roundtrip() {
        let payload = encode_payload(&[]);
        assert_eq!(decode_payload(&payload).unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn payload_decode_rejects_garbage() {
        assert!(decode_payload(&[0x01, 0x02]).is_err());
    }
}
