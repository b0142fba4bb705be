//! Consensus artifacts: blocks, proposals, and signature shares.
//!
//! Each artifact encodes canonically with bincode; `encode(false)` clears
//! the trailing signature field so signers and verifiers agree on the
//! covered bytes.

use quorumdex_types::Addr;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

fn sha3(bytes: &[u8]) -> [u8; 32] {
    let digest = Sha3_256::digest(bytes);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// A notarized block: the round's transaction payload plus the
/// post-state root, carried under the notarization committee's aggregate
/// BLS signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub round: u64,
    /// Address of the proposer.
    pub owner: Addr,
    /// Hash of the previous block.
    pub prev: [u8; 32],
    /// State root after applying `payload` to the prior state.
    pub state_root: [u8; 32],
    /// RLP-encoded list of raw transactions.
    pub payload: Vec<u8>,
    /// Aggregate BLS signature of the notarization committee over
    /// `encode(false)`.
    pub notarization_sig: Vec<u8>,
}

impl Block {
    /// Canonical bytes; with `include_sig == false` the notarization
    /// signature field is empty.
    #[must_use]
    pub fn encode(&self, include_sig: bool) -> Vec<u8> {
        let bytes = if include_sig {
            bincode::serialize(self)
        } else {
            let unsigned = Self {
                notarization_sig: Vec::new(),
                ..self.clone()
            };
            bincode::serialize(&unsigned)
        };
        bytes.expect("block serialization cannot fail")
    }

    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        sha3(&self.encode(true))
    }
}

/// A block proposal: the payload a proposer offers for notarization,
/// under the proposer's own key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProposal {
    pub round: u64,
    /// Raw ed25519 public key of the proposer.
    pub owner_pk: [u8; 32],
    /// Hash of the previous block.
    pub prev: [u8; 32],
    /// RLP-encoded list of raw transactions.
    pub payload: Vec<u8>,
    /// Proposer's ed25519 signature over `encode(false)`.
    pub signature: Vec<u8>,
}

impl BlockProposal {
    #[must_use]
    pub fn encode(&self, include_sig: bool) -> Vec<u8> {
        let bytes = if include_sig {
            bincode::serialize(self)
        } else {
            let unsigned = Self {
                signature: Vec::new(),
                ..self.clone()
            };
            bincode::serialize(&unsigned)
        };
        bytes.expect("block proposal serialization cannot fail")
    }

    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        sha3(&self.encode(true))
    }

    #[must_use]
    pub fn owner_addr(&self) -> Addr {
        Addr::from_pubkey(&self.owner_pk)
    }
}

/// One member's notarization share for a proposed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtShare {
    pub round: u64,
    /// Raw ed25519 public key of the sharing member.
    pub owner_pk: [u8; 32],
    /// Hash of the block proposal being notarized.
    pub proposal_hash: [u8; 32],
    /// The member's BLS signature share (opaque to this crate).
    pub share: Vec<u8>,
    /// Member's ed25519 signature over `encode(false)`.
    pub signature: Vec<u8>,
}

impl NtShare {
    #[must_use]
    pub fn encode(&self, include_sig: bool) -> Vec<u8> {
        let bytes = if include_sig {
            bincode::serialize(self)
        } else {
            let unsigned = Self {
                signature: Vec::new(),
                ..self.clone()
            };
            bincode::serialize(&unsigned)
        };
        bytes.expect("nt share serialization cannot fail")
    }

    #[must_use]
    pub fn owner_addr(&self) -> Addr {
        Addr::from_pubkey(&self.owner_pk)
    }
}

/// The completed random-beacon signature advancing the beacon one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandBeaconSig {
    pub round: u64,
    /// Hash of the previous beacon signature.
    pub last_sig_hash: [u8; 32],
    /// Aggregate BLS signature of the random-beacon committee.
    pub sig: Vec<u8>,
}

/// One member's share of the next random-beacon signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandBeaconSigShare {
    pub round: u64,
    /// Raw ed25519 public key of the sharing member.
    pub owner_pk: [u8; 32],
    /// Hash of the previous beacon signature.
    pub last_sig_hash: [u8; 32],
    /// The member's BLS signature share (opaque to this crate).
    pub share: Vec<u8>,
    /// Member's ed25519 signature over `encode(false)`.
    pub signature: Vec<u8>,
}

impl RandBeaconSigShare {
    #[must_use]
    pub fn encode(&self, include_sig: bool) -> Vec<u8> {
        let bytes = if include_sig {
            bincode::serialize(self)
        } else {
            let unsigned = Self {
                signature: Vec::new(),
                ..self.clone()
            };
            bincode::serialize(&unsigned)
        };
        bytes.expect("beacon share serialization cannot fail")
    }

    #[must_use]
    pub fn owner_addr(&self) -> Addr {
        Addr::from_pubkey(&self.owner_pk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Block {
        Block {
            round: 3,
            owner: Addr([1u8; 20]),
            prev: [2u8; 32],
            state_root: [3u8; 32],
            payload: vec![1, 2, 3],
            notarization_sig: vec![9; 16],
        }
    }

    #[test]
    fn unsigned_encoding_excludes_signature() {
        let b = block();
        let mut without = b.clone();
        without.notarization_sig = vec![7; 16];
        assert_eq!(
            b.encode(false),
            without.encode(false),
            "signature must not affect the signed bytes"
        );
        assert_ne!(b.encode(true), without.encode(true));
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(block().hash(), block().hash());
    }

    #[test]
    fn hash_depends_on_payload() {
        let mut other = block();
        other.payload.push(4);
        assert_ne!(block().hash(), other.hash());
    }

    #[test]
    fn proposal_owner_addr_matches_key() {
        let bp = BlockProposal {
            round: 1,
            owner_pk: [5u8; 32],
            prev: [0u8; 32],
            payload: Vec::new(),
            signature: Vec::new(),
        };
        assert_eq!(bp.owner_addr(), Addr::from_pubkey(&[5u8; 32]));
    }

    #[test]
    fn serde_roundtrip() {
        let b = block();
        let bytes = bincode::serialize(&b).unwrap();
        let back: Block = bincode::deserialize(&bytes).unwrap();
        assert_eq!(b, back);
    }
}
