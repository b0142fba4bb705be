//! Acceptance predicates for consensus artifacts received from peers.
//!
//! The validator is stateless against the transition; it consults only
//! the chain and beacon views. Predicates return `(…, false)` on any
//! mismatch and never panic on peer input; an artifact from a higher
//! round than we can check logs at `warn` (we may need to sync), a
//! stale one at `debug`.

use tracing::{debug, error, warn};

use quorumdex_types::verify_detached;

use crate::artifacts::{Block, BlockProposal, NtShare, RandBeaconSig, RandBeaconSigShare};
use crate::view::{ChainView, RandomBeaconView};

/// Proposer weight halves with each rank step. A negative rank is state
/// corruption, not peer input.
#[must_use]
pub fn rank_to_weight(rank: i32) -> f64 {
    assert!(rank >= 0, "negative proposer rank {rank}");
    0.5f64.powi(rank)
}

/// Validates the artifacts peers gossip for the current round.
pub struct Validator<'a, C, B> {
    chain: &'a C,
    beacon: &'a B,
}

impl<'a, C: ChainView, B: RandomBeaconView> Validator<'a, C, B> {
    #[must_use]
    pub fn new(chain: &'a C, beacon: &'a B) -> Self {
        Self { chain, beacon }
    }

    /// Accept a block: its round must be within the beacon's depth, the
    /// notarization committee's aggregate signature must cover the
    /// unsigned encoding, and the proposer must be ranked for the round.
    /// Returns the proposer weight `0.5^rank`.
    #[must_use]
    pub fn validate_block(&self, b: &Block) -> (f64, bool) {
        let depth = self.beacon.depth();
        if b.round > depth {
            warn!(
                round = b.round,
                depth, "received block of too high round, can't validate"
            );
            return (0.0, false);
        }

        let committees = self.beacon.committees(b.round);
        let Some(key) = self.beacon.group_key(committees.notarization) else {
            warn!(
                group = committees.notarization,
                round = b.round,
                "notarization group key unavailable"
            );
            return (0.0, false);
        };
        if !key.verify(&b.encode(false), &b.notarization_sig) {
            warn!(
                group = committees.notarization,
                block = %hex_short(&b.hash()),
                "block notarization signature failed"
            );
            return (0.0, false);
        }

        match self.beacon.rank(&b.owner, b.round) {
            Ok(rank) => (rank_to_weight(rank), true),
            Err(e) => {
                error!(%e, "no proposer rank, but group signature is valid");
                (0.0, false)
            }
        }
    }

    /// Accept a block proposal: correct round, proposer signature over
    /// the unsigned encoding, and a ranked proposer. The weight of a
    /// proposal is always 0; only the notarized block carries weight.
    #[must_use]
    pub fn validate_block_proposal(&self, bp: &BlockProposal) -> (f64, bool) {
        let round = self.chain.round();
        if bp.round != round {
            log_round_mismatch("block proposal", bp.round, round);
            return (0.0, false);
        }
        if !verify_detached(&bp.owner_pk, &bp.encode(false), &bp.signature) {
            warn!(round = bp.round, "block proposal signature failed");
            return (0.0, false);
        }
        if let Err(e) = self.beacon.rank(&bp.owner_addr(), round) {
            warn!(%e, "block proposal from unranked owner");
            return (0.0, false);
        }
        (0.0, true)
    }

    /// Accept a notarization share: correct round and a valid owner
    /// signature. Returns the notarization group the share belongs to.
    #[must_use]
    pub fn validate_nt_share(&self, n: &NtShare) -> (usize, bool) {
        let round = self.chain.round();
        if n.round != round {
            log_round_mismatch("nt share", n.round, round);
            return (0, false);
        }
        if !verify_detached(&n.owner_pk, &n.encode(false), &n.signature) {
            warn!(round = n.round, "nt share signature failed");
            return (0, false);
        }
        (self.beacon.committees(round).notarization, true)
    }

    /// Accept a completed random-beacon signature: it must advance the
    /// beacon exactly at its current depth.
    #[must_use]
    pub fn validate_rand_beacon_sig(&self, r: &RandBeaconSig) -> bool {
        let depth = self.beacon.depth();
        if r.round != depth {
            log_round_mismatch("rand beacon sig", r.round, depth);
            return false;
        }
        true
    }

    /// Accept a random-beacon signature share: beacon depth and owner
    /// signature. Returns the random-beacon group the share belongs to.
    #[must_use]
    pub fn validate_rand_beacon_sig_share(&self, r: &RandBeaconSigShare) -> (usize, bool) {
        let depth = self.beacon.depth();
        if r.round != depth {
            log_round_mismatch("rand beacon sig share", r.round, depth);
            return (0, false);
        }
        if !verify_detached(&r.owner_pk, &r.encode(false), &r.signature) {
            warn!(round = r.round, "rand beacon sig share signature failed");
            return (0, false);
        }
        (self.beacon.committees(depth).rand_beacon, true)
    }
}

fn log_round_mismatch(kind: &str, got: u64, expected: u64) {
    if got > expected {
        warn!(round = got, expected, "received {kind} of higher round");
    } else {
        debug!(round = got, expected, "received {kind} of lower round");
    }
}

fn hex_short(hash: &[u8; 32]) -> String {
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ed25519_dalek::{Signer, SigningKey};
    use quorumdex_types::{Addr, DexError};
    use sha3::{Digest, Sha3_256};

    use super::*;
    use crate::view::{Committees, GroupKey};

    struct MockChain {
        round: u64,
    }

    impl ChainView for MockChain {
        fn round(&self) -> u64 {
            self.round
        }
    }

    /// A stand-in aggregate key: a signature is the SHA-3 digest of the
    /// group seed concatenated with the message.
    struct MockGroupKey {
        seed: u8,
    }

    impl MockGroupKey {
        fn sign(&self, msg: &[u8]) -> Vec<u8> {
            let mut hasher = Sha3_256::new();
            hasher.update([self.seed]);
            hasher.update(msg);
            hasher.finalize().to_vec()
        }
    }

    impl GroupKey for MockGroupKey {
        fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
            self.sign(msg) == sig
        }
    }

    struct MockBeacon {
        depth: u64,
        keys: Vec<MockGroupKey>,
        ranks: HashMap<Addr, i32>,
    }

    impl RandomBeaconView for MockBeacon {
        fn depth(&self) -> u64 {
            self.depth
        }

        fn committees(&self, _round: u64) -> Committees {
            Committees {
                rand_beacon: 0,
                proposal: 1,
                notarization: 2,
            }
        }

        fn rank(&self, owner: &Addr, round: u64) -> quorumdex_types::Result<i32> {
            self.ranks
                .get(owner)
                .copied()
                .ok_or(DexError::UnknownCommitteeMember {
                    owner: *owner,
                    round,
                })
        }

        fn group_key(&self, group: usize) -> Option<&dyn GroupKey> {
            self.keys.get(group).map(|k| k as &dyn GroupKey)
        }
    }

    fn proposer() -> SigningKey {
        SigningKey::from_bytes(&[1u8; 32])
    }

    fn proposer_addr() -> Addr {
        Addr::from_pubkey(&proposer().verifying_key().to_bytes())
    }

    fn beacon(depth: u64, rank: i32) -> MockBeacon {
        MockBeacon {
            depth,
            keys: vec![
                MockGroupKey { seed: 10 },
                MockGroupKey { seed: 11 },
                MockGroupKey { seed: 12 },
            ],
            ranks: [(proposer_addr(), rank)].into_iter().collect(),
        }
    }

    fn notarized_block(beacon: &MockBeacon, round: u64) -> Block {
        let mut block = Block {
            round,
            owner: proposer_addr(),
            prev: [0u8; 32],
            state_root: [1u8; 32],
            payload: vec![1, 2, 3],
            notarization_sig: Vec::new(),
        };
        block.notarization_sig = beacon.keys[2].sign(&block.encode(false));
        block
    }

    fn signed_proposal(round: u64) -> BlockProposal {
        let key = proposer();
        let mut bp = BlockProposal {
            round,
            owner_pk: key.verifying_key().to_bytes(),
            prev: [0u8; 32],
            payload: vec![4, 5],
            signature: Vec::new(),
        };
        bp.signature = key.sign(&bp.encode(false)).to_bytes().to_vec();
        bp
    }

    fn signed_nt_share(round: u64) -> NtShare {
        let key = proposer();
        let mut share = NtShare {
            round,
            owner_pk: key.verifying_key().to_bytes(),
            proposal_hash: [7u8; 32],
            share: vec![1; 8],
            signature: Vec::new(),
        };
        share.signature = key.sign(&share.encode(false)).to_bytes().to_vec();
        share
    }

    fn signed_beacon_share(round: u64) -> RandBeaconSigShare {
        let key = proposer();
        let mut share = RandBeaconSigShare {
            round,
            owner_pk: key.verifying_key().to_bytes(),
            last_sig_hash: [3u8; 32],
            share: vec![2; 8],
            signature: Vec::new(),
        };
        share.signature = key.sign(&share.encode(false)).to_bytes().to_vec();
        share
    }

    #[test]
    fn block_weight_halves_with_rank() {
        let chain = MockChain { round: 5 };
        let b = beacon(5, 2);
        let block = notarized_block(&b, 5);
        let validator = Validator::new(&chain, &b);

        let (weight, ok) = validator.validate_block(&block);
        assert!(ok);
        assert!((weight - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn block_above_beacon_depth_rejected() {
        let chain = MockChain { round: 5 };
        let b = beacon(4, 0);
        let block = notarized_block(&b, 5);
        let validator = Validator::new(&chain, &b);
        assert_eq!(validator.validate_block(&block), (0.0, false));
    }

    #[test]
    fn block_with_bad_group_sig_rejected() {
        let chain = MockChain { round: 5 };
        let b = beacon(5, 0);
        let mut block = notarized_block(&b, 5);
        block.notarization_sig[0] ^= 0xff;
        let validator = Validator::new(&chain, &b);
        assert_eq!(validator.validate_block(&block), (0.0, false));
    }

    #[test]
    fn block_from_unranked_owner_rejected() {
        let chain = MockChain { round: 5 };
        let mut b = beacon(5, 0);
        b.ranks.clear();
        let block = notarized_block(&b, 5);
        let validator = Validator::new(&chain, &b);
        assert_eq!(validator.validate_block(&block), (0.0, false));
    }

    #[test]
    fn proposal_at_chain_round_accepted_with_zero_weight() {
        let chain = MockChain { round: 3 };
        let b = beacon(3, 1);
        let validator = Validator::new(&chain, &b);
        assert_eq!(
            validator.validate_block_proposal(&signed_proposal(3)),
            (0.0, true)
        );
    }

    #[test]
    fn proposal_round_mismatch_rejected() {
        let chain = MockChain { round: 3 };
        let b = beacon(3, 1);
        let validator = Validator::new(&chain, &b);
        assert_eq!(
            validator.validate_block_proposal(&signed_proposal(4)),
            (0.0, false),
            "higher round"
        );
        assert_eq!(
            validator.validate_block_proposal(&signed_proposal(2)),
            (0.0, false),
            "lower round"
        );
    }

    #[test]
    fn proposal_with_bad_signature_rejected() {
        let chain = MockChain { round: 3 };
        let b = beacon(3, 1);
        let mut bp = signed_proposal(3);
        bp.payload.push(9);
        let validator = Validator::new(&chain, &b);
        assert_eq!(validator.validate_block_proposal(&bp), (0.0, false));
    }

    #[test]
    fn proposal_from_unranked_owner_rejected() {
        let chain = MockChain { round: 3 };
        let mut b = beacon(3, 1);
        b.ranks.clear();
        let validator = Validator::new(&chain, &b);
        assert_eq!(
            validator.validate_block_proposal(&signed_proposal(3)),
            (0.0, false)
        );
    }

    #[test]
    fn nt_share_returns_notarization_group() {
        let chain = MockChain { round: 3 };
        let b = beacon(3, 0);
        let validator = Validator::new(&chain, &b);
        assert_eq!(validator.validate_nt_share(&signed_nt_share(3)), (2, true));
        assert_eq!(validator.validate_nt_share(&signed_nt_share(4)), (0, false));
    }

    #[test]
    fn nt_share_with_bad_signature_rejected() {
        let chain = MockChain { round: 3 };
        let b = beacon(3, 0);
        let mut share = signed_nt_share(3);
        share.share.push(0);
        let validator = Validator::new(&chain, &b);
        assert_eq!(validator.validate_nt_share(&share), (0, false));
    }

    #[test]
    fn rand_beacon_sig_must_match_depth() {
        let chain = MockChain { round: 9 };
        let b = beacon(6, 0);
        let validator = Validator::new(&chain, &b);
        let sig = RandBeaconSig {
            round: 6,
            last_sig_hash: [0u8; 32],
            sig: vec![1],
        };
        assert!(validator.validate_rand_beacon_sig(&sig));

        let stale = RandBeaconSig { round: 5, ..sig.clone() };
        assert!(!validator.validate_rand_beacon_sig(&stale));
        let early = RandBeaconSig { round: 7, ..sig };
        assert!(!validator.validate_rand_beacon_sig(&early));
    }

    #[test]
    fn beacon_share_returns_rand_beacon_group() {
        let chain = MockChain { round: 9 };
        let b = beacon(6, 0);
        let validator = Validator::new(&chain, &b);
        assert_eq!(
            validator.validate_rand_beacon_sig_share(&signed_beacon_share(6)),
            (0, true)
        );
        assert_eq!(
            validator.validate_rand_beacon_sig_share(&signed_beacon_share(7)),
            (0, false)
        );
    }

    #[test]
    fn weight_is_half_to_the_rank() {
        assert!((rank_to_weight(0) - 1.0).abs() < f64::EPSILON);
        assert!((rank_to_weight(1) - 0.5).abs() < f64::EPSILON);
        assert!((rank_to_weight(3) - 0.125).abs() < f64::EPSILON);
    }

    #[test]
    #[should_panic(expected = "negative proposer rank")]
    fn negative_rank_aborts() {
        rank_to_weight(-1);
    }
}
