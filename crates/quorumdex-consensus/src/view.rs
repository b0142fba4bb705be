//! The read-only chain and random-beacon surface the validator consumes.
//!
//! The BLS primitives stay outside this crate: committee keys appear only
//! as [`GroupKey`] trait objects capable of verifying an aggregate
//! signature over a message.

use quorumdex_types::{Addr, Result};

/// The committee group ids drawn for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committees {
    /// Group signing the next random-beacon output.
    pub rand_beacon: usize,
    /// Group ranking block proposers.
    pub proposal: usize,
    /// Group notarizing blocks.
    pub notarization: usize,
}

/// The chain's view of consensus progress.
pub trait ChainView {
    /// The round the chain is currently working on.
    fn round(&self) -> u64;
}

/// An aggregate committee public key.
pub trait GroupKey {
    /// Verify an aggregate signature over `msg`.
    fn verify(&self, msg: &[u8], sig: &[u8]) -> bool;
}

/// The random beacon's committee-selection surface.
pub trait RandomBeaconView {
    /// Rounds the beacon has completed; artifacts beyond this depth
    /// cannot be validated yet.
    fn depth(&self) -> u64;

    /// The committee groups drawn for `round`.
    fn committees(&self, round: u64) -> Committees;

    /// The proposer rank of `owner` in `round`; an error if `owner` is
    /// not ranked there.
    fn rank(&self, owner: &Addr, round: u64) -> Result<i32>;

    /// The aggregate public key of a committee group.
    fn group_key(&self, group: usize) -> Option<&dyn GroupKey>;
}
