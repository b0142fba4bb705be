//! # quorumdex-consensus
//!
//! Round-scoped validation of consensus artifacts for the **quorumdex**
//! exchange.
//!
//! - [`Block`], [`BlockProposal`], [`NtShare`], [`RandBeaconSig`],
//!   [`RandBeaconSigShare`]: the artifacts gossiped between nodes
//! - [`ChainView`], [`RandomBeaconView`], [`GroupKey`]: the read-only
//!   chain/beacon surface the validator consumes; the BLS implementation
//!   lives behind [`GroupKey`] outside this crate
//! - [`Validator`]: per-artifact acceptance predicates
//!
//! Validator predicates never panic on peer input: any mismatch yields
//! `(…, false)`, with higher-round artifacts logged at `warn` (a
//! potential sync trigger) and lower-round at `debug` (stale).

pub mod artifacts;
pub mod validator;
pub mod view;

pub use artifacts::{Block, BlockProposal, NtShare, RandBeaconSig, RandBeaconSigShare};
pub use validator::{rank_to_weight, Validator};
pub use view::{ChainView, Committees, GroupKey, RandomBeaconView};
