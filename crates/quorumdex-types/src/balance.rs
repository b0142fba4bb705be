//! Balance tracking types.
//!
//! An account's holdings of a token are split across three disjoint
//! buckets: `available` (spendable), `pending` (reserved for live orders),
//! and `frozen` (time-locked until a release round). The sum across the
//! three buckets is the account's total holding; per-token conservation
//! over all accounts is a system invariant.

use serde::{Deserialize, Serialize};

use crate::{Addr, TokenId};

/// One time-locked tranche of a balance. Released in exactly one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frozen {
    /// The round in which this tranche becomes available again.
    pub available_round: u64,
    /// Amount locked, in base units.
    pub quant: u64,
}

/// Per-(account, token) balance record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Usable for new orders, transfers, and freezes.
    pub available: u64,
    /// Reserved by live orders awaiting fills or cancellation.
    pub pending: u64,
    /// Time-locked tranches in schedule-insertion order.
    pub frozen: Vec<Frozen>,
}

impl Balance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total holding across all three buckets.
    #[must_use]
    pub fn total(&self) -> u128 {
        u128::from(self.available)
            + u128::from(self.pending)
            + self.frozen.iter().map(|f| u128::from(f.quant)).sum::<u128>()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available == 0 && self.pending == 0 && self.frozen.is_empty()
    }
}

/// One entry of the state's freeze schedule: who thaws what at the
/// schedule's round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeEntry {
    pub addr: Addr,
    pub token_id: TokenId,
    pub quant: u64,
}
