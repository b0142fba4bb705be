//! # quorumdex-state
//!
//! Deterministic per-round state transition for the **quorumdex**
//! exchange.
//!
//! - [`State`]: persistent store of accounts, tokens, order books, and
//!   the expiration/freeze schedules, with a write-through account cache
//!   and a canonical SHA-3 state root
//! - [`Account`]: balances, pending orders, and execution reports of one
//!   address
//! - [`TokenCache`]: in-memory token index with case-insensitive symbol
//!   uniqueness
//! - [`Transition`]: the per-round scratchpad that validates and applies
//!   transactions, matches orders, and finalizes the round
//! - [`TxnPool`]: the consumed mempool surface (get/add/remove by hash)
//! - [`GenesisConfig`]: initial token and allocation
//!
//! A `Transition` is the exclusive writer to its `State` for the duration
//! of a round. Until [`Transition::commit`] (or [`Transition::state_hash`],
//! which forces finalization) runs, every staged mutation lives in the
//! transition's own maps or in the state's discardable cache, so an
//! abandoned round leaves the committed state untouched.

pub mod account;
pub mod genesis;
pub mod mempool;
pub mod state;
pub mod token_cache;
pub mod transition;

pub use account::Account;
pub use genesis::GenesisConfig;
pub use mempool::{InMemoryPool, TxnPool};
pub use state::State;
pub use token_cache::TokenCache;
pub use transition::Transition;
