//! # quorumdex-types
//!
//! Shared types, errors, and constants for the **quorumdex** state-transition
//! core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`TokenId`], [`Addr`], [`MarketSymbol`], [`OrderId`]
//! - **Token model**: [`TokenInfo`], [`Token`]
//! - **Balance model**: [`Balance`], [`Frozen`], [`FreezeEntry`]
//! - **Order model**: [`Order`], [`PendingOrder`], [`Execution`],
//!   [`ExecutionReport`], [`OrderExpiration`]
//! - **Transactions**: [`TxnBody`], [`SignedTxn`], [`TxnHash`], and the
//!   block-payload codec ([`encode_payload`] / [`decode_payload`])
//! - **Quote-quant arithmetic**: [`calc_quote_quant`]
//! - **Errors**: [`DexError`] with `QDX_ERR_` prefix codes
//! - **Constants**: system-wide limits and scale factors

pub mod balance;
pub mod constants;
pub mod error;
pub mod ids;
pub mod math;
pub mod order;
pub mod token;
pub mod txn;

// Re-export all primary types at crate root for ergonomic imports:
//   use quorumdex_types::{Order, Balance, SignedTxn, ...};

pub use balance::*;
pub use error::*;
pub use ids::*;
pub use math::*;
pub use order::*;
pub use token::*;
pub use txn::*;

// Constants are accessed via `quorumdex_types::constants::FOO`
// (not re-exported to avoid name collisions).
