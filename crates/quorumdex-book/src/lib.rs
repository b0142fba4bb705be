//! # quorumdex-book
//!
//! Per-market price-time-priority limit order book for the **quorumdex**
//! matching engine.
//!
//! - [`OrderBook`]: BTreeMap-based book with maker-price crossing
//! - [`PriceLevel`]: FIFO queue of resting orders at one price
//! - [`BookSnapshot`]: deterministic serialized form for persistence
//!
//! Matching is synchronous and deterministic: `limit` assigns the next
//! strictly-increasing id, crosses the opposite side while the best
//! opposite price satisfies the taker's limit, and emits one
//! [`Execution`](quorumdex_types::Execution) pair per cross at the
//! maker's price.

pub mod orderbook;
pub mod price_level;

pub use orderbook::{BookSnapshot, OrderBook, RestingOrder};
pub use price_level::PriceLevel;
