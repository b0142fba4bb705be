//! Order and execution types.
//!
//! An [`Order`] is a limit order; matching happens synchronously when the
//! order is placed, and each cross emits a pair of [`Execution`]s -- one for
//! the resting maker, one for the incoming taker -- at the maker's price.

use serde::{Deserialize, Serialize};

use crate::{Addr, OrderId};

/// A limit order as submitted to a market's book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub owner: Addr,
    /// `true` sells base for quote; `false` buys base with quote.
    pub sell_side: bool,
    /// Quantity in base-token units.
    pub quant: u64,
    /// Limit price scaled by `ORDER_PRICE_DECIMALS`.
    pub price: u64,
    /// Round at which the unfilled remainder is cancelled; 0 = never.
    pub expire_round: u64,
}

/// A live order tracked on its owner's account.
///
/// `executed < quant` always holds while the order is pending; once
/// `executed == quant` the order moves to the transition's filled set and
/// leaves the owner's pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    pub order: Order,
    /// Base units filled so far.
    pub executed: u64,
}

impl PendingOrder {
    /// Base units still open.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.order.quant - self.executed
    }
}

/// One side of a single fill, as emitted by the order book.
///
/// `price` is always the maker's price; `taker` distinguishes the incoming
/// order's half of the pair from the resting order's half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Book-local id of the executed order.
    pub id: u64,
    pub owner: Addr,
    pub sell_side: bool,
    pub price: u64,
    pub quant: u64,
    pub taker: bool,
}

/// Durable record of one fill, appended to the executed account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub round: u64,
    pub id: OrderId,
    pub sell_side: bool,
    pub trade_price: u64,
    pub quant: u64,
    /// Always 0 until a fee model is specified.
    pub fee: u64,
}

/// One entry of the state's order-expiration schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpiration {
    pub id: OrderId,
    pub owner: Addr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MarketSymbol, TokenId};

    fn order_id() -> OrderId {
        OrderId::new(MarketSymbol::new(TokenId(0), TokenId(1)), 3)
    }

    #[test]
    fn remaining_tracks_fills() {
        let po = PendingOrder {
            id: order_id(),
            order: Order {
                owner: Addr([0u8; 20]),
                sell_side: true,
                quant: 10,
                price: 100,
                expire_round: 0,
            },
            executed: 4,
        };
        assert_eq!(po.remaining(), 6);
    }

    #[test]
    fn serde_roundtrip() {
        let exec = Execution {
            id: 1,
            owner: Addr([2u8; 20]),
            sell_side: false,
            price: 5,
            quant: 7,
            taker: true,
        };
        let json = serde_json::to_string(&exec).unwrap();
        let back: Execution = serde_json::from_str(&json).unwrap();
        assert_eq!(exec, back);
    }
}
