//! The order book for a single market.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<u64>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<u64, PriceLevel>` -- lowest price first
//!
//! An auxiliary `HashMap<u64, (side, price)>` enables O(log N) cancellation.
//! Book-local ids are assigned strictly increasing; within a price level,
//! time priority is the FIFO order of the level's deque.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use quorumdex_types::{Addr, Execution, MarketSymbol, Order};
use serde::{Deserialize, Serialize};

use crate::price_level::PriceLevel;

/// A resting order: the remainder of a limit order waiting in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    /// Book-local id.
    pub id: u64,
    pub owner: Addr,
    pub price: u64,
    /// Remaining base units.
    pub quant: u64,
}

/// The order book for a single market.
#[derive(Debug)]
pub struct OrderBook {
    /// The market this book serves.
    market: MarketSymbol,
    /// Next id to assign; ids are strictly increasing per book.
    next_id: u64,
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<u64>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<u64, PriceLevel>,
    /// Fast lookup: `id -> (sell_side, price)` for O(log N) cancel.
    index: HashMap<u64, (bool, u64)>,
}

impl OrderBook {
    /// Create a new empty order book for the given market.
    #[must_use]
    pub fn new(market: MarketSymbol) -> Self {
        Self {
            market,
            next_id: 0,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    #[must_use]
    pub fn market(&self) -> MarketSymbol {
        self.market
    }

    // =================================================================
    // Matching
    // =================================================================

    /// Place a limit order: assign the next id, cross the opposite side
    /// while the best opposite price satisfies the taker's limit, and
    /// rest the remainder (if any) on the order's own side.
    ///
    /// Each cross fills `min(remaining, maker.remaining)` at the
    /// **maker's** price and emits two executions -- maker first, then
    /// taker -- so the caller settles both accounts from one stream.
    /// Executions appear in the order makers were consumed.
    pub fn limit(&mut self, order: &Order) -> (u64, Vec<Execution>) {
        let id = self.next_id;
        self.next_id += 1;

        let mut remaining = order.quant;
        let mut executions = Vec::new();

        if order.sell_side {
            while remaining > 0 {
                let Some((&Reverse(bid_price), level)) = self.bids.iter_mut().next() else {
                    break;
                };
                if bid_price < order.price {
                    break;
                }
                remaining = Self::cross(
                    &mut self.index,
                    level,
                    order,
                    id,
                    remaining,
                    &mut executions,
                );
                if level.is_empty() {
                    self.bids.remove(&Reverse(bid_price));
                }
            }
            if remaining > 0 {
                self.index.insert(id, (true, order.price));
                self.asks
                    .entry(order.price)
                    .or_insert_with(|| PriceLevel::new(order.price))
                    .push_back(RestingOrder {
                        id,
                        owner: order.owner,
                        price: order.price,
                        quant: remaining,
                    });
            }
        } else {
            while remaining > 0 {
                let Some((&ask_price, level)) = self.asks.iter_mut().next() else {
                    break;
                };
                if ask_price > order.price {
                    break;
                }
                remaining = Self::cross(
                    &mut self.index,
                    level,
                    order,
                    id,
                    remaining,
                    &mut executions,
                );
                if level.is_empty() {
                    self.asks.remove(&ask_price);
                }
            }
            if remaining > 0 {
                self.index.insert(id, (false, order.price));
                self.bids
                    .entry(Reverse(order.price))
                    .or_insert_with(|| PriceLevel::new(order.price))
                    .push_back(RestingOrder {
                        id,
                        owner: order.owner,
                        price: order.price,
                        quant: remaining,
                    });
            }
        }

        (id, executions)
    }

    /// Fill the taker against the front maker of `level` and emit the
    /// execution pair. Returns the taker's remaining quantity.
    fn cross(
        index: &mut HashMap<u64, (bool, u64)>,
        level: &mut PriceLevel,
        taker: &Order,
        taker_id: u64,
        remaining: u64,
        executions: &mut Vec<Execution>,
    ) -> u64 {
        let maker = level
            .orders
            .front_mut()
            .expect("non-empty price level has a front order");
        let fill = remaining.min(maker.quant);

        executions.push(Execution {
            id: maker.id,
            owner: maker.owner,
            sell_side: !taker.sell_side,
            price: maker.price,
            quant: fill,
            taker: false,
        });
        executions.push(Execution {
            id: taker_id,
            owner: taker.owner,
            sell_side: taker.sell_side,
            price: maker.price,
            quant: fill,
            taker: true,
        });

        maker.quant -= fill;
        if maker.quant == 0 {
            let filled = level
                .orders
                .pop_front()
                .expect("front order exists while filling");
            index.remove(&filled.id);
        }
        remaining - fill
    }

    // =================================================================
    // Cancellation
    // =================================================================

    /// Remove the order with the given book-local id from either side.
    /// Returns the removed resting order, or `None` if absent.
    pub fn cancel(&mut self, id: u64) -> Option<RestingOrder> {
        let (sell_side, price) = self.index.remove(&id)?;
        let removed = if sell_side {
            let level = self.asks.get_mut(&price)?;
            let removed = level.remove_order(id);
            if level.is_empty() {
                self.asks.remove(&price);
            }
            removed
        } else {
            let level = self.bids.get_mut(&Reverse(price))?;
            let removed = level.remove_order(id);
            if level.is_empty() {
                self.bids.remove(&Reverse(price));
            }
            removed
        };
        removed
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.keys().next().copied()
    }

    /// Total number of resting orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the book has no orders on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if an order rests in the book.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.index.contains_key(&id)
    }

    // =================================================================
    // Persistence
    // =================================================================

    /// Deterministic serialized form: both sides flattened best-price
    /// first, FIFO within each level.
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            market: self.market,
            next_id: self.next_id,
            bids: self
                .bids
                .values()
                .flat_map(|l| l.orders.iter().copied())
                .collect(),
            asks: self
                .asks
                .values()
                .flat_map(|l| l.orders.iter().copied())
                .collect(),
        }
    }

    /// Rebuild a book from its snapshot. Replaying the flattened sides
    /// in order reconstructs both price priority and FIFO order.
    #[must_use]
    pub fn from_snapshot(snap: &BookSnapshot) -> Self {
        let mut book = Self::new(snap.market);
        book.next_id = snap.next_id;
        for o in &snap.bids {
            book.index.insert(o.id, (false, o.price));
            book.bids
                .entry(Reverse(o.price))
                .or_insert_with(|| PriceLevel::new(o.price))
                .push_back(*o);
        }
        for o in &snap.asks {
            book.index.insert(o.id, (true, o.price));
            book.asks
                .entry(o.price)
                .or_insert_with(|| PriceLevel::new(o.price))
                .push_back(*o);
        }
        book
    }
}

/// The persisted form of an order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub market: MarketSymbol,
    pub next_id: u64,
    pub bids: Vec<RestingOrder>,
    pub asks: Vec<RestingOrder>,
}
