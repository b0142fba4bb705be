//! The per-round state transition.
//!
//! A [`Transition`] is created against a base [`State`] and records the
//! round's transactions in consensus order. Matching happens synchronously
//! as orders are placed; fills, refunds, and balance movements are applied
//! in-line, so every node reaching the same round from the same prior
//! state produces an identical post-state root.
//!
//! Staged mutations (token creations, scheduled expirations and thaws,
//! loaded order books, the recorded transaction list) live in the
//! transition's own maps; account mutations live in the state's write
//! cache. Nothing reaches the committed state until [`Transition::commit`]
//! or [`Transition::state_hash`] finalizes the round, so an abandoned
//! transition is discarded without side effects.
//!
//! Validation failures reject the transaction and leak no state change.
//! Violated invariants -- a refund exceeding the pending bucket, an
//! execution against an unknown pending order -- indicate state corruption
//! and abort the process.

use std::collections::{BTreeMap, BTreeSet};

use quorumdex_book::OrderBook;
use quorumdex_types::{
    calc_quote_quant, decode_payload, encode_payload, Addr, Balance, CancelOrderTxn, DexError,
    Execution, ExecutionReport, FreezeEntry, FreezeTokenTxn, Frozen, IssueTokenTxn, MarketSymbol,
    Order, OrderExpiration, OrderId, PendingOrder, PlaceOrderTxn, Result, SendTokenTxn, SignedTxn,
    Token, TokenId, TxnBody, TxnHash,
};
use tracing::{debug, error, warn};

use crate::mempool::TxnPool;
use crate::state::State;
use crate::token_cache::TokenCache;

/// Per-round scratchpad over a base state. Exclusive writer to its state
/// for the duration of the round; not reentrant.
pub struct Transition<'a> {
    state: &'a mut State,
    round: u64,
    finalized: bool,
    /// Tokens issued this round; registered on finalize.
    token_creations: Vec<Token>,
    /// Raw bytes of every applied transaction, in application order.
    /// This list is the canonical round payload.
    txns: Vec<Vec<u8>>,
    /// Expirations scheduled this round, keyed by expire round.
    expirations: BTreeMap<u64, Vec<OrderExpiration>>,
    /// Thaws scheduled this round, keyed by release round.
    freezes: BTreeMap<u64, Vec<FreezeEntry>>,
    /// Orders fully filled this round.
    filled_orders: Vec<PendingOrder>,
    /// Books touched this round, loaded at most once.
    order_books: BTreeMap<MarketSymbol, OrderBook>,
    dirty_books: BTreeSet<MarketSymbol>,
    token_cache: TokenCache,
}

impl<'a> Transition<'a> {
    /// Open a transition for `round` over the given base state.
    #[must_use]
    pub fn new(state: &'a mut State, round: u64) -> Self {
        let token_cache = TokenCache::load(state);
        Self {
            state,
            round,
            finalized: false,
            token_creations: Vec::new(),
            txns: Vec::new(),
            expirations: BTreeMap::new(),
            freezes: BTreeMap::new(),
            filled_orders: Vec::new(),
            order_books: BTreeMap::new(),
            dirty_books: BTreeSet::new(),
            token_cache,
        }
    }

    #[must_use]
    pub fn round(&self) -> u64 {
        self.round
    }

    // =================================================================
    // Recording
    // =================================================================

    /// Decode a block payload and record every transaction in order,
    /// resolving each raw byte-string through the pool by content hash.
    /// Stops at the first transaction that is invalid or not applied.
    /// Returns `(count, valid, success)`.
    pub fn record_serialized(
        &mut self,
        payload: &[u8],
        pool: &mut dyn TxnPool,
    ) -> (usize, bool, bool) {
        let raws = match decode_payload(payload) {
            Ok(raws) => raws,
            Err(e) => {
                error!(%e, "failed to decode txn payload");
                return (0, false, false);
            }
        };

        for raw in &raws {
            let hash = TxnHash::of(raw);
            let txn = match pool.get(&hash) {
                Some(txn) => txn,
                None => match pool.add(raw) {
                    Ok(txn) => txn,
                    Err(e) => {
                        error!(%e, %hash, "failed to admit txn from payload");
                        return (0, false, false);
                    }
                },
            };
            let (valid, success) = self.record(&txn);
            if !valid || !success {
                error!(%hash, valid, success, "failed to record txn from payload");
                return (0, valid, success);
            }
            pool.remove(&hash);
        }

        (raws.len(), true, true)
    }

    /// Record one transaction. Returns `(valid, success)`:
    /// `(false, _)` rejects permanently, `(true, false)` defers a nonce
    /// gap without mutating anything, `(true, true)` applies and appends
    /// the transaction to the round payload.
    pub fn record(&mut self, txn: &SignedTxn) -> (bool, bool) {
        assert!(
            !self.finalized,
            "record must never be called after finalize"
        );

        match self.validate_nonce(txn) {
            Err(e) => {
                warn!(%e, "transaction rejected");
                return (false, false);
            }
            Ok(false) => return (true, false),
            Ok(true) => {}
        }

        let sender = txn.sender_addr();
        let applied = match &txn.body {
            TxnBody::PlaceOrder(t) => self.place_order(sender, t),
            TxnBody::CancelOrder(t) => self.cancel_order(sender, t),
            TxnBody::IssueToken(t) => self.issue_token(sender, t),
            TxnBody::SendToken(t) => self.send_token(sender, t),
            TxnBody::FreezeToken(t) => self.freeze_token(sender, t),
        };

        if let Err(e) = applied {
            warn!(%e, %sender, "transaction failed");
            return (false, false);
        }

        self.state
            .account(&sender)
            .expect("sender account exists after nonce validation")
            .bump_nonce();
        self.txns.push(txn.encode());
        (true, true)
    }

    /// Signature and nonce admission. `Ok(true)` = ready to apply,
    /// `Ok(false)` = valid but deferred (nonce gap), `Err` = invalid.
    fn validate_nonce(&mut self, txn: &SignedTxn) -> Result<bool> {
        if !txn.verify_signature() {
            return Err(DexError::BadSignature);
        }
        let addr = txn.sender_addr();
        let Some(account) = self.state.account(&addr) else {
            return Err(DexError::UnknownSender(addr));
        };
        if txn.nonce < account.nonce() {
            return Err(DexError::NonceReplay {
                txn_nonce: txn.nonce,
                account_nonce: account.nonce(),
            });
        }
        Ok(txn.nonce == account.nonce())
    }

    /// RLP-encode the recorded transaction list, or `None` when the
    /// round is empty.
    #[must_use]
    pub fn txns(&self) -> Option<Vec<u8>> {
        if self.txns.is_empty() {
            None
        } else {
            Some(encode_payload(&self.txns))
        }
    }

    // =================================================================
    // Dispatch targets
    // =================================================================

    fn place_order(&mut self, owner: Addr, txn: &PlaceOrderTxn) -> Result<()> {
        if !txn.market.valid() {
            return Err(DexError::InvalidMarket(txn.market));
        }
        if txn.expire_round > 0 && self.round >= txn.expire_round {
            return Err(DexError::OrderExpired {
                expire_round: txn.expire_round,
                round: self.round,
            });
        }
        if txn.quant == 0 {
            return Err(DexError::ZeroQuant);
        }

        let base_decimals = self
            .token_cache
            .info(txn.market.base)
            .ok_or(DexError::UnknownToken(txn.market.base))?
            .decimals;
        let quote_decimals = self
            .token_cache
            .info(txn.market.quote)
            .ok_or(DexError::UnknownToken(txn.market.quote))?
            .decimals;

        // Reserve the order's funding leg: base for a sell, quote at the
        // limit price for a buy.
        if txn.sell_side {
            let account = self
                .state
                .account(&owner)
                .ok_or(DexError::UnknownSender(owner))?;
            let mut base = account.balance(txn.market.base);
            if base.available < txn.quant {
                return Err(DexError::InsufficientBalance {
                    token: txn.market.base,
                    needed: txn.quant,
                    available: base.available,
                });
            }
            base.available -= txn.quant;
            base.pending += txn.quant;
            account.update_balance(txn.market.base, base);
        } else {
            let reserve = calc_quote_quant(txn.quant, quote_decimals, txn.price, base_decimals)
                .ok_or(DexError::QuoteOverflow)?;
            if reserve == 0 {
                return Err(DexError::QuoteTooSmall);
            }
            let account = self
                .state
                .account(&owner)
                .ok_or(DexError::UnknownSender(owner))?;
            let mut quote = account.balance(txn.market.quote);
            if quote.available < reserve {
                return Err(DexError::InsufficientBalance {
                    token: txn.market.quote,
                    needed: reserve,
                    available: quote.available,
                });
            }
            quote.available -= reserve;
            quote.pending += reserve;
            account.update_balance(txn.market.quote, quote);
        }

        let order = Order {
            owner,
            sell_side: txn.sell_side,
            quant: txn.quant,
            price: txn.price,
            expire_round: txn.expire_round,
        };

        let (book_id, executions) = self.book(txn.market).limit(&order);
        self.dirty_books.insert(txn.market);

        let id = OrderId::new(txn.market, book_id);
        self.state
            .account(&owner)
            .expect("owner fetched above")
            .update_pending_order(PendingOrder {
                id,
                order,
                executed: 0,
            });
        if order.expire_round > 0 {
            self.expirations
                .entry(order.expire_round)
                .or_default()
                .push(OrderExpiration { id, owner });
        }

        for exec in &executions {
            self.settle_execution(txn.market, base_decimals, quote_decimals, exec);
        }
        Ok(())
    }

    /// Apply one side of a fill to the executed account: write the
    /// execution report, advance the pending order, and move balances.
    /// A sell-side fill releases pending base and receives quote at the
    /// trade price; a buy-side fill releases the reserve taken at the
    /// order's own limit price, pays the trade price, and keeps the
    /// difference.
    fn settle_execution(
        &mut self,
        market: MarketSymbol,
        base_decimals: u8,
        quote_decimals: u8,
        exec: &Execution,
    ) {
        let round = self.round;
        let order_id = OrderId::new(market, exec.id);
        let account = self
            .state
            .account(&exec.owner)
            .unwrap_or_else(|| panic!("no account {} for execution {order_id}", exec.owner));

        account.add_execution_report(ExecutionReport {
            round,
            id: order_id,
            sell_side: exec.sell_side,
            trade_price: exec.price,
            quant: exec.quant,
            fee: 0,
        });

        let mut executed = account
            .pending_order(order_id)
            .unwrap_or_else(|| panic!("no pending order {order_id} for a known execution"));
        executed.executed += exec.quant;
        let filled = executed.executed == executed.order.quant;
        if filled {
            account.remove_pending_order(order_id);
        } else {
            account.update_pending_order(executed);
        }

        let mut base = account.balance(market.base);
        let mut quote = account.balance(market.quote);
        if exec.sell_side {
            assert!(
                base.pending >= exec.quant,
                "pending base {} below executed {} for {order_id} (taker: {})",
                base.pending,
                exec.quant,
                exec.taker
            );
            base.pending -= exec.quant;
            let received = calc_quote_quant(exec.quant, quote_decimals, exec.price, base_decimals)
                .expect("settlement at trade price stays within the reserve");
            quote.available += received;
        } else {
            let reserved = calc_quote_quant(
                exec.quant,
                quote_decimals,
                executed.order.price,
                base_decimals,
            )
            .expect("release at the order's own price stays within the reserve");
            let paid = calc_quote_quant(exec.quant, quote_decimals, exec.price, base_decimals)
                .expect("settlement at trade price stays within the reserve");
            assert!(
                quote.pending >= reserved,
                "pending quote {} below reserve {} for {order_id} (taker: {})",
                quote.pending,
                reserved,
                exec.taker
            );
            quote.pending -= reserved;
            quote.available += reserved;
            quote.available -= paid;
            base.available += exec.quant;
        }
        account.update_balance(market.base, base);
        account.update_balance(market.quote, quote);

        if filled {
            self.filled_orders.push(executed);
        }
    }

    fn cancel_order(&mut self, owner: Addr, txn: &CancelOrderTxn) -> Result<()> {
        let cancelled = self
            .state
            .account(&owner)
            .ok_or(DexError::UnknownSender(owner))?
            .pending_order(txn.id)
            .ok_or(DexError::OrderNotFound(txn.id))?;

        self.book(txn.id.market).cancel(txn.id.id);
        self.dirty_books.insert(txn.id.market);
        self.state
            .account(&owner)
            .expect("owner fetched above")
            .remove_pending_order(txn.id);
        self.refund_after_cancel(owner, &cancelled, txn.id.market);
        Ok(())
    }

    /// Return a cancelled or expired order's reserve from pending to
    /// available, at the order's own price.
    fn refund_after_cancel(&mut self, owner: Addr, cancelled: &PendingOrder, market: MarketSymbol) {
        assert!(
            cancelled.order.quant > cancelled.executed,
            "pending order {} remainder must be positive: quant {}, executed {}",
            cancelled.id,
            cancelled.order.quant,
            cancelled.executed
        );
        let remaining = cancelled.remaining();

        let (token, refund) = if cancelled.order.sell_side {
            (market.base, remaining)
        } else {
            let quote_decimals = self
                .token_cache
                .info(market.quote)
                .expect("quote token exists for a live order")
                .decimals;
            let base_decimals = self
                .token_cache
                .info(market.base)
                .expect("base token exists for a live order")
                .decimals;
            let refund = calc_quote_quant(
                remaining,
                quote_decimals,
                cancelled.order.price,
                base_decimals,
            )
            .expect("refund at the order's own price stays within the reserve");
            (market.quote, refund)
        };

        let account = self
            .state
            .account(&owner)
            .unwrap_or_else(|| panic!("no account {owner} for refund of {}", cancelled.id));
        let mut balance = account.balance(token);
        assert!(
            balance.pending >= refund,
            "pending balance {} below refund {} for {}",
            balance.pending,
            refund,
            cancelled.id
        );
        balance.pending -= refund;
        balance.available += refund;
        account.update_balance(token, balance);
    }

    fn issue_token(&mut self, owner: Addr, txn: &IssueTokenTxn) -> Result<()> {
        txn.info.validate()?;
        if self.token_cache.exists(&txn.info.symbol) {
            return Err(DexError::DuplicateSymbol(txn.info.symbol.clone()));
        }
        // Symbols staged earlier in this transition collide too.
        let canonical = txn.info.canonical_symbol();
        if self
            .token_creations
            .iter()
            .any(|t| t.info.canonical_symbol() == canonical)
        {
            return Err(DexError::DuplicateSymbol(txn.info.symbol.clone()));
        }

        let id = TokenId((self.token_cache.size() + self.token_creations.len()) as u64);
        self.token_creations.push(Token {
            id,
            info: txn.info.clone(),
        });

        let account = self
            .state
            .account(&owner)
            .ok_or(DexError::UnknownSender(owner))?;
        let mut balance = Balance::new();
        balance.available = txn.info.total_units;
        account.update_balance(id, balance);
        Ok(())
    }

    fn send_token(&mut self, owner: Addr, txn: &SendTokenTxn) -> Result<()> {
        if txn.quant == 0 {
            return Err(DexError::ZeroQuant);
        }

        let sender = self
            .state
            .account(&owner)
            .ok_or(DexError::UnknownSender(owner))?;
        let mut from = sender.balance(txn.token_id);
        if from.available < txn.quant {
            return Err(DexError::InsufficientBalance {
                token: txn.token_id,
                needed: txn.quant,
                available: from.available,
            });
        }
        from.available -= txn.quant;
        sender.update_balance(txn.token_id, from);

        let to_addr = Addr::from_pubkey(&txn.to);
        if self.state.account(&to_addr).is_none() {
            self.state.new_account(txn.to);
        }
        let recipient = self
            .state
            .account(&to_addr)
            .expect("recipient account created above");
        let mut to = recipient.balance(txn.token_id);
        to.available += txn.quant;
        recipient.update_balance(txn.token_id, to);
        Ok(())
    }

    fn freeze_token(&mut self, owner: Addr, txn: &FreezeTokenTxn) -> Result<()> {
        if txn.quant == 0 {
            return Err(DexError::ZeroQuant);
        }
        if txn.available_round <= self.round {
            return Err(DexError::FreezeRoundPassed {
                available_round: txn.available_round,
                round: self.round,
            });
        }

        let account = self
            .state
            .account(&owner)
            .ok_or(DexError::UnknownSender(owner))?;
        let mut balance = account.balance(txn.token_id);
        if balance.available < txn.quant {
            return Err(DexError::InsufficientBalance {
                token: txn.token_id,
                needed: txn.quant,
                available: balance.available,
            });
        }
        balance.available -= txn.quant;
        balance.frozen.push(Frozen {
            available_round: txn.available_round,
            quant: txn.quant,
        });
        account.update_balance(txn.token_id, balance);

        self.freezes
            .entry(txn.available_round)
            .or_default()
            .push(FreezeEntry {
                addr: owner,
                token_id: txn.token_id,
                quant: txn.quant,
            });
        Ok(())
    }

    // =================================================================
    // Finalization
    // =================================================================

    /// The book for a market, loaded from state at most once per round.
    fn book(&mut self, market: MarketSymbol) -> &mut OrderBook {
        if !self.order_books.contains_key(&market) {
            let book = self
                .state
                .load_order_book(market)
                .unwrap_or_else(|| OrderBook::new(market));
            self.order_books.insert(market, book);
        }
        self.order_books.get_mut(&market).expect("book just loaded")
    }

    /// Run the round-boundary bookkeeping exactly once. The step order
    /// is load-bearing: filled orders leave the expiration schedule
    /// before this round's schedule additions persist, expirations run
    /// before books are saved (expiring cancels dirty books), and thaws
    /// read a schedule independent of order state.
    fn finalize_state(&mut self) {
        if self.finalized {
            return;
        }
        self.remove_filled_orders_from_expirations();
        // Must run after remove_filled_orders_from_expirations.
        self.record_order_expirations();
        // Must run after record_order_expirations, since this round may
        // add orders expiring next round.
        self.expire_orders();
        // Must run after expire_orders, which dirties books.
        self.save_dirty_order_books();
        self.record_freezes();
        self.release_tokens();
        self.register_token_creations();
        self.state.commit_cache();
        self.finalized = true;
    }

    /// Orders filled this round no longer expire. Drop them from the
    /// staged schedule; when fewer staged entries were dropped than
    /// orders filled for that round, the remainder was persisted by an
    /// earlier round and is purged from state.
    fn remove_filled_orders_from_expirations(&mut self) {
        let mut rounds: BTreeMap<u64, usize> = BTreeMap::new();
        let mut filled: BTreeSet<OrderId> = BTreeSet::new();
        for order in &self.filled_orders {
            if order.order.expire_round == 0 {
                continue;
            }
            filled.insert(order.id);
            *rounds.entry(order.order.expire_round).or_default() += 1;
        }

        for (&expire_round, &scheduled) in &rounds {
            let staged = self.expirations.entry(expire_round).or_default();
            let before = staged.len();
            staged.retain(|e| !filled.contains(&e.id));
            let removed = before - staged.len();
            if removed < scheduled {
                self.state.remove_order_expirations(expire_round, &filled);
            }
        }
    }

    /// Persist this round's staged expirations, ascending by round.
    fn record_order_expirations(&mut self) {
        for (&expire_round, entries) in &self.expirations {
            self.state
                .add_order_expirations(expire_round, entries.clone());
        }
    }

    /// Cancel and refund every order whose expiration is next round.
    fn expire_orders(&mut self) {
        let due = self.state.take_order_expirations(self.round + 1);
        for expiration in due {
            self.book(expiration.id.market).cancel(expiration.id.id);
            self.dirty_books.insert(expiration.id.market);

            let account = self
                .state
                .account(&expiration.owner)
                .unwrap_or_else(|| panic!("no account for expiring order {}", expiration.id));
            let Some(order) = account.pending_order(expiration.id) else {
                // Cancelled after scheduling; nothing left to refund.
                debug!(order = %expiration.id, "expiring order already retired");
                continue;
            };
            account.remove_pending_order(expiration.id);
            self.refund_after_cancel(expiration.owner, &order, expiration.id.market);
        }
    }

    /// Write back every touched book, in canonical market order.
    fn save_dirty_order_books(&mut self) {
        for (market, book) in &self.order_books {
            if self.dirty_books.contains(market) {
                self.state.save_order_book(book);
            }
        }
    }

    /// Persist this round's staged thaw schedule, ascending by round.
    /// Runs before `release_tokens`: a freeze may release next round.
    fn record_freezes(&mut self) {
        for (&release_round, entries) in &self.freezes {
            for entry in entries {
                self.state.freeze_token(release_round, *entry);
            }
        }
    }

    /// Release every frozen tranche scheduled to thaw next round. Each
    /// schedule entry matches the owner's first tranche keyed by the
    /// release round; a quantity mismatch at that key is corruption.
    fn release_tokens(&mut self) {
        let release_round = self.round + 1;
        let due = self.state.take_freeze_tokens(release_round);
        for entry in due {
            let account = self
                .state
                .account(&entry.addr)
                .unwrap_or_else(|| panic!("no account {} for scheduled thaw", entry.addr));
            let mut balance = account.balance(entry.token_id);
            let position = balance
                .frozen
                .iter()
                .position(|f| f.available_round == release_round)
                .unwrap_or_else(|| {
                    panic!(
                        "no frozen tranche of {} releasing at round {release_round} for {}",
                        entry.token_id, entry.addr
                    )
                });
            let tranche = balance.frozen.remove(position);
            assert_eq!(
                tranche.quant, entry.quant,
                "frozen tranche quant mismatch at round {release_round} for {}",
                entry.addr
            );
            balance.available += tranche.quant;
            account.update_balance(entry.token_id, balance);
        }
    }

    /// Register this round's issued tokens in the persistent store and
    /// the cache.
    fn register_token_creations(&mut self) {
        for token in &self.token_creations {
            self.state.update_token(token);
            self.token_cache.update(token);
        }
    }

    // =================================================================
    // Commit
    // =================================================================

    /// Finalize (idempotent) and return the post-state root. A pure
    /// function of (prior state, ordered txn list, round).
    pub fn state_hash(&mut self) -> [u8; 32] {
        self.finalize_state();
        self.state.hash()
    }

    /// Finalize the round and release the state.
    pub fn commit(mut self) {
        self.finalize_state();
    }
}
