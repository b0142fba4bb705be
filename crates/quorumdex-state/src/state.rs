//! Persistent world state: accounts, tokens, order books, and the
//! expiration/freeze schedules.
//!
//! Accounts mutate through a write-through cache: `account` /
//! `new_account` hand out mutable views living in the cache, and only
//! `commit_cache` folds them into the committed maps. Dropping the cache
//! instead leaves the committed state untouched, which is what makes an
//! uncommitted transition discardable.
//!
//! Every store is a `BTreeMap`, so iteration -- and therefore the state
//! root -- is deterministic across nodes.

use std::collections::{BTreeMap, BTreeSet};

use quorumdex_book::{BookSnapshot, OrderBook};
use quorumdex_types::{
    Addr, Balance, FreezeEntry, MarketSymbol, OrderExpiration, OrderId, Token, TokenId, TokenInfo,
};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::account::Account;
use crate::genesis::GenesisConfig;

/// The shared world state one transition mutates per round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    accounts: BTreeMap<Addr, Account>,
    tokens: BTreeMap<TokenId, TokenInfo>,
    books: BTreeMap<MarketSymbol, BookSnapshot>,
    order_expirations: BTreeMap<u64, Vec<OrderExpiration>>,
    freeze_schedule: BTreeMap<u64, Vec<FreezeEntry>>,
    /// Write-through account cache; never serialized or hashed.
    #[serde(skip)]
    cache: BTreeMap<Addr, Account>,
}

impl State {
    /// An empty state with no tokens and no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the round-zero state from a genesis configuration: one
    /// native token, fully credited to the configured owner.
    pub fn genesis(config: &GenesisConfig) -> quorumdex_types::Result<Self> {
        config.token.validate()?;
        let mut state = Self::new();
        let token = Token {
            id: TokenId(0),
            info: config.token.clone(),
        };
        state.update_token(&token);

        let owner = state.new_account(config.owner_pk);
        let mut balance = Balance::new();
        balance.available = config.token.total_units;
        owner.update_balance(token.id, balance);
        state.commit_cache();
        Ok(state)
    }

    // =================================================================
    // Accounts
    // =================================================================

    /// Mutable view of an account, pulled into the write cache on first
    /// access. `None` if the address has never been seen.
    pub fn account(&mut self, addr: &Addr) -> Option<&mut Account> {
        if !self.cache.contains_key(addr) {
            let committed = self.accounts.get(addr)?.clone();
            self.cache.insert(*addr, committed);
        }
        self.cache.get_mut(addr)
    }

    /// Create an account for a public key and return its mutable view.
    /// The account lives in the cache until `commit_cache`.
    pub fn new_account(&mut self, pk: [u8; 32]) -> &mut Account {
        let account = Account::new(pk);
        let addr = account.addr();
        self.cache.entry(addr).or_insert(account);
        self.cache.get_mut(&addr).expect("account just inserted")
    }

    /// Fold every cached account into the committed store.
    pub fn commit_cache(&mut self) {
        let cache = std::mem::take(&mut self.cache);
        for (addr, account) in cache {
            self.accounts.insert(addr, account);
        }
    }

    /// Drop all uncommitted account mutations.
    pub fn discard_cache(&mut self) {
        self.cache.clear();
    }

    /// Committed accounts, in address order.
    #[must_use]
    pub fn accounts(&self) -> &BTreeMap<Addr, Account> {
        &self.accounts
    }

    // =================================================================
    // Tokens
    // =================================================================

    #[must_use]
    pub fn tokens(&self) -> &BTreeMap<TokenId, TokenInfo> {
        &self.tokens
    }

    pub fn update_token(&mut self, token: &Token) {
        self.tokens.insert(token.id, token.info.clone());
    }

    // =================================================================
    // Order books
    // =================================================================

    #[must_use]
    pub fn load_order_book(&self, market: MarketSymbol) -> Option<OrderBook> {
        self.books.get(&market).map(OrderBook::from_snapshot)
    }

    pub fn save_order_book(&mut self, book: &OrderBook) {
        self.books.insert(book.market(), book.snapshot());
    }

    // =================================================================
    // Order-expiration schedule
    // =================================================================

    /// Append expirations scheduled for `round`.
    pub fn add_order_expirations(&mut self, round: u64, entries: Vec<OrderExpiration>) {
        if entries.is_empty() {
            return;
        }
        self.order_expirations.entry(round).or_default().extend(entries);
    }

    /// Expirations scheduled for `round`, in schedule-insertion order.
    #[must_use]
    pub fn get_order_expirations(&self, round: u64) -> Vec<OrderExpiration> {
        self.order_expirations.get(&round).cloned().unwrap_or_default()
    }

    /// Remove and return the expirations scheduled for `round`.
    pub fn take_order_expirations(&mut self, round: u64) -> Vec<OrderExpiration> {
        self.order_expirations.remove(&round).unwrap_or_default()
    }

    /// Purge persisted schedule entries for orders that were filled
    /// before they could expire.
    pub fn remove_order_expirations(&mut self, round: u64, filled: &BTreeSet<OrderId>) {
        if let Some(entries) = self.order_expirations.get_mut(&round) {
            entries.retain(|e| !filled.contains(&e.id));
            if entries.is_empty() {
                self.order_expirations.remove(&round);
            }
        }
    }

    // =================================================================
    // Freeze schedule
    // =================================================================

    /// Schedule a thaw of `entry` at `round`.
    pub fn freeze_token(&mut self, round: u64, entry: FreezeEntry) {
        self.freeze_schedule.entry(round).or_default().push(entry);
    }

    /// Thaws scheduled for `round`, in schedule-insertion order.
    #[must_use]
    pub fn get_freeze_tokens(&self, round: u64) -> Vec<FreezeEntry> {
        self.freeze_schedule.get(&round).cloned().unwrap_or_default()
    }

    /// Remove and return the thaws scheduled for `round`.
    pub fn take_freeze_tokens(&mut self, round: u64) -> Vec<FreezeEntry> {
        self.freeze_schedule.remove(&round).unwrap_or_default()
    }

    // =================================================================
    // Hashing and invariants
    // =================================================================

    /// Canonical SHA-3-256 root of the committed state. The cache is
    /// not part of the root; finalization flushes it first.
    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update(b"quorumdex:state:v1:");
        Self::hash_section(&mut hasher, b"accounts:", &self.accounts);
        Self::hash_section(&mut hasher, b"tokens:", &self.tokens);
        Self::hash_section(&mut hasher, b"books:", &self.books);
        Self::hash_section(&mut hasher, b"expirations:", &self.order_expirations);
        Self::hash_section(&mut hasher, b"freezes:", &self.freeze_schedule);
        let digest = hasher.finalize();
        let mut root = [0u8; 32];
        root.copy_from_slice(&digest);
        root
    }

    fn hash_section<T: Serialize>(hasher: &mut Sha3_256, tag: &[u8], section: &T) {
        let bytes = bincode::serialize(section).expect("state section serialization cannot fail");
        hasher.update(tag);
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }

    /// Sum of `available + pending + frozen` over every account for one
    /// token, cached mutations included. Equals the token's issued
    /// supply in every reachable state.
    #[must_use]
    pub fn circulating_supply(&self, token: TokenId) -> u128 {
        let mut total: u128 = 0;
        for (addr, account) in &self.accounts {
            let effective = self.cache.get(addr).unwrap_or(account);
            total += effective.balance(token).total();
        }
        for (addr, account) in &self.cache {
            if !self.accounts.contains_key(addr) {
                total += account.balance(token).total();
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use quorumdex_types::TokenInfo;

    use super::*;

    fn genesis_state() -> State {
        State::genesis(&GenesisConfig {
            owner_pk: [1u8; 32],
            token: TokenInfo::new("GEN", 2, 1_000_000),
        })
        .unwrap()
    }

    #[test]
    fn genesis_credits_owner() {
        let mut state = genesis_state();
        let owner = Addr::from_pubkey(&[1u8; 32]);
        let acc = state.account(&owner).unwrap();
        assert_eq!(acc.balance(TokenId(0)).available, 1_000_000);
        assert_eq!(state.tokens().len(), 1);
    }

    #[test]
    fn genesis_rejects_bad_token() {
        let result = State::genesis(&GenesisConfig {
            owner_pk: [1u8; 32],
            token: TokenInfo::new("GEN", 19, 1),
        });
        assert!(result.is_err());
    }

    #[test]
    fn cache_discard_leaves_committed_untouched() {
        let mut state = genesis_state();
        let owner = Addr::from_pubkey(&[1u8; 32]);
        let before = state.hash();

        let acc = state.account(&owner).unwrap();
        let mut b = acc.balance(TokenId(0));
        b.available -= 500;
        acc.update_balance(TokenId(0), b);
        state.discard_cache();

        assert_eq!(state.hash(), before);
        assert_eq!(
            state.account(&owner).unwrap().balance(TokenId(0)).available,
            1_000_000
        );
    }

    #[test]
    fn commit_cache_persists_mutations() {
        let mut state = genesis_state();
        let owner = Addr::from_pubkey(&[1u8; 32]);
        let before = state.hash();

        let acc = state.account(&owner).unwrap();
        let mut b = acc.balance(TokenId(0));
        b.available -= 500;
        acc.update_balance(TokenId(0), b);
        state.commit_cache();

        assert_ne!(state.hash(), before);
        assert_eq!(
            state.account(&owner).unwrap().balance(TokenId(0)).available,
            999_500
        );
    }

    #[test]
    fn hash_is_deterministic() {
        let a = genesis_state();
        let b = genesis_state();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn expiration_schedule_roundtrip() {
        let mut state = State::new();
        let id = OrderId::new(MarketSymbol::new(TokenId(0), TokenId(1)), 3);
        let entry = OrderExpiration {
            id,
            owner: Addr([9u8; 20]),
        };
        state.add_order_expirations(10, vec![entry]);
        assert_eq!(state.get_order_expirations(10), vec![entry]);
        assert!(state.get_order_expirations(11).is_empty());

        let taken = state.take_order_expirations(10);
        assert_eq!(taken, vec![entry]);
        assert!(state.get_order_expirations(10).is_empty());
    }

    #[test]
    fn remove_order_expirations_purges_filled() {
        let mut state = State::new();
        let market = MarketSymbol::new(TokenId(0), TokenId(1));
        let keep = OrderExpiration {
            id: OrderId::new(market, 1),
            owner: Addr([1u8; 20]),
        };
        let fill = OrderExpiration {
            id: OrderId::new(market, 2),
            owner: Addr([1u8; 20]),
        };
        state.add_order_expirations(5, vec![keep, fill]);

        let filled: BTreeSet<OrderId> = [fill.id].into_iter().collect();
        state.remove_order_expirations(5, &filled);
        assert_eq!(state.get_order_expirations(5), vec![keep]);
    }

    #[test]
    fn freeze_schedule_preserves_insertion_order() {
        let mut state = State::new();
        let first = FreezeEntry {
            addr: Addr([1u8; 20]),
            token_id: TokenId(0),
            quant: 10,
        };
        let second = FreezeEntry {
            addr: Addr([2u8; 20]),
            token_id: TokenId(0),
            quant: 20,
        };
        state.freeze_token(7, first);
        state.freeze_token(7, second);
        assert_eq!(state.take_freeze_tokens(7), vec![first, second]);
        assert!(state.get_freeze_tokens(7).is_empty());
    }

    #[test]
    fn supply_counts_cached_accounts() {
        let mut state = genesis_state();
        assert_eq!(state.circulating_supply(TokenId(0)), 1_000_000);

        // Move 300 to a fresh (cached, uncommitted) account.
        let owner = Addr::from_pubkey(&[1u8; 32]);
        let acc = state.account(&owner).unwrap();
        let mut b = acc.balance(TokenId(0));
        b.available -= 300;
        acc.update_balance(TokenId(0), b);
        let recipient = state.new_account([2u8; 32]);
        let mut rb = recipient.balance(TokenId(0));
        rb.available += 300;
        recipient.update_balance(TokenId(0), rb);

        assert_eq!(state.circulating_supply(TokenId(0)), 1_000_000);
    }
}
