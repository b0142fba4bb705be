//! In-memory index of token metadata backed by the state.
//!
//! Symbol uniqueness is case-insensitive; the cache keeps the canonical
//! (upper-cased) symbol set alongside the id index. Newly staged tokens
//! enter the cache only when their transition commits.

use std::collections::{BTreeMap, BTreeSet};

use quorumdex_types::{Token, TokenId, TokenInfo};

use crate::state::State;

/// Token index: id to metadata plus the canonical symbol set.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    id_to_info: BTreeMap<TokenId, TokenInfo>,
    symbols: BTreeSet<String>,
}

impl TokenCache {
    /// Load the cache from every token persisted in the state.
    #[must_use]
    pub fn load(state: &State) -> Self {
        let mut cache = Self::default();
        for (id, info) in state.tokens() {
            cache.update(&Token {
                id: *id,
                info: info.clone(),
            });
        }
        cache
    }

    #[must_use]
    pub fn info(&self, id: TokenId) -> Option<&TokenInfo> {
        self.id_to_info.get(&id)
    }

    /// Case-insensitive symbol existence check.
    #[must_use]
    pub fn exists(&self, symbol: &str) -> bool {
        self.symbols.contains(&symbol.to_ascii_uppercase())
    }

    /// Number of registered tokens. The next token id is
    /// `size() + staged_creations` during a transition.
    #[must_use]
    pub fn size(&self) -> usize {
        self.id_to_info.len()
    }

    /// Register a token in the cache.
    pub fn update(&mut self, token: &Token) {
        self.symbols.insert(token.info.canonical_symbol());
        self.id_to_info.insert(token.id, token.info.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(symbol: &str) -> TokenCache {
        let mut cache = TokenCache::default();
        cache.update(&Token {
            id: TokenId(0),
            info: TokenInfo::new(symbol, 2, 1000),
        });
        cache
    }

    #[test]
    fn exists_is_case_insensitive() {
        let cache = cache_with("Abc");
        assert!(cache.exists("abc"));
        assert!(cache.exists("ABC"));
        assert!(!cache.exists("abcd"));
    }

    #[test]
    fn info_by_id() {
        let cache = cache_with("BTC");
        assert_eq!(cache.info(TokenId(0)).unwrap().symbol, "BTC");
        assert!(cache.info(TokenId(1)).is_none());
    }

    #[test]
    fn size_counts_tokens() {
        let mut cache = cache_with("A");
        assert_eq!(cache.size(), 1);
        cache.update(&Token {
            id: TokenId(1),
            info: TokenInfo::new("B", 0, 1),
        });
        assert_eq!(cache.size(), 2);
    }
}
