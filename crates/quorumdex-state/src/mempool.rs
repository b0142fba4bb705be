//! The mempool surface the transition consumes.
//!
//! The pool itself lives outside the core; the transition only looks
//! transactions up by content hash, inserts raw bytes it has not seen,
//! and removes what it applied.

use std::collections::HashMap;

use quorumdex_types::{Result, SignedTxn, TxnHash};

/// Content-addressed transaction pool, keyed by SHA-3-256 of the raw
/// transaction bytes.
pub trait TxnPool {
    /// Look up a decoded transaction by hash.
    fn get(&self, hash: &TxnHash) -> Option<SignedTxn>;

    /// Decode and admit raw transaction bytes, returning the decoded
    /// transaction.
    fn add(&mut self, raw: &[u8]) -> Result<SignedTxn>;

    /// Drop a transaction that has been applied.
    fn remove(&mut self, hash: &TxnHash);
}

/// A minimal in-memory pool for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct InMemoryPool {
    txns: HashMap<TxnHash, SignedTxn>,
}

impl InMemoryPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.txns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.txns.is_empty()
    }
}

impl TxnPool for InMemoryPool {
    fn get(&self, hash: &TxnHash) -> Option<SignedTxn> {
        self.txns.get(hash).cloned()
    }

    fn add(&mut self, raw: &[u8]) -> Result<SignedTxn> {
        let txn = SignedTxn::decode(raw)?;
        self.txns.insert(TxnHash::of(raw), txn.clone());
        Ok(txn)
    }

    fn remove(&mut self, hash: &TxnHash) {
        self.txns.remove(hash);
    }
}
