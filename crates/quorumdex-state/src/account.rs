//! The mutable record of one address: balances per token, pending
//! orders, execution reports, and the transaction nonce.

use std::collections::BTreeMap;

use quorumdex_types::{Addr, Balance, ExecutionReport, OrderId, PendingOrder, TokenId};
use serde::{Deserialize, Serialize};

/// Per-address account state. All maps are `BTreeMap` so the serialized
/// form (and therefore the state root) is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pk: [u8; 32],
    addr: Addr,
    nonce: u64,
    balances: BTreeMap<TokenId, Balance>,
    pending_orders: BTreeMap<OrderId, PendingOrder>,
    execution_reports: Vec<ExecutionReport>,
}

impl Account {
    /// Create an empty account owned by the given public key.
    #[must_use]
    pub fn new(pk: [u8; 32]) -> Self {
        Self {
            pk,
            addr: Addr::from_pubkey(&pk),
            nonce: 0,
            balances: BTreeMap::new(),
            pending_orders: BTreeMap::new(),
            execution_reports: Vec::new(),
        }
    }

    #[must_use]
    pub fn pk(&self) -> &[u8; 32] {
        &self.pk
    }

    #[must_use]
    pub fn addr(&self) -> Addr {
        self.addr
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Advance the nonce after a transaction applies.
    pub fn bump_nonce(&mut self) {
        self.nonce += 1;
    }

    // =================================================================
    // Balances
    // =================================================================

    /// The balance record for a token; zero if the account never held it.
    #[must_use]
    pub fn balance(&self, token: TokenId) -> Balance {
        self.balances.get(&token).cloned().unwrap_or_default()
    }

    /// Write back a balance record.
    pub fn update_balance(&mut self, token: TokenId, balance: Balance) {
        self.balances.insert(token, balance);
    }

    /// Tokens this account has ever held, with their balances.
    #[must_use]
    pub fn balances(&self) -> &BTreeMap<TokenId, Balance> {
        &self.balances
    }

    // =================================================================
    // Pending orders
    // =================================================================

    #[must_use]
    pub fn pending_order(&self, id: OrderId) -> Option<PendingOrder> {
        self.pending_orders.get(&id).copied()
    }

    pub fn update_pending_order(&mut self, order: PendingOrder) {
        self.pending_orders.insert(order.id, order);
    }

    pub fn remove_pending_order(&mut self, id: OrderId) {
        self.pending_orders.remove(&id);
    }

    #[must_use]
    pub fn pending_orders(&self) -> &BTreeMap<OrderId, PendingOrder> {
        &self.pending_orders
    }

    // =================================================================
    // Execution reports
    // =================================================================

    pub fn add_execution_report(&mut self, report: ExecutionReport) {
        self.execution_reports.push(report);
    }

    #[must_use]
    pub fn execution_reports(&self) -> &[ExecutionReport] {
        &self.execution_reports
    }
}
