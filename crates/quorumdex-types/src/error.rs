//! Error types for the quorumdex state-transition core.
//!
//! All errors use the `QDX_ERR_` prefix convention for easy grepping in
//! logs. Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance errors
//! - 3xx: Token errors
//! - 4xx: Transaction errors
//! - 5xx: Freeze errors
//! - 6xx: Consensus errors
//! - 9xx: General / internal errors
//!
//! Every variant here is a tier-2 validation failure: the offending
//! transaction or artifact is rejected and no state change leaks from the
//! attempt. Invariant violations that indicate state corruption are not
//! errors -- they abort the process.

use thiserror::Error;

use crate::{Addr, MarketSymbol, OrderId, TokenId};

/// Central error enum for all quorumdex operations.
#[derive(Debug, Error)]
pub enum DexError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The order to cancel is not pending on the sender's account.
    #[error("QDX_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The market's base and quote legs are the same token.
    #[error("QDX_ERR_101: Invalid market: {0}")]
    InvalidMarket(MarketSymbol),

    /// The order would expire at or before the current round.
    #[error("QDX_ERR_102: Order already expired: expire_round {expire_round}, round {round}")]
    OrderExpired { expire_round: u64, round: u64 },

    /// Zero-quantity orders and transfers are rejected.
    #[error("QDX_ERR_103: Quantity must be positive")]
    ZeroQuant,

    /// The order's quote-side value truncates to zero at the book's
    /// precision.
    #[error("QDX_ERR_104: Order quote value rounds to zero")]
    QuoteTooSmall,

    /// The order's quote-side value overflows 64-bit precision.
    #[error("QDX_ERR_105: Order quote value overflows")]
    QuoteOverflow,

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("QDX_ERR_200: Insufficient balance of {token}: need {needed}, have {available}")]
    InsufficientBalance {
        token: TokenId,
        needed: u64,
        available: u64,
    },

    // =================================================================
    // Token Errors (3xx)
    // =================================================================
    /// The referenced token does not exist.
    #[error("QDX_ERR_300: Unknown token: {0}")]
    UnknownToken(TokenId),

    /// A token with this symbol already exists (case-insensitive).
    #[error("QDX_ERR_301: Token symbol already exists: {0}")]
    DuplicateSymbol(String),

    /// The token definition failed validation.
    #[error("QDX_ERR_302: Invalid token info: {reason}")]
    InvalidTokenInfo { reason: String },

    // =================================================================
    // Transaction Errors (4xx)
    // =================================================================
    /// The sender has no account in the state.
    #[error("QDX_ERR_400: Unknown sender: {0}")]
    UnknownSender(Addr),

    /// The transaction nonce is below the account nonce (replay).
    #[error("QDX_ERR_401: Nonce replay: txn nonce {txn_nonce}, account nonce {account_nonce}")]
    NonceReplay { txn_nonce: u64, account_nonce: u64 },

    /// The ed25519 signature did not verify against the sender key.
    #[error("QDX_ERR_402: Transaction signature verification failed")]
    BadSignature,

    /// The transaction bytes did not decode.
    #[error("QDX_ERR_403: Malformed transaction: {0}")]
    MalformedTxn(String),

    // =================================================================
    // Freeze Errors (5xx)
    // =================================================================
    /// The freeze would thaw at or before the current round.
    #[error("QDX_ERR_500: Freeze releases too early: available_round {available_round}, round {round}")]
    FreezeRoundPassed { available_round: u64, round: u64 },

    // =================================================================
    // Consensus Errors (6xx)
    // =================================================================
    /// The owner is not a member of the round's committee.
    #[error("QDX_ERR_600: No rank for {owner} in round {round}")]
    UnknownCommitteeMember { owner: Addr, round: u64 },

    /// The referenced committee group does not exist.
    #[error("QDX_ERR_601: Unknown committee group: {0}")]
    UnknownGroup(usize),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Serialization / deserialization error.
    #[error("QDX_ERR_900: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DexError>;
