//! System-wide constants for the quorumdex state-transition core.

/// Fixed decimal scale of the integer price representation. A price `p`
/// denotes `p / 10^ORDER_PRICE_DECIMALS` quote tokens per base token.
pub const ORDER_PRICE_DECIMALS: u8 = 8;

/// Maximum decimal precision a token may declare.
pub const MAX_TOKEN_DECIMALS: u8 = 18;

/// Length of an account address in bytes (truncated SHA-3-256 of the
/// owner public key).
pub const ADDR_LEN: usize = 20;

/// Length of a SHA-3-256 digest in bytes.
pub const HASH_LEN: usize = 32;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "quorumdex";
