//! Genesis configuration: the initial token and its owner.

use quorumdex_types::TokenInfo;
use serde::{Deserialize, Serialize};

/// Configuration for building the round-zero state. The configured token
/// becomes token id 0 with its full supply credited to `owner_pk`'s
/// account; everything else starts empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Raw ed25519 public key of the initial owner.
    pub owner_pk: [u8; 32],
    /// The native token definition.
    pub token: TokenInfo,
}
