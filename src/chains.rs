// src/chains.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::errors::SwapError;

/// Sentinel address used by the aggregation service for the native coin of an
/// EVM chain. Swaps selling the native coin need no ERC-20 approval.
pub const NATIVE_TOKEN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Slippage is a percentage; anything outside this window is a caller mistake.
pub const MIN_SLIPPAGE: f64 = 0.01;
pub const MAX_SLIPPAGE: f64 = 50.0;

/// Token decimals accepted by the amount codec.
pub const MAX_DECIMALS: u32 = 30;

/// The fixed set of networks this server can trade on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainName {
    Base,
    Scroll,
    Starknet,
}

/// The two transaction models the engine knows how to drive. Selected once at
/// the top of each operation; everything downstream matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFamily {
    /// Private-key account, gas-unit x gas-price auction (Base, Scroll).
    Evm,
    /// Deployed contract account invoked via call bundles, fee estimation as
    /// a separate primitive (Starknet).
    Starknet,
}

impl ChainName {
    pub const ALL: [ChainName; 3] = [ChainName::Base, ChainName::Scroll, ChainName::Starknet];

    pub fn parse(input: &str) -> Result<Self, SwapError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(ChainName::Base),
            "scroll" => Ok(ChainName::Scroll),
            "starknet" => Ok(ChainName::Starknet),
            other => Err(SwapError::InvalidParameters(format!(
                "Unsupported chain '{}'. Supported chains: base, scroll, starknet",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainName::Base => "base",
            ChainName::Scroll => "scroll",
            ChainName::Starknet => "starknet",
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            ChainName::Base | ChainName::Scroll => ChainFamily::Evm,
            ChainName::Starknet => ChainFamily::Starknet,
        }
    }

    /// Block-explorer transaction URL for a submitted hash.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        match self {
            ChainName::Base => format!("https://basescan.org/tx/{}", tx_hash),
            ChainName::Scroll => format!("https://scrollscan.com/tx/{}", tx_hash),
            ChainName::Starknet => format!("https://starkscan.co/tx/{}", tx_hash),
        }
    }

    /// Environment-variable prefix for this chain's credentials.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ChainName::Base => "BASE",
            ChainName::Scroll => "SCROLL",
            ChainName::Starknet => "STARKNET",
        }
    }
}

impl fmt::Display for ChainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape check for an address on the given chain family. EVM addresses are
/// exactly 20 bytes of hex; Starknet addresses are field elements of up to
/// 32 bytes, conventionally 0x-prefixed with no fixed width.
pub fn is_valid_address(family: ChainFamily, address: &str) -> bool {
    let Some(body) = address.strip_prefix("0x") else {
        return false;
    };
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    match family {
        ChainFamily::Evm => body.len() == 40,
        ChainFamily::Starknet => body.len() <= 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_chain_names() {
        assert_eq!(ChainName::parse("base").unwrap(), ChainName::Base);
        assert_eq!(ChainName::parse("  Scroll ").unwrap(), ChainName::Scroll);
        assert_eq!(ChainName::parse("STARKNET").unwrap(), ChainName::Starknet);
        assert!(ChainName::parse("solana").is_err());
    }

    #[test]
    fn families_split_by_transaction_model() {
        assert_eq!(ChainName::Base.family(), ChainFamily::Evm);
        assert_eq!(ChainName::Scroll.family(), ChainFamily::Evm);
        assert_eq!(ChainName::Starknet.family(), ChainFamily::Starknet);
    }

    #[test]
    fn address_shapes_per_family() {
        assert!(is_valid_address(
            ChainFamily::Evm,
            "0x742d35Cc6634C0532925a3b844Bc454e4438f44e"
        ));
        assert!(!is_valid_address(ChainFamily::Evm, "0x742d35"));
        assert!(!is_valid_address(
            ChainFamily::Evm,
            "742d35Cc6634C0532925a3b844Bc454e4438f44e"
        ));
        // Starknet felts are variable width up to 64 hex chars.
        assert!(is_valid_address(ChainFamily::Starknet, "0x49d3657"));
        assert!(is_valid_address(
            ChainFamily::Starknet,
            "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7"
        ));
        assert!(!is_valid_address(
            ChainFamily::Starknet,
            "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7aa"
        ));
        assert!(!is_valid_address(ChainFamily::Starknet, "0xzz"));
    }
}
