// src/config.rs

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::chains::{ChainFamily, ChainName};
use crate::engine::errors::SwapError;

/// Credential values nobody should ever trade with.
const PLACEHOLDER_VALUES: [&str; 4] = [
    "your_private_key_here",
    "YOUR_PRIVATE_KEY",
    "changeme",
    "0x0",
];

/// A private key shorter than this cannot be a real signing key on either
/// chain family.
const MIN_CREDENTIAL_LEN: usize = 32;

/// Credentials for one chain, as found in the environment. Fields are kept
/// optional so `validate_chain` can report exactly what is missing;
/// `resolve` produces the fully-populated form the engine needs.
#[derive(Clone, Default)]
pub struct ChainEnv {
    pub rpc_url: Option<String>,
    pub private_key: Option<SecretString>,
    /// Deployed account address. Starknet only: the account contract is
    /// deployed separately from the key, unlike EVM where the address is
    /// derived from the private key.
    pub account_address: Option<String>,
}

/// Fully-resolved credentials for one chain. Read-only after construction;
/// the private key is only exposed at the signing site.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub private_key: SecretString,
    pub account_address: Option<String>,
}

/// Per-chain validation outcome for the diagnostics tool. Credentials appear
/// only in masked form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfigStatus {
    pub chain: ChainName,
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_masked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_address: Option<String>,
}

/// All configuration, loaded once at startup from the environment and
/// treated as read-only for the rest of the process.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Base URL of the external aggregation service.
    pub aggregator_api_url: String,
    /// Server-wide default slippage percentage.
    pub default_slippage: f64,
    /// Gas price multiplier as a fraction (1.2 = 120%). Applied with integer
    /// arithmetic: price * round(multiplier * 100) / 100.
    pub gas_price_multiplier: f64,
    /// How long to wait for a transaction confirmation before giving up.
    pub tx_timeout_secs: u64,
    chains: HashMap<ChainName, ChainEnv>,
}

impl Config {
    /// Loads configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut chains = HashMap::new();
        for chain in ChainName::ALL {
            let prefix = chain.env_prefix();
            let entry = ChainEnv {
                rpc_url: env::var(format!("{}_RPC_URL", prefix)).ok(),
                private_key: env::var(format!("{}_PRIVATE_KEY", prefix))
                    .ok()
                    .map(SecretString::new),
                account_address: env::var(format!("{}_ACCOUNT_ADDRESS", prefix)).ok(),
            };
            chains.insert(chain, entry);
        }

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            aggregator_api_url: env::var("AGGREGATOR_API_URL")
                .context("AGGREGATOR_API_URL must be set to the aggregation service base URL")?,
            default_slippage: env::var("DEFAULT_SLIPPAGE")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("DEFAULT_SLIPPAGE must be a valid number")?,
            gas_price_multiplier: env::var("GAS_PRICE_MULTIPLIER")
                .unwrap_or_else(|_| "1.2".to_string())
                .parse()
                .context("GAS_PRICE_MULTIPLIER must be a valid number")?,
            tx_timeout_secs: env::var("TX_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("TX_TIMEOUT_SECS must be a valid number")?,
            chains,
        })
    }

    /// Resolve the credentials for a chain, failing if anything required is
    /// absent. Starknet additionally needs the deployed account address.
    pub fn resolve(&self, chain: ChainName) -> Result<ChainConfig, SwapError> {
        let prefix = chain.env_prefix();
        let entry = self.chains.get(&chain).ok_or_else(|| {
            SwapError::ConfigMissing(format!("no configuration loaded for chain '{}'", chain))
        })?;
        let rpc_url = entry
            .rpc_url
            .clone()
            .ok_or_else(|| SwapError::ConfigMissing(format!("{}_RPC_URL is not set", prefix)))?;
        let private_key = entry.private_key.clone().ok_or_else(|| {
            SwapError::ConfigMissing(format!("{}_PRIVATE_KEY is not set", prefix))
        })?;
        let account_address = entry.account_address.clone();
        if chain.family() == ChainFamily::Starknet && account_address.is_none() {
            return Err(SwapError::MissingCredential(format!(
                "{}_ACCOUNT_ADDRESS is required: the Starknet account address cannot be derived from the private key",
                prefix
            )));
        }
        Ok(ChainConfig {
            rpc_url,
            private_key,
            account_address,
        })
    }

    /// Non-throwing validation for the diagnostics tool.
    pub fn validate_chain(&self, chain: ChainName) -> ChainConfigStatus {
        let prefix = chain.env_prefix();
        let entry = self.chains.get(&chain).cloned().unwrap_or_default();
        let mut errors = Vec::new();

        match &entry.rpc_url {
            None => errors.push(format!("{}_RPC_URL is not set", prefix)),
            Some(raw) => match url::Url::parse(raw) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                Ok(parsed) => errors.push(format!(
                    "{}_RPC_URL must be http or https, got '{}'",
                    prefix,
                    parsed.scheme()
                )),
                Err(_) => errors.push(format!("{}_RPC_URL is not a well-formed URL", prefix)),
            },
        }

        match &entry.private_key {
            None => errors.push(format!("{}_PRIVATE_KEY is not set", prefix)),
            Some(secret) => {
                let value = secret.expose_secret();
                if PLACEHOLDER_VALUES.contains(&value.as_str()) {
                    errors.push(format!("{}_PRIVATE_KEY is a placeholder value", prefix));
                } else if value.len() < MIN_CREDENTIAL_LEN {
                    errors.push(format!(
                        "{}_PRIVATE_KEY is too short to be a signing key",
                        prefix
                    ));
                }
            }
        }

        if chain.family() == ChainFamily::Starknet {
            match &entry.account_address {
                None => errors.push(format!("{}_ACCOUNT_ADDRESS is not set", prefix)),
                Some(address) => {
                    if PLACEHOLDER_VALUES.contains(&address.as_str())
                        || !crate::chains::is_valid_address(ChainFamily::Starknet, address)
                    {
                        errors.push(format!(
                            "{}_ACCOUNT_ADDRESS is not a valid Starknet address",
                            prefix
                        ));
                    }
                }
            }
        }

        ChainConfigStatus {
            chain,
            valid: errors.is_empty(),
            errors,
            rpc_url: entry.rpc_url.clone(),
            private_key_masked: entry
                .private_key
                .as_ref()
                .map(|secret| mask_secret(secret.expose_secret())),
            account_address: entry.account_address.clone(),
        }
    }

    pub fn with_chains(mut self, chains: HashMap<ChainName, ChainEnv>) -> Self {
        self.chains = chains;
        self
    }

    /// Minimal configuration for tests and programmatic construction.
    pub fn for_aggregator(aggregator_api_url: impl Into<String>) -> Self {
        Config {
            port: 0,
            aggregator_api_url: aggregator_api_url.into(),
            default_slippage: 1.0,
            gas_price_multiplier: 1.2,
            tx_timeout_secs: 10,
            chains: HashMap::new(),
        }
    }
}

/// Mask a credential for diagnostic output: first four and last four chars
/// with the middle elided, or a fixed token when too short to split safely.
pub fn mask_secret(secret: &str) -> String {
    if secret.len() <= 8 {
        return "****".to_string();
    }
    format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
}
