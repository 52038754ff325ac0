// src/aggregator/models.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chains::ChainName;
use crate::engine::models::SwapOptions;

/// One supported chain as reported by the aggregation service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub chain_id: u64,
    pub router_address: String,
}

/// Immutable snapshot of the aggregation service's chain table, fetched once
/// at process start and injected into the engine. Name -> numeric id ->
/// router address.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<ChainName, ChainEntry>,
}

impl ChainRegistry {
    pub fn new(chains: HashMap<ChainName, ChainEntry>) -> Self {
        Self { chains }
    }

    pub fn get(&self, chain: ChainName) -> Option<&ChainEntry> {
        self.chains.get(&chain)
    }

    pub fn chains(&self) -> impl Iterator<Item = (&ChainName, &ChainEntry)> {
        self.chains.iter()
    }
}

/// Wire shape of the registry response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChainRegistryResponse {
    pub chains: Vec<ChainRegistryRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChainRegistryRow {
    pub name: String,
    pub chain_id: u64,
    pub router_address: String,
}

/// Parameters for a route / calldata request against the aggregation
/// service. Amounts are smallest-unit integer strings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub input_amount: String,
    pub token_in_address: String,
    pub token_out_address: String,
    pub slippage: f64,
    pub destination: String,
    pub chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_route: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub excluded_protocols: Vec<String>,
}

impl RouteRequest {
    pub fn new(
        input_amount: String,
        token_in: &str,
        token_out: &str,
        slippage: f64,
        destination: String,
        chain_id: u64,
        options: Option<&SwapOptions>,
    ) -> Self {
        RouteRequest {
            input_amount,
            token_in_address: token_in.to_string(),
            token_out_address: token_out.to_string(),
            slippage,
            destination,
            chain_id,
            direct_route: options.and_then(|o| o.direct_route.then_some(true)),
            excluded_protocols: options
                .map(|o| o.excluded_protocols.clone())
                .unwrap_or_default(),
        }
    }
}

/// Best-route descriptor. Opaque beyond the display summary and the quoted
/// output amount; the `route` value is passed through untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuote {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub input_amount: Option<String>,
    #[serde(default)]
    pub output_amount: Option<String>,
    #[serde(default)]
    pub route: Option<Value>,
}

impl RouteQuote {
    /// The upstream signals failure in-band rather than via HTTP status.
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }
}

/// Chain-family-shaped call data. The engine branches on family to consume
/// it but never inspects the contents.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CalldataPayload {
    /// Single ABI-encoded payload for the router on an EVM chain.
    Evm(String),
    /// Felt sequence for the router's swap entry point on Starknet.
    Starknet(Vec<String>),
}

/// Route plus the call data needed to build the swap transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCalldata {
    pub route: RouteQuote,
    pub calldata: CalldataPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calldata_payload_branches_on_shape() {
        let evm: RouteCalldata = serde_json::from_str(
            r#"{"route": {"outputAmount": "100"}, "calldata": "0xdeadbeef"}"#,
        )
        .unwrap();
        assert!(matches!(evm.calldata, CalldataPayload::Evm(ref s) if s == "0xdeadbeef"));

        let starknet: RouteCalldata = serde_json::from_str(
            r#"{"route": {}, "calldata": ["0x1", "0x2", "0x3"]}"#,
        )
        .unwrap();
        assert!(matches!(starknet.calldata, CalldataPayload::Starknet(ref v) if v.len() == 3));
    }

    #[test]
    fn quote_failure_flag() {
        let quote: RouteQuote =
            serde_json::from_str(r#"{"success": false, "errorMessage": "no liquidity"}"#).unwrap();
        assert!(quote.is_failure());
        assert_eq!(quote.error_message.as_deref(), Some("no liquidity"));

        let quote: RouteQuote = serde_json::from_str(r#"{"outputAmount": "5"}"#).unwrap();
        assert!(!quote.is_failure());
    }
}
