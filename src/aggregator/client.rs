// src/aggregator/client.rs

use std::collections::HashMap;

use reqwest::Client;
use tracing::{debug, warn};

use crate::chains::ChainName;
use crate::engine::errors::SwapError;

use super::models::{
    ChainEntry, ChainRegistry, ChainRegistryResponse, RouteCalldata, RouteQuote, RouteRequest,
};

/// Thin typed wrapper over the external aggregation service. The routing
/// algorithm itself lives upstream; this client only moves requests and
/// responses.
#[derive(Clone)]
pub struct AggregatorClient {
    http: Client,
    base_url: String,
}

impl AggregatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the chain table (name, numeric id, router address). Called once
    /// at process start; the result is shared read-only for the process
    /// lifetime. Chains the service reports but this server does not support
    /// are skipped.
    pub async fn fetch_chain_registry(&self) -> Result<ChainRegistry, SwapError> {
        let url = format!("{}/chains", self.base_url);
        let response: ChainRegistryResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SwapError::RouteUnavailable(format!("chain registry fetch: {}", e)))?
            .json()
            .await
            .map_err(|e| SwapError::RouteUnavailable(format!("chain registry decode: {}", e)))?;

        let mut chains = HashMap::new();
        for row in response.chains {
            match ChainName::parse(&row.name) {
                Ok(chain) => {
                    chains.insert(
                        chain,
                        ChainEntry {
                            chain_id: row.chain_id,
                            router_address: row.router_address,
                        },
                    );
                }
                Err(_) => {
                    warn!("Skipping unsupported chain '{}' from registry", row.name);
                }
            }
        }
        debug!("Loaded chain registry with {} entries", chains.len());
        Ok(ChainRegistry::new(chains))
    }

    /// Quote the best route without building call data.
    pub async fn get_best_route(&self, request: &RouteRequest) -> Result<RouteQuote, SwapError> {
        let url = format!("{}/route", self.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("amount", request.input_amount.clone()),
            ("tokenInAddress", request.token_in_address.clone()),
            ("tokenOutAddress", request.token_out_address.clone()),
            ("chainId", request.chain_id.to_string()),
        ];
        if request.direct_route == Some(true) {
            query.push(("direct", "true".to_string()));
        }
        if !request.excluded_protocols.is_empty() {
            query.push(("excludeProtocols", request.excluded_protocols.join(",")));
        }

        let quote: RouteQuote = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| SwapError::RouteUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| SwapError::RouteUnavailable(format!("route decode: {}", e)))?;
        Self::check_quote(&quote)?;
        Ok(quote)
    }

    /// Build the best route together with the chain-appropriate call data
    /// for executing it.
    pub async fn build_route_calldata(
        &self,
        request: &RouteRequest,
    ) -> Result<RouteCalldata, SwapError> {
        let url = format!("{}/calldata", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SwapError::RouteUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SwapError::RouteUnavailable(format!(
                "aggregation service returned {}",
                response.status()
            )));
        }
        let calldata: RouteCalldata = response
            .json()
            .await
            .map_err(|e| SwapError::RouteUnavailable(format!("calldata decode: {}", e)))?;
        Self::check_quote(&calldata.route)?;
        Ok(calldata)
    }

    fn check_quote(quote: &RouteQuote) -> Result<(), SwapError> {
        if quote.is_failure() {
            return Err(SwapError::RouteUnavailable(
                quote
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "aggregation service reported failure".to_string()),
            ));
        }
        Ok(())
    }
}
