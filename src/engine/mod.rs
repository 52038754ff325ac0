// src/engine/mod.rs
//
// The swap execution engine. One uniform entry point per operation; the
// chain family is selected exactly once at the top and everything
// downstream is an exhaustive match over the two transaction models.

pub mod amounts;
pub mod errors;
pub mod estimate;
mod evm;
pub mod models;
mod starknet;

use std::sync::Arc;
use std::time::Duration;

use ethers_core::types::U256;
use tracing::{info, warn};

use crate::aggregator::models::ChainEntry;
use crate::aggregator::{AggregatorClient, ChainRegistry};
use crate::chains::{ChainFamily, ChainName};
use crate::config::{ChainConfig, Config};
use errors::SwapError;
use models::{GasEstimate, SwapParams, SwapResult};

/// Everything one operation needs. Built per invocation; nothing here
/// outlives the call.
pub(crate) struct SwapContext<'a> {
    pub chain: ChainName,
    pub entry: &'a ChainEntry,
    pub chain_config: ChainConfig,
    pub params: &'a SwapParams,
    pub amount: U256,
    pub slippage: f64,
    pub gas_price_multiplier: f64,
    pub tx_timeout: Duration,
    pub aggregator: &'a AggregatorClient,
}

/// Engine over the injected configuration, registry snapshot, and
/// aggregation client. Cheap to clone and safe to share across concurrent
/// invocations: all fields are read-only.
#[derive(Clone)]
pub struct SwapEngine {
    config: Arc<Config>,
    registry: Arc<ChainRegistry>,
    aggregator: Arc<AggregatorClient>,
}

impl SwapEngine {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ChainRegistry>,
        aggregator: Arc<AggregatorClient>,
    ) -> Self {
        Self {
            config,
            registry,
            aggregator,
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &AggregatorClient {
        &self.aggregator
    }

    /// Resolve registry entry and chain credentials into a per-operation
    /// context. Pure lookup; no network I/O.
    fn resolve_context<'a>(
        &'a self,
        params: &'a SwapParams,
        amount: U256,
    ) -> Result<SwapContext<'a>, SwapError> {
        let chain = params.chain_name;
        let entry = self
            .registry
            .get(chain)
            .ok_or_else(|| SwapError::RouterNotFound(chain.to_string()))?;
        let chain_config = self.config.resolve(chain)?;
        Ok(SwapContext {
            chain,
            entry,
            chain_config,
            params,
            amount,
            slippage: params.slippage.unwrap_or(self.config.default_slippage),
            gas_price_multiplier: self.config.gas_price_multiplier,
            tx_timeout: Duration::from_secs(self.config.tx_timeout_secs),
            aggregator: &self.aggregator,
        })
    }

    /// Execute one swap attempt. Never retries; every failure path folds
    /// into a value-typed result, nothing escapes as a panic or error.
    pub async fn execute_swap(&self, params: &SwapParams) -> SwapResult {
        if let Err(err) = params.validate() {
            return SwapResult::failure(err.to_string());
        }
        let amount = match amounts::parse_smallest_unit(&params.amount) {
            Ok(amount) => amount,
            Err(err) => return SwapResult::failure(err.to_string()),
        };
        let ctx = match self.resolve_context(params, amount) {
            Ok(ctx) => ctx,
            Err(err) => return SwapResult::failure(err.to_string()),
        };

        info!(
            "Executing swap on {}: {} -> {}",
            ctx.chain, params.token_in_address, params.token_out_address
        );
        let outcome = match ctx.chain.family() {
            ChainFamily::Evm => evm::execute_swap(&ctx).await,
            ChainFamily::Starknet => starknet::execute_swap(&ctx).await,
        };
        match outcome {
            Ok(success) => SwapResult::success(success),
            Err(err) => SwapResult::failure(err.to_string()),
        }
    }

    /// Estimate the cost of a swap without submitting anything. Parameter
    /// errors surface; everything after validation collapses into the
    /// per-family fallback tuple rather than failing.
    pub async fn estimate_gas(&self, params: &SwapParams) -> Result<GasEstimate, SwapError> {
        params.validate()?;
        let amount = amounts::parse_smallest_unit(&params.amount)?;
        match self.resolve_context(params, amount) {
            Ok(ctx) => Ok(estimate::estimate_with_fallback(&ctx).await),
            Err(err) => {
                warn!(
                    "Cannot prepare estimation on {} ({}), using fallback values",
                    params.chain_name, err
                );
                Ok(estimate::fallback_estimate(params.chain_name.family()))
            }
        }
    }
}
