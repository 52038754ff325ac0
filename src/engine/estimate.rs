// src/engine/estimate.rs
//
// Gas/fee estimation mirrors the execution engine's branching but stops
// short of submission. Estimation failures never reach the caller: any
// error collapses into fixed per-chain-family constants, distinguishable
// only in the logs.

use ethers_core::types::U256;
use tracing::warn;

use crate::chains::ChainFamily;
use crate::engine::errors::SwapError;
use crate::engine::models::GasEstimate;
use crate::engine::{evm, starknet, SwapContext};

/// Fallback constants for account-based chains: a generous swap gas limit
/// and a 20 gwei price.
const EVM_FALLBACK_GAS_UNITS: u64 = 300_000;
const EVM_FALLBACK_GAS_PRICE: u64 = 20_000_000_000;

/// Fallback constants for Starknet, in execution resources and fri.
const STARKNET_FALLBACK_GAS_UNITS: u64 = 5_000;
const STARKNET_FALLBACK_GAS_PRICE: u64 = 100_000_000_000;

/// The fixed estimate used when live estimation is unavailable. The shape is
/// identical to a live estimate, product identity included.
pub fn fallback_estimate(family: ChainFamily) -> GasEstimate {
    let (units, price) = match family {
        ChainFamily::Evm => (EVM_FALLBACK_GAS_UNITS, EVM_FALLBACK_GAS_PRICE),
        ChainFamily::Starknet => (STARKNET_FALLBACK_GAS_UNITS, STARKNET_FALLBACK_GAS_PRICE),
    };
    let cost = U256::from(units) * U256::from(price);
    GasEstimate {
        gas_estimate: units.to_string(),
        gas_price: price.to_string(),
        estimated_cost: cost.to_string(),
        cost_in_usd: None,
    }
}

/// Run the chain-appropriate estimator, absorbing every failure into the
/// fallback tuple.
pub(crate) async fn estimate_with_fallback(ctx: &SwapContext<'_>) -> GasEstimate {
    let family = ctx.chain.family();
    let attempt: Result<GasEstimate, SwapError> = match family {
        ChainFamily::Evm => evm::estimate_gas(ctx).await,
        ChainFamily::Starknet => starknet::estimate_gas(ctx).await,
    };
    match attempt {
        Ok(estimate) => estimate,
        Err(err) => {
            warn!(
                "Gas estimation failed on {} ({}), using fallback values",
                ctx.chain, err
            );
            fallback_estimate(family)
        }
    }
}
