// src/engine/starknet.rs
//
// Executor for the account-abstraction chain. The user's on-chain presence
// is a deployed account contract; approve + swap go out as one atomic
// multi-call, and fees come from a dedicated estimation primitive rather
// than a gas auction.

use ethers_core::types::U256;
use secrecy::ExposeSecret;
use starknet::accounts::{Account, ExecutionEncoding, SingleOwnerAccount};
use starknet::core::chain_id;
use starknet::core::types::{BlockId, BlockTag, Call, Felt};
use starknet::core::utils::get_selector_from_name;
use starknet::providers::jsonrpc::{HttpTransport, JsonRpcClient};
use starknet::signers::{LocalWallet, SigningKey};
use tracing::info;
use url::Url;

use crate::aggregator::models::{CalldataPayload, RouteRequest};
use crate::engine::errors::{SwapError, GENERIC_STARKNET_FAILURE};
use crate::engine::models::{GasEstimate, SwapOutcome};
use crate::engine::SwapContext;

/// The router's swap entry point, invoked with the calldata returned by the
/// aggregation service.
const SWAP_ENTRY_POINT: &str = "swap";

fn parse_felt(value: &str, what: &str) -> Result<Felt, SwapError> {
    Felt::from_hex(value)
        .map_err(|e| SwapError::InvalidParameters(format!("bad {} '{}': {}", what, value, e)))
}

fn message_or_generic(err: impl ToString) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        GENERIC_STARKNET_FAILURE.to_string()
    } else {
        message
    }
}

/// Split a U256 into the (low, high) 128-bit limbs of a Cairo u256.
fn u256_limbs(amount: U256) -> (Felt, Felt) {
    let low = amount & ((U256::one() << 128) - U256::one());
    let high = amount >> 128;
    (Felt::from(low.as_u128()), Felt::from(high.as_u128()))
}

/// Approve call against the input token, allowing the router to pull the
/// swap amount.
fn build_approve_call(token: Felt, router: Felt, amount: U256) -> Result<Call, SwapError> {
    let (low, high) = u256_limbs(amount);
    Ok(Call {
        to: token,
        selector: get_selector_from_name("approve")
            .map_err(|e| SwapError::Unknown(message_or_generic(e)))?,
        calldata: vec![router, low, high],
    })
}

fn build_swap_call(router: Felt, calldata: &[String]) -> Result<Call, SwapError> {
    let felts = calldata
        .iter()
        .map(|step| {
            Felt::from_hex(step).map_err(|e| {
                SwapError::RouteUnavailable(format!("bad calldata step '{}': {}", step, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Call {
        to: router,
        selector: get_selector_from_name(SWAP_ENTRY_POINT)
            .map_err(|e| SwapError::Unknown(message_or_generic(e)))?,
        calldata: felts,
    })
}

type StarknetAccount = SingleOwnerAccount<JsonRpcClient<HttpTransport>, LocalWallet>;

fn build_account(ctx: &SwapContext<'_>, address: Felt) -> Result<StarknetAccount, SwapError> {
    let rpc_url = Url::parse(&ctx.chain_config.rpc_url)
        .map_err(|e| SwapError::ConfigInvalid(format!("bad Starknet RPC URL: {}", e)))?;
    let provider = JsonRpcClient::new(HttpTransport::new(rpc_url));
    let secret = Felt::from_hex(ctx.chain_config.private_key.expose_secret())
        .map_err(|e| SwapError::ConfigInvalid(format!("invalid Starknet private key: {}", e)))?;
    let signer = LocalWallet::from(SigningKey::from_secret_scalar(secret));
    let mut account = SingleOwnerAccount::new(
        provider,
        signer,
        address,
        chain_id::MAINNET,
        ExecutionEncoding::New,
    );
    account.set_block_id(BlockId::Tag(BlockTag::Pending));
    Ok(account)
}

/// Resolve the deployed account address; required before anything touches
/// the network.
fn account_address(ctx: &SwapContext<'_>) -> Result<Felt, SwapError> {
    let address = ctx.chain_config.account_address.as_deref().ok_or_else(|| {
        SwapError::MissingCredential(
            "STARKNET_ACCOUNT_ADDRESS is required for Starknet swaps".to_string(),
        )
    })?;
    parse_felt(address, "account address")
}

/// Build both calls, then fetch route calldata and submit the approve+swap
/// pair as one atomic execution under the account.
pub(crate) async fn execute_swap(ctx: &SwapContext<'_>) -> Result<SwapOutcome, SwapError> {
    let address = account_address(ctx)?;
    let token_in = parse_felt(&ctx.params.token_in_address, "token address")?;
    let router = parse_felt(&ctx.entry.router_address, "router address")
        .map_err(|_| SwapError::RouterNotFound(ctx.chain.to_string()))?;

    let receiver = ctx
        .params
        .receiver_address
        .clone()
        .unwrap_or_else(|| ctx.chain_config.account_address.clone().unwrap_or_default());

    let approve_call = build_approve_call(token_in, router, ctx.amount)?;

    let request = RouteRequest::new(
        ctx.amount.to_string(),
        &ctx.params.token_in_address,
        &ctx.params.token_out_address,
        ctx.slippage,
        receiver,
        ctx.entry.chain_id,
        ctx.params.options.as_ref(),
    );
    let calldata = ctx.aggregator.build_route_calldata(&request).await?;
    let steps = match &calldata.calldata {
        CalldataPayload::Starknet(steps) => steps,
        CalldataPayload::Evm(_) => {
            return Err(SwapError::RouteUnavailable(
                "aggregation service returned EVM calldata for Starknet".to_string(),
            ))
        }
    };
    let swap_call = build_swap_call(router, steps)?;

    let account = build_account(ctx, address)?;
    let result = account
        .execute_v3(vec![approve_call, swap_call])
        .send()
        .await
        .map_err(|e| SwapError::SubmissionFailed(message_or_generic(e)))?;

    let tx_hash = format!("{:#x}", result.transaction_hash);
    info!("Swap submitted on {}: {}", ctx.chain, tx_hash);
    Ok(SwapOutcome {
        explorer_url: ctx.chain.explorer_tx_url(&tx_hash),
        transaction_hash: tx_hash,
        gas_used: None,
        output_amount: calldata.route.output_amount,
    })
}

/// Same approve+swap pair, run through the account's fee-estimation
/// primitive instead of being submitted.
pub(crate) async fn estimate_gas(ctx: &SwapContext<'_>) -> Result<GasEstimate, SwapError> {
    let address = account_address(ctx)?;
    let token_in = parse_felt(&ctx.params.token_in_address, "token address")?;
    let router = parse_felt(&ctx.entry.router_address, "router address")
        .map_err(|_| SwapError::RouterNotFound(ctx.chain.to_string()))?;

    let receiver = ctx
        .params
        .receiver_address
        .clone()
        .unwrap_or_else(|| ctx.chain_config.account_address.clone().unwrap_or_default());

    let approve_call = build_approve_call(token_in, router, ctx.amount)?;

    let request = RouteRequest::new(
        ctx.amount.to_string(),
        &ctx.params.token_in_address,
        &ctx.params.token_out_address,
        ctx.slippage,
        receiver,
        ctx.entry.chain_id,
        ctx.params.options.as_ref(),
    );
    let calldata = ctx.aggregator.build_route_calldata(&request).await?;
    let steps = match &calldata.calldata {
        CalldataPayload::Starknet(steps) => steps,
        CalldataPayload::Evm(_) => {
            return Err(SwapError::EstimationFailed(
                "aggregation service returned EVM calldata for Starknet".to_string(),
            ))
        }
    };
    let swap_call = build_swap_call(router, steps)?;

    let account = build_account(ctx, address)?;
    let estimate = account
        .execute_v3(vec![approve_call, swap_call])
        .estimate_fee()
        .await
        .map_err(|e| SwapError::EstimationFailed(message_or_generic(e)))?;

    let gas_consumed = felt_to_u256(estimate.gas_consumed)?;
    let gas_price = felt_to_u256(estimate.gas_price)?;
    let cost = gas_consumed
        .checked_mul(gas_price)
        .ok_or_else(|| SwapError::EstimationFailed("fee calculation overflow".to_string()))?;

    Ok(GasEstimate {
        gas_estimate: gas_consumed.to_string(),
        gas_price: gas_price.to_string(),
        estimated_cost: cost.to_string(),
        cost_in_usd: None,
    })
}

fn felt_to_u256(value: Felt) -> Result<U256, SwapError> {
    U256::from_dec_str(&value.to_string())
        .map_err(|e| SwapError::EstimationFailed(format!("bad fee value: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_u256_into_cairo_limbs() {
        let (low, high) = u256_limbs(U256::from(42u64));
        assert_eq!(low, Felt::from(42u64));
        assert_eq!(high, Felt::ZERO);

        let big = U256::from(1u64) << 130;
        let (low, high) = u256_limbs(big);
        assert_eq!(low, Felt::ZERO);
        assert_eq!(high, Felt::from(4u64));
    }

    #[test]
    fn approve_call_targets_token_with_router_spender() {
        let token = Felt::from_hex("0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7")
            .unwrap();
        let router = Felt::from_hex("0x1234").unwrap();
        let call = build_approve_call(token, router, U256::from(1_000u64)).unwrap();
        assert_eq!(call.to, token);
        assert_eq!(call.calldata[0], router);
        assert_eq!(call.calldata[1], Felt::from(1_000u64));
        assert_eq!(call.calldata[2], Felt::ZERO);
    }

    #[test]
    fn swap_call_rejects_malformed_steps() {
        let router = Felt::from_hex("0x1234").unwrap();
        let err = build_swap_call(router, &["not-a-felt".to_string()]).unwrap_err();
        assert!(matches!(err, SwapError::RouteUnavailable(_)));
    }
}
