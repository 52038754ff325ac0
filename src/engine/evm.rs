// src/engine/evm.rs
//
// Executor for the account-based chains (Base, Scroll): private-key signer,
// ERC-20 approval workflow, gas-auction pricing. Talks raw JSON-RPC so the
// whole path can be exercised against a mock endpoint.

use std::str::FromStr;
use std::time::Duration;

use ethers_core::abi::{encode, Token};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use ethers_core::utils::{keccak256, to_checksum};
use ethers_signers::{LocalWallet, Signer};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::aggregator::models::{CalldataPayload, RouteRequest};
use crate::chains::NATIVE_TOKEN_ADDRESS;
use crate::engine::errors::{SwapError, GENERIC_EVM_FAILURE};
use crate::engine::models::{GasEstimate, SwapOutcome};
use crate::engine::SwapContext;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

fn message_or_generic(message: String) -> String {
    if message.trim().is_empty() {
        GENERIC_EVM_FAILURE.to_string()
    } else {
        message
    }
}

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

fn encode_call(sig: &str, tokens: Vec<Token>) -> Bytes {
    let mut out = selector(sig).to_vec();
    let mut tail = encode(&tokens);
    out.append(&mut tail);
    Bytes::from(out)
}

/// One JSON-RPC round trip. The node signals failures in-band via the
/// `error` member, not via HTTP status.
async fn rpc(client: &Client, rpc_url: &str, method: &str, params: Value) -> Result<Value, String> {
    let payload = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let response: Value = client
        .post(rpc_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;
    if let Some(error) = response.get("error") {
        return Err(format!("RPC error from {}: {}", method, error));
    }
    Ok(response["result"].clone())
}

fn result_u256(value: &Value, what: &str) -> Result<U256, String> {
    let hex = value
        .as_str()
        .ok_or_else(|| format!("missing '{}' in RPC response", what))?;
    U256::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| format!("bad {} value: {}", what, e))
}

/// Current allowance of token -> owner -> spender via `eth_call`.
async fn read_allowance(
    client: &Client,
    rpc_url: &str,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, String> {
    let data = encode_call(
        "allowance(address,address)",
        vec![Token::Address(owner), Token::Address(spender)],
    );
    let result = rpc(
        client,
        rpc_url,
        "eth_call",
        json!([{"to": format!("{:?}", token), "data": format!("0x{}", hex::encode(&data))}, "latest"]),
    )
    .await?;
    result_u256(&result, "allowance")
}

/// Gas price multiplier in integer arithmetic: price * round(mult * 100) /
/// 100. The percent rounding can drift up to ~0.5% from the true float
/// multiplier; that approximation is part of the contract.
pub(crate) fn apply_gas_multiplier(price: U256, multiplier: f64) -> U256 {
    let percent = (multiplier * 100.0).round() as u64;
    price * U256::from(percent) / U256::from(100u64)
}

async fn wait_for_receipt(
    client: &Client,
    rpc_url: &str,
    tx_hash: &str,
    timeout: Duration,
) -> Result<Value, String> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let receipt = rpc(client, rpc_url, "eth_getTransactionReceipt", json!([tx_hash])).await?;
        if !receipt.is_null() {
            return Ok(receipt);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(format!(
                "timed out waiting for confirmation of {}",
                tx_hash
            ));
        }
        tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
    }
}

/// Sign and submit one transaction, then block until it has one
/// confirmation. Fills nonce, gas limit, and (when not supplied) gas price
/// from the node. Returns the hash and the receipt.
async fn submit_and_confirm(
    client: &Client,
    rpc_url: &str,
    wallet: &LocalWallet,
    tx: TransactionRequest,
    chain_id: u64,
    gas_price: Option<U256>,
    timeout: Duration,
) -> Result<(String, Value), String> {
    let from = wallet.address();
    let nonce_raw = rpc(
        client,
        rpc_url,
        "eth_getTransactionCount",
        json!([format!("{:?}", from), "pending"]),
    )
    .await?;
    let nonce = result_u256(&nonce_raw, "nonce")?;

    let mut tx = tx.from(from).nonce(nonce).chain_id(chain_id);

    if tx.gas.is_none() {
        let call_obj = serde_json::to_value(&tx).map_err(|e| e.to_string())?;
        let estimate = rpc(client, rpc_url, "eth_estimateGas", json!([call_obj])).await?;
        tx = tx.gas(result_u256(&estimate, "gas estimate")?);
    }

    let gas_price = match gas_price {
        Some(price) => price,
        None => {
            let raw = rpc(client, rpc_url, "eth_gasPrice", json!([])).await?;
            result_u256(&raw, "gas price")?
        }
    };
    tx = tx.gas_price(gas_price);

    let typed: TypedTransaction = tx.clone().into();
    let signature = wallet
        .sign_transaction(&typed)
        .await
        .map_err(|e| e.to_string())?;
    let raw_tx = tx.rlp_signed(&signature);

    let result = rpc(
        client,
        rpc_url,
        "eth_sendRawTransaction",
        json!([format!("0x{}", hex::encode(&raw_tx))]),
    )
    .await?;
    let tx_hash = result
        .as_str()
        .ok_or_else(|| "no transaction hash in RPC response".to_string())?
        .to_string();

    debug!("Submitted transaction {}, awaiting confirmation", tx_hash);
    let receipt = wait_for_receipt(client, rpc_url, &tx_hash, timeout).await?;
    if receipt["status"].as_str() == Some("0x0") {
        return Err(format!("transaction {} reverted on-chain", tx_hash));
    }
    Ok((tx_hash, receipt))
}

fn parse_router(ctx: &SwapContext<'_>) -> Result<Address, SwapError> {
    Address::from_str(&ctx.entry.router_address)
        .map_err(|_| SwapError::RouterNotFound(ctx.chain.to_string()))
}

fn signer(ctx: &SwapContext<'_>) -> Result<LocalWallet, SwapError> {
    LocalWallet::from_str(ctx.chain_config.private_key.expose_secret())
        .map_err(|e| SwapError::ConfigInvalid(format!("invalid EVM private key: {}", e)))
}

fn is_native_token(address: &str) -> bool {
    address.eq_ignore_ascii_case(NATIVE_TOKEN_ADDRESS)
}

fn route_request(ctx: &SwapContext<'_>, destination: String) -> RouteRequest {
    RouteRequest::new(
        ctx.amount.to_string(),
        &ctx.params.token_in_address,
        &ctx.params.token_out_address,
        ctx.slippage,
        destination,
        ctx.entry.chain_id,
        ctx.params.options.as_ref(),
    )
}

fn expect_evm_calldata(payload: &CalldataPayload) -> Result<Bytes, SwapError> {
    match payload {
        CalldataPayload::Evm(hex_data) => {
            let stripped = hex_data.strip_prefix("0x").unwrap_or(hex_data);
            hex::decode(stripped)
                .map(Bytes::from)
                .map_err(|e| SwapError::RouteUnavailable(format!("bad EVM calldata: {}", e)))
        }
        CalldataPayload::Starknet(_) => Err(SwapError::RouteUnavailable(
            "aggregation service returned Starknet calldata for an EVM chain".to_string(),
        )),
    }
}

/// Approve-then-swap on an account-based chain. Approval is skipped when the
/// input token is the native coin or the router is already allowed enough.
pub(crate) async fn execute_swap(ctx: &SwapContext<'_>) -> Result<SwapOutcome, SwapError> {
    let client = Client::new();
    let rpc_url = &ctx.chain_config.rpc_url;
    let wallet = signer(ctx)?;
    let router = parse_router(ctx)?;
    let owner = wallet.address();

    let receiver = ctx
        .params
        .receiver_address
        .clone()
        .unwrap_or_else(|| to_checksum(&owner, None));

    if !is_native_token(&ctx.params.token_in_address) {
        let token = Address::from_str(&ctx.params.token_in_address)
            .map_err(|e| SwapError::InvalidParameters(format!("bad token address: {}", e)))?;
        let allowance = read_allowance(&client, rpc_url, token, owner, router)
            .await
            .map_err(SwapError::ApprovalFailed)?;
        if allowance < ctx.amount {
            info!(
                "Allowance {} below swap amount, approving router {} on {}",
                allowance, ctx.entry.router_address, ctx.chain
            );
            let approve = TransactionRequest::new().to(token).data(encode_call(
                "approve(address,uint256)",
                vec![Token::Address(router), Token::Uint(ctx.amount)],
            ));
            submit_and_confirm(
                &client,
                rpc_url,
                &wallet,
                approve,
                ctx.entry.chain_id,
                None,
                ctx.tx_timeout,
            )
            .await
            .map_err(SwapError::ApprovalFailed)?;
        } else {
            debug!("Existing allowance {} covers the swap amount", allowance);
        }
    }

    let calldata = ctx
        .aggregator
        .build_route_calldata(&route_request(ctx, receiver))
        .await?;
    let payload = expect_evm_calldata(&calldata.calldata)?;

    let gas_price_raw = rpc(&client, rpc_url, "eth_gasPrice", json!([]))
        .await
        .map_err(SwapError::SubmissionFailed)?;
    let gas_price = result_u256(&gas_price_raw, "gas price").map_err(SwapError::SubmissionFailed)?;
    let gas_price = apply_gas_multiplier(gas_price, ctx.gas_price_multiplier);

    let mut tx = TransactionRequest::new().to(router).data(payload);
    if is_native_token(&ctx.params.token_in_address) {
        tx = tx.value(ctx.amount);
    }

    let (tx_hash, receipt) = submit_and_confirm(
        &client,
        rpc_url,
        &wallet,
        tx,
        ctx.entry.chain_id,
        Some(gas_price),
        ctx.tx_timeout,
    )
    .await
    .map_err(|e| SwapError::SubmissionFailed(message_or_generic(e)))?;

    let gas_used = receipt["gasUsed"]
        .as_str()
        .and_then(|hex| U256::from_str_radix(hex.trim_start_matches("0x"), 16).ok())
        .map(|v| v.to_string());

    info!("Swap confirmed on {}: {}", ctx.chain, tx_hash);
    Ok(SwapOutcome {
        explorer_url: ctx.chain.explorer_tx_url(&tx_hash),
        transaction_hash: tx_hash,
        gas_used,
        output_amount: calldata.route.output_amount,
    })
}

/// Same call building as `execute_swap`, stopping before submission: gas via
/// `eth_estimateGas`, price via `eth_gasPrice` with the same multiplier.
pub(crate) async fn estimate_gas(ctx: &SwapContext<'_>) -> Result<GasEstimate, SwapError> {
    let client = Client::new();
    let rpc_url = &ctx.chain_config.rpc_url;
    let wallet = signer(ctx)?;
    let router = parse_router(ctx)?;

    let receiver = ctx
        .params
        .receiver_address
        .clone()
        .unwrap_or_else(|| to_checksum(&wallet.address(), None));

    let calldata = ctx
        .aggregator
        .build_route_calldata(&route_request(ctx, receiver))
        .await?;
    let payload = expect_evm_calldata(&calldata.calldata)?;

    let mut call_obj = json!({
        "from": format!("{:?}", wallet.address()),
        "to": format!("{:?}", router),
        "data": format!("0x{}", hex::encode(&payload)),
    });
    if is_native_token(&ctx.params.token_in_address) {
        call_obj["value"] = json!(format!("{:#x}", ctx.amount));
    }

    let estimate_raw = rpc(&client, rpc_url, "eth_estimateGas", json!([call_obj]))
        .await
        .map_err(SwapError::EstimationFailed)?;
    let gas_estimate =
        result_u256(&estimate_raw, "gas estimate").map_err(SwapError::EstimationFailed)?;

    let price_raw = rpc(&client, rpc_url, "eth_gasPrice", json!([]))
        .await
        .map_err(SwapError::EstimationFailed)?;
    let gas_price = apply_gas_multiplier(
        result_u256(&price_raw, "gas price").map_err(SwapError::EstimationFailed)?,
        ctx.gas_price_multiplier,
    );

    let cost = gas_estimate
        .checked_mul(gas_price)
        .ok_or_else(|| SwapError::EstimationFailed("fee calculation overflow".to_string()))?;

    Ok(GasEstimate {
        gas_estimate: gas_estimate.to_string(),
        gas_price: gas_price.to_string(),
        estimated_cost: cost.to_string(),
        cost_in_usd: None,
    })
}
