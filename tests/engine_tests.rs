//! Tests for the swap execution engine and gas estimator against a mocked
//! JSON-RPC node and aggregation service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use mockito::{mock, server_url, Matcher};
use secrecy::SecretString;

use swap_mcp_server::{
    aggregator::{AggregatorClient, ChainEntry, ChainRegistry},
    chains::ChainName,
    config::{ChainEnv, Config},
    engine::{estimate::fallback_estimate, models::SwapParams, SwapEngine},
    U256,
};

// Well-known test key (hardhat account #3); never funded on a real network.
const TEST_PRIVATE_KEY: &str =
    "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";

const STARKNET_TEST_KEY: &str =
    "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
const STARKNET_ACCOUNT: &str =
    "0x02a1b2c3d4e5f60718293a4b5c6d7e8f902a1b2c3d4e5f60718293a4b5c6d7e8";

// mockito <1.0 uses one global server; serialize tests that register mocks.
fn serial() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn evm_chain_env() -> ChainEnv {
    ChainEnv {
        rpc_url: Some(server_url()),
        private_key: Some(SecretString::new(TEST_PRIVATE_KEY.to_string())),
        account_address: None,
    }
}

fn registry_with(chain: ChainName, chain_id: u64, router: &str) -> ChainRegistry {
    let mut chains = HashMap::new();
    chains.insert(
        chain,
        ChainEntry {
            chain_id,
            router_address: router.to_string(),
        },
    );
    ChainRegistry::new(chains)
}

fn engine_for(chain: ChainName, env: ChainEnv, registry: ChainRegistry) -> SwapEngine {
    let mut chains = HashMap::new();
    chains.insert(chain, env);
    let config = Arc::new(Config::for_aggregator(server_url()).with_chains(chains));
    let aggregator = Arc::new(AggregatorClient::new(server_url()));
    SwapEngine::new(config, Arc::new(registry), aggregator)
}

fn base_swap_params() -> SwapParams {
    SwapParams {
        amount: "1000000000000000000".to_string(),
        token_in_address: "0x4200000000000000000000000000000000000006".to_string(),
        token_out_address: "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913".to_string(),
        slippage: Some(1.0),
        receiver_address: None,
        chain_name: ChainName::Base,
        options: None,
    }
}

fn starknet_swap_params() -> SwapParams {
    SwapParams {
        amount: "1000000000000000000".to_string(),
        token_in_address: "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7"
            .to_string(),
        token_out_address: "0x053c91253bc9682c04929ca02ed00b3e423f6710d2ee7e0d5ebb06f3ecf368a8"
            .to_string(),
        slippage: Some(1.0),
        receiver_address: None,
        chain_name: ChainName::Starknet,
        options: None,
    }
}

fn rpc_mock(method: &str, result: serde_json::Value) -> mockito::Mock {
    rpc_mock_builder(method, result).create()
}

fn rpc_mock_counted(method: &str, result: serde_json::Value, hits: usize) -> mockito::Mock {
    rpc_mock_builder(method, result).expect(hits).create()
}

fn rpc_mock_builder(method: &str, result: serde_json::Value) -> mockito::Mock {
    mock("POST", "/")
        .match_body(Matcher::PartialJsonString(format!(
            r#"{{"method": "{}"}}"#,
            method
        )))
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string(),
        )
}

#[tokio::test]
async fn evm_swap_happy_path_skips_approval_with_sufficient_allowance() {
    let _guard = serial();
    mockito::reset();

    // Allowance read: effectively unlimited, so no approval is submitted.
    let _allowance = rpc_mock(
        "eth_call",
        serde_json::json!(format!("0x{}", "f".repeat(64))),
    );
    let _nonce = rpc_mock("eth_getTransactionCount", serde_json::json!("0x7"));
    let _gas = rpc_mock("eth_estimateGas", serde_json::json!("0x30d40"));
    let _price = rpc_mock("eth_gasPrice", serde_json::json!("0x3b9aca00"));
    let send = rpc_mock_counted(
        "eth_sendRawTransaction",
        serde_json::json!("0xabc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd"),
        1,
    );
    let _receipt = rpc_mock(
        "eth_getTransactionReceipt",
        serde_json::json!({"status": "0x1", "gasUsed": "0x29810"}),
    );
    let _calldata = mock("POST", "/calldata")
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "route": {"outputAmount": "2500000000"},
                "calldata": "0xdeadbeef"
            })
            .to_string(),
        )
        .create();

    let engine = engine_for(
        ChainName::Base,
        evm_chain_env(),
        registry_with(
            ChainName::Base,
            8453,
            "0x1111111111111111111111111111111111111111",
        ),
    );
    let result = engine.execute_swap(&base_swap_params()).await;

    assert!(result.success, "swap should succeed: {:?}", result.error);
    assert_eq!(
        result.transaction_hash.as_deref(),
        Some("0xabc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd")
    );
    assert!(result
        .explorer_url
        .as_deref()
        .unwrap()
        .starts_with("https://basescan.org/tx/0xabc123"));
    // gasUsed comes from the mocked receipt: 0x29810 = 170000.
    assert_eq!(result.gas_used.as_deref(), Some("170000"));
    assert_eq!(result.output_amount.as_deref(), Some("2500000000"));
    assert!(result.error.is_none());
    // Exactly one submission: the swap itself, no approval.
    send.assert();
}

#[tokio::test]
async fn evm_swap_approves_first_when_allowance_is_short() {
    let _guard = serial();
    mockito::reset();

    let _allowance = rpc_mock("eth_call", serde_json::json!(format!("0x{:064x}", 1)));
    let _nonce = rpc_mock("eth_getTransactionCount", serde_json::json!("0x7"));
    let _gas = rpc_mock("eth_estimateGas", serde_json::json!("0x30d40"));
    let _price = rpc_mock("eth_gasPrice", serde_json::json!("0x3b9aca00"));
    // Approval and swap each submit once.
    let send = rpc_mock_counted(
        "eth_sendRawTransaction",
        serde_json::json!("0xabc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd"),
        2,
    );
    let _receipt = rpc_mock(
        "eth_getTransactionReceipt",
        serde_json::json!({"status": "0x1", "gasUsed": "0x29810"}),
    );
    let _calldata = mock("POST", "/calldata")
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({"route": {}, "calldata": "0xdeadbeef"}).to_string(),
        )
        .create();

    let engine = engine_for(
        ChainName::Base,
        evm_chain_env(),
        registry_with(
            ChainName::Base,
            8453,
            "0x1111111111111111111111111111111111111111",
        ),
    );
    let result = engine.execute_swap(&base_swap_params()).await;

    assert!(result.success, "swap should succeed: {:?}", result.error);
    send.assert();
}

#[tokio::test]
async fn identical_token_addresses_fail_before_any_network_call() {
    let _guard = serial();
    mockito::reset();

    // Any request reaching the mock server would be a bug.
    let nothing = mock("POST", Matcher::Any).expect(0).create();

    let engine = engine_for(
        ChainName::Base,
        evm_chain_env(),
        registry_with(
            ChainName::Base,
            8453,
            "0x1111111111111111111111111111111111111111",
        ),
    );
    let mut params = base_swap_params();
    params.token_out_address = params.token_in_address.clone();
    let result = engine.execute_swap(&params).await;

    assert!(!result.success);
    assert!(result.transaction_hash.is_none());
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("Token in and token out addresses must be different"));
    nothing.assert();
}

#[tokio::test]
async fn starknet_swap_without_account_address_fails_without_network_io() {
    let _guard = serial();
    mockito::reset();

    let nothing = mock("POST", Matcher::Any).expect(0).create();

    let env = ChainEnv {
        rpc_url: Some(server_url()),
        private_key: Some(SecretString::new(STARKNET_TEST_KEY.to_string())),
        account_address: None,
    };
    let engine = engine_for(
        ChainName::Starknet,
        env,
        registry_with(ChainName::Starknet, 23448594291968334, "0x0123abc"),
    );
    let result = engine.execute_swap(&starknet_swap_params()).await;

    assert!(!result.success);
    assert!(result.transaction_hash.is_none());
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("STARKNET_ACCOUNT_ADDRESS"));
    nothing.assert();
}

#[tokio::test]
async fn malformed_amount_is_rejected_before_execution() {
    let _guard = serial();
    mockito::reset();

    let engine = engine_for(
        ChainName::Base,
        evm_chain_env(),
        registry_with(
            ChainName::Base,
            8453,
            "0x1111111111111111111111111111111111111111",
        ),
    );
    for bad in ["1.5", "-1", "", "abc"] {
        let mut params = base_swap_params();
        params.amount = bad.to_string();
        let result = engine.execute_swap(&params).await;
        assert!(!result.success, "amount '{}' should be rejected", bad);
        assert!(result.transaction_hash.is_none());
    }
}

#[tokio::test]
async fn estimation_failure_returns_the_evm_fallback_every_time() {
    let _guard = serial();
    mockito::reset();

    // No mocks registered: every upstream call fails. The estimator must
    // absorb that and return the fixed per-family tuple.
    let engine = engine_for(
        ChainName::Base,
        evm_chain_env(),
        registry_with(
            ChainName::Base,
            8453,
            "0x1111111111111111111111111111111111111111",
        ),
    );

    let expected = fallback_estimate(swap_mcp_server::chains::ChainFamily::Evm);
    for _ in 0..2 {
        let estimate = engine.estimate_gas(&base_swap_params()).await.unwrap();
        assert_eq!(estimate.gas_estimate, expected.gas_estimate);
        assert_eq!(estimate.gas_price, expected.gas_price);
        assert_eq!(estimate.estimated_cost, expected.estimated_cost);
    }
}

#[tokio::test]
async fn starknet_estimation_failure_falls_back_to_its_own_constants() {
    let _guard = serial();
    mockito::reset();

    let env = ChainEnv {
        rpc_url: Some(server_url()),
        private_key: Some(SecretString::new(STARKNET_TEST_KEY.to_string())),
        account_address: Some(STARKNET_ACCOUNT.to_string()),
    };
    let engine = engine_for(
        ChainName::Starknet,
        env,
        registry_with(ChainName::Starknet, 23448594291968334, "0x0123abc"),
    );

    let estimate = engine.estimate_gas(&starknet_swap_params()).await.unwrap();
    let evm_fallback = fallback_estimate(swap_mcp_server::chains::ChainFamily::Evm);
    let starknet_fallback = fallback_estimate(swap_mcp_server::chains::ChainFamily::Starknet);
    assert_eq!(estimate.gas_estimate, starknet_fallback.gas_estimate);
    assert_ne!(estimate.gas_estimate, evm_fallback.gas_estimate);
}

#[tokio::test]
async fn live_estimate_holds_the_product_identity() {
    let _guard = serial();
    mockito::reset();

    let _gas = rpc_mock("eth_estimateGas", serde_json::json!("0x30d40"));
    let _price = rpc_mock("eth_gasPrice", serde_json::json!("0x3b9aca00"));
    let _calldata = mock("POST", "/calldata")
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({"route": {}, "calldata": "0xdeadbeef"}).to_string(),
        )
        .create();

    let engine = engine_for(
        ChainName::Base,
        evm_chain_env(),
        registry_with(
            ChainName::Base,
            8453,
            "0x1111111111111111111111111111111111111111",
        ),
    );
    let estimate = engine.estimate_gas(&base_swap_params()).await.unwrap();

    // 0x30d40 = 200000 gas; 1 gwei * 1.2 multiplier = 1200000000.
    assert_eq!(estimate.gas_estimate, "200000");
    assert_eq!(estimate.gas_price, "1200000000");
    let units = U256::from_dec_str(&estimate.gas_estimate).unwrap();
    let price = U256::from_dec_str(&estimate.gas_price).unwrap();
    assert_eq!(
        U256::from_dec_str(&estimate.estimated_cost).unwrap(),
        units * price
    );
}

#[tokio::test]
async fn route_failure_indicator_aborts_the_swap() {
    let _guard = serial();
    mockito::reset();

    let _allowance = rpc_mock(
        "eth_call",
        serde_json::json!(format!("0x{}", "f".repeat(64))),
    );
    let send = rpc_mock_counted("eth_sendRawTransaction", serde_json::json!("0x0"), 0);
    let _calldata = mock("POST", "/calldata")
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "route": {"success": false, "errorMessage": "no liquidity for pair"},
                "calldata": "0x"
            })
            .to_string(),
        )
        .create();

    let engine = engine_for(
        ChainName::Base,
        evm_chain_env(),
        registry_with(
            ChainName::Base,
            8453,
            "0x1111111111111111111111111111111111111111",
        ),
    );
    let result = engine.execute_swap(&base_swap_params()).await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("no liquidity"));
    send.assert();
}

#[tokio::test]
async fn unknown_chain_in_registry_reports_router_not_found() {
    let _guard = serial();
    mockito::reset();

    // Registry only knows Base; a Scroll swap has no router to target.
    let mut env_map = HashMap::new();
    env_map.insert(ChainName::Scroll, evm_chain_env());
    let config = Arc::new(Config::for_aggregator(server_url()).with_chains(env_map));
    let aggregator = Arc::new(AggregatorClient::new(server_url()));
    let registry = registry_with(
        ChainName::Base,
        8453,
        "0x1111111111111111111111111111111111111111",
    );
    let engine = SwapEngine::new(config, Arc::new(registry), aggregator);

    let mut params = base_swap_params();
    params.chain_name = ChainName::Scroll;
    let result = engine.execute_swap(&params).await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("scroll"));
}
