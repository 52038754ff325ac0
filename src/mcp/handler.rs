//! # MCP Handler Module
//!
//! Dispatches incoming MCP requests to the swap tools.
//!
//! ## Supported Tools
//!
//! ### Swap Operations
//! - `execute_swap` - Execute a token swap on a configured chain
//! - `estimate_swap_gas` - Estimate the cost of a swap without submitting
//! - `get_best_route` - Quote the best route for a pair without executing
//!
//! ### Utilities
//! - `convert_amount` - Convert between smallest-unit and decimal amounts
//! - `get_supported_chains` - List chains known to the aggregation service
//! - `check_config` - Validate per-chain credentials (masked output)

use serde_json::{json, Value};
use tracing::info;

use crate::aggregator::models::RouteRequest;
use crate::chains::ChainName;
use crate::engine::amounts;
use crate::engine::models::SwapParams;
use crate::mcp::protocol::{error_codes, Request, Response};
use crate::{utils, AppState};

// Helper: produce a result Value that always contains a text content array
// and preserves structured data for JSON-friendly clients.
fn make_texty_result(text: String, payload: Value) -> Value {
    let content = json!([{ "type": "text", "text": text }]);
    match payload {
        Value::Object(mut map) => {
            if !map.contains_key("content") {
                map.insert("content".into(), content);
            }
            Value::Object(map)
        }
        other => json!({
            "data": other,
            "content": content
        }),
    }
}

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, state).await,
        // Convenience aliases so CLI clients can call tools as plain methods;
        // rewritten into tools/call to reuse the same logic.
        "execute_swap" | "estimate_swap_gas" | "get_best_route" | "convert_amount"
        | "get_supported_chains" | "check_config" => {
            let name = req.method.clone();
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

fn parse_swap_params(args: &Value, req_id: &Value) -> Result<SwapParams, Response> {
    serde_json::from_value::<SwapParams>(args.clone()).map_err(|e| {
        Response::error(
            req_id.clone(),
            error_codes::INVALID_PARAMS,
            format!("Invalid swap parameters: {}", e),
        )
    })
}

/// Handles a 'tools/call' request by dispatching it to the correct tool logic.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    let empty_args = json!({});
    let args = params.get("arguments").unwrap_or(&empty_args);
    let req_id = &req.id;

    match tool_name {
        "execute_swap" => {
            let res: Result<Response, Response> = (async {
                let swap_params = parse_swap_params(args, req_id)?;
                let result = state.engine.execute_swap(&swap_params).await;
                let summary = if result.success {
                    format!(
                        "Swap submitted on {}: {}",
                        swap_params.chain_name,
                        result.transaction_hash.as_deref().unwrap_or_default()
                    )
                } else {
                    format!(
                        "Swap failed: {}",
                        result.error.as_deref().unwrap_or("unknown error")
                    )
                };
                let payload = serde_json::to_value(&result).unwrap_or_else(|_| json!({}));
                Ok(Response::success(
                    req_id.clone(),
                    make_texty_result(summary, payload),
                ))
            })
            .await;
            res.unwrap_or_else(|err_resp| err_resp)
        }
        "estimate_swap_gas" => {
            let res: Result<Response, Response> = (async {
                let swap_params = parse_swap_params(args, req_id)?;
                let estimate = state
                    .engine
                    .estimate_gas(&swap_params)
                    .await
                    .map_err(|e| {
                        Response::error(
                            req_id.clone(),
                            error_codes::INVALID_PARAMS,
                            e.to_string(),
                        )
                    })?;
                let summary = format!(
                    "Estimated cost on {}: {} ({} gas at {})",
                    swap_params.chain_name,
                    estimate.estimated_cost,
                    estimate.gas_estimate,
                    estimate.gas_price
                );
                let payload = serde_json::to_value(&estimate).unwrap_or_else(|_| json!({}));
                Ok(Response::success(
                    req_id.clone(),
                    make_texty_result(summary, payload),
                ))
            })
            .await;
            res.unwrap_or_else(|err_resp| err_resp)
        }
        "get_best_route" => {
            let res: Result<Response, Response> = (async {
                let mut args = args.clone();
                // Quotes need no receiver; reuse the swap parameter checks.
                if let Value::Object(map) = &mut args {
                    map.remove("receiverAddress");
                }
                let swap_params = parse_swap_params(&args, req_id)?;
                swap_params.validate().map_err(|e| {
                    Response::error(req_id.clone(), error_codes::INVALID_PARAMS, e.to_string())
                })?;
                let entry = state
                    .engine
                    .registry()
                    .get(swap_params.chain_name)
                    .ok_or_else(|| {
                        Response::error(
                            req_id.clone(),
                            error_codes::INVALID_PARAMS,
                            format!(
                                "no router deployed for chain '{}'",
                                swap_params.chain_name
                            ),
                        )
                    })?;
                let request = RouteRequest::new(
                    swap_params.amount.clone(),
                    &swap_params.token_in_address,
                    &swap_params.token_out_address,
                    swap_params.slippage.unwrap_or(state.config.default_slippage),
                    String::new(),
                    entry.chain_id,
                    swap_params.options.as_ref(),
                );
                let quote = state
                    .engine
                    .aggregator()
                    .get_best_route(&request)
                    .await
                    .map_err(|e| {
                        Response::error(req_id.clone(), error_codes::INTERNAL_ERROR, e.to_string())
                    })?;
                let summary = match &quote.output_amount {
                    Some(amount) => format!("Best route returns {}", amount),
                    None => "Best route found".to_string(),
                };
                let payload = serde_json::to_value(&quote).unwrap_or_else(|_| json!({}));
                Ok(Response::success(
                    req_id.clone(),
                    make_texty_result(summary, payload),
                ))
            })
            .await;
            res.unwrap_or_else(|err_resp| err_resp)
        }
        "convert_amount" => {
            let res: Result<Response, Response> = (async {
                let amount = utils::get_required_arg::<String>(args, "amount", req_id)?;
                let decimals = utils::get_required_arg::<u32>(args, "decimals", req_id)?;
                let operation = utils::get_required_arg::<String>(args, "operation", req_id)?;
                let converted = match operation.as_str() {
                    "toSmallestUnit" => amounts::to_smallest_unit(&amount, decimals),
                    "toHumanUnit" => amounts::to_human_unit(&amount, decimals),
                    other => {
                        return Err(Response::error(
                            req_id.clone(),
                            error_codes::INVALID_PARAMS,
                            format!(
                                "operation must be 'toSmallestUnit' or 'toHumanUnit', got '{}'",
                                other
                            ),
                        ))
                    }
                }
                .map_err(|e| {
                    Response::error(req_id.clone(), error_codes::INVALID_PARAMS, e.to_string())
                })?;
                Ok(Response::success(
                    req_id.clone(),
                    make_texty_result(
                        format!("{} -> {}", amount, converted),
                        json!({ "amount": amount, "decimals": decimals, "operation": operation, "result": converted }),
                    ),
                ))
            })
            .await;
            res.unwrap_or_else(|err_resp| err_resp)
        }
        "get_supported_chains" => {
            let chains: Vec<Value> = state
                .engine
                .registry()
                .chains()
                .map(|(name, entry)| {
                    let family = match name.family() {
                        crate::chains::ChainFamily::Evm => "evm",
                        crate::chains::ChainFamily::Starknet => "starknet",
                    };
                    json!({
                        "name": name.as_str(),
                        "chainId": entry.chain_id,
                        "routerAddress": entry.router_address,
                        "family": family,
                    })
                })
                .collect();
            let summary = format!("{} chains supported", chains.len());
            Response::success(
                req.id.clone(),
                make_texty_result(summary, json!({ "chains": chains })),
            )
        }
        "check_config" => {
            let statuses: Vec<Value> = ChainName::ALL
                .iter()
                .map(|chain| {
                    serde_json::to_value(state.config.validate_chain(*chain))
                        .unwrap_or_else(|_| json!({}))
                })
                .collect();
            let valid = statuses
                .iter()
                .filter(|s| s["valid"].as_bool().unwrap_or(false))
                .count();
            let summary = format!("{}/{} chains fully configured", valid, statuses.len());
            Response::success(
                req.id.clone(),
                make_texty_result(summary, json!({ "chains": statuses })),
            )
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Unknown tool: {}", tool_name),
        ),
    }
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "swap_mcp",
        "version": "0.1.0"
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions =
        "DeFi swap MCP server: route quoting, gas estimation, and swap execution across Base, Scroll, and Starknet.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request by returning a JSON definition of all available tools.
fn handle_tools_list(req: &Request) -> Response {
    let swap_properties = json!({
        "amount": {"type": "string", "description": "Amount to sell as an integer in the input token's smallest unit (e.g. wei)."},
        "tokenInAddress": {"type": "string", "description": "Address of the token being sold."},
        "tokenOutAddress": {"type": "string", "description": "Address of the token being bought."},
        "chainName": {"type": "string", "description": "One of 'base', 'scroll', 'starknet'."},
        "slippage": {"type": "number", "description": "Max tolerated slippage percentage in [0.01, 50]. Defaults to the server setting."},
        "receiverAddress": {"type": "string", "description": "Recipient of the output tokens. Defaults to the executing account."},
        "options": {
            "type": "object",
            "properties": {
                "directRoute": {"type": "boolean", "description": "Restrict routing to single-hop routes."},
                "excludedProtocols": {"type": "array", "items": {"type": "string"}, "description": "Protocol identifiers the route must not use."}
            },
            "additionalProperties": false
        }
    });

    let tools = json!([
        {
            "name": "execute_swap",
            "description": "Execute a token swap through the aggregation router. Approves the input token when needed, submits, and waits for confirmation.",
            "inputSchema": {
                "type": "object",
                "properties": swap_properties.clone(),
                "required": ["amount", "tokenInAddress", "tokenOutAddress", "chainName"],
                "additionalProperties": false
            }
        },
        {
            "name": "estimate_swap_gas",
            "description": "Estimate the gas/fee cost of a swap without submitting any transaction.",
            "inputSchema": {
                "type": "object",
                "properties": swap_properties,
                "required": ["amount", "tokenInAddress", "tokenOutAddress", "chainName"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_best_route",
            "description": "Quote the best route for a token pair without executing it.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "amount": {"type": "string", "description": "Amount in the input token's smallest unit."},
                    "tokenInAddress": {"type": "string"},
                    "tokenOutAddress": {"type": "string"},
                    "chainName": {"type": "string", "description": "One of 'base', 'scroll', 'starknet'."},
                    "options": {"type": "object"}
                },
                "required": ["amount", "tokenInAddress", "tokenOutAddress", "chainName"],
                "additionalProperties": false
            }
        },
        {
            "name": "convert_amount",
            "description": "Convert a token amount between smallest-unit and human decimal representations without precision loss.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "amount": {"type": "string", "description": "The amount to convert."},
                    "decimals": {"type": "integer", "description": "Token decimals, 0 to 30."},
                    "operation": {"type": "string", "enum": ["toSmallestUnit", "toHumanUnit"]}
                },
                "required": ["amount", "decimals", "operation"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_supported_chains",
            "description": "List the chains known to the aggregation service with their ids and router addresses.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "check_config",
            "description": "Validate per-chain RPC and credential configuration. Secrets are masked.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        }
    ]);

    Response::success(req.id.clone(), json!({ "tools": tools }))
}
