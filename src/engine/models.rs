// src/engine/models.rs

use serde::{Deserialize, Serialize};

use crate::chains::{is_valid_address, ChainName, MAX_SLIPPAGE, MIN_SLIPPAGE};
use crate::engine::errors::SwapError;

/// Routing options forwarded to the aggregation service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOptions {
    /// Restrict routing to single-hop direct routes.
    #[serde(default)]
    pub direct_route: bool,
    /// Protocol identifiers the route must not use.
    #[serde(default)]
    pub excluded_protocols: Vec<String>,
}

/// One validated swap request. Constructed per incoming tool call, immutable
/// for the lifetime of that call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    /// Amount to sell, as an integer string in the input token's smallest unit.
    pub amount: String,
    pub token_in_address: String,
    pub token_out_address: String,
    /// Percentage in [0.01, 50]; falls back to the server default when absent.
    #[serde(default)]
    pub slippage: Option<f64>,
    /// Defaults to the executing account's own address.
    #[serde(default)]
    pub receiver_address: Option<String>,
    pub chain_name: ChainName,
    #[serde(default)]
    pub options: Option<SwapOptions>,
}

impl SwapParams {
    /// Full parameter validation. Runs before any network I/O; an error here
    /// means no side effect has happened yet.
    pub fn validate(&self) -> Result<(), SwapError> {
        let mut errors: Vec<String> = Vec::new();
        let family = self.chain_name.family();

        if !is_valid_address(family, &self.token_in_address) {
            errors.push(format!(
                "tokenInAddress '{}' is not a valid {} address",
                self.token_in_address, self.chain_name
            ));
        }
        if !is_valid_address(family, &self.token_out_address) {
            errors.push(format!(
                "tokenOutAddress '{}' is not a valid {} address",
                self.token_out_address, self.chain_name
            ));
        }
        if self
            .token_in_address
            .eq_ignore_ascii_case(&self.token_out_address)
        {
            errors.push("Token in and token out addresses must be different".to_string());
        }
        if let Some(receiver) = &self.receiver_address {
            if !is_valid_address(family, receiver) {
                errors.push(format!(
                    "receiverAddress '{}' is not a valid {} address",
                    receiver, self.chain_name
                ));
            }
        }
        if let Some(slippage) = self.slippage {
            if !(MIN_SLIPPAGE..=MAX_SLIPPAGE).contains(&slippage) {
                errors.push(format!(
                    "slippage must be between {} and {}, got {}",
                    MIN_SLIPPAGE, MAX_SLIPPAGE, slippage
                ));
            }
        }

        let amount = self.amount.trim();
        if amount.is_empty() || !amount.chars().all(|c| c.is_ascii_digit()) {
            errors.push(format!(
                "amount must be a non-negative integer in the token's smallest unit, got '{}'",
                amount
            ));
        } else if amount.chars().all(|c| c == '0') {
            errors.push("amount must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SwapError::InvalidParameters(errors.join("; ")))
        }
    }
}

/// Outcome of one swap attempt. Exactly one of the success/failure branches
/// is populated; construct through `success`/`failure` to keep it that way.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SwapResult {
    pub fn success(outcome: SwapOutcome) -> Self {
        Self {
            success: true,
            transaction_hash: Some(outcome.transaction_hash),
            explorer_url: Some(outcome.explorer_url),
            gas_used: outcome.gas_used,
            output_amount: outcome.output_amount,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            explorer_url: None,
            gas_used: None,
            output_amount: None,
            error: Some(message.into()),
        }
    }
}

/// Internal success payload produced by the chain executors before being
/// folded into a `SwapResult`.
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub transaction_hash: String,
    pub explorer_url: String,
    pub gas_used: Option<String>,
    pub output_amount: Option<String>,
}

/// Cost estimate for a swap. All fields are string-encoded integers in the
/// chain's smallest fee unit; `estimated_cost` is always the product of the
/// other two, live or fallback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub gas_estimate: String,
    pub gas_price: String,
    pub estimated_cost: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_in_usd: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_evm_params() -> SwapParams {
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

    #[test]
    fn accepts_valid_params() {
        assert!(valid_evm_params().validate().is_ok());
    }

    #[test]
    fn rejects_identical_token_addresses() {
        let mut params = valid_evm_params();
        params.token_out_address = params.token_in_address.clone();
        let err = params.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("Token in and token out addresses must be different"));
    }

    #[test]
    fn rejects_zero_amount() {
        let mut params = valid_evm_params();
        params.amount = "0".to_string();
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_slippage() {
        let mut params = valid_evm_params();
        params.slippage = Some(50.5);
        assert!(params.validate().is_err());
        params.slippage = Some(0.001);
        assert!(params.validate().is_err());
        params.slippage = Some(0.01);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_wrong_family_address_shape() {
        let mut params = valid_evm_params();
        params.token_in_address =
            "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7".to_string();
        assert!(params.validate().is_err());
    }

    #[test]
    fn failure_results_never_carry_a_hash() {
        let result = SwapResult::failure("boom");
        assert!(!result.success);
        assert!(result.transaction_hash.is_none());
        assert!(result.explorer_url.is_none());
        assert_eq!(result.error.as_deref(), Some("boom"));

        let result = SwapResult::success(SwapOutcome {
            transaction_hash: "0xabc".to_string(),
            explorer_url: "https://basescan.org/tx/0xabc".to_string(),
            gas_used: Some("21000".to_string()),
            output_amount: None,
        });
        assert!(result.success);
        assert!(result.transaction_hash.is_some());
        assert!(result.error.is_none());
    }
}
