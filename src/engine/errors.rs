// src/engine/errors.rs

use thiserror::Error;

/// Every fallible engine operation returns one of these. The public engine
/// boundary folds them into value-typed results; nothing here crosses the
/// component boundary as a panic.
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("missing configuration: {0}")]
    ConfigMissing(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("no router deployed for chain '{0}'")]
    RouterNotFound(String),

    #[error("token approval failed: {0}")]
    ApprovalFailed(String),

    #[error("route unavailable: {0}")]
    RouteUnavailable(String),

    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    #[error("estimation failed: {0}")]
    EstimationFailed(String),

    #[error("{0}")]
    Unknown(String),
}

/// Fixed messages used when an underlying error carries no text of its own.
pub const GENERIC_EVM_FAILURE: &str = "Swap failed on EVM chain";
pub const GENERIC_STARKNET_FAILURE: &str = "Swap failed on Starknet";
