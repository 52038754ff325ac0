// src/lib.rs

use std::sync::Arc;

// Re-export commonly used types
pub use ethers_core::types::U256;

pub mod aggregator;
pub mod api;
pub mod chains;
pub mod config;
pub mod engine;
pub mod mcp;
pub mod utils;

/// Application state shared across all request handlers. Everything in here
/// is read-only after startup, so concurrent invocations never contend.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::Config>,
    /// Swap engine over the chain registry and aggregation client
    pub engine: engine::SwapEngine,
}
