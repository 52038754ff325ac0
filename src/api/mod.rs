// src/api/mod.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::chains::ChainName;
use crate::AppState;

/// Liveness plus a masked summary of per-chain configuration state.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let chains: Vec<_> = ChainName::ALL
        .iter()
        .map(|chain| state.config.validate_chain(*chain))
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "chains": chains,
    }))
}
