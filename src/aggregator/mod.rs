// src/aggregator/mod.rs

pub mod client;
pub mod models;

pub use client::AggregatorClient;
pub use models::{CalldataPayload, ChainEntry, ChainRegistry, RouteCalldata, RouteQuote, RouteRequest};
