// ABOUTME: Health endpoint reporting service status and provider configuration
// ABOUTME: Used by deploy tooling; carries no session or auth logic
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::server::ServerResources;

/// Response body for `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` when the provider is reachable, `"degraded"` otherwise
    pub status: String,
    /// Service name
    pub service: String,
    /// Configured LLM provider name
    pub provider: String,
    /// Whether the provider answered the reachability check
    pub llm_reachable: bool,
    /// Current server time, RFC 3339
    pub timestamp: String,
}

/// Health route handlers
pub struct HealthRoutes;

impl HealthRoutes {
    /// Build the health router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(health))
            .with_state(resources)
    }
}

/// `GET /health` - liveness plus a provider reachability probe
async fn health(State(resources): State<Arc<ServerResources>>) -> Json<HealthResponse> {
    let llm_reachable = resources.engine.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: if llm_reachable { "ok" } else { "degraded" }.to_owned(),
        service: env!("CARGO_PKG_NAME").to_owned(),
        provider: resources.engine.provider_name().to_owned(),
        llm_reachable,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
