use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub store: String,
    pub redis: String,
    pub ai_service: String,
}

fn label(configured: bool, ok: bool) -> &'static str {
    match (configured, ok) {
        (false, _) => "disabled",
        (true, true) => "ok",
        (true, false) => "error",
    }
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    // Check all services in parallel
    let (store_ok, redis_ok, ai_ok) = tokio::join!(
        state.requests.health_check(),
        async {
            match &state.cache {
                Some(cache) => cache.health_check().await.is_ok(),
                None => false,
            }
        },
        async {
            match &state.ai_client {
                Some(ai) => ai.health_check().await.is_ok(),
                None => false,
            }
        },
    );

    let redis_configured = state.cache.is_some();
    let ai_configured = state.ai_client.is_some();
    let optional_ok = (!redis_configured || redis_ok) && (!ai_configured || ai_ok);

    // The store is critical, the others only degrade
    let status = match (store_ok, optional_ok) {
        (true, true) => "healthy",
        (true, false) => "degraded",
        (false, _) => "unhealthy",
    };

    let status_code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                store: label(true, store_ok).to_string(),
                redis: label(redis_configured, redis_ok).to_string(),
                ai_service: label(ai_configured, ai_ok).to_string(),
            },
        }),
    )
}
