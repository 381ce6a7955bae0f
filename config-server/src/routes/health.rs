use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(rename = "cacheEntries")]
    pub cache_entries: usize,
}

/// GET /health — liveness and cache occupancy.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_entries: state.cache.len(),
    })
}
