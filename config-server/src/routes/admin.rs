use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::cache::CacheView;
use crate::error::AppError;
use crate::middleware::require_shared_secret;
use crate::routes::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheContentResponse {
    pub entries: Vec<CacheView>,
    pub ttl_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearResponse {
    pub evicted: usize,
}

/// GET /admin/cache — current cache content for observability.
pub async fn view_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CacheContentResponse>, AppError> {
    require_shared_secret(&headers, &state.config)?;
    Ok(Json(CacheContentResponse {
        entries: state.cache.snapshot(),
        ttl_secs: state.config.cache_ttl_secs,
    }))
}

/// POST /admin/cache/clear — eager invalidation.
pub async fn clear_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CacheClearResponse>, AppError> {
    require_shared_secret(&headers, &state.config)?;
    let evicted = state.cache.clear();
    tracing::info!(evicted, "cache cleared by admin request");
    Ok(Json(CacheClearResponse { evicted }))
}
