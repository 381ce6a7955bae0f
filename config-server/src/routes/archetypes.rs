use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

use crate::error::AppError;
use crate::middleware::log_prefix;
use crate::routes::AppState;

/// GET /archetypes/{name} — archetype JSON, TTL-cached.
pub async fn get_archetype(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let prefix = log_prefix(&headers);

    if let Some(hit) = state.cache.get("archetype", &name) {
        tracing::debug!(%prefix, archetype = %name, "archetype served from cache");
        return Ok(Json(hit));
    }

    let value = state.store.archetype(&name)?;
    state.cache.put("archetype", &name, value.clone());
    tracing::info!(%prefix, archetype = %name, "archetype loaded from store");
    Ok(Json(value))
}
