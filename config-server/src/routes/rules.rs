use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

use crate::error::AppError;
use crate::middleware::log_prefix;
use crate::routes::AppState;

/// GET /rules/{name} — rule JSON, TTL-cached.
pub async fn get_rule(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let prefix = log_prefix(&headers);

    if let Some(hit) = state.cache.get("rule", &name) {
        tracing::debug!(%prefix, rule = %name, "rule served from cache");
        return Ok(Json(hit));
    }

    let value = state.store.rule(&name)?;
    state.cache.put("rule", &name, value.clone());
    tracing::info!(%prefix, rule = %name, "rule loaded from store");
    Ok(Json(value))
}
