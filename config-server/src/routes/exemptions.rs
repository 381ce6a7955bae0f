use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

use crate::error::AppError;
use crate::middleware::log_prefix;
use crate::routes::AppState;

/// GET /exemptions/{archetype} — exemption list, TTL-cached.
///
/// A missing exemptions file is an empty list, not an error: most
/// archetypes never accumulate waivers.
pub async fn get_exemptions(
    State(state): State<AppState>,
    Path(archetype): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let prefix = log_prefix(&headers);

    if let Some(hit) = state.cache.get("exemptions", &archetype) {
        tracing::debug!(%prefix, archetype = %archetype, "exemptions served from cache");
        return Ok(Json(hit));
    }

    let value = match state.store.exemptions(&archetype) {
        Ok(value) => value,
        Err(AppError::NotFound(_)) => Value::Array(vec![]),
        Err(other) => return Err(other),
    };
    state.cache.put("exemptions", &archetype, value.clone());
    tracing::info!(%prefix, archetype = %archetype, "exemptions loaded from store");
    Ok(Json(value))
}
