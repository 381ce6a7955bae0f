use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use xfi_engine::api::types::TelemetryEvent;

use crate::error::AppError;
use crate::middleware::{log_prefix, require_shared_secret};
use crate::routes::AppState;

/// POST /telemetry — accept an engine telemetry event.
///
/// Requires the shared secret; events are logged, not persisted.
pub async fn post_telemetry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<TelemetryEvent>,
) -> Result<StatusCode, AppError> {
    require_shared_secret(&headers, &state.config)?;
    let prefix = log_prefix(&headers);

    tracing::info!(
        %prefix,
        event_type = ?event.event_type,
        timestamp = %event.timestamp,
        metadata = %event.metadata,
        "telemetry event received"
    );
    Ok(StatusCode::ACCEPTED)
}
