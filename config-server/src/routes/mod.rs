pub mod admin;
pub mod archetypes;
pub mod exemptions;
pub mod health;
pub mod rules;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;

use crate::cache::TtlCache;
use crate::config::ServerConfig;
use crate::middleware::cors_layer;
use crate::store::ConfigStore;

/// Shared application state passed to all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub cache: TtlCache,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        AppState {
            store: Arc::new(ConfigStore::new(config.config_dir.clone())),
            cache: TtlCache::new(Duration::from_secs(config.cache_ttl_secs)),
            config,
        }
    }
}

/// Build the complete router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/archetypes/{name}", get(archetypes::get_archetype))
        .route("/rules/{name}", get(rules::get_rule))
        .route("/exemptions/{archetype}", get(exemptions::get_exemptions))
        .route("/telemetry", post(telemetry::post_telemetry))
        .route("/admin/cache", get(admin::view_cache))
        .route("/admin/cache/clear", post(admin::clear_cache))
        .layer(cors_layer())
        .with_state(state)
}
