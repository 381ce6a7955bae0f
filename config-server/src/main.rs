use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use xfi_config_server::config::ServerConfig;
use xfi_config_server::routes::{build_router, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    tracing::info!(
        "Starting xfi-config-server v{} on {}:{} (config dir {})",
        env!("CARGO_PKG_VERSION"),
        config.host,
        config.port,
        config.config_dir.display()
    );
    if config.shared_secret.is_none() {
        tracing::warn!("XFI_SHARED_SECRET is not set; telemetry and admin endpoints will reject requests");
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid bind address");

    let app = build_router(AppState::new(config));

    tracing::info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    axum::serve(listener, app)
        .await
        .expect("server error");
}
