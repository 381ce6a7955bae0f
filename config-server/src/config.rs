use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding `archetypes/`, `rules/`, and `exemptions/`.
    pub config_dir: PathBuf,
    /// Cache entry lifetime in seconds.
    pub cache_ttl_secs: u64,
    /// Shared secret for telemetry and admin requests.
    pub shared_secret: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("XFI_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("XFI_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8888),
            config_dir: std::env::var("XFI_SERVER_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("xfi-config")),
            cache_ttl_secs: std::env::var("XFI_SERVER_CACHE_TTL")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(300),
            shared_secret: std::env::var("XFI_SHARED_SECRET").ok().filter(|s| !s.is_empty()),
        }
    }
}
