use axum::http::HeaderMap;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::error::AppError;

/// Permissive CORS for GET-only configuration consumers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::any())
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static("x-shared-secret"),
            axum::http::HeaderName::from_static("x-log-prefix"),
        ])
}

/// Validate the shared secret on telemetry and admin requests.
pub fn require_shared_secret(headers: &HeaderMap, config: &ServerConfig) -> Result<(), AppError> {
    let Some(expected) = &config.shared_secret else {
        return Err(AppError::Unauthorized("shared secret is not configured".into()));
    };
    let provided = headers
        .get("x-shared-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return Err(AppError::Unauthorized("invalid shared secret".into()));
    }
    Ok(())
}

/// Correlation prefix forwarded by the analysis engine.
pub fn log_prefix(headers: &HeaderMap) -> String {
    headers
        .get("x-log-prefix")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(secret: Option<&str>) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            config_dir: PathBuf::from("."),
            cache_ttl_secs: 300,
            shared_secret: secret.map(str::to_string),
        }
    }

    #[test]
    fn test_secret_match() {
        let mut headers = HeaderMap::new();
        headers.insert("x-shared-secret", "s3cret".parse().unwrap());
        assert!(require_shared_secret(&headers, &config(Some("s3cret"))).is_ok());
    }

    #[test]
    fn test_secret_mismatch() {
        let mut headers = HeaderMap::new();
        headers.insert("x-shared-secret", "wrong".parse().unwrap());
        assert!(require_shared_secret(&headers, &config(Some("s3cret"))).is_err());
    }

    #[test]
    fn test_missing_configuration_rejects() {
        let headers = HeaderMap::new();
        assert!(require_shared_secret(&headers, &config(None)).is_err());
    }

    #[test]
    fn test_log_prefix_default() {
        assert_eq!(log_prefix(&HeaderMap::new()), "-");
    }
}
