use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

use crate::api::types::{HostInfo, TelemetryEvent, TelemetryEventType, UserInfo};

/// Fire-and-forget telemetry client.
///
/// Events are posted to the collector with the shared secret header and
/// a 5-second timeout. When either the collector URL or the secret is
/// absent the client is disabled and every send is a silent no-op.
/// Failures are logged and never fatal.
#[derive(Clone)]
pub struct TelemetryClient {
    endpoint: Option<String>,
    shared_secret: Option<String>,
    correlation_id: String,
    http: reqwest::blocking::Client,
}

impl TelemetryClient {
    pub fn new(collector: Option<&str>, shared_secret: Option<&str>, correlation_id: &str) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        TelemetryClient {
            endpoint: collector.map(str::to_string),
            shared_secret: shared_secret.map(str::to_string),
            correlation_id: correlation_id.to_string(),
            http,
        }
    }

    /// Build a disabled client (no collector configured).
    pub fn disabled() -> Self {
        TelemetryClient::new(None, None, "")
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some() && self.shared_secret.is_some()
    }

    /// Post one event; disabled clients and transport failures are
    /// no-ops beyond a log line.
    pub fn send(&self, event_type: TelemetryEventType, metadata: Value) {
        let (Some(endpoint), Some(secret)) = (&self.endpoint, &self.shared_secret) else {
            tracing::debug!(?event_type, "telemetry disabled, event skipped");
            return;
        };

        let event = TelemetryEvent { event_type, metadata, timestamp: Utc::now() };
        let response = self
            .http
            .post(endpoint)
            .header("X-Shared-Secret", secret)
            .header("X-Log-Prefix", &self.correlation_id)
            .json(&event)
            .send();

        match response {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(?event_type, status = %response.status(), "telemetry collector rejected event");
            }
            Err(e) => {
                tracing::warn!(?event_type, "telemetry post failed: {e}");
            }
        }
    }

    /// Standard metadata attached to lifecycle events.
    pub fn analysis_metadata(&self, archetype: &str, repo_path: &str, repo_url: &str) -> Value {
        json!({
            "archetype": archetype,
            "repoPath": repo_path,
            "repoUrl": repo_url,
            "correlationId": self.correlation_id,
        })
    }
}

/// Identify the host for the artifact's telemetry snapshot.
pub fn host_info() -> HostInfo {
    HostInfo {
        hostname: std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "unknown".to_string()),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

/// Identify the invoking user for the artifact's telemetry snapshot.
pub fn user_info() -> UserInfo {
    UserInfo {
        username: std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string()),
        home_dir: std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_default(),
    }
}
