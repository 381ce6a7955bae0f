use std::time::Duration;

use serde_json::Value;

use crate::api::types::{Exemption, RuleSpec};

/// HTTP client for the configuration server.
///
/// Every fetch is best-effort: failures are reported as strings so the
/// config manager and loader can warn and fall back to local sources.
pub struct RemoteClient {
    base: String,
    http: reqwest::blocking::Client,
    log_prefix: String,
}

impl RemoteClient {
    pub fn new(base: &str, log_prefix: &str) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        RemoteClient {
            base: base.trim_end_matches('/').to_string(),
            http,
            log_prefix: log_prefix.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn get_json(&self, path: &str) -> Result<Value, String> {
        let url = format!("{}/{}", self.base, path);
        let response = self
            .http
            .get(&url)
            .header("X-Log-Prefix", &self.log_prefix)
            .send()
            .map_err(|e| format!("GET {} failed: {}", url, e))?;
        if !response.status().is_success() {
            return Err(format!("GET {} returned {}", url, response.status()));
        }
        response.json().map_err(|e| format!("GET {} body invalid: {}", url, e))
    }

    /// `GET /archetypes/{name}` as raw JSON for overlay merging.
    pub fn fetch_archetype(&self, name: &str) -> Result<Value, String> {
        self.get_json(&format!("archetypes/{}", name))
    }

    /// `GET /rules/{name}`.
    pub fn fetch_rule(&self, name: &str) -> Result<RuleSpec, String> {
        let value = self.get_json(&format!("rules/{}", name))?;
        serde_json::from_value(value).map_err(|e| format!("rule '{}' invalid: {}", name, e))
    }

    /// `GET /exemptions/{archetype}`.
    pub fn fetch_exemptions(&self, archetype: &str) -> Result<Vec<Exemption>, String> {
        let value = self.get_json(&format!("exemptions/{}", archetype))?;
        serde_json::from_value(value).map_err(|e| format!("exemptions invalid: {}", e))
    }
}
