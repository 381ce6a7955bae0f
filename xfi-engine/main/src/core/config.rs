use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::types::{ArchetypeConfig, EngineError, Exemption, RepoXfiConfig};
use crate::core::exemptions;
use crate::core::remote::RemoteClient;

/// Compile-time archetype table.
pub const BUILTIN_ARCHETYPES: &[(&str, &str)] = &[
    ("node-fullstack", include_str!("../../../config/archetypes/node-fullstack.json")),
    ("java-microservice", include_str!("../../../config/archetypes/java-microservice.json")),
];

/// Repo-local extension file name.
pub const REPO_CONFIG_FILE: &str = ".xfiConfig.json";

/// Everything the loader needs, resolved once per analysis.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub archetype: ArchetypeConfig,
    pub repo_config: RepoXfiConfig,
    /// Unexpired exemptions only.
    pub exemptions: Vec<Exemption>,
}

/// Resolves archetype configuration from the built-in table, the remote
/// server, the local overlay directory, and the repo-local config file,
/// memoizing per `(archetype, configServer, localConfigPath)` for the
/// lifetime of one analysis.
pub struct ConfigManager {
    remote: Option<RemoteClient>,
    local_config: Option<PathBuf>,
    cache: Mutex<HashMap<String, ResolvedConfig>>,
    remote_healthy: AtomicBool,
}

impl ConfigManager {
    pub fn new(config_server: Option<&str>, local_config: Option<PathBuf>, log_prefix: &str) -> Self {
        ConfigManager {
            remote: config_server.map(|base| RemoteClient::new(base, log_prefix)),
            local_config,
            cache: Mutex::new(HashMap::new()),
            remote_healthy: AtomicBool::new(true),
        }
    }

    pub fn remote(&self) -> Option<&RemoteClient> {
        self.remote.as_ref()
    }

    pub fn local_config(&self) -> Option<&Path> {
        self.local_config.as_deref()
    }

    /// The server URL that actually served this run, if any. Falls back
    /// to `None` when the configured server was unreachable, so the
    /// artifact records an offline run as `configServer: "none"`.
    pub fn active_config_server(&self) -> Option<String> {
        if self.remote_healthy.load(Ordering::SeqCst) {
            self.remote.as_ref().map(|r| r.base_url().to_string())
        } else {
            None
        }
    }

    /// Resolve and validate the configuration for one analysis run.
    pub fn resolve(
        &self,
        archetype: &str,
        repo_path: &Path,
        now: DateTime<Utc>,
    ) -> Result<ResolvedConfig, EngineError> {
        let key = format!(
            "{}|{}|{}",
            archetype,
            self.remote.as_ref().map(|r| r.base_url()).unwrap_or("none"),
            self.local_config.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
        );
        if let Some(cached) = self.cache.lock().unwrap().get(&key) {
            return Ok(cached.clone());
        }

        let mut merged = builtin_archetype(archetype).unwrap_or(Value::Null);

        if let Some(remote) = &self.remote {
            match remote.fetch_archetype(archetype) {
                Ok(overlay) => {
                    if merged.is_null() {
                        merged = overlay;
                    } else {
                        deep_merge(&mut merged, overlay);
                    }
                }
                Err(e) => {
                    self.remote_healthy.store(false, Ordering::SeqCst);
                    tracing::warn!(archetype, "remote archetype fetch failed, using local table: {e}");
                }
            }
        }

        if let Some(local) = &self.local_config {
            let path = local.join(format!("{}.json", archetype));
            match fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                    Ok(overlay) => {
                        if merged.is_null() {
                            merged = overlay;
                        } else {
                            deep_merge(&mut merged, overlay);
                        }
                    }
                    Err(e) => {
                        return Err(EngineError::ConfigInvalid(format!(
                            "local archetype '{}' is not valid JSON: {}",
                            path.display(),
                            e
                        )));
                    }
                },
                Err(_) => {
                    tracing::debug!(path = %path.display(), "no local archetype overlay");
                }
            }
        }

        if merged.is_null() {
            return Err(EngineError::ConfigInvalid(format!("unknown archetype '{}'", archetype)));
        }

        validate_archetype(&merged)?;
        let archetype_config: ArchetypeConfig = serde_json::from_value(merged)
            .map_err(|e| EngineError::ConfigInvalid(format!("archetype '{}': {}", archetype, e)))?;

        let repo_config = load_repo_config(repo_path);
        let exemptions = self.load_exemptions(archetype, now);

        let resolved = ResolvedConfig { archetype: archetype_config, repo_config, exemptions };
        self.cache.lock().unwrap().insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Load exemptions from the server, then the local overlay, keeping
    /// only entries unexpired at the analysis start instant.
    fn load_exemptions(&self, archetype: &str, now: DateTime<Utc>) -> Vec<Exemption> {
        let mut entries: Vec<Exemption> = Vec::new();

        if let Some(remote) = &self.remote {
            match remote.fetch_exemptions(archetype) {
                Ok(remote_entries) => entries.extend(remote_entries),
                Err(e) => tracing::warn!(archetype, "remote exemption fetch failed: {e}"),
            }
        }

        if let Some(local) = &self.local_config {
            let path = local.join(format!("{}-exemptions.json", archetype));
            if let Ok(raw) = fs::read_to_string(&path) {
                match serde_json::from_str::<Vec<Exemption>>(&raw) {
                    Ok(local_entries) => entries.extend(local_entries),
                    Err(e) => tracing::warn!(path = %path.display(), "ignoring malformed exemptions: {e}"),
                }
            }
        }

        let before = entries.len();
        entries.retain(|entry| exemptions::is_unexpired(entry, now));
        if before > entries.len() {
            tracing::info!(expired = before - entries.len(), "dropped expired exemptions");
        }
        entries
    }
}

/// Look up a built-in archetype as raw JSON.
pub fn builtin_archetype(name: &str) -> Option<Value> {
    BUILTIN_ARCHETYPES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .and_then(|(_, raw)| serde_json::from_str(raw).ok())
}

/// Recursively overlay `overlay` onto `base`: objects merge key-wise,
/// everything else replaces.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}

/// Post-merge schema check: the archetype must carry the required
/// top-level fields with the right shapes.
pub fn validate_archetype(value: &Value) -> Result<(), EngineError> {
    let Some(map) = value.as_object() else {
        return Err(EngineError::ConfigInvalid("archetype must be a JSON object".to_string()));
    };

    let mut problems = Vec::new();
    if !map.get("name").map(Value::is_string).unwrap_or(false) {
        problems.push("name (string)");
    }
    for field in ["rules", "facts", "operators"] {
        let ok = map
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().all(Value::is_string))
            .unwrap_or(false);
        if !ok {
            problems.push(match field {
                "rules" => "rules (array of strings)",
                "facts" => "facts (array of strings)",
                _ => "operators (array of strings)",
            });
        }
    }
    if !map.get("config").map(Value::is_object).unwrap_or(false) {
        problems.push("config (object)");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(EngineError::ConfigInvalid(format!(
            "archetype is missing required fields: {}",
            problems.join(", ")
        )))
    }
}

/// Read `.xfiConfig.json` from the repo root. Absent or malformed files
/// contribute nothing; a malformed file is logged.
pub fn load_repo_config(repo_path: &Path) -> RepoXfiConfig {
    let path = repo_path.join(REPO_CONFIG_FILE);
    match fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring malformed repo config: {e}");
                RepoXfiConfig::default()
            }
        },
        Err(_) => RepoXfiConfig::default(),
    }
}
