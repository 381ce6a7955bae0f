use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::types::EngineError;
use crate::core::report::RESULTS_DIR;

/// Lock file name inside the workspace results directory.
pub const LOCK_FILE: &str = ".xfi-analysis.lock";

/// Default age after which a leftover lock is considered stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

/// Metadata written into the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    /// Process holding the lock.
    pub pid: u32,
    /// Seconds since the UNIX epoch at acquisition.
    pub created_at: i64,
    /// Correlation identifier of the owning analysis.
    pub correlation_id: String,
    /// Engine version that created the lock.
    pub version: String,
}

/// Advisory single-analysis lock for one workspace.
///
/// Enforces at-most-one concurrent analysis per workspace through a
/// named lock file under `.xfiResults/`. Stale locks older than the
/// configured threshold are broken on acquisition. The lock is released
/// on drop.
pub struct WorkspaceLock {
    path: PathBuf,
}

impl WorkspaceLock {
    /// Acquire the workspace lock, breaking a stale one if present.
    pub fn acquire(
        repo_path: &Path,
        correlation_id: &str,
        stale_after: Duration,
    ) -> Result<Self, EngineError> {
        let dir = repo_path.join(RESULTS_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(LOCK_FILE);

        match Self::try_create(&path, correlation_id) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = read_lock_info(&path);
                // Unreadable metadata means unknown age; treat the lock
                // as freshly held rather than stealing it.
                let age_secs = holder
                    .as_ref()
                    .map(|info| Utc::now().timestamp().saturating_sub(info.created_at))
                    .unwrap_or(0);

                if age_secs >= 0 && (age_secs as u64) > stale_after.as_secs() {
                    tracing::warn!(
                        path = %path.display(),
                        age_secs,
                        "breaking stale analysis lock"
                    );
                    let _ = fs::remove_file(&path);
                    return Self::try_create(&path, correlation_id).map_err(EngineError::Io);
                }

                Err(EngineError::AlreadyRunning {
                    pid: holder.map(|info| info.pid).unwrap_or(0),
                })
            }
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    fn try_create(path: &Path, correlation_id: &str) -> Result<Self, std::io::Error> {
        let info = LockInfo {
            pid: std::process::id(),
            created_at: Utc::now().timestamp(),
            correlation_id: correlation_id.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let body = serde_json::to_string_pretty(&info).unwrap_or_default();

        use std::io::Write;
        let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(body.as_bytes())?;
        Ok(WorkspaceLock { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), "failed to remove lock file: {e}");
        }
    }
}

fn read_lock_info(path: &Path) -> Option<LockInfo> {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
}
