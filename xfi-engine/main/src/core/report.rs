use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::types::{
    AnalysisOptions, EngineError, FactMetric, IssueLevel, MemoryUsage, RepoXfiConfig, ScanResult,
    TelemetryData, XfiResult, XfiResultEnvelope,
};

/// Directory holding analysis artifacts inside the workspace.
pub const RESULTS_DIR: &str = ".xfiResults";
/// The artifact file name.
pub const RESULT_FILE: &str = "XFI_RESULT.json";

/// Inputs folded into the final artifact.
pub struct AssembleParams {
    pub options: AnalysisOptions,
    pub archetype: String,
    pub repo_path: String,
    pub repo_url: String,
    /// Real files analyzed; the global sentinel is counted separately.
    pub file_count: u64,
    pub results: Vec<ScanResult>,
    pub fact_metrics: BTreeMap<String, FactMetric>,
    pub start_time: DateTime<Utc>,
    pub finish_time: DateTime<Utc>,
    pub telemetry_data: TelemetryData,
    pub repo_config: RepoXfiConfig,
}

/// Fold scan results into the persisted artifact shape.
pub fn assemble(params: AssembleParams) -> XfiResult {
    let mut warning_count = 0;
    let mut error_count = 0;
    let mut fatality_count = 0;
    let mut exempt_count = 0;
    for result in &params.results {
        for failure in &result.errors {
            match failure.level {
                IssueLevel::Warning => warning_count += 1,
                IssueLevel::Error => error_count += 1,
                IssueLevel::Fatality => fatality_count += 1,
                IssueLevel::Exempt => exempt_count += 1,
            }
        }
    }

    let duration = params
        .finish_time
        .signed_duration_since(params.start_time)
        .num_milliseconds() as f64
        / 1000.0;

    XfiResult {
        archetype: params.archetype,
        repo_path: params.repo_path,
        repo_url: params.repo_url,
        file_count: params.file_count,
        global_checks_run: 1,
        total_issues: warning_count + error_count + fatality_count + exempt_count,
        warning_count,
        error_count,
        fatality_count,
        exempt_count,
        issue_details: params.results,
        start_time: params.start_time,
        finish_time: params.finish_time,
        duration_seconds: duration,
        memory_usage: memory_snapshot(),
        fact_metrics: params.fact_metrics,
        options: params.options,
        telemetry_data: params.telemetry_data,
        repo_xfi_config: params.repo_config,
        xfi_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Persist the artifact atomically under `{repoPath}/.xfiResults/`.
///
/// The file is written to a temp sibling and renamed into place, so a
/// concurrent reader never observes a torn artifact. An existing file
/// is overwritten, never deleted.
pub fn persist(repo_path: &Path, result: &XfiResult) -> Result<PathBuf, EngineError> {
    let dir = repo_path.join(RESULTS_DIR);
    fs::create_dir_all(&dir)?;

    let envelope = XfiResultEnvelope { xfi_result: result.clone() };
    let json = serde_json::to_string_pretty(&envelope)
        .map_err(|e| EngineError::Internal(format!("artifact serialization failed: {}", e)))?;

    let target = dir.join(RESULT_FILE);
    let temp = dir.join(format!("{}.tmp.{}", RESULT_FILE, std::process::id()));
    fs::write(&temp, json.as_bytes())?;
    fs::rename(&temp, &target)?;
    tracing::info!(path = %target.display(), "analysis artifact written");
    Ok(target)
}

/// Read an artifact back, accepting the three envelope shapes consumers
/// produce: `{XFI_RESULT}`, `{result: {XFI_RESULT}}`, or a bare result.
pub fn read_result(repo_path: &Path) -> Result<XfiResult, EngineError> {
    let path = repo_path.join(RESULTS_DIR).join(RESULT_FILE);
    let raw = fs::read_to_string(&path)
        .map_err(|e| EngineError::ResultParse(format!("'{}': {}", path.display(), e)))?;
    if raw.trim().is_empty() {
        return Err(EngineError::ResultParse(format!("'{}' is empty", path.display())));
    }
    parse_result(&raw).map_err(|e| EngineError::ResultParse(format!("'{}': {}", path.display(), e)))
}

fn parse_result(raw: &str) -> Result<XfiResult, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let candidate = value
        .get("XFI_RESULT")
        .or_else(|| value.get("result").and_then(|r| r.get("XFI_RESULT")))
        .unwrap_or(&value);
    serde_json::from_value(candidate.clone()).map_err(|e| e.to_string())
}

/// Best-effort resident/virtual memory snapshot.
pub fn memory_snapshot() -> MemoryUsage {
    #[cfg(target_os = "linux")]
    {
        if let Ok(statm) = fs::read_to_string("/proc/self/statm") {
            let mut fields = statm.split_whitespace();
            let vm_pages: u64 = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
            let rss_pages: u64 = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
            let page_size = 4096;
            return MemoryUsage {
                rss_bytes: rss_pages * page_size,
                vm_bytes: vm_pages * page_size,
            };
        }
    }
    MemoryUsage::default()
}
