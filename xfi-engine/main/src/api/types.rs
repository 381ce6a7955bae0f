use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel pseudo-file that triggers repository-scoped rules.
///
/// The collector appends exactly one `FileData` whose name, path, and
/// relative path all equal this literal; rules scope themselves to it
/// through their own conditions.
pub const REPO_GLOBAL_CHECK: &str = "REPO_GLOBAL_CHECK";

// ---------------------------------------------------------------------------
// Severity and classification enums
// ---------------------------------------------------------------------------

/// Severity of a rule event or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    /// A non-blocking issue that should be addressed.
    Warning,
    /// A blocking issue that must be fixed.
    Error,
    /// A blocking issue that fails the whole analysis.
    Fatality,
    /// A waived issue covered by an unexpired exemption.
    Exempt,
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueLevel::Warning => write!(f, "warning"),
            IssueLevel::Error => write!(f, "error"),
            IssueLevel::Fatality => write!(f, "fatality"),
            IssueLevel::Exempt => write!(f, "exempt"),
        }
    }
}

/// Where a rule execution error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    Operator,
    Fact,
    Plugin,
    Rule,
    Unknown,
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSource::Operator => write!(f, "operator"),
            ErrorSource::Fact => write!(f, "fact"),
            ErrorSource::Plugin => write!(f, "plugin"),
            ErrorSource::Rule => write!(f, "rule"),
            ErrorSource::Unknown => write!(f, "unknown"),
        }
    }
}

/// How a rule reacts when its own evaluation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBehavior {
    /// Record the failure and continue the run.
    #[default]
    Swallow,
    /// Record the failure at fatality level.
    Fatal,
}

/// Extractor confidence attached to a resolved location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

// ---------------------------------------------------------------------------
// Collected files
// ---------------------------------------------------------------------------

/// A single file presented to the rules engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// Base name of the file.
    pub file_name: String,
    /// Absolute path on disk.
    pub file_path: String,
    /// Path relative to the repository root.
    pub relative_path: String,
    /// Full file content; empty for the global sentinel.
    #[serde(default)]
    pub file_content: String,
    /// Parsed AST payload when a fact has produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_ast: Option<Value>,
}

impl FileData {
    /// Build the synthetic record that triggers repository-scoped rules.
    pub fn repo_global_check() -> Self {
        FileData {
            file_name: REPO_GLOBAL_CHECK.to_string(),
            file_path: REPO_GLOBAL_CHECK.to_string(),
            relative_path: REPO_GLOBAL_CHECK.to_string(),
            file_content: String::new(),
            file_ast: None,
        }
    }

    /// Whether this record is the global sentinel.
    pub fn is_global_sentinel(&self) -> bool {
        self.file_name == REPO_GLOBAL_CHECK
    }
}

// ---------------------------------------------------------------------------
// Archetype configuration
// ---------------------------------------------------------------------------

/// A named configuration profile binding rules, facts, and operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeConfig {
    /// Archetype name (e.g. `node-fullstack`).
    pub name: String,
    /// Rule names to load, in declaration order.
    pub rules: Vec<String>,
    /// Fact names to register.
    pub facts: Vec<String>,
    /// Operator names to register.
    pub operators: Vec<String>,
    /// When true, unknown fact/operator names abort the analysis.
    #[serde(default)]
    pub strict: bool,
    /// Structural expectations and pattern configuration.
    pub config: ArchetypeSettings,
}

/// The `config` block of an archetype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeSettings {
    /// Package name to minimum acceptable version constraint.
    #[serde(default)]
    pub minimum_dependency_versions: BTreeMap<String, String>,
    /// Expected directory tree, as nested objects with null leaves.
    #[serde(default)]
    pub standard_structure: Value,
    /// Regex patterns excluding paths from collection; first match wins.
    #[serde(default)]
    pub blacklist_patterns: Vec<String>,
    /// Regex patterns a file path must match to be collected.
    #[serde(default)]
    pub whitelist_patterns: Vec<String>,
    /// Gate for `openai`-prefixed facts and rules.
    #[serde(default)]
    pub openai_enabled: bool,
    /// Upper bound on parallel per-file evaluations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_analysis: Option<usize>,
}

/// Repo-local extension declarations from `.xfiConfig.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoXfiConfig {
    /// Inline rule definitions contributed by the repository.
    #[serde(default)]
    pub additional_rules: Vec<RuleSpec>,
    /// Extra fact names to register.
    #[serde(default)]
    pub additional_facts: Vec<String>,
    /// Extra operator names to register.
    #[serde(default)]
    pub additional_operators: Vec<String>,
    /// Plugin names the repository asks for.
    #[serde(default)]
    pub additional_plugins: Vec<String>,
    /// Paths the sensitive-content facts must not flag.
    #[serde(default)]
    pub sensitive_file_false_positives: Vec<String>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn default_priority() -> i64 {
    1
}

/// A declarative rule: a condition tree producing an event when it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    /// Rule name, unique within an archetype.
    pub name: String,
    /// Nested all/any condition tree.
    pub conditions: ConditionSet,
    /// Event emitted when the conditions hold.
    pub event: RuleEvent,
    /// Reaction to evaluation failure; defaults to swallow.
    #[serde(default)]
    pub error_behavior: ErrorBehavior,
    /// Optional named action to run on evaluation failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnErrorSpec>,
    /// Evaluation priority. Higher runs first; ties keep registration
    /// order. Defaults to 1.
    #[serde(default = "default_priority")]
    pub priority: i64,
}

/// The event block of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvent {
    /// Severity the fired rule reports at.
    #[serde(rename = "type")]
    pub event_type: IssueLevel,
    /// Free-form payload; `{"fact": "name"}` placeholders are substituted
    /// with resolved fact values at emit time.
    #[serde(default)]
    pub params: Value,
}

/// The `onError` block of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnErrorSpec {
    /// Name of a registered error action.
    pub action: String,
    /// Parameters forwarded to the action.
    #[serde(default)]
    pub params: Value,
}

/// A boolean grouping of conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionSet {
    /// Every member must hold.
    All(Vec<ConditionNode>),
    /// At least one member must hold.
    Any(Vec<ConditionNode>),
}

/// A member of a condition set: either a nested set or a predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Nested(ConditionSet),
    Leaf(ConditionLeaf),
}

/// A single predicate over a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionLeaf {
    /// Fact name to resolve.
    pub fact: String,
    /// Parameters forwarded to the fact producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Optional `$.a.b` path applied to the resolved fact value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Operator name applied to `(factValue, value)`.
    pub operator: String,
    /// Comparand; may itself be a `{"fact": "name"}` reference.
    pub value: Value,
}

// ---------------------------------------------------------------------------
// Exemptions
// ---------------------------------------------------------------------------

/// How an exemption's repoUrl is compared against the analysis repoUrl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExemptionMatchMode {
    /// The entry's repoUrl must equal the analysis repoUrl.
    #[default]
    Exact,
    /// The entry's repoUrl must be a substring of the analysis repoUrl.
    Substring,
}

/// A time-limited waiver downgrading a (repo, rule) pair to `exempt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exemption {
    /// Repository URL the waiver applies to.
    pub repo_url: String,
    /// Rule name the waiver applies to.
    pub rule_name: String,
    /// Date (or RFC 3339 timestamp) after which the waiver lapses.
    pub expiration_date: String,
    /// Why the waiver was granted.
    #[serde(default)]
    pub reason: String,
    /// Comparison mode for repoUrl; exact by default.
    #[serde(default)]
    pub match_mode: ExemptionMatchMode,
}

// ---------------------------------------------------------------------------
// Per-file results
// ---------------------------------------------------------------------------

/// A single rule failure recorded against a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFailure {
    /// Name of the rule that fired or errored.
    pub rule_failure: String,
    /// Severity of the failure.
    pub level: IssueLevel,
    /// Heterogeneous payload from the rule event or error classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// All failures recorded against one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Workspace-relative path, or the global sentinel literal.
    pub file_path: String,
    /// Failures in rule-firing order.
    pub errors: Vec<RuleFailure>,
}

/// A canonical 1-based source range resolved from failure details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    /// Which extractor produced the range (e.g. `complexity-metrics`).
    pub source: String,
    pub confidence: Confidence,
    /// False when the ultimate fallback range was used.
    pub found: bool,
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Telemetry event kinds accepted by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TelemetryEventType {
    AnalysisStart,
    AnalysisEnd,
    Warning,
    Error,
    Fatality,
    Exempt,
    Violation,
}

/// A single telemetry event posted to the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event_type: TelemetryEventType,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

/// Host identification captured into the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub hostname: String,
    pub platform: String,
    pub arch: String,
}

/// User identification captured into the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub username: String,
    pub home_dir: String,
}

/// The telemetry snapshot embedded in the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryData {
    pub repo_url: String,
    /// Configured server URL, or `"none"` when running offline.
    pub config_server: String,
    pub host_info: HostInfo,
    pub user_info: UserInfo,
}

// ---------------------------------------------------------------------------
// Analysis options and artifact
// ---------------------------------------------------------------------------

/// Output format for the CLI report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
}

/// Logging mode of the host invoking the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Console-format logging.
    #[default]
    Cli,
    /// Editor-format (JSON line) logging.
    Vscode,
}

/// Resolved options for one analysis run, echoed into the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Workspace path under analysis.
    pub dir: PathBuf,
    /// Archetype name; defaults to `node-fullstack`.
    pub archetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_config: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry_collector: Option<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub mode: RunMode,
    /// Upper bound on parallel file evaluations; overrides the archetype.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

impl AnalysisOptions {
    /// Minimal options for a local offline run.
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        AnalysisOptions {
            dir: dir.into(),
            archetype: "node-fullstack".to_string(),
            config_server: None,
            local_config: None,
            telemetry_collector: None,
            output_format: OutputFormat::Json,
            mode: RunMode::Cli,
            max_concurrency: None,
        }
    }
}

/// Process memory snapshot taken at assembly time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    /// Resident set size in bytes; zero when unavailable.
    pub rss_bytes: u64,
    /// Virtual size in bytes; zero when unavailable.
    pub vm_bytes: u64,
}

/// Evaluation counters for one fact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactMetric {
    /// Number of producer invocations (memoized hits excluded).
    pub evaluations: u64,
    /// Total producer wall time in milliseconds.
    pub total_millis: u64,
}

/// The persisted analysis artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XfiResult {
    pub archetype: String,
    pub repo_path: String,
    pub repo_url: String,
    /// Real files analyzed; excludes the global sentinel.
    pub file_count: u64,
    /// Always 1: the sentinel iteration.
    pub global_checks_run: u64,
    /// Sum of the four level counts.
    pub total_issues: u64,
    pub warning_count: u64,
    pub error_count: u64,
    pub fatality_count: u64,
    pub exempt_count: u64,
    /// Per-file failures, stable-sorted by filePath.
    pub issue_details: Vec<ScanResult>,
    pub start_time: DateTime<Utc>,
    pub finish_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub memory_usage: MemoryUsage,
    /// Fact name to evaluation counters.
    pub fact_metrics: BTreeMap<String, FactMetric>,
    pub options: AnalysisOptions,
    pub telemetry_data: TelemetryData,
    pub repo_xfi_config: RepoXfiConfig,
    pub xfi_version: String,
}

/// The wrapper shape written to `.xfiResults/XFI_RESULT.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XfiResultEnvelope {
    #[serde(rename = "XFI_RESULT")]
    pub xfi_result: XfiResult,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for analysis setup and teardown.
///
/// Per-file rule execution errors never surface here; they are classified
/// into [`RuleFailure`] entries by the runner.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Archetype or rule schema failed validation.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A declared fact or operator name is unknown under `strict`.
    #[error("unknown extension: {0}")]
    LoaderMissing(String),

    /// The result artifact is missing, empty, or malformed.
    #[error("cannot parse result artifact: {0}")]
    ResultParse(String),

    /// Emitted after persistence when fatalityCount > 0.
    #[error("analysis recorded {fatality_count} fatality issue(s)")]
    AnalysisFatal { fatality_count: u64 },

    /// Another analysis already holds the workspace lock.
    #[error("analysis already running for this workspace (pid {pid})")]
    AlreadyRunning { pid: u32 },

    /// The run was cancelled cooperatively.
    #[error("analysis cancelled")]
    Cancelled,

    /// The workspace path is invalid or inaccessible.
    #[error("path error: {0}")]
    Path(String),

    /// Remote configuration fetch failed in a non-recoverable way.
    #[error("http error: {0}")]
    Http(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Unrecoverable host failure (e.g. worker pool construction).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A classified evaluation failure for one rule on one file.
#[derive(Debug, Clone)]
pub struct EvalError {
    /// The failing rule, when attributable.
    pub rule_name: Option<String>,
    /// operator | fact | plugin | rule | unknown.
    pub source: ErrorSource,
    pub message: String,
    /// Level declared by a plugin error, overriding the behavior mapping.
    pub declared_level: Option<IssueLevel>,
    /// Extra payload carried into the synthetic failure details.
    pub detail: Option<Value>,
}

impl EvalError {
    pub fn operator(name: &str, message: impl Into<String>) -> Self {
        EvalError {
            rule_name: None,
            source: ErrorSource::Operator,
            message: format!("operator '{}': {}", name, message.into()),
            declared_level: None,
            detail: None,
        }
    }

    pub fn fact(name: &str, message: impl Into<String>) -> Self {
        EvalError {
            rule_name: None,
            source: ErrorSource::Fact,
            message: format!("fact '{}': {}", name, message.into()),
            declared_level: None,
            detail: None,
        }
    }

    pub fn plugin(name: &str, message: impl Into<String>, level: Option<IssueLevel>) -> Self {
        EvalError {
            rule_name: None,
            source: ErrorSource::Plugin,
            message: format!("plugin '{}': {}", name, message.into()),
            declared_level: level,
            detail: None,
        }
    }

    pub fn rule(name: &str, message: impl Into<String>) -> Self {
        EvalError {
            rule_name: Some(name.to_string()),
            source: ErrorSource::Rule,
            message: message.into(),
            declared_level: None,
            detail: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        EvalError {
            rule_name: None,
            source: ErrorSource::Unknown,
            message: message.into(),
            declared_level: None,
            detail: None,
        }
    }

    pub fn with_rule(mut self, name: &str) -> Self {
        self.rule_name = Some(name.to_string());
        self
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule_name {
            Some(rule) => write!(f, "[{}] {}: {}", self.source, rule, self.message),
            None => write!(f, "[{}] {}", self.source, self.message),
        }
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_level_serde() {
        assert_eq!(serde_json::to_string(&IssueLevel::Fatality).unwrap(), "\"fatality\"");
        let level: IssueLevel = serde_json::from_str("\"exempt\"").unwrap();
        assert_eq!(level, IssueLevel::Exempt);
    }

    #[test]
    fn test_global_sentinel_fields_equal() {
        let sentinel = FileData::repo_global_check();
        assert!(sentinel.is_global_sentinel());
        assert_eq!(sentinel.file_name, REPO_GLOBAL_CHECK);
        assert_eq!(sentinel.file_path, REPO_GLOBAL_CHECK);
        assert_eq!(sentinel.relative_path, REPO_GLOBAL_CHECK);
    }

    #[test]
    fn test_rule_spec_parses_nested_conditions() {
        let rule: RuleSpec = serde_json::from_value(json!({
            "name": "sensitiveLogging-iterative",
            "conditions": {
                "all": [
                    {
                        "fact": "fileData",
                        "path": "$.fileName",
                        "operator": "notEqual",
                        "value": "REPO_GLOBAL_CHECK"
                    },
                    {
                        "any": [
                            {
                                "fact": "repoFileAnalysis",
                                "params": {"checkPattern": "password"},
                                "operator": "hasMatches",
                                "value": true
                            }
                        ]
                    }
                ]
            },
            "event": {"type": "warning", "params": {"message": "sensitive data logged"}}
        }))
        .unwrap();

        assert_eq!(rule.priority, 1);
        assert_eq!(rule.error_behavior, ErrorBehavior::Swallow);
        let ConditionSet::All(members) = &rule.conditions else {
            panic!("expected all-group");
        };
        assert_eq!(members.len(), 2);
        assert!(matches!(members[0], ConditionNode::Leaf(_)));
        assert!(matches!(members[1], ConditionNode::Nested(ConditionSet::Any(_))));
    }

    #[test]
    fn test_rule_event_type_rename() {
        let event: RuleEvent = serde_json::from_value(json!({
            "type": "fatality",
            "params": {}
        }))
        .unwrap();
        assert_eq!(event.event_type, IssueLevel::Fatality);
        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["type"], "fatality");
    }

    #[test]
    fn test_rule_failure_wire_name() {
        let failure = RuleFailure {
            rule_failure: "noDatabases-iterative".to_string(),
            level: IssueLevel::Error,
            details: Some(json!({"message": "direct db call"})),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["ruleFailure"], "noDatabases-iterative");
        assert_eq!(value["level"], "error");
    }

    #[test]
    fn test_exemption_defaults() {
        let exemption: Exemption = serde_json::from_value(json!({
            "repoUrl": "git@host:org/x.git",
            "ruleName": "noDatabases-iterative",
            "expirationDate": "2099-01-01"
        }))
        .unwrap();
        assert_eq!(exemption.match_mode, ExemptionMatchMode::Exact);
        assert!(exemption.reason.is_empty());
    }

    #[test]
    fn test_archetype_settings_defaults() {
        let config: ArchetypeConfig = serde_json::from_value(json!({
            "name": "minimal",
            "rules": [],
            "facts": [],
            "operators": [],
            "config": {}
        }))
        .unwrap();
        assert!(!config.strict);
        assert!(config.config.whitelist_patterns.is_empty());
        assert!(config.config.max_concurrent_analysis.is_none());
    }

    #[test]
    fn test_eval_error_display_includes_source_and_rule() {
        let err = EvalError::operator("lessThan", "non-numeric fact value")
            .with_rule("functionComplexity-iterative");
        let rendered = err.to_string();
        assert!(rendered.contains("operator"));
        assert!(rendered.contains("functionComplexity-iterative"));
    }
}
