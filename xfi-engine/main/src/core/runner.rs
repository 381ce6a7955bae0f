use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::{json, Value};

use crate::api::types::{
    EngineError, ErrorBehavior, ErrorSource, EvalError, FactMetric, FileData, IssueLevel,
    RuleFailure, RuleSpec, ScanResult,
};
use crate::core::engine::{RuleOutcome, RulesEngine};
use crate::core::location;

/// Cooperative cancellation flag shared with the caller.
///
/// Workers observe it at the next suspension point; file evaluation
/// checks it before each file.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run-wide facts shared read-only across all file evaluations.
#[derive(Debug, Clone)]
pub struct SharedFacts {
    pub dependency_data: Value,
    pub standard_structure: Value,
    pub sensitive_file_false_positives: Vec<String>,
    pub repo_path: String,
    pub repo_url: String,
}

/// Context handed to a configured `onError` action.
pub struct ErrorActionContext<'a> {
    pub error: &'a EvalError,
    pub rule_name: &'a str,
    pub level: IssueLevel,
    pub source: ErrorSource,
    pub params: &'a Value,
    pub file: &'a str,
}

pub type ErrorActionFn = Arc<dyn Fn(&ErrorActionContext<'_>) -> Result<Value, String> + Send + Sync>;

/// The named error-action catalog.
pub fn builtin_error_actions() -> HashMap<String, ErrorActionFn> {
    let mut actions: HashMap<String, ErrorActionFn> = HashMap::new();
    actions.insert(
        "logError".to_string(),
        Arc::new(|cx| {
            tracing::error!(
                rule = cx.rule_name,
                source = %cx.source,
                file = cx.file,
                "rule evaluation failed: {}",
                cx.error.message
            );
            Ok(Value::Null)
        }),
    );
    actions.insert(
        "captureContext".to_string(),
        Arc::new(|cx| {
            Ok(json!({
                "rule": cx.rule_name,
                "level": cx.level,
                "source": cx.source,
                "file": cx.file,
                "params": cx.params,
                "message": cx.error.message,
            }))
        }),
    );
    actions
}

/// Results of one analysis sweep over the file list.
#[derive(Debug)]
pub struct RunOutput {
    /// Files with at least one failure, stable-sorted by filePath.
    pub results: Vec<ScanResult>,
    /// Fact evaluation counters merged across files.
    pub fact_metrics: BTreeMap<String, FactMetric>,
}

/// Evaluate every file against the engine with a bounded worker pool.
///
/// Worker count is `min(cpuCount, maxConcurrency)`. Each file owns its
/// almanac; only the immutable engine and shared facts cross threads.
pub fn run_files(
    engine: &RulesEngine,
    files: &[FileData],
    shared: &SharedFacts,
    max_concurrency: Option<usize>,
    cancel: &CancelFlag,
) -> Result<RunOutput, EngineError> {
    let cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let workers = max_concurrency.unwrap_or(cpu_count).min(cpu_count).max(1);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| EngineError::Internal(format!("worker pool: {}", e)))?;

    let actions = builtin_error_actions();
    let per_file: Result<Vec<(ScanResult, BTreeMap<String, FactMetric>)>, EngineError> =
        pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    if cancel.is_cancelled() {
                        return Err(EngineError::Cancelled);
                    }
                    Ok(evaluate_file(engine, file, shared, &actions))
                })
                .collect()
        });
    let per_file = per_file?;

    let mut fact_metrics: BTreeMap<String, FactMetric> = BTreeMap::new();
    let mut results = Vec::new();
    for (result, metrics) in per_file {
        for (name, metric) in metrics {
            let merged = fact_metrics.entry(name).or_default();
            merged.evaluations += metric.evaluations;
            merged.total_millis += metric.total_millis;
        }
        if !result.errors.is_empty() {
            results.push(result);
        }
    }
    results.sort_by(|a, b| a.file_path.cmp(&b.file_path));

    Ok(RunOutput { results, fact_metrics })
}

fn evaluate_file(
    engine: &RulesEngine,
    file: &FileData,
    shared: &SharedFacts,
    actions: &HashMap<String, ErrorActionFn>,
) -> (ScanResult, BTreeMap<String, FactMetric>) {
    let runtime_facts = vec![
        ("fileData".to_string(), serde_json::to_value(file).unwrap_or(Value::Null)),
        ("dependencyData".to_string(), shared.dependency_data.clone()),
        ("standardStructure".to_string(), shared.standard_structure.clone()),
        (
            "sensitiveFileFalsePositives".to_string(),
            json!(shared.sensitive_file_false_positives),
        ),
        ("repoPath".to_string(), json!(shared.repo_path)),
        ("repoUrl".to_string(), json!(shared.repo_url)),
    ];

    let run = engine.run(&runtime_facts);

    let mut errors = Vec::new();
    for outcome in run.outcomes {
        match outcome {
            RuleOutcome::Fired { name, level, params } => {
                errors.push(RuleFailure {
                    rule_failure: name.clone(),
                    level,
                    details: Some(enrich_with_location(&name, params)),
                });
            }
            RuleOutcome::NotFired { .. } => {}
            RuleOutcome::Errored { rule, error } => {
                errors.push(classify_failure(&rule, &error, file, actions));
            }
        }
    }

    (
        ScanResult { file_path: file.relative_path.clone(), errors },
        run.fact_metrics,
    )
}

/// Attach the canonical range resolved by the location extractor.
fn enrich_with_location(rule_name: &str, params: Value) -> Value {
    let range = location::extract_location(rule_name, &params);
    match params {
        Value::Object(mut map) => {
            map.insert(
                "resolvedLocation".to_string(),
                serde_json::to_value(&range).unwrap_or(Value::Null),
            );
            Value::Object(map)
        }
        other => other,
    }
}

/// Map an evaluation error to `errorSource × level` and build the
/// synthetic failure entry.
fn classify_failure(
    rule: &RuleSpec,
    error: &EvalError,
    file: &FileData,
    actions: &HashMap<String, ErrorActionFn>,
) -> RuleFailure {
    let fatal = rule.error_behavior == ErrorBehavior::Fatal;
    let level = match error.source {
        ErrorSource::Plugin => error
            .declared_level
            .unwrap_or(if fatal { IssueLevel::Fatality } else { IssueLevel::Error }),
        ErrorSource::Operator | ErrorSource::Fact => {
            if fatal {
                IssueLevel::Fatality
            } else {
                IssueLevel::Error
            }
        }
        ErrorSource::Rule => {
            if fatal || rule.event.event_type == IssueLevel::Fatality {
                IssueLevel::Fatality
            } else {
                IssueLevel::Error
            }
        }
        ErrorSource::Unknown => IssueLevel::Error,
    };

    tracing::error!(
        rule = %rule.name,
        source = %error.source,
        file = %file.relative_path,
        level = %level,
        "rule execution error: {}",
        error.message
    );

    if let Some(on_error) = &rule.on_error {
        let context = ErrorActionContext {
            error,
            rule_name: &rule.name,
            level,
            source: error.source,
            params: &on_error.params,
            file: &file.relative_path,
        };
        match actions.get(&on_error.action) {
            Some(action) => match action(&context) {
                Ok(outcome) => {
                    tracing::info!(rule = %rule.name, action = %on_error.action, ?outcome, "onError action completed");
                }
                Err(e) => {
                    tracing::warn!(rule = %rule.name, action = %on_error.action, "onError action failed: {e}");
                }
            },
            None => {
                tracing::warn!(rule = %rule.name, action = %on_error.action, "unknown onError action");
            }
        }
    }

    let rule_name = error
        .rule_name
        .clone()
        .unwrap_or_else(|| "ExecutionError".to_string());
    let mut details = json!({
        "message": error.message,
        "source": error.source,
        "stack": Value::Null,
    });
    if let Some(extra) = &error.detail {
        details["details"] = extra.clone();
    }

    RuleFailure { rule_failure: rule_name, level, details: Some(details) }
}
