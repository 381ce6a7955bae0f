mod common;

use std::fs;

use serde_json::json;

use xfi_engine::api::types::IssueLevel;
use xfi_engine::core::lock::{WorkspaceLock, DEFAULT_STALE_AFTER};
use xfi_engine::{read_result, run_analysis, AnalysisOptions, EngineError};

fn options_for(dir: &std::path::Path) -> AnalysisOptions {
    AnalysisOptions::for_dir(dir)
}

#[test]
fn test_empty_whitelist_analyzes_only_the_global_check() {
    let repo = common::create_compliant_repo();
    let local = common::local_config_with_overlay(
        "node-fullstack",
        &json!({"config": {"whitelistPatterns": []}}),
    );

    let mut options = options_for(repo.path());
    options.local_config = Some(local.path().to_path_buf());

    let result = run_analysis(&options).unwrap();
    assert_eq!(result.file_count, 0);
    assert_eq!(result.global_checks_run, 1);
    assert_eq!(result.total_issues, 0);
}

#[test]
fn test_exemption_rewrites_matching_rule_to_exempt() {
    let repo = common::create_repo_with_db_url();
    common::write_git_origin(repo.path(), "git@host:org/x.git");

    let local = tempfile::TempDir::new().unwrap();
    common::write_exemptions(
        local.path(),
        "node-fullstack",
        &json!([{
            "repoUrl": "git@host:org/x.git",
            "ruleName": "noDatabases-iterative",
            "expirationDate": "2099-01-01",
            "reason": "database migration scheduled"
        }]),
    );

    let mut options = options_for(repo.path());
    options.local_config = Some(local.path().to_path_buf());

    let result = run_analysis(&options).unwrap();
    assert!(result.exempt_count > 0, "expected exempt findings");
    assert_eq!(result.error_count, 0, "exempted rule must not count as error");

    let db_failures: Vec<_> = result
        .issue_details
        .iter()
        .flat_map(|scan| &scan.errors)
        .filter(|failure| failure.rule_failure == "noDatabases-iterative")
        .collect();
    assert!(!db_failures.is_empty());
    assert!(db_failures.iter().all(|f| f.level == IssueLevel::Exempt));
}

#[test]
fn test_operator_failure_with_fatal_behavior_is_fatality() {
    let repo = common::create_compliant_repo();
    let local = common::local_config_with_overlay(
        "node-fullstack",
        &json!({"rules": ["badCompare-iterative"]}),
    );
    common::write_local_rule(
        local.path(),
        "badCompare-iterative",
        &json!({
            "name": "badCompare-iterative",
            "conditions": {
                "all": [
                    {"fact": "fileData", "path": "$.fileName", "operator": "notEqual", "value": "REPO_GLOBAL_CHECK"},
                    {"fact": "fileData", "path": "$.fileContent", "operator": "lessThan", "value": 5}
                ]
            },
            "event": {"type": "warning", "params": {"message": "comparison rule"}},
            "errorBehavior": "fatal"
        }),
    );

    let mut options = options_for(repo.path());
    options.local_config = Some(local.path().to_path_buf());

    let outcome = run_analysis(&options);
    match outcome {
        Err(EngineError::AnalysisFatal { fatality_count }) => assert!(fatality_count >= 1),
        other => panic!("expected AnalysisFatal, got {:?}", other.map(|r| r.total_issues)),
    }

    // The artifact was persisted before the fatal signal.
    let result = read_result(repo.path()).unwrap();
    assert!(result.fatality_count >= 1);
    let failure = result
        .issue_details
        .iter()
        .flat_map(|scan| &scan.errors)
        .find(|f| f.level == IssueLevel::Fatality)
        .expect("fatality failure recorded");
    let details = failure.details.as_ref().unwrap();
    assert_eq!(details["source"], "operator");
}

#[test]
fn test_second_analysis_rejected_while_lock_held() {
    let repo = common::create_compliant_repo();
    let lock = WorkspaceLock::acquire(repo.path(), "editor-host", DEFAULT_STALE_AFTER).unwrap();

    let result = run_analysis(&options_for(repo.path()));
    assert!(matches!(result, Err(EngineError::AlreadyRunning { .. })));

    drop(lock);
    let result = run_analysis(&options_for(repo.path()));
    assert!(result.is_ok(), "lock release must allow the next run");
}

#[test]
fn test_unreachable_config_server_falls_back_to_builtin() {
    let repo = common::create_compliant_repo();
    let mut options = options_for(repo.path());
    options.config_server = Some("http://127.0.0.1:9".to_string());

    let result = run_analysis(&options).unwrap();
    assert_eq!(result.telemetry_data.config_server, "none");
    assert_eq!(result.archetype, "node-fullstack");
    assert_eq!(result.total_issues, 0);
}

#[test]
fn test_issue_counts_sum_and_artifact_roundtrip() {
    let repo = common::create_repo_with_db_url();
    fs::write(
        repo.path().join("src/config.js"),
        "const password = 'hunter2';\n",
    )
    .unwrap();
    fs::write(
        repo.path().join("package.json"),
        json!({"name": "demo", "dependencies": {"react": "^16.3.0"}}).to_string(),
    )
    .unwrap();

    let result = run_analysis(&options_for(repo.path())).unwrap();
    assert!(result.total_issues >= 3, "db error + sensitive warning + outdated dep");
    assert_eq!(
        result.total_issues,
        result.warning_count + result.error_count + result.fatality_count + result.exempt_count
    );

    // issueDetails are stable-sorted by filePath.
    let paths: Vec<&str> = result.issue_details.iter().map(|s| s.file_path.as_str()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);

    let restored = read_result(repo.path()).unwrap();
    assert_eq!(restored.total_issues, result.total_issues);
    assert_eq!(restored.issue_details.len(), result.issue_details.len());
    assert_eq!(restored.xfi_version, result.xfi_version);
}

#[test]
fn test_outdated_dependency_failure_carries_manifest_location() {
    let repo = common::create_compliant_repo();
    fs::write(
        repo.path().join("package.json"),
        "{\n  \"name\": \"demo\",\n  \"dependencies\": {\n    \"react\": \"^16.3.0\"\n  }\n}\n",
    )
    .unwrap();

    let result = run_analysis(&options_for(repo.path())).unwrap();
    let failure = result
        .issue_details
        .iter()
        .flat_map(|scan| &scan.errors)
        .find(|f| f.rule_failure == "outdatedFramework-global")
        .expect("outdated framework failure");
    let details = failure.details.as_ref().unwrap();
    assert_eq!(details["details"]["details"][0]["dependency"], "react");
    assert_eq!(details["details"]["details"][0]["location"]["lineNumber"], 4);
}

#[test]
fn test_identical_fixtures_produce_identical_findings() {
    let first = common::create_repo_with_db_url();
    let second = common::create_repo_with_db_url();

    let result_a = run_analysis(&options_for(first.path())).unwrap();
    let result_b = run_analysis(&options_for(second.path())).unwrap();

    assert_eq!(result_a.total_issues, result_b.total_issues);
    let paths_a: Vec<&str> = result_a.issue_details.iter().map(|s| s.file_path.as_str()).collect();
    let paths_b: Vec<&str> = result_b.issue_details.iter().map(|s| s.file_path.as_str()).collect();
    assert_eq!(paths_a, paths_b);
}

#[test]
fn test_sensitive_false_positive_path_is_suppressed() {
    let repo = common::create_compliant_repo();
    fs::write(
        repo.path().join("src/fixture.js"),
        "const password = 'not-a-real-secret';\n",
    )
    .unwrap();
    fs::write(
        repo.path().join(".xfiConfig.json"),
        json!({"sensitiveFileFalsePositives": ["src/fixture.js"]}).to_string(),
    )
    .unwrap();

    let result = run_analysis(&options_for(repo.path())).unwrap();
    let flagged = result
        .issue_details
        .iter()
        .any(|scan| scan.file_path == "src/fixture.js");
    assert!(!flagged, "false-positive path must not be flagged");
    assert_eq!(result.repo_xfi_config.sensitive_file_false_positives.len(), 1);
}
