mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("xfi").unwrap();
    // Keep e2e runs quiet and hermetic.
    cmd.env("XFI_DISABLE_FILE_LOGGING", "1");
    cmd.env("XFI_LOG_LEVEL", "error");
    cmd
}

#[test]
fn test_cli_help() {
    cmd().arg("--help").assert().success().stdout(predicate::str::contains("--archetype"));
}

#[test]
fn test_cli_exit_0_on_clean_repo() {
    let repo = common::create_compliant_repo();
    cmd().arg("--dir").arg(repo.path()).assert().success();
}

#[test]
fn test_cli_exit_1_on_issues() {
    let repo = common::create_repo_with_db_url();
    cmd().arg("--dir").arg(repo.path()).assert().code(1);
}

#[test]
fn test_cli_exit_2_on_bad_path() {
    cmd().arg("--dir").arg("/nonexistent/path/xyz").assert().code(2);
}

#[test]
fn test_cli_exit_2_on_unknown_mode() {
    let repo = common::create_compliant_repo();
    cmd()
        .arg("--dir")
        .arg(repo.path())
        .arg("--mode")
        .arg("tui")
        .assert()
        .code(2);
}

#[test]
fn test_cli_exit_2_on_unknown_archetype() {
    let repo = common::create_compliant_repo();
    cmd()
        .arg("--dir")
        .arg(repo.path())
        .arg("--archetype")
        .arg("no-such-archetype")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_cli_stdout_is_result_envelope() {
    let repo = common::create_repo_with_db_url();
    let output = cmd().arg("--dir").arg(repo.path()).output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(value.get("XFI_RESULT").is_some());
    assert_eq!(value["XFI_RESULT"]["archetype"], "node-fullstack");
    assert!(value["XFI_RESULT"]["totalIssues"].as_u64().unwrap() > 0);
}

#[test]
fn test_cli_writes_artifact_file() {
    let repo = common::create_repo_with_db_url();
    cmd().arg("--dir").arg(repo.path()).assert().code(1);

    let artifact = repo.path().join(".xfiResults/XFI_RESULT.json");
    assert!(artifact.exists());
    let raw = std::fs::read_to_string(artifact).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value["XFI_RESULT"]["issueDetails"].is_array());
}

#[test]
fn test_cli_artifact_overwritten_on_rerun() {
    let repo = common::create_repo_with_db_url();
    cmd().arg("--dir").arg(repo.path()).assert().code(1);
    std::fs::remove_file(repo.path().join("src/db.js")).unwrap();
    cmd().arg("--dir").arg(repo.path()).assert().success();

    let raw = std::fs::read_to_string(repo.path().join(".xfiResults/XFI_RESULT.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["XFI_RESULT"]["totalIssues"], 0);
}
