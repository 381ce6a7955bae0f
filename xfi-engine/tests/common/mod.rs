#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// A repository that satisfies the node-fullstack archetype: standard
/// directories present, no flagged content, no dependency manifest.
pub fn create_compliant_repo() -> TempDir {
    let tmp = TempDir::new().expect("failed to create temp dir");
    for dir in ["src/components", "src/services", "src/utils", "tests", "public"] {
        fs::create_dir_all(tmp.path().join(dir)).unwrap();
    }
    fs::write(
        tmp.path().join("src/app.js"),
        "const greeting = 'hello';\nmodule.exports = { greeting };\n",
    )
    .unwrap();
    tmp
}

/// A compliant repository plus one file with a direct database URL.
pub fn create_repo_with_db_url() -> TempDir {
    let tmp = create_compliant_repo();
    fs::write(
        tmp.path().join("src/db.js"),
        "const url = 'mongodb://localhost:27017/app';\n",
    )
    .unwrap();
    tmp
}

/// Declare a git origin so the analysis resolves a repo URL.
pub fn write_git_origin(root: &Path, url: &str) {
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(
        root.join(".git/config"),
        format!("[remote \"origin\"]\n\turl = {}\n", url),
    )
    .unwrap();
}

/// A local configuration directory overlaying the named archetype.
pub fn local_config_with_overlay(archetype: &str, overlay: &serde_json::Value) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    fs::write(
        dir.path().join(format!("{}.json", archetype)),
        overlay.to_string(),
    )
    .unwrap();
    dir
}

/// Add an exemptions file to a local configuration directory.
pub fn write_exemptions(dir: &Path, archetype: &str, exemptions: &serde_json::Value) {
    fs::write(
        dir.join(format!("{}-exemptions.json", archetype)),
        exemptions.to_string(),
    )
    .unwrap();
}

/// Add a rule file to a local configuration directory.
pub fn write_local_rule(dir: &Path, name: &str, rule: &serde_json::Value) {
    let rules_dir = dir.join("rules");
    fs::create_dir_all(&rules_dir).unwrap();
    fs::write(rules_dir.join(format!("{}-rule.json", name)), rule.to_string()).unwrap();
}
