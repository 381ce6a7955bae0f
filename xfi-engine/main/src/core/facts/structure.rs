use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::api::types::EvalError;
use crate::core::almanac::{Almanac, FactDef, FactFn};

/// `repoDirectoryStructure`: snapshot of the repository's top level.
///
/// Reads the `repoPath` runtime fact and produces `{"directories":
/// [...], "files": [...]}`, both sorted. `.git` is omitted. Intended for
/// the global sentinel iteration together with the
/// `nonStandardDirectoryStructure` and `missingRequiredFiles` operators.
pub fn repo_directory_structure() -> FactDef {
    let producer: FactFn = Arc::new(|_params, almanac| run(almanac));
    FactDef::new("repoDirectoryStructure", 1, producer)
}

fn run(almanac: &mut Almanac<'_>) -> Result<Value, EvalError> {
    let repo_path = almanac
        .get_value("repoPath")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EvalError::fact("repoDirectoryStructure", "repoPath is not available"))?;

    let entries = fs::read_dir(&repo_path)
        .map_err(|e| EvalError::fact("repoDirectoryStructure", format!("cannot read '{}': {}", repo_path, e)))?;

    let mut directories = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name == ".git" {
            continue;
        }
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => directories.push(name),
            Ok(_) => files.push(name),
            Err(_) => {}
        }
    }
    directories.sort();
    files.sort();

    Ok(json!({"directories": directories, "files": files}))
}
