use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Value};

use crate::api::types::EvalError;
use crate::core::almanac::{Almanac, FactDef, FactFn};

/// `repoFileAnalysis`: regex scan of the current file content.
///
/// Params: `checkPattern` (string or array of strings), optional
/// `resultFact` to re-expose the result under another fact name.
/// Produces `{"matches": [{pattern, lineNumber, columnNumber, match}]}`
/// with 1-based coordinates. The global sentinel and any path listed in
/// `sensitiveFileFalsePositives` produce an empty match set.
pub fn repo_file_analysis() -> FactDef {
    let producer: FactFn = Arc::new(|params, almanac| run(params, almanac));
    FactDef::new("repoFileAnalysis", 1, producer)
}

fn run(params: &Value, almanac: &mut Almanac<'_>) -> Result<Value, EvalError> {
    let file_data = almanac
        .get_value("fileData")
        .cloned()
        .ok_or_else(|| EvalError::fact("repoFileAnalysis", "fileData is not available"))?;

    let file_name = file_data["fileName"].as_str().unwrap_or_default().to_string();
    let relative_path = file_data["relativePath"].as_str().unwrap_or_default().to_string();
    let content = file_data["fileContent"].as_str().unwrap_or_default().to_string();

    let result = if file_name == crate::api::types::REPO_GLOBAL_CHECK
        || is_false_positive(almanac, &relative_path)
    {
        json!({"matches": []})
    } else {
        let patterns = patterns_from(params)?;
        scan(&content, &patterns)?
    };

    if let Some(result_fact) = params.get("resultFact").and_then(Value::as_str) {
        let name = result_fact.to_string();
        almanac.add_runtime_fact(&name, result.clone());
    }

    Ok(result)
}

fn is_false_positive(almanac: &Almanac<'_>, relative_path: &str) -> bool {
    almanac
        .get_value("sensitiveFileFalsePositives")
        .and_then(Value::as_array)
        .map(|paths| {
            paths
                .iter()
                .filter_map(Value::as_str)
                .any(|p| p == relative_path)
        })
        .unwrap_or(false)
}

fn patterns_from(params: &Value) -> Result<Vec<String>, EvalError> {
    let raw = params
        .get("checkPattern")
        .ok_or_else(|| EvalError::fact("repoFileAnalysis", "params.checkPattern is required"))?;
    match raw {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        _ => Err(EvalError::fact(
            "repoFileAnalysis",
            "params.checkPattern must be a string or array of strings",
        )),
    }
}

fn scan(content: &str, patterns: &[String]) -> Result<Value, EvalError> {
    let mut matches = Vec::new();
    for pattern in patterns {
        let re = Regex::new(pattern)
            .map_err(|e| EvalError::fact("repoFileAnalysis", format!("invalid pattern '{}': {}", pattern, e)))?;
        for (idx, line) in content.lines().enumerate() {
            for found in re.find_iter(line) {
                matches.push(json!({
                    "pattern": pattern,
                    "lineNumber": idx + 1,
                    "columnNumber": found.start() + 1,
                    "match": found.as_str(),
                }));
            }
        }
    }
    Ok(json!({"matches": matches}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{FileData, REPO_GLOBAL_CHECK};
    use crate::core::almanac::FactCatalog;

    fn almanac_with_file<'a>(catalog: &'a FactCatalog, file: &'a FileData) -> Almanac<'a> {
        let mut almanac = Almanac::new(catalog);
        almanac.add_runtime_fact("fileData", serde_json::to_value(file).unwrap());
        almanac
    }

    fn file(relative: &str, content: &str) -> FileData {
        FileData {
            file_name: relative.rsplit('/').next().unwrap_or(relative).to_string(),
            file_path: format!("/repo/{}", relative),
            relative_path: relative.to_string(),
            file_content: content.to_string(),
            file_ast: None,
        }
    }

    #[test]
    fn test_matches_carry_one_based_coordinates() {
        let catalog = FactCatalog::new();
        let data = file("src/app.js", "ok line\npassword = 'hunter2'\n");
        let mut almanac = almanac_with_file(&catalog, &data);

        let result = run(&json!({"checkPattern": "password"}), &mut almanac).unwrap();
        let matches = result["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["lineNumber"], 2);
        assert_eq!(matches[0]["columnNumber"], 1);
        assert_eq!(matches[0]["match"], "password");
    }

    #[test]
    fn test_sentinel_produces_no_matches() {
        let catalog = FactCatalog::new();
        let data = FileData::repo_global_check();
        assert_eq!(data.file_name, REPO_GLOBAL_CHECK);
        let mut almanac = almanac_with_file(&catalog, &data);

        let result = run(&json!({"checkPattern": ".*"}), &mut almanac).unwrap();
        assert!(result["matches"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_false_positive_paths_are_skipped() {
        let catalog = FactCatalog::new();
        let data = file("test/fixtures/fake-creds.js", "password = 'x'");
        let mut almanac = almanac_with_file(&catalog, &data);
        almanac.add_runtime_fact(
            "sensitiveFileFalsePositives",
            json!(["test/fixtures/fake-creds.js"]),
        );

        let result = run(&json!({"checkPattern": "password"}), &mut almanac).unwrap();
        assert!(result["matches"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_result_fact_reexposed() {
        let catalog = FactCatalog::new();
        let data = file("src/a.js", "token = 1");
        let mut almanac = almanac_with_file(&catalog, &data);

        run(
            &json!({"checkPattern": "token", "resultFact": "tokenScan"}),
            &mut almanac,
        )
        .unwrap();
        assert!(almanac.get_value("tokenScan").is_some());
    }

    #[test]
    fn test_invalid_pattern_is_fact_error() {
        let catalog = FactCatalog::new();
        let data = file("src/a.js", "x");
        let mut almanac = almanac_with_file(&catalog, &data);

        let err = run(&json!({"checkPattern": "["}), &mut almanac).unwrap_err();
        assert_eq!(err.source, crate::api::types::ErrorSource::Fact);
    }

    #[test]
    fn test_multiple_patterns_accumulate() {
        let catalog = FactCatalog::new();
        let data = file("src/a.js", "apiKey = 'k'\npassword = 'p'\n");
        let mut almanac = almanac_with_file(&catalog, &data);

        let result = run(&json!({"checkPattern": ["apiKey", "password"]}), &mut almanac).unwrap();
        assert_eq!(result["matches"].as_array().unwrap().len(), 2);
    }
}
