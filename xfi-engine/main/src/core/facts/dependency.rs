use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::api::types::{ArchetypeSettings, EvalError};
use crate::core::almanac::{Almanac, FactDef, FactFn};

/// `repoDependencyAnalysis`: compares installed dependency versions
/// against the archetype's minimum constraints.
///
/// Reads the pre-collected `dependencyData` runtime fact and produces
/// `{"details": [{dependency, installedVersion, minimumVersion,
/// location{lineNumber, columnNumber}, manifest}]}` listing every
/// dependency below its minimum.
pub fn repo_dependency_analysis() -> FactDef {
    let producer: FactFn = Arc::new(|_params, almanac| run(almanac));
    FactDef::new("repoDependencyAnalysis", 2, producer)
}

fn run(almanac: &mut Almanac<'_>) -> Result<Value, EvalError> {
    let data = almanac
        .get_value("dependencyData")
        .cloned()
        .ok_or_else(|| EvalError::fact("repoDependencyAnalysis", "dependencyData is not available"))?;

    let installed = data["installedDependencyVersions"]
        .as_object()
        .cloned()
        .unwrap_or_default();
    let minimum = data["minimumDependencyVersions"]
        .as_object()
        .cloned()
        .unwrap_or_default();

    let mut details = Vec::new();
    for (name, constraint) in &minimum {
        let Some(minimum_version) = constraint.as_str() else {
            continue;
        };
        let Some(entry) = installed.get(name) else {
            // Dependency not declared by the repo; nothing to compare.
            continue;
        };
        let installed_version = entry["version"].as_str().unwrap_or_default();
        if version_below(installed_version, minimum_version) {
            details.push(json!({
                "dependency": name,
                "installedVersion": installed_version,
                "minimumVersion": minimum_version,
                "manifest": entry["manifest"],
                "location": entry["location"],
            }));
        }
    }

    Ok(json!({"details": details}))
}

/// Collect installed dependency versions from the repo's manifests.
///
/// Supports `package.json` (dependencies + devDependencies) and
/// `Cargo.toml` (`[dependencies]`, `[dev-dependencies]`). Each entry
/// records the 1-based manifest line where the dependency is declared.
pub fn collect_dependency_data(repo_path: &Path, settings: &ArchetypeSettings) -> Value {
    let mut installed = Map::new();

    let package_json = repo_path.join("package.json");
    if let Ok(raw) = fs::read_to_string(&package_json) {
        if let Ok(parsed) = serde_json::from_str::<Value>(&raw) {
            for section in ["dependencies", "devDependencies"] {
                if let Some(deps) = parsed[section].as_object() {
                    for (name, version) in deps {
                        let version = version.as_str().unwrap_or_default();
                        installed.insert(
                            name.clone(),
                            manifest_entry(version, "package.json", &raw, name),
                        );
                    }
                }
            }
        }
    }

    let cargo_toml = repo_path.join("Cargo.toml");
    if let Ok(raw) = fs::read_to_string(&cargo_toml) {
        if let Ok(parsed) = raw.parse::<toml::Value>() {
            for section in ["dependencies", "dev-dependencies"] {
                if let Some(deps) = parsed.get(section).and_then(toml::Value::as_table) {
                    for (name, spec) in deps {
                        let version = match spec {
                            toml::Value::String(v) => v.clone(),
                            toml::Value::Table(t) => t
                                .get("version")
                                .and_then(toml::Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            _ => String::new(),
                        };
                        installed.insert(
                            name.clone(),
                            manifest_entry(&version, "Cargo.toml", &raw, name),
                        );
                    }
                }
            }
        }
    }

    json!({
        "installedDependencyVersions": installed,
        "minimumDependencyVersions": settings.minimum_dependency_versions,
    })
}

fn manifest_entry(version: &str, manifest: &str, raw: &str, name: &str) -> Value {
    let (line, column) = declaration_location(raw, name);
    json!({
        "version": normalize(version),
        "manifest": manifest,
        "location": {"lineNumber": line, "columnNumber": column},
    })
}

/// Find the 1-based line/column of a dependency declaration by scanning
/// the raw manifest text.
fn declaration_location(raw: &str, name: &str) -> (usize, usize) {
    let quoted = format!("\"{}\"", name);
    for (idx, line) in raw.lines().enumerate() {
        if let Some(col) = line.find(&quoted) {
            return (idx + 1, col + 1);
        }
        // Bare TOML keys: `serde = "1"`.
        let trimmed = line.trim_start();
        if trimmed.starts_with(name)
            && trimmed[name.len()..].trim_start().starts_with('=')
        {
            return (idx + 1, line.len() - trimmed.len() + 1);
        }
    }
    (1, 1)
}

/// Strip constraint sigils and compare dotted numeric components.
fn version_below(installed: &str, minimum: &str) -> bool {
    let lhs = components(installed);
    let rhs = components(minimum);
    if lhs.is_empty() || rhs.is_empty() {
        return false;
    }
    for i in 0..lhs.len().max(rhs.len()) {
        let l = lhs.get(i).copied().unwrap_or(0);
        let r = rhs.get(i).copied().unwrap_or(0);
        if l != r {
            return l < r;
        }
    }
    false
}

fn normalize(version: &str) -> String {
    version
        .trim()
        .trim_start_matches(['^', '~', '=', 'v', '>', '<', ' '])
        .to_string()
}

fn components(version: &str) -> Vec<u64> {
    normalize(version)
        .split(['.', '-', '+'])
        .map_while(|part| part.parse::<u64>().ok())
        .collect()
}
