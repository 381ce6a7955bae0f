use std::fs;
use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::api::types::{ArchetypeConfig, EngineError, FileData};

/// Compiled blacklist/whitelist patterns.
struct PatternSet {
    blacklist: Vec<Regex>,
    whitelist: Vec<Regex>,
}

impl PatternSet {
    /// Compile the archetype's patterns. Invalid expressions are logged
    /// and ignored so one bad pattern cannot blank the whole scan.
    fn compile(config: &ArchetypeConfig) -> Self {
        PatternSet {
            blacklist: compile_all(&config.config.blacklist_patterns, "blacklist"),
            whitelist: compile_all(&config.config.whitelist_patterns, "whitelist"),
        }
    }

    fn blacklisted(&self, path: &str) -> bool {
        self.blacklist.iter().any(|re| re.is_match(path))
    }

    fn whitelisted(&self, path: &str) -> bool {
        self.whitelist.iter().any(|re| re.is_match(path))
    }
}

fn compile_all(patterns: &[String], kind: &str) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(%pattern, kind, "ignoring invalid pattern: {e}");
                None
            }
        })
        .collect()
}

/// Walk the repository and produce the file list for one analysis.
///
/// Directories are descended when no blacklist pattern matches; a file
/// is included when no blacklist pattern matches and at least one
/// whitelist pattern does. Blacklist always wins. Paths escaping the
/// repository root through symlinks are skipped. The returned order is
/// the deterministic walk order (pre-order, lexicographic within a
/// directory), with the global sentinel appended last.
pub fn collect(repo_path: &Path, config: &ArchetypeConfig) -> Result<Vec<FileData>, EngineError> {
    let root = repo_path
        .canonicalize()
        .map_err(|e| EngineError::Path(format!("cannot resolve '{}': {}", repo_path.display(), e)))?;
    if !root.is_dir() {
        return Err(EngineError::Path(format!("'{}' is not a directory", root.display())));
    }

    let patterns = PatternSet::compile(config);
    let mut files = Vec::new();

    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_dir() {
                !patterns.blacklisted(&entry.path().to_string_lossy())
            } else {
                true
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        // Resolve symlinks and require the target to stay inside the root.
        let resolved = match entry.path().canonicalize() {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), "skipping unresolvable path: {e}");
                continue;
            }
        };
        if !resolved.starts_with(&root) {
            tracing::warn!(
                path = %entry.path().display(),
                "skipping path escaping the repository root"
            );
            continue;
        }

        let path_str = resolved.to_string_lossy().to_string();
        if patterns.blacklisted(&path_str) || !patterns.whitelisted(&path_str) {
            continue;
        }

        let content = match fs::read_to_string(&resolved) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path_str, "skipping unreadable file: {e}");
                continue;
            }
        };

        let relative = resolved
            .strip_prefix(&root)
            .unwrap_or(&resolved)
            .to_string_lossy()
            .to_string();
        files.push(FileData {
            file_name: resolved
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: path_str,
            relative_path: relative,
            file_content: content,
            file_ast: None,
        });
    }

    files.push(FileData::repo_global_check());
    Ok(files)
}
