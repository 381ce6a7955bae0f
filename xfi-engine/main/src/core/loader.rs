use std::fs;
use std::path::Path;

use crate::api::types::{EngineError, RuleSpec};
use crate::core::almanac::FactDef;
use crate::core::config::ResolvedConfig;
use crate::core::facts::{self, openai};
use crate::core::operators::{builtin_operators, OperatorDef};
use crate::core::remote::RemoteClient;

/// Compile-time rule table, mirroring `{ruleName}-rule.json` files.
pub const BUILTIN_RULES: &[(&str, &str)] = &[
    ("functionComplexity-iterative", include_str!("../../../config/rules/functionComplexity-iterative-rule.json")),
    ("functionCount-iterative", include_str!("../../../config/rules/functionCount-iterative-rule.json")),
    ("codeRhythm-iterative", include_str!("../../../config/rules/codeRhythm-iterative-rule.json")),
    ("invalidSystemIdConfigured-iterative", include_str!("../../../config/rules/invalidSystemIdConfigured-iterative-rule.json")),
    ("sensitiveLogging-iterative", include_str!("../../../config/rules/sensitiveLogging-iterative-rule.json")),
    ("noDatabases-iterative", include_str!("../../../config/rules/noDatabases-iterative-rule.json")),
    ("outdatedFramework-global", include_str!("../../../config/rules/outdatedFramework-global-rule.json")),
    ("nonStandardDirectoryStructure-global", include_str!("../../../config/rules/nonStandardDirectoryStructure-global-rule.json")),
    ("openaiAnalysisTop5-global", include_str!("../../../config/rules/openaiAnalysisTop5-global-rule.json")),
];

/// The registrable extension set for one analysis.
pub struct LoadedExtensions {
    /// Rules in registration order: archetype rules first, then
    /// repo-contributed rules that did not collide.
    pub rules: Vec<RuleSpec>,
    pub facts: Vec<FactDef>,
    pub operators: Vec<OperatorDef>,
}

/// Resolve every declared rule, fact, and operator name.
///
/// Unknown names are logged and skipped unless the archetype declares
/// `strict`, in which case they abort with [`EngineError::LoaderMissing`].
/// `openai`-prefixed items load only when the ambient key and the
/// archetype flag both allow it; otherwise they are silently skipped.
pub fn load_extensions(
    resolved: &ResolvedConfig,
    remote: Option<&RemoteClient>,
    local_config: Option<&Path>,
) -> Result<LoadedExtensions, EngineError> {
    let archetype = &resolved.archetype;
    let openai_ok = openai::openai_enabled(archetype.config.openai_enabled);

    let mut rules: Vec<RuleSpec> = Vec::new();
    for name in &archetype.rules {
        if openai::is_openai_item(name) && !openai_ok {
            tracing::debug!(rule = %name, "openai-gated rule skipped");
            continue;
        }
        match resolve_rule(name, remote, local_config) {
            Some(rule) => rules.push(rule),
            None => {
                if archetype.strict {
                    return Err(EngineError::LoaderMissing(format!("rule '{}'", name)));
                }
                tracing::warn!(rule = %name, "rule not found on any search path, skipped");
            }
        }
    }

    // Repo-contributed rules register after the archetype's; an archetype
    // duplicate wins and the repo copy is skipped.
    for rule in &resolved.repo_config.additional_rules {
        if openai::is_openai_item(&rule.name) && !openai_ok {
            tracing::debug!(rule = %rule.name, "openai-gated repo rule skipped");
            continue;
        }
        if rules.iter().any(|existing| existing.name == rule.name) {
            tracing::warn!(rule = %rule.name, "repo rule duplicates archetype rule, skipped");
            continue;
        }
        rules.push(rule.clone());
    }

    let fact_names: Vec<&String> = archetype
        .facts
        .iter()
        .chain(resolved.repo_config.additional_facts.iter())
        .collect();
    let mut loaded_facts: Vec<FactDef> = Vec::new();
    let catalog = facts::builtin_facts();
    for name in fact_names {
        if openai::is_openai_item(name) && !openai_ok {
            tracing::debug!(fact = %name, "openai-gated fact skipped");
            continue;
        }
        if loaded_facts.iter().any(|f| &f.name == name) {
            continue;
        }
        match catalog.iter().find(|f| &f.name == name) {
            Some(def) => loaded_facts.push(def.clone()),
            None => {
                if archetype.strict {
                    return Err(EngineError::LoaderMissing(format!("fact '{}'", name)));
                }
                tracing::warn!(fact = %name, "unknown fact name, skipped");
            }
        }
    }

    let operator_names: Vec<&String> = archetype
        .operators
        .iter()
        .chain(resolved.repo_config.additional_operators.iter())
        .collect();
    let mut loaded_operators: Vec<OperatorDef> = Vec::new();
    let available = builtin_operators();
    for name in operator_names {
        if openai::is_openai_item(name) && !openai_ok {
            tracing::debug!(operator = %name, "openai-gated operator skipped");
            continue;
        }
        if loaded_operators.iter().any(|o| &o.name == name) {
            continue;
        }
        match available.iter().find(|o| &o.name == name) {
            Some(def) => loaded_operators.push(def.clone()),
            None => {
                if archetype.strict {
                    return Err(EngineError::LoaderMissing(format!("operator '{}'", name)));
                }
                tracing::warn!(operator = %name, "unknown operator name, skipped");
            }
        }
    }

    // No dynamic plugin loader is compiled in; declared plugins beyond
    // the builtin fact/operator registries are reported and skipped.
    for plugin in &resolved.repo_config.additional_plugins {
        tracing::warn!(plugin = %plugin, "dynamic plugin loading is disabled, skipped");
    }

    Ok(LoadedExtensions { rules, facts: loaded_facts, operators: loaded_operators })
}

/// Resolve one rule by name: remote first (when configured), then the
/// local `rules/` search path, then the compile-time table.
fn resolve_rule(name: &str, remote: Option<&RemoteClient>, local_config: Option<&Path>) -> Option<RuleSpec> {
    if let Some(client) = remote {
        match client.fetch_rule(name) {
            Ok(rule) => return Some(rule),
            Err(e) => {
                tracing::warn!(rule = %name, "remote rule fetch failed, falling back to local: {e}");
            }
        }
    }

    if let Some(dir) = local_config {
        let file_name = format!("{}-rule.json", name);
        for candidate in [dir.join("rules").join(&file_name), dir.join(&file_name)] {
            if let Ok(raw) = fs::read_to_string(&candidate) {
                match serde_json::from_str::<RuleSpec>(&raw) {
                    Ok(rule) => return Some(rule),
                    Err(e) => {
                        tracing::warn!(path = %candidate.display(), "malformed rule file: {e}");
                    }
                }
            }
        }
    }

    BUILTIN_RULES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .and_then(|(_, raw)| match serde_json::from_str::<RuleSpec>(raw) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::error!(rule = %name, "builtin rule is malformed: {e}");
                None
            }
        })
}
