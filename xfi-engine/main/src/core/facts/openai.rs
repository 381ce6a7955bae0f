use std::sync::Arc;

use serde_json::json;

use crate::api::types::EvalError;
use crate::core::almanac::FactDef;

/// `openaiAnalysis`: the LLM-backed fact.
///
/// The loader only registers this when `OPENAI_API_KEY` is present and
/// the archetype enables it; the adapter itself lives outside the
/// engine, so the producer returns an empty result set. If the key
/// disappears between load and evaluation the producer surfaces a
/// plugin error.
pub fn openai_analysis() -> FactDef {
    FactDef::new(
        "openaiAnalysis",
        1,
        Arc::new(|_params, _almanac| {
            if std::env::var("OPENAI_API_KEY").unwrap_or_default().is_empty() {
                return Err(EvalError::plugin(
                    "openaiAnalysis",
                    "OPENAI_API_KEY is no longer set",
                    None,
                ));
            }
            tracing::debug!("openaiAnalysis invoked; external adapter not wired, returning empty result");
            Ok(json!({"result": []}))
        }),
    )
}

/// Reserved prefix gating LLM-backed facts and rules.
pub const OPENAI_PREFIX: &str = "openai";

/// Whether an `openai`-prefixed item may be loaded.
pub fn openai_enabled(config_flag: bool) -> bool {
    config_flag && !std::env::var("OPENAI_API_KEY").unwrap_or_default().is_empty()
}

/// Whether the name is subject to the openai gate at all.
pub fn is_openai_item(name: &str) -> bool {
    name.starts_with(OPENAI_PREFIX)
}
