use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::api::types::{EvalError, FactMetric, IssueLevel, RuleSpec};
use crate::core::almanac::{Almanac, FactCatalog, FactDef};
use crate::core::conditions::{evaluate_set, EvalContext};
use crate::core::operators::{OperatorDef, OperatorFn};

/// Evaluator behavior switches.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// An absent fact resolves to JSON null instead of aborting the run.
    pub allow_undefined_facts: bool,
    /// `{"fact": "name"}` placeholders inside event params are replaced
    /// with resolved values at emit time.
    pub replace_facts_in_event_params: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            allow_undefined_facts: true,
            replace_facts_in_event_params: true,
        }
    }
}

/// Outcome of evaluating one rule against one file.
#[derive(Debug, Clone)]
pub enum RuleOutcome {
    /// Conditions held; the event fired.
    Fired {
        name: String,
        level: IssueLevel,
        params: Value,
    },
    /// Conditions evaluated cleanly to false.
    NotFired { name: String },
    /// Evaluation failed; carries the rule for error classification.
    Errored { rule: RuleSpec, error: EvalError },
}

/// One evaluator run over a single fact-value map.
#[derive(Debug)]
pub struct EngineRun {
    pub outcomes: Vec<RuleOutcome>,
    pub fact_metrics: BTreeMap<String, FactMetric>,
}

/// Hook invoked for every fired rule (telemetry, severity tagging).
pub type SuccessHook = Arc<dyn Fn(&str, IssueLevel, &Value) + Send + Sync>;

/// The rules evaluator host: registered operators, facts, and rules,
/// immutable during an analysis run.
#[derive(Default)]
pub struct RulesEngine {
    rules: Vec<RuleSpec>,
    operators: HashMap<String, OperatorFn>,
    facts: FactCatalog,
    options: EngineOptions,
    success_hooks: Vec<SuccessHook>,
}

impl RulesEngine {
    pub fn new(options: EngineOptions) -> Self {
        RulesEngine {
            rules: Vec::new(),
            operators: HashMap::new(),
            facts: FactCatalog::new(),
            options,
            success_hooks: Vec::new(),
        }
    }

    pub fn add_operator(&mut self, def: OperatorDef) {
        self.operators.insert(def.name.clone(), def.func);
    }

    pub fn add_fact(&mut self, def: FactDef) {
        self.facts.register(def);
    }

    /// Register a rule. A duplicate name is skipped with a warning; the
    /// first registration wins, which keeps registration order observable.
    pub fn add_rule(&mut self, rule: RuleSpec) {
        if self.rules.iter().any(|r| r.name == rule.name) {
            tracing::warn!(rule = %rule.name, "duplicate rule registration skipped");
            return;
        }
        self.rules.push(rule);
    }

    /// Subscribe to fired-rule events.
    pub fn on_success(&mut self, hook: SuccessHook) {
        self.success_hooks.push(hook);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    pub fn has_operator(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    pub fn has_fact(&self, name: &str) -> bool {
        self.facts.contains(name)
    }

    /// Run every registered rule against one fact-value map.
    ///
    /// Rules run in priority order (higher first, ties by registration
    /// order). Errors never abort the run; each failing rule yields an
    /// [`RuleOutcome::Errored`] and evaluation continues.
    pub fn run(&self, runtime_facts: &[(String, Value)]) -> EngineRun {
        let mut almanac = Almanac::new(&self.facts);
        for (name, value) in runtime_facts {
            almanac.add_runtime_fact(name, value.clone());
        }

        let mut order: Vec<usize> = (0..self.rules.len()).collect();
        order.sort_by_key(|&idx| (-self.rules[idx].priority, idx));

        let cx = EvalContext {
            operators: &self.operators,
            allow_undefined_facts: self.options.allow_undefined_facts,
        };

        let mut outcomes = Vec::with_capacity(self.rules.len());
        for idx in order {
            let rule = &self.rules[idx];
            match evaluate_set(&rule.conditions, &mut almanac, &cx) {
                Ok(true) => {
                    let params = if self.options.replace_facts_in_event_params {
                        substitute_fact_refs(&rule.event.params, &mut almanac)
                    } else {
                        rule.event.params.clone()
                    };
                    for hook in &self.success_hooks {
                        hook(&rule.name, rule.event.event_type, &params);
                    }
                    outcomes.push(RuleOutcome::Fired {
                        name: rule.name.clone(),
                        level: rule.event.event_type,
                        params,
                    });
                }
                Ok(false) => outcomes.push(RuleOutcome::NotFired { name: rule.name.clone() }),
                Err(mut error) => {
                    if error.rule_name.is_none() {
                        error.rule_name = Some(rule.name.clone());
                    }
                    outcomes.push(RuleOutcome::Errored { rule: rule.clone(), error });
                }
            }
        }

        EngineRun { outcomes, fact_metrics: almanac.into_metrics() }
    }
}

/// Replace `{"fact": "name"}` placeholders with resolved fact values.
/// Unresolvable references become null.
fn substitute_fact_refs(value: &Value, almanac: &mut Almanac<'_>) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(name)) = map.get("fact") {
                    return match almanac.resolve(name, None) {
                        Ok(Some(resolved)) => resolved,
                        _ => Value::Null,
                    };
                }
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), substitute_fact_refs(v, almanac)))
                    .collect(),
            )
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute_fact_refs(v, almanac)).collect())
        }
        other => other.clone(),
    }
}
