use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::api::types::{EvalError, FactMetric};

/// A named fact producer. Receives the leaf's `params` (JSON null when
/// absent) and the almanac, so producers can read other facts lazily.
pub type FactFn = Arc<dyn Fn(&Value, &mut Almanac) -> Result<Value, EvalError> + Send + Sync>;

/// A registered fact.
#[derive(Clone)]
pub struct FactDef {
    pub name: String,
    /// Higher priority resolves first when facts are preloaded.
    pub priority: i64,
    pub producer: FactFn,
}

impl FactDef {
    pub fn new(name: &str, priority: i64, producer: FactFn) -> Self {
        FactDef { name: name.to_string(), priority, producer }
    }
}

/// Immutable catalog of fact producers, built once per analysis.
#[derive(Clone, Default)]
pub struct FactCatalog {
    facts: Vec<FactDef>,
    by_name: HashMap<String, usize>,
}

impl FactCatalog {
    pub fn new() -> Self {
        FactCatalog::default()
    }

    /// Register a producer. Re-registering a name replaces the producer
    /// but keeps the original registration slot.
    pub fn register(&mut self, def: FactDef) {
        match self.by_name.get(&def.name) {
            Some(&idx) => self.facts[idx] = def,
            None => {
                self.by_name.insert(def.name.clone(), self.facts.len());
                self.facts.push(def);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FactDef> {
        self.by_name.get(name).map(|&idx| &self.facts[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered fact names in priority order (higher first, ties by
    /// registration order).
    pub fn names_by_priority(&self) -> Vec<&str> {
        let mut indices: Vec<usize> = (0..self.facts.len()).collect();
        indices.sort_by_key(|&idx| (-self.facts[idx].priority, idx));
        indices.iter().map(|&idx| self.facts[idx].name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Per-file memoized store of resolved fact values.
///
/// Owned by a single evaluator run; never shared across files.
pub struct Almanac<'a> {
    catalog: &'a FactCatalog,
    runtime: HashMap<String, Value>,
    memo: HashMap<String, Value>,
    metrics: BTreeMap<String, FactMetric>,
}

impl<'a> Almanac<'a> {
    pub fn new(catalog: &'a FactCatalog) -> Self {
        Almanac {
            catalog,
            runtime: HashMap::new(),
            memo: HashMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Install a pre-resolved value (e.g. `fileData`) for this run.
    pub fn add_runtime_fact(&mut self, name: &str, value: Value) {
        self.runtime.insert(name.to_string(), value);
    }

    /// Synchronous lookup of an already-resolved value.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.runtime.get(name).or_else(|| self.memo.get(name))
    }

    /// Resolve a fact through its producer, memoizing per `(name, params)`.
    ///
    /// Returns `Ok(None)` when no runtime value and no producer exist;
    /// the caller decides whether that is undefined-tolerant or an error.
    pub fn resolve(&mut self, name: &str, params: Option<&Value>) -> Result<Option<Value>, EvalError> {
        if let Some(value) = self.runtime.get(name) {
            return Ok(Some(value.clone()));
        }

        let key = memo_key(name, params);
        if let Some(value) = self.memo.get(&key) {
            return Ok(Some(value.clone()));
        }

        let producer = match self.catalog.get(name) {
            Some(def) => def.producer.clone(),
            None => return Ok(None),
        };

        let params_value = params.cloned().unwrap_or(Value::Null);
        let started = Instant::now();
        let result = producer(&params_value, self);
        let elapsed = started.elapsed().as_millis() as u64;

        let metric = self.metrics.entry(name.to_string()).or_default();
        metric.evaluations += 1;
        metric.total_millis += elapsed;

        let value = result?;
        self.memo.insert(key, value.clone());
        // Parameterless resolution is also visible via get_value.
        self.memo.entry(name.to_string()).or_insert_with(|| value.clone());
        Ok(Some(value))
    }

    /// Drain the evaluation counters collected by this run.
    pub fn into_metrics(self) -> BTreeMap<String, FactMetric> {
        self.metrics
    }
}

fn memo_key(name: &str, params: Option<&Value>) -> String {
    match params {
        Some(p) if !p.is_null() => format!("{}::{}", name, p),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fact(counter: Arc<AtomicUsize>) -> FactFn {
        Arc::new(move |params, _almanac| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"echo": params.clone()}))
        })
    }

    #[test]
    fn test_runtime_fact_wins_over_producer() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut catalog = FactCatalog::new();
        catalog.register(FactDef::new("fileData", 1, counting_fact(counter.clone())));

        let mut almanac = Almanac::new(&catalog);
        almanac.add_runtime_fact("fileData", json!({"fileName": "a.js"}));

        let value = almanac.resolve("fileData", None).unwrap().unwrap();
        assert_eq!(value["fileName"], "a.js");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolution_is_memoized_per_params() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut catalog = FactCatalog::new();
        catalog.register(FactDef::new("scan", 1, counting_fact(counter.clone())));

        let mut almanac = Almanac::new(&catalog);
        almanac.resolve("scan", Some(&json!({"p": 1}))).unwrap();
        almanac.resolve("scan", Some(&json!({"p": 1}))).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        almanac.resolve("scan", Some(&json!({"p": 2}))).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_fact_resolves_to_none() {
        let catalog = FactCatalog::new();
        let mut almanac = Almanac::new(&catalog);
        assert!(almanac.resolve("nope", None).unwrap().is_none());
    }

    #[test]
    fn test_producer_can_read_other_facts() {
        let mut catalog = FactCatalog::new();
        catalog.register(FactDef::new(
            "derived",
            1,
            Arc::new(|_params, almanac| {
                let base = almanac
                    .get_value("base")
                    .cloned()
                    .unwrap_or(Value::Null);
                Ok(json!({"base": base}))
            }),
        ));

        let mut almanac = Almanac::new(&catalog);
        almanac.add_runtime_fact("base", json!(41));
        let value = almanac.resolve("derived", None).unwrap().unwrap();
        assert_eq!(value["base"], 41);
    }

    #[test]
    fn test_metrics_count_producer_invocations() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut catalog = FactCatalog::new();
        catalog.register(FactDef::new("scan", 1, counting_fact(counter)));

        let mut almanac = Almanac::new(&catalog);
        almanac.resolve("scan", None).unwrap();
        almanac.resolve("scan", None).unwrap();

        let metrics = almanac.into_metrics();
        assert_eq!(metrics["scan"].evaluations, 1);
    }

    #[test]
    fn test_priority_ordering_higher_first() {
        let noop: FactFn = Arc::new(|_p, _a| Ok(Value::Null));
        let mut catalog = FactCatalog::new();
        catalog.register(FactDef::new("low", 1, noop.clone()));
        catalog.register(FactDef::new("high", 10, noop.clone()));
        catalog.register(FactDef::new("mid", 5, noop));

        assert_eq!(catalog.names_by_priority(), vec!["high", "mid", "low"]);
    }
}
