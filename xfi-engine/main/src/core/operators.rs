use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

/// A named binary predicate over `(factValue, comparand)`.
///
/// Errors are plain strings; the condition evaluator tags them with the
/// operator marker before classification.
pub type OperatorFn = Arc<dyn Fn(&Value, &Value) -> Result<bool, String> + Send + Sync>;

/// A registered operator.
#[derive(Clone)]
pub struct OperatorDef {
    pub name: String,
    pub func: OperatorFn,
}

impl OperatorDef {
    pub fn new(name: &str, func: OperatorFn) -> Self {
        OperatorDef { name: name.to_string(), func }
    }
}

fn numeric(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| "non-finite number".to_string()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not numeric", s)),
        other => Err(format!("expected a number, got {}", type_name(other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn compare(fact: &Value, comparand: &Value) -> Result<Ordering, String> {
    let lhs = numeric(fact)?;
    let rhs = numeric(comparand)?;
    lhs.partial_cmp(&rhs).ok_or_else(|| "values are not comparable".to_string())
}

fn loose_equal(fact: &Value, comparand: &Value) -> bool {
    if fact == comparand {
        return true;
    }
    // Tolerate number-vs-numeric-string payloads from rule JSON.
    if let (Ok(lhs), Ok(rhs)) = (numeric(fact), numeric(comparand)) {
        return lhs == rhs;
    }
    false
}

fn membership(needle: &Value, haystack: &Value) -> Result<bool, String> {
    match haystack {
        Value::Array(items) => Ok(items.iter().any(|item| loose_equal(item, needle))),
        Value::String(s) => match needle {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            other => Err(format!("cannot search a string for {}", type_name(other))),
        },
        other => Err(format!("cannot test membership in {}", type_name(other))),
    }
}

/// Count of entries in a `matches` array, tolerating both a bare array
/// and an object carrying one.
fn match_count(fact: &Value) -> usize {
    match fact {
        Value::Array(items) => items.len(),
        Value::Object(map) => map
            .get("matches")
            .and_then(Value::as_array)
            .map(|m| m.len())
            .unwrap_or(0),
        _ => 0,
    }
}

/// The static operator catalog: comparison operators plus the domain
/// predicates rule authors reference by name.
pub fn builtin_operators() -> Vec<OperatorDef> {
    let mut operators: Vec<OperatorDef> = Vec::new();

    operators.push(OperatorDef::new("equal", Arc::new(|f, c| Ok(loose_equal(f, c)))));
    operators.push(OperatorDef::new("notEqual", Arc::new(|f, c| Ok(!loose_equal(f, c)))));
    operators.push(OperatorDef::new(
        "lessThan",
        Arc::new(|f, c| Ok(compare(f, c)? == Ordering::Less)),
    ));
    operators.push(OperatorDef::new(
        "lessThanInclusive",
        Arc::new(|f, c| Ok(compare(f, c)? != Ordering::Greater)),
    ));
    operators.push(OperatorDef::new(
        "greaterThan",
        Arc::new(|f, c| Ok(compare(f, c)? == Ordering::Greater)),
    ));
    operators.push(OperatorDef::new(
        "greaterThanInclusive",
        Arc::new(|f, c| Ok(compare(f, c)? != Ordering::Less)),
    ));
    operators.push(OperatorDef::new("in", Arc::new(|f, c| membership(f, c))));
    operators.push(OperatorDef::new("notIn", Arc::new(|f, c| Ok(!membership(f, c)?))));
    operators.push(OperatorDef::new("contains", Arc::new(|f, c| membership(c, f))));
    operators.push(OperatorDef::new(
        "doesNotContain",
        Arc::new(|f, c| Ok(!membership(c, f)?)),
    ));
    operators.push(OperatorDef::new(
        "regexMatch",
        Arc::new(|f, c| {
            let pattern = c
                .as_str()
                .ok_or_else(|| "comparand must be a regex string".to_string())?;
            let re = Regex::new(pattern).map_err(|e| format!("invalid regex '{}': {}", pattern, e))?;
            let subject = match f {
                Value::String(s) => s.clone(),
                Value::Null => return Ok(false),
                other => other.to_string(),
            };
            Ok(re.is_match(&subject))
        }),
    ));

    // Domain predicates.
    operators.push(OperatorDef::new(
        "hasMatches",
        Arc::new(|f, c| {
            let expected = c.as_bool().unwrap_or(true);
            Ok((match_count(f) > 0) == expected)
        }),
    ));
    operators.push(OperatorDef::new(
        "outdatedFramework",
        Arc::new(|f, c| {
            let expected = c.as_bool().unwrap_or(true);
            let outdated = match f {
                Value::Object(map) => map
                    .get("details")
                    .and_then(Value::as_array)
                    .map(|d| !d.is_empty())
                    .unwrap_or(false),
                Value::Array(items) => !items.is_empty(),
                Value::Null => false,
                other => return Err(format!("expected dependency analysis, got {}", type_name(other))),
            };
            Ok(outdated == expected)
        }),
    ));
    operators.push(OperatorDef::new(
        "nonStandardDirectoryStructure",
        Arc::new(|f, c| {
            let present: Vec<&str> = match f {
                Value::Object(map) => map
                    .get("directories")
                    .and_then(Value::as_array)
                    .map(|d| d.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default(),
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            let expected = match c {
                Value::Object(map) => map.keys().map(String::as_str).collect::<Vec<_>>(),
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                Value::Null => return Ok(false),
                other => return Err(format!("expected structure tree, got {}", type_name(other))),
            };
            Ok(expected.iter().any(|dir| !present.contains(dir)))
        }),
    ));
    operators.push(OperatorDef::new(
        "missingRequiredFiles",
        Arc::new(|f, c| {
            let files: Vec<&str> = match f {
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            let required = c
                .as_array()
                .ok_or_else(|| "comparand must be an array of path regexes".to_string())?;
            for pattern in required.iter().filter_map(Value::as_str) {
                let re = Regex::new(pattern)
                    .map_err(|e| format!("invalid regex '{}': {}", pattern, e))?;
                if !files.iter().any(|file| re.is_match(file)) {
                    return Ok(true);
                }
            }
            Ok(false)
        }),
    ));

    operators
}

/// Build the lookup map used by the evaluator.
pub fn operator_map(defs: &[OperatorDef]) -> HashMap<String, OperatorFn> {
    defs.iter().map(|def| (def.name.clone(), def.func.clone())).collect()
}
