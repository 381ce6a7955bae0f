use std::collections::HashMap;

use serde_json::Value;

use crate::api::types::{ConditionLeaf, ConditionNode, ConditionSet, EvalError};
use crate::core::almanac::Almanac;
use crate::core::operators::OperatorFn;

/// Evaluation options mirrored from the engine host.
pub struct EvalContext<'a> {
    pub operators: &'a HashMap<String, OperatorFn>,
    /// When true, an absent fact resolves to JSON null instead of failing.
    pub allow_undefined_facts: bool,
}

/// Evaluate a nested all/any condition tree.
///
/// Errors propagate immediately; short-circuiting applies only to boolean
/// outcomes.
pub fn evaluate_set(
    set: &ConditionSet,
    almanac: &mut Almanac<'_>,
    cx: &EvalContext<'_>,
) -> Result<bool, EvalError> {
    match set {
        ConditionSet::All(members) => {
            for member in members {
                if !evaluate_node(member, almanac, cx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ConditionSet::Any(members) => {
            for member in members {
                if evaluate_node(member, almanac, cx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn evaluate_node(
    node: &ConditionNode,
    almanac: &mut Almanac<'_>,
    cx: &EvalContext<'_>,
) -> Result<bool, EvalError> {
    match node {
        ConditionNode::Nested(set) => evaluate_set(set, almanac, cx),
        ConditionNode::Leaf(leaf) => evaluate_leaf(leaf, almanac, cx),
    }
}

fn evaluate_leaf(
    leaf: &ConditionLeaf,
    almanac: &mut Almanac<'_>,
    cx: &EvalContext<'_>,
) -> Result<bool, EvalError> {
    let fact_value = resolve_fact(&leaf.fact, leaf.params.as_ref(), almanac, cx)?;
    let fact_value = match &leaf.path {
        Some(path) => apply_path(&fact_value, path),
        None => fact_value,
    };

    let comparand = resolve_comparand(&leaf.value, almanac, cx)?;

    let operator = cx
        .operators
        .get(&leaf.operator)
        .ok_or_else(|| EvalError::operator(&leaf.operator, "operator is not registered"))?;

    operator(&fact_value, &comparand).map_err(|message| EvalError::operator(&leaf.operator, message))
}

fn resolve_fact(
    name: &str,
    params: Option<&Value>,
    almanac: &mut Almanac<'_>,
    cx: &EvalContext<'_>,
) -> Result<Value, EvalError> {
    match almanac.resolve(name, params)? {
        Some(value) => Ok(value),
        None if cx.allow_undefined_facts => Ok(Value::Null),
        None => Err(EvalError::fact(name, "fact is not registered")),
    }
}

/// A comparand of the shape `{"fact": "name"}` references another fact.
fn resolve_comparand(
    value: &Value,
    almanac: &mut Almanac<'_>,
    cx: &EvalContext<'_>,
) -> Result<Value, EvalError> {
    if let Value::Object(map) = value {
        if map.len() == 1 {
            if let Some(Value::String(name)) = map.get("fact") {
                return resolve_fact(name, None, almanac, cx);
            }
        }
    }
    Ok(value.clone())
}

/// Apply a `$.a.b[0].c` style path to a value. Missing segments resolve
/// to null, matching undefined-tolerant fact access. The pseudo-key
/// `length` yields the element count of an array or string.
pub fn apply_path(value: &Value, path: &str) -> Value {
    let mut current = value;
    for segment in parse_path(path) {
        current = match segment {
            PathSegment::Key(key) => match current.get(key) {
                Some(next) => next,
                None if key == "length" => {
                    return match current {
                        Value::Array(items) => Value::from(items.len()),
                        Value::String(s) => Value::from(s.chars().count()),
                        _ => Value::Null,
                    };
                }
                None => return Value::Null,
            },
            PathSegment::Index(idx) => match current.get(idx) {
                Some(next) => next,
                None => return Value::Null,
            },
        };
    }
    current.clone()
}

enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

fn parse_path(path: &str) -> Vec<PathSegment<'_>> {
    let trimmed = path.strip_prefix("$.").or_else(|| path.strip_prefix('$')).unwrap_or(path);
    let mut segments = Vec::new();
    for part in trimmed.split('.').filter(|p| !p.is_empty()) {
        let mut rest = part;
        while let Some(open) = rest.find('[') {
            let key = &rest[..open];
            if !key.is_empty() {
                segments.push(PathSegment::Key(key));
            }
            match rest[open + 1..].find(']') {
                Some(close) => {
                    let idx_str = &rest[open + 1..open + 1 + close];
                    if let Ok(idx) = idx_str.parse::<usize>() {
                        segments.push(PathSegment::Index(idx));
                    }
                    rest = &rest[open + 1 + close + 1..];
                }
                None => {
                    rest = "";
                }
            }
        }
        if !rest.is_empty() {
            segments.push(PathSegment::Key(rest));
        }
    }
    segments
}
