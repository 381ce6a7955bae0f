use serde_json::Value;

use crate::api::types::{Confidence, LocationRange};

/// Rules whose failures describe the whole file rather than a range.
/// `functionComplexity-iterative` belongs here only when its payload
/// carries no usable complexity location.
const FILE_LEVEL_RULES: &[&str] = &[
    "functionCount-iterative",
    "codeRhythm-iterative",
    "functionComplexity-iterative",
    "outdatedFramework-global",
    "invalidSystemIdConfigured-iterative",
];

const COMPLEXITY_RULE: &str = "functionComplexity-iterative";

/// Minimum visible highlight weight: `Δline·1000 + Δcol` must exceed
/// this for complexity ranges so editors can render them.
const MIN_COMPLEXITY_WEIGHT: i64 = 1000;

const DEFAULT_WIDTH: u32 = 20;

/// Map a failure's heterogeneous details payload to a canonical range.
///
/// Extractors run in priority order; the first that finds a location
/// wins. The result is always validated: 1-based coordinates,
/// `startLine <= endLine`, and a non-empty span on single-line ranges.
pub fn extract_location(rule_name: &str, payload: &Value) -> LocationRange {
    if FILE_LEVEL_RULES.contains(&rule_name) {
        if rule_name == COMPLEXITY_RULE {
            if let Some(range) = from_complexity(payload, rule_name) {
                return validate(range);
            }
        }
        return validate(file_level_range());
    }

    let extractors: &[fn(&Value) -> Option<LocationRange>] = &[
        from_dependency_manifest,
        from_location_object,
        from_ast_node,
        from_details_array,
        from_matches_array,
        from_range_object,
        from_details_line_number,
        from_legacy,
    ];

    if let Some(range) = from_complexity(payload, rule_name) {
        return validate(range);
    }
    for extractor in extractors {
        if let Some(range) = extractor(payload) {
            return validate(range);
        }
    }

    validate(fallback_range())
}

fn file_level_range() -> LocationRange {
    LocationRange {
        start_line: 1,
        start_column: 1,
        end_line: 1,
        end_column: DEFAULT_WIDTH,
        source: "file-level-rule".to_string(),
        confidence: Confidence::Medium,
        found: true,
    }
}

fn fallback_range() -> LocationRange {
    LocationRange {
        start_line: 1,
        start_column: 1,
        end_line: 1,
        end_column: DEFAULT_WIDTH,
        source: "fallback".to_string(),
        confidence: Confidence::Low,
        found: false,
    }
}

/// Coerce a JSON number or numeric string to u32.
fn coerce(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_i64().filter(|v| *v >= 0).map(|v| v as u32),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn coerce_field(value: &Value, field: &str) -> Option<u32> {
    value.get(field).and_then(coerce)
}

/// `details.complexities[0].metrics.location`, possibly nested one level
/// deeper under `details.details`.
fn from_complexity(payload: &Value, rule_name: &str) -> Option<LocationRange> {
    let complexities = payload
        .get("details")
        .and_then(|d| d.get("complexities"))
        .or_else(|| payload.get("complexities"))?
        .as_array()?;
    let location = complexities.first()?.get("metrics")?.get("location")?;

    let start_line = coerce_field(location, "startLine")?;
    let start_column = coerce_field(location, "startColumn").unwrap_or(1);
    let end_line = coerce_field(location, "endLine").unwrap_or(start_line);
    let end_column = coerce_field(location, "endColumn").unwrap_or(start_column);

    let mut range = LocationRange {
        start_line,
        start_column,
        end_line,
        end_column,
        source: "complexity-metrics".to_string(),
        confidence: Confidence::High,
        found: true,
    };

    if rule_name == COMPLEXITY_RULE {
        expand_to_visible_weight(&mut range);
    }
    Some(range)
}

/// Widen narrow complexity ranges so the highlight weight exceeds the
/// editor-visible minimum; wide ranges are never shrunk.
fn expand_to_visible_weight(range: &mut LocationRange) {
    let weight = i64::from(range.end_line.saturating_sub(range.start_line)) * 1000
        + i64::from(range.end_column) - i64::from(range.start_column);
    if weight <= MIN_COMPLEXITY_WEIGHT {
        let needed = (MIN_COMPLEXITY_WEIGHT + 1 - weight.max(0)) as u32;
        range.end_column = range.end_column.saturating_add(needed);
    }
}

/// `details[*].location{lineNumber, columnNumber, endLineNumber?,
/// endColumnNumber?}`, with `details` either the payload's array or one
/// level deeper under `details.details`.
fn from_dependency_manifest(payload: &Value) -> Option<LocationRange> {
    let entries = payload
        .get("details")
        .and_then(|d| d.get("details"))
        .or_else(|| payload.get("details"))?
        .as_array()?;
    let location = entries.iter().find_map(|entry| entry.get("location"))?;

    let line = coerce_field(location, "lineNumber")?;
    let column = coerce_field(location, "columnNumber").unwrap_or(1);
    Some(LocationRange {
        start_line: line,
        start_column: column,
        end_line: coerce_field(location, "endLineNumber").unwrap_or(line),
        end_column: coerce_field(location, "endColumnNumber").unwrap_or(column + DEFAULT_WIDTH),
        source: "dependency-manifest-location".to_string(),
        confidence: Confidence::High,
        found: true,
    })
}

/// `details.location` or `error.location` carrying `startLine`.
fn from_location_object(payload: &Value) -> Option<LocationRange> {
    let location = payload
        .get("location")
        .or_else(|| payload.get("error").and_then(|e| e.get("location")))?;
    let start_line = coerce_field(location, "startLine")?;
    let start_column = coerce_field(location, "startColumn").unwrap_or(1);
    Some(LocationRange {
        start_line,
        start_column,
        end_line: coerce_field(location, "endLine").unwrap_or(start_line),
        end_column: coerce_field(location, "endColumn").unwrap_or(start_column + DEFAULT_WIDTH),
        source: "location-object".to_string(),
        confidence: Confidence::High,
        found: true,
    })
}

/// `details.node` or `error.node` with `startLine/startColumn` or
/// `line/column` coordinates.
fn from_ast_node(payload: &Value) -> Option<LocationRange> {
    let node = payload
        .get("node")
        .or_else(|| payload.get("error").and_then(|e| e.get("node")))?;

    let (start_line, start_column) = match coerce_field(node, "startLine") {
        Some(line) => (line, coerce_field(node, "startColumn").unwrap_or(1)),
        None => (
            coerce_field(node, "line")?,
            coerce_field(node, "column").unwrap_or(1),
        ),
    };
    Some(LocationRange {
        start_line,
        start_column,
        end_line: coerce_field(node, "endLine").unwrap_or(start_line),
        end_column: coerce_field(node, "endColumn").unwrap_or(start_column + 10),
        source: "ast-node".to_string(),
        confidence: Confidence::High,
        found: true,
    })
}

/// `details[0].lineNumber`. The width is a fixed 10 characters; the
/// entry's pattern is a regex whose length says nothing about the match.
fn from_details_array(payload: &Value) -> Option<LocationRange> {
    let entries = payload.get("details")?.as_array()?;
    let first = entries.first()?;
    let line = coerce_field(first, "lineNumber")?;
    let column = coerce_field(first, "columnNumber").unwrap_or(1);
    Some(LocationRange {
        start_line: line,
        start_column: column,
        end_line: line,
        end_column: column + 10,
        source: "details-array".to_string(),
        confidence: Confidence::Medium,
        found: true,
    })
}

/// `details.matches[0]` or `matches[0]`; width from the matched text.
fn from_matches_array(payload: &Value) -> Option<LocationRange> {
    let matches = payload
        .get("details")
        .and_then(|d| d.get("matches"))
        .or_else(|| payload.get("matches"))?
        .as_array()?;
    let first = matches.first()?;
    let line = coerce_field(first, "lineNumber")?;
    let column = coerce_field(first, "columnNumber").unwrap_or(1);
    let width = first
        .get("match")
        .and_then(Value::as_str)
        .map(|m| m.chars().count() as u32)
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WIDTH);
    Some(LocationRange {
        start_line: line,
        start_column: column,
        end_line: line,
        end_column: column + width,
        source: "matches-array".to_string(),
        confidence: Confidence::Medium,
        found: true,
    })
}

/// `{start: {line, column}, end: {line, column}}`, directly or under a
/// `range` key.
fn from_range_object(payload: &Value) -> Option<LocationRange> {
    let range = match payload.get("range") {
        Some(nested) if nested.get("start").is_some() => nested,
        _ => payload,
    };
    let start = range.get("start")?;
    let end = range.get("end")?;
    let start_line = coerce_field(start, "line")?;
    let start_column = coerce_field(start, "column").unwrap_or(1);
    Some(LocationRange {
        start_line,
        start_column,
        end_line: coerce_field(end, "line").unwrap_or(start_line),
        end_column: coerce_field(end, "column").unwrap_or(start_column + 1),
        source: "range-object".to_string(),
        confidence: Confidence::Medium,
        found: true,
    })
}

/// `details.lineNumber` or `error.lineNumber`, width 20.
fn from_details_line_number(payload: &Value) -> Option<LocationRange> {
    let line = payload
        .get("details")
        .and_then(|d| coerce_field(d, "lineNumber"))
        .or_else(|| payload.get("error").and_then(|e| coerce_field(e, "lineNumber")))?;
    Some(LocationRange {
        start_line: line,
        start_column: 1,
        end_line: line,
        end_column: 1 + DEFAULT_WIDTH,
        source: "details-line-number".to_string(),
        confidence: Confidence::Medium,
        found: true,
    })
}

/// `lineNumber`/`line` with `columnNumber`/`column`, at the top level
/// or nested under `error`.
fn from_legacy(payload: &Value) -> Option<LocationRange> {
    let error = payload.get("error");
    let line = coerce_field(payload, "lineNumber")
        .or_else(|| coerce_field(payload, "line"))
        .or_else(|| error.and_then(|e| coerce_field(e, "lineNumber")))
        .or_else(|| error.and_then(|e| coerce_field(e, "line")))?;
    let column = coerce_field(payload, "columnNumber")
        .or_else(|| coerce_field(payload, "column"))
        .or_else(|| error.and_then(|e| coerce_field(e, "columnNumber")))
        .or_else(|| error.and_then(|e| coerce_field(e, "column")))
        .unwrap_or(1);
    Some(LocationRange {
        start_line: line,
        start_column: column,
        end_line: line,
        end_column: column + DEFAULT_WIDTH,
        source: "legacy".to_string(),
        confidence: Confidence::Low,
        found: true,
    })
}

/// Clamp to 1-based coordinates and guarantee a non-degenerate span.
fn validate(mut range: LocationRange) -> LocationRange {
    if range.start_line < 1 {
        range.start_line = 1;
    }
    if range.start_column < 1 {
        range.start_column = 1;
    }
    if range.end_line < range.start_line {
        range.end_line = range.start_line;
    }
    if range.end_line == range.start_line && range.end_column <= range.start_column {
        range.end_column = range.start_column + 1;
    }
    range
}
