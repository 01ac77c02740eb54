//! Conformance checks and JSON-schema export for ruleset schemas.
//!
//! Providers exchange content inside a `{"value": ...}` envelope so that every slot, scalar or
//! not, travels as a JSON object.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::spec::ruleset::{BannedPattern, SchemaNode, StringRule};

/// Key wrapping slot content in provider responses.
pub const ENVELOPE_KEY: &str = "value";

/// First reason a value fails its schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// JSON path of the offending value (`$`, `$[2].description`).
    pub path: String,
    /// Human-readable cause, suitable for a repair prompt.
    pub reason: String,
}

impl Violation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Whitespace-separated word count.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Unwrap a raw provider response into its content value.
pub fn parse_envelope(raw: &str) -> Result<Value, Violation> {
    let parsed: Value = serde_json::from_str(raw.trim())
        .map_err(|e| Violation::new("$", format!("malformed JSON: {e}")))?;
    match parsed {
        Value::Object(mut m) => m
            .remove(ENVELOPE_KEY)
            .ok_or_else(|| Violation::new("$", format!("missing `{ENVELOPE_KEY}` field"))),
        other => Err(Violation::new(
            "$",
            format!("expected an object, got {}", json_type(&other)),
        )),
    }
}

/// Wrap content in the provider envelope.
pub fn wrap_envelope(value: Value) -> String {
    let mut m = Map::new();
    m.insert(ENVELOPE_KEY.to_owned(), value);
    Value::Object(m).to_string()
}

/// Check `value` against `node`, including banned patterns on every string.
pub fn validate(
    value: &Value,
    node: &SchemaNode,
    banned: &[BannedPattern],
) -> Result<(), Violation> {
    check(value, node, banned, "$")
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> Violation {
    Violation::new(path, format!("expected {expected}, got {}", json_type(value)))
}

fn check(
    value: &Value,
    node: &SchemaNode,
    banned: &[BannedPattern],
    path: &str,
) -> Result<(), Violation> {
    match node {
        SchemaNode::String(rule) => {
            let Value::String(s) = value else {
                return Err(type_mismatch(path, "string", value));
            };
            check_string(s, rule, banned).map_err(|reason| Violation::new(path, reason))
        }
        SchemaNode::Number { min, max } => {
            let Some(n) = value.as_f64() else {
                return Err(type_mismatch(path, "number", value));
            };
            check_range(n, *min, *max).map_err(|reason| Violation::new(path, reason))
        }
        SchemaNode::Integer { min, max } => {
            let Some(n) = value.as_i64() else {
                return Err(Violation::new(path, format!("expected integer, got {value}")));
            };
            check_range(n, *min, *max).map_err(|reason| Violation::new(path, reason))
        }
        SchemaNode::Boolean => match value {
            Value::Bool(_) => Ok(()),
            other => Err(type_mismatch(path, "boolean", other)),
        },
        SchemaNode::Enum(values) => match value {
            Value::String(s) if values.iter().any(|v| v == s) => {
                check_banned(s, banned).map_err(|reason| Violation::new(path, reason))
            }
            other => Err(Violation::new(
                path,
                format!("expected one of [{}], got {other}", values.join(", ")),
            )),
        },
        SchemaNode::Array {
            items,
            min_items,
            max_items,
        } => {
            let Value::Array(list) = value else {
                return Err(type_mismatch(path, "array", value));
            };
            if list.len() < *min_items {
                return Err(Violation::new(
                    path,
                    format!("expected at least {min_items} items, got {}", list.len()),
                ));
            }
            if let Some(max) = max_items
                && list.len() > *max
            {
                return Err(Violation::new(
                    path,
                    format!("expected at most {max} items, got {}", list.len()),
                ));
            }
            for (i, item) in list.iter().enumerate() {
                check(item, items, banned, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        SchemaNode::Object {
            properties,
            required,
        } => {
            let Value::Object(m) = value else {
                return Err(type_mismatch(path, "object", value));
            };
            for key in m.keys() {
                if !properties.iter().any(|(name, _)| name == key) {
                    return Err(Violation::new(path, format!("unexpected property `{key}`")));
                }
            }
            for (name, prop) in properties {
                let child = format!("{path}.{name}");
                match m.get(name) {
                    None | Some(Value::Null) if required.contains(name) => {
                        return Err(Violation::new(&child, "missing required property"));
                    }
                    None | Some(Value::Null) => {}
                    Some(v) => check(v, prop, banned, &child)?,
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn check_string(
    s: &str,
    rule: &StringRule,
    banned: &[BannedPattern],
) -> Result<(), String> {
    let chars = s.chars().count();
    if let Some(min) = rule.min_length
        && chars < min
    {
        return Err(format!("expected at least {min} characters, got {chars}"));
    }
    if let Some(max) = rule.max_length
        && chars > max
    {
        return Err(format!("expected at most {max} characters, got {chars}"));
    }
    let words = word_count(s);
    if let Some(min) = rule.min_words
        && words < min
    {
        return Err(format!("expected at least {min} words, got {words}"));
    }
    if let Some(max) = rule.max_words
        && words > max
    {
        return Err(format!("expected at most {max} words, got {words}"));
    }
    check_banned(s, banned)
}

fn check_banned(s: &str, banned: &[BannedPattern]) -> Result<(), String> {
    match banned.iter().find(|p| p.is_match(s)) {
        Some(p) => Err(format!("text matches banned pattern `{}`", p.source)),
        None => Ok(()),
    }
}

fn check_range<T: PartialOrd + fmt::Display>(
    n: T,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), String> {
    if let Some(lo) = min
        && n < lo
    {
        return Err(format!("expected >= {lo}, got {n}"));
    }
    if let Some(hi) = max
        && n > hi
    {
        return Err(format!("expected <= {hi}, got {n}"));
    }
    Ok(())
}

/// JSON-schema rendering of a node, as sent to structured-output endpoints.
pub fn to_json_schema(node: &SchemaNode) -> Value {
    match node {
        SchemaNode::String(rule) => {
            let mut m = Map::new();
            m.insert("type".into(), json!("string"));
            if let Some(v) = rule.min_length {
                m.insert("minLength".into(), json!(v));
            }
            if let Some(v) = rule.max_length {
                m.insert("maxLength".into(), json!(v));
            }
            match (rule.min_words, rule.max_words) {
                (Some(lo), Some(hi)) => {
                    m.insert("description".into(), json!(format!("between {lo} and {hi} words")));
                }
                (Some(lo), None) => {
                    m.insert("description".into(), json!(format!("at least {lo} words")));
                }
                (None, Some(hi)) => {
                    m.insert("description".into(), json!(format!("at most {hi} words")));
                }
                (None, None) => {}
            }
            Value::Object(m)
        }
        SchemaNode::Number { min, max } => {
            bounded("number", min.map(|v| json!(v)), max.map(|v| json!(v)))
        }
        SchemaNode::Integer { min, max } => {
            bounded("integer", min.map(|v| json!(v)), max.map(|v| json!(v)))
        }
        SchemaNode::Boolean => json!({"type": "boolean"}),
        SchemaNode::Enum(values) => json!({"type": "string", "enum": values}),
        SchemaNode::Array {
            items,
            min_items,
            max_items,
        } => {
            let mut m = Map::new();
            m.insert("type".into(), json!("array"));
            m.insert("items".into(), to_json_schema(items));
            m.insert("minItems".into(), json!(min_items));
            if let Some(v) = max_items {
                m.insert("maxItems".into(), json!(v));
            }
            Value::Object(m)
        }
        SchemaNode::Object {
            properties,
            required,
        } => {
            let mut props = Map::new();
            for (name, prop) in properties {
                let schema = to_json_schema(prop);
                let schema = if required.contains(name) {
                    schema
                } else {
                    json!({"anyOf": [schema, {"type": "null"}]})
                };
                props.insert(name.clone(), schema);
            }
            let names: Vec<&str> = properties.iter().map(|(n, _)| n.as_str()).collect();
            json!({
                "type": "object",
                "properties": props,
                "required": names,
                "additionalProperties": false,
            })
        }
    }
}

fn bounded(ty: &str, min: Option<Value>, max: Option<Value>) -> Value {
    let mut m = Map::new();
    m.insert("type".into(), json!(ty));
    if let Some(v) = min {
        m.insert("minimum".into(), v);
    }
    if let Some(v) = max {
        m.insert("maximum".into(), v);
    }
    Value::Object(m)
}

/// Schema of the response envelope around `node`.
pub fn envelope_schema(node: &SchemaNode) -> Value {
    json!({
        "type": "object",
        "properties": { ENVELOPE_KEY: to_json_schema(node) },
        "required": [ENVELOPE_KEY],
        "additionalProperties": false,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/content/schema.rs"]
mod tests;
