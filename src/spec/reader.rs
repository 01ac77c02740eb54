//! Collecting structural readers over `serde_yaml::Value`.
//!
//! Every helper records a located error and returns `None` instead of failing, so a whole document
//! is checked in one pass.

use serde_yaml::{Mapping, Value};

use crate::spec::diagnostics::{Diagnostics, SpecPath};

pub(crate) fn describe(v: &Value) -> String {
    match v {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > 40 {
                let head: String = s.chars().take(40).collect();
                format!("\"{head}...\"")
            } else {
                format!("\"{s}\"")
            }
        }
        Value::Sequence(_) => "a list".to_owned(),
        Value::Mapping(_) => "a mapping".to_owned(),
        Value::Tagged(t) => format!("tagged value {}", t.tag),
    }
}

pub(crate) fn as_mapping<'v>(
    v: &'v Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<&'v Mapping> {
    match v {
        Value::Mapping(m) => Some(m),
        other => {
            d.error_value(path, "expected a mapping", describe(other));
            None
        }
    }
}

pub(crate) fn as_sequence<'v>(
    v: &'v Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<&'v Vec<Value>> {
    match v {
        Value::Sequence(s) => Some(s),
        other => {
            d.error_value(path, "expected a list", describe(other));
            None
        }
    }
}

pub(crate) fn field<'v>(m: &'v Mapping, key: &str) -> Option<&'v Value> {
    m.get(key).filter(|v| !v.is_null())
}

pub(crate) fn required<'v>(
    m: &'v Mapping,
    key: &str,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<&'v Value> {
    let v = field(m, key);
    if v.is_none() {
        d.error(&path.key(key), "missing required field");
    }
    v
}

pub(crate) fn reject_unknown(
    m: &Mapping,
    allowed: &[&str],
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) {
    for (k, _) in m {
        match k.as_str() {
            Some(name) if allowed.contains(&name) => {}
            Some(name) => d.error(
                &path.key(name),
                format!("unknown field (expected one of: {})", allowed.join(", ")),
            ),
            None => d.error_value(path, "mapping keys must be strings", describe(k)),
        }
    }
}

pub(crate) fn read_str(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        other => {
            d.error_value(path, "expected a string", describe(other));
            None
        }
    }
}

pub(crate) fn read_ident(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<String> {
    let s = read_str(v, path, d)?;
    if s.trim().is_empty() {
        d.error(path, "must be a non-empty string");
        return None;
    }
    Some(s)
}

pub(crate) fn read_f64(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<f64> {
    match v.as_f64() {
        Some(f) if f.is_finite() => Some(f),
        _ => {
            d.error_value(path, "expected a finite number", describe(v));
            None
        }
    }
}

pub(crate) fn read_u64(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<u64> {
    match v.as_u64() {
        Some(n) => Some(n),
        None => {
            d.error_value(path, "expected a non-negative integer", describe(v));
            None
        }
    }
}

pub(crate) fn read_u32(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<u32> {
    let n = read_u64(v, path, d)?;
    match u32::try_from(n) {
        Ok(n) => Some(n),
        Err(_) => {
            d.error_value(path, "integer is too large", n);
            None
        }
    }
}

pub(crate) fn read_i64(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<i64> {
    match v.as_i64() {
        Some(n) => Some(n),
        None => {
            d.error_value(path, "expected an integer", describe(v));
            None
        }
    }
}

pub(crate) fn read_bool(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        other => {
            d.error_value(path, "expected true or false", describe(other));
            None
        }
    }
}

pub(crate) fn read_enum<T: Copy>(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
    options: &[(&str, T)],
) -> Option<T> {
    let s = read_str(v, path, d)?;
    if let Some((_, t)) = options.iter().find(|(name, _)| *name == s) {
        return Some(*t);
    }
    let names: Vec<&str> = options.iter().map(|(n, _)| *n).collect();
    d.error_value(
        path,
        format!("must be one of: {}", names.join(", ")),
        describe(v),
    );
    None
}

pub(crate) fn read_str_list(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<Vec<String>> {
    let seq = as_sequence(v, path, d)?;
    let mut out = Vec::with_capacity(seq.len());
    let mut ok = true;
    for (i, item) in seq.iter().enumerate() {
        match read_str(item, &path.index(i), d) {
            Some(s) => out.push(s),
            None => ok = false,
        }
    }
    ok.then_some(out)
}

/// Parse YAML text into a value, or a single located syntax error.
pub(crate) fn parse_document(text: &str, d: &mut Diagnostics<'_>) -> Option<Value> {
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Null) => {
            d.error(&SpecPath::root(), "document is empty");
            None
        }
        Ok(v) => Some(v),
        Err(e) => {
            d.error_at_line(e.location().map(|l| l.line()), format!("YAML syntax: {e}"));
            None
        }
    }
}
