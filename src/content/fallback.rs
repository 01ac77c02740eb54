//! Deterministic, network-free content synthesis.
//!
//! Content is drawn from a fixed business-vocabulary corpus with a seeded stream. When a
//! seeded variant keeps tripping the schema or a banned pattern, the slot's safe default (proven
//! to exist when the ruleset was validated) is used instead.

use serde_json::{Map, Value, json};

use crate::content::provider::{ContentProvider, ContentRequest, ProviderError, ProviderIdentity};
use crate::content::schema::{check_string, validate, wrap_envelope};
use crate::foundation::math::{Fnv1a64, Rng64};
use crate::spec::ruleset::{BannedPattern, SchemaNode, StringRule};

const CORPUS: &[&str] = &[
    "account", "balance", "quarter", "revenue", "customer", "invoice", "payment", "order",
    "service", "delivery", "contract", "period", "report", "summary", "total", "amount",
    "review", "budget", "schedule", "project", "update", "supplier", "product", "record",
    "growth", "margin", "region", "office", "team", "support", "request", "approval",
    "shipment", "storage", "inventory", "policy", "renewal", "billing", "statement", "estimate",
    "the", "a", "for", "with", "and", "of", "to", "in", "on", "per", "across", "under",
    "annual", "monthly", "final", "pending", "net", "gross", "standard", "regional", "current",
    "confirmed", "revised", "detailed",
];

const SAFE_WORDS: &[&str] = &["data", "item", "note", "value", "entry", "text", "x"];

const MAX_VARIANTS: u64 = 8;

/// Schema-valid content for a slot, seeded by `seed`.
///
/// Tries a handful of seeded variants, then falls back to `safe_default`.
pub fn synthesize(
    node: &SchemaNode,
    seed: u64,
    banned: &[BannedPattern],
    safe: Option<&Value>,
) -> Result<Value, String> {
    for variant in 0..MAX_VARIANTS {
        let mut h = Fnv1a64::new(seed);
        h.write_u64(variant);
        let mut rng = Rng64::new(h.finish());
        let v = draw(node, &mut rng);
        if validate(&v, node, banned).is_ok() {
            return Ok(v);
        }
    }
    match safe {
        Some(v) => Ok(v.clone()),
        None => safe_default(node, banned),
    }
}

fn draw(node: &SchemaNode, rng: &mut Rng64) -> Value {
    match node {
        SchemaNode::String(rule) => Value::String(draw_string(rule, rng)),
        SchemaNode::Number { min, max } => {
            let (lo, hi) = match (*min, *max) {
                (Some(lo), Some(hi)) => (lo, hi),
                (Some(lo), None) => (lo, lo + 1000.0),
                (None, Some(hi)) => (hi - 1000.0, hi),
                (None, None) => (0.0, 1000.0),
            };
            let raw = lo + rng.next_f64_01() * (hi - lo);
            let rounded = ((raw * 100.0).round() / 100.0).clamp(lo, hi);
            json!(rounded)
        }
        SchemaNode::Integer { min, max } => {
            let (lo, hi) = match (*min, *max) {
                (Some(lo), Some(hi)) => (lo, hi),
                (Some(lo), None) => (lo, lo.saturating_add(100)),
                (None, Some(hi)) => (hi.saturating_sub(100), hi),
                (None, None) => (0, 100),
            };
            let span = (i128::from(hi) - i128::from(lo)).clamp(0, i128::from(u32::MAX)) as u64;
            json!(lo.saturating_add(rng.range_u64(0, span) as i64))
        }
        SchemaNode::Boolean => json!(rng.next_u64() & 1 == 1),
        SchemaNode::Enum(values) => {
            let n = values.len() as u64;
            if n == 0 {
                return Value::Null;
            }
            json!(values[rng.range_u64(0, n - 1) as usize])
        }
        SchemaNode::Array {
            items,
            min_items,
            max_items,
        } => {
            let lo = *min_items as u64;
            let hi = max_items.map_or(lo.max(3), |m| m as u64).max(lo);
            let n = rng.range_u64(lo, hi);
            Value::Array((0..n).map(|_| draw(items, rng)).collect())
        }
        SchemaNode::Object { properties, .. } => {
            let mut m = Map::new();
            for (name, prop) in properties {
                m.insert(name.clone(), draw(prop, rng));
            }
            Value::Object(m)
        }
    }
}

fn draw_string(rule: &StringRule, rng: &mut Rng64) -> String {
    let lo = rule.min_words.unwrap_or(1) as u64;
    let hi = rule.max_words.map_or(lo.max(12), |m| m as u64);
    let lo = lo.min(hi);
    let n = rng.range_u64(lo, hi) as usize;

    let mut words: Vec<&str> = (0..n)
        .map(|_| CORPUS[rng.range_u64(0, CORPUS.len() as u64 - 1) as usize])
        .collect();
    let render = |words: &[&str]| -> String {
        let mut s = words.join(" ");
        if let Some(first) = s.get(..1) {
            let upper = first.to_ascii_uppercase();
            s.replace_range(..1, &upper);
        }
        if !s.is_empty() {
            s.push('.');
        }
        s
    };

    let mut s = render(&words);
    if let Some(max) = rule.max_length {
        while s.chars().count() > max && words.len() > lo as usize {
            words.pop();
            s = render(&words);
        }
        if s.chars().count() > max {
            s = s.chars().take(max).collect::<String>().trim_end().to_owned();
        }
    }
    if let Some(min) = rule.min_length {
        while s.chars().count() < min {
            words.push(CORPUS[rng.range_u64(0, CORPUS.len() as u64 - 1) as usize]);
            s = render(&words);
        }
    }
    s
}

/// Smallest deterministic schema-valid value, or why none exists.
pub fn safe_default(node: &SchemaNode, banned: &[BannedPattern]) -> Result<Value, String> {
    let v = minimal(node, banned)?;
    validate(&v, node, banned).map_err(|v| v.to_string())?;
    Ok(v)
}

fn minimal(node: &SchemaNode, banned: &[BannedPattern]) -> Result<Value, String> {
    match node {
        SchemaNode::String(rule) => minimal_string(rule, banned).map(Value::String),
        SchemaNode::Number { min, max } => {
            let v = match (*min, *max) {
                (Some(lo), _) => lo,
                (None, Some(hi)) if hi < 0.0 => hi,
                _ => 0.0,
            };
            Ok(json!(v))
        }
        SchemaNode::Integer { min, max } => {
            let v = match (*min, *max) {
                (Some(lo), _) => lo,
                (None, Some(hi)) if hi < 0 => hi,
                _ => 0,
            };
            Ok(json!(v))
        }
        SchemaNode::Boolean => Ok(json!(false)),
        SchemaNode::Enum(values) => values
            .iter()
            .find(|v| !banned.iter().any(|p| p.is_match(v)))
            .map(|v| json!(v))
            .ok_or_else(|| "every enum value matches a banned pattern".to_owned()),
        SchemaNode::Array {
            items, min_items, ..
        } => {
            if *min_items == 0 {
                return Ok(Value::Array(Vec::new()));
            }
            let item = minimal(items, banned)?;
            Ok(Value::Array(vec![item; *min_items]))
        }
        SchemaNode::Object { properties, .. } => {
            let mut m = Map::new();
            for (name, prop) in properties {
                let v = minimal(prop, banned).map_err(|e| format!("property `{name}`: {e}"))?;
                m.insert(name.clone(), v);
            }
            Ok(Value::Object(m))
        }
    }
}

fn minimal_string(rule: &StringRule, banned: &[BannedPattern]) -> Result<String, String> {
    let words = rule.min_words.unwrap_or(1).min(rule.max_words.unwrap_or(usize::MAX));
    let min_len = rule.min_length.unwrap_or(0);
    for filler in SAFE_WORDS {
        let mut s = vec![*filler; words].join(" ");
        let short = min_len.saturating_sub(s.chars().count());
        s.extend(std::iter::repeat_n('x', short));
        if check_string(&s, rule, banned).is_ok() {
            return Ok(s);
        }
    }
    Err("no text satisfies the length and word limits without matching a banned pattern".to_owned())
}

/// Deterministic local provider.
///
/// Seeds come from the request, so the same sample seed and block always produce the same text.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackProvider;

impl ContentProvider for FallbackProvider {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity {
            kind: "fallback".to_owned(),
            model: format!("corpus-v{}", env!("CARGO_PKG_VERSION")),
        }
    }

    fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError> {
        synthesize(request.schema, request.seed, request.banned, None)
            .map(wrap_envelope)
            .map_err(ProviderError::Malformed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/content/fallback.rs"]
mod tests;
