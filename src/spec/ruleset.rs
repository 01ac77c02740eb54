use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde_yaml::Value;

use crate::content::fallback;
use crate::spec::diagnostics::{Diagnostics, SpecErrors, SpecPath};
use crate::spec::hash::canonical_hash;
use crate::spec::reader::{
    as_mapping, describe, field, parse_document, read_enum, read_f64, read_i64, read_str,
    read_str_list, read_u64, reject_unknown, required,
};
use crate::spec::source::SourceMap;

/// File name used in diagnostics for the ruleset.
pub const RULESET_FILE: &str = "ruleset.yaml";

/// Length limits of a string node. Lengths count characters, words are whitespace separated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StringRule {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_words: Option<usize>,
    pub max_words: Option<usize>,
}

/// Output schema of a generated content slot.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaNode {
    /// Free text.
    String(StringRule),
    /// Floating point number.
    Number {
        /// Inclusive lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
    },
    /// Whole number.
    Integer {
        /// Inclusive lower bound.
        min: Option<i64>,
        /// Inclusive upper bound.
        max: Option<i64>,
    },
    /// `true` or `false`.
    Boolean,
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    /// Homogeneous list.
    Array {
        /// Element schema.
        items: Box<SchemaNode>,
        /// Minimum length.
        min_items: usize,
        /// Maximum length.
        max_items: Option<usize>,
    },
    /// Record with ordered properties.
    Object {
        /// Properties in declaration order.
        properties: Vec<(String, SchemaNode)>,
        /// Names that must be present.
        required: Vec<String>,
    },
}

impl SchemaNode {
    /// Short type name used in messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number { .. } => "number",
            Self::Integer { .. } => "integer",
            Self::Boolean => "boolean",
            Self::Enum(_) => "enum",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
        }
    }

    /// Return `true` for schemas whose values render as a single cell of text.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Array { .. } | Self::Object { .. })
    }
}

/// A compiled banned pattern and its source text.
#[derive(Clone, Debug)]
pub struct BannedPattern {
    pub source: String,
    regex: Regex,
}

impl BannedPattern {
    /// Compile a pattern.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_owned(),
            regex: Regex::new(source)?,
        })
    }

    /// Return `true` when `text` contains a match.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for BannedPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Validated, immutable content ruleset.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentRuleset {
    pub system_prompt: String,
    pub banned_patterns: Vec<BannedPattern>,
    pub schemas: BTreeMap<String, SchemaNode>,
    safe_defaults: BTreeMap<String, serde_json::Value>,
    content_hash: String,
}

impl ContentRuleset {
    /// Parse and validate a ruleset.
    pub fn from_yaml_str(text: &str) -> Result<Self, SpecErrors> {
        parse_ruleset(text)
    }

    /// Canonical content hash (SHA-256 hex).
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Schema of a slot.
    pub fn schema(&self, slot: &str) -> Option<&SchemaNode> {
        self.schemas.get(slot)
    }

    /// Source of the first banned pattern matching `text`.
    pub fn banned_match(&self, text: &str) -> Option<&str> {
        self.banned_patterns
            .iter()
            .find(|p| p.is_match(text))
            .map(|p| p.source.as_str())
    }

    /// Schema-valid content proven to exist when the ruleset was validated.
    pub fn safe_default(&self, slot: &str) -> Option<&serde_json::Value> {
        self.safe_defaults.get(slot)
    }
}

fn parse_ruleset(text: &str) -> Result<ContentRuleset, SpecErrors> {
    let source = SourceMap::build(text);
    let mut d = Diagnostics::new(RULESET_FILE, &source);
    let Some(root) = parse_document(text, &mut d) else {
        return Err(d.into_errors());
    };
    let content_hash = canonical_hash(&root);
    let root_path = SpecPath::root();
    let Some(m) = as_mapping(&root, &root_path, &mut d) else {
        return Err(d.into_errors());
    };
    reject_unknown(
        m,
        &["system_prompt", "banned_patterns", "schemas"],
        &root_path,
        &mut d,
    );

    let system_prompt = match field(m, "system_prompt") {
        Some(v) => read_str(v, &root_path.key("system_prompt"), &mut d),
        None => Some(String::new()),
    };
    let banned_path = root_path.key("banned_patterns");
    let banned_sources = match field(m, "banned_patterns") {
        Some(v) => read_str_list(v, &banned_path, &mut d),
        None => Some(Vec::new()),
    };
    let schemas_path = root_path.key("schemas");
    let schemas = required(m, "schemas", &root_path, &mut d)
        .and_then(|v| read_schemas(v, &schemas_path, &mut d));

    let (Some(system_prompt), Some(banned_sources), Some(schemas)) =
        (system_prompt, banned_sources, schemas)
    else {
        return Err(d.into_errors());
    };

    let mut banned_patterns = Vec::with_capacity(banned_sources.len());
    for (i, src) in banned_sources.iter().enumerate() {
        match BannedPattern::new(src) {
            Ok(p) => banned_patterns.push(p),
            Err(e) => d.error_value(&banned_path.index(i), format!("invalid regex: {e}"), src),
        }
    }
    for (name, node) in &schemas {
        check_schema(node, &schemas_path.key(name), &mut d);
    }
    if d.has_errors() {
        return Err(d.into_errors());
    }

    let mut safe_defaults = BTreeMap::new();
    for (name, node) in &schemas {
        match fallback::safe_default(node, &banned_patterns) {
            Ok(v) => {
                safe_defaults.insert(name.clone(), v);
            }
            Err(reason) => d.error(
                &schemas_path.key(name),
                format!("no schema-valid fallback content exists: {reason}"),
            ),
        }
    }
    let errors = d.into_errors();
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ContentRuleset {
        system_prompt,
        banned_patterns,
        schemas,
        safe_defaults,
        content_hash,
    })
}

fn read_schemas(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<BTreeMap<String, SchemaNode>> {
    let m = as_mapping(v, path, d)?;
    let mut out = BTreeMap::new();
    let mut ok = true;
    for (k, v) in m {
        let Some(name) = k.as_str() else {
            d.error_value(path, "schema names must be strings", describe(k));
            ok = false;
            continue;
        };
        match read_schema(v, &path.key(name), d) {
            Some(node) => {
                out.insert(name.to_owned(), node);
            }
            None => ok = false,
        }
    }
    ok.then_some(out)
}

#[derive(Clone, Copy)]
enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Enum,
    Array,
    Object,
}

const SCHEMA_TYPES: [(&str, SchemaType); 7] = [
    ("string", SchemaType::String),
    ("number", SchemaType::Number),
    ("integer", SchemaType::Integer),
    ("boolean", SchemaType::Boolean),
    ("enum", SchemaType::Enum),
    ("array", SchemaType::Array),
    ("object", SchemaType::Object),
];

fn read_count(
    m: &serde_yaml::Mapping,
    key: &str,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<Option<usize>> {
    match field(m, key) {
        Some(v) => {
            let n = read_u64(v, &path.key(key), d)?;
            Some(Some(usize::try_from(n).unwrap_or(usize::MAX)))
        }
        None => Some(None),
    }
}

fn read_schema(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<SchemaNode> {
    let m = as_mapping(v, path, d)?;
    let ty = required(m, "type", path, d)
        .and_then(|v| read_enum(v, &path.key("type"), d, &SCHEMA_TYPES))?;
    match ty {
        SchemaType::String => {
            reject_unknown(
                m,
                &["type", "min_length", "max_length", "min_words", "max_words"],
                path,
                d,
            );
            let min_length = read_count(m, "min_length", path, d);
            let max_length = read_count(m, "max_length", path, d);
            let min_words = read_count(m, "min_words", path, d);
            let max_words = read_count(m, "max_words", path, d);
            Some(SchemaNode::String(StringRule {
                min_length: min_length?,
                max_length: max_length?,
                min_words: min_words?,
                max_words: max_words?,
            }))
        }
        SchemaType::Number => {
            reject_unknown(m, &["type", "min", "max"], path, d);
            let mut bound = |key: &str| match field(m, key) {
                Some(v) => read_f64(v, &path.key(key), d).map(Some),
                None => Some(None),
            };
            let min = bound("min");
            let max = bound("max");
            Some(SchemaNode::Number {
                min: min?,
                max: max?,
            })
        }
        SchemaType::Integer => {
            reject_unknown(m, &["type", "min", "max"], path, d);
            let mut bound = |key: &str| match field(m, key) {
                Some(v) => read_i64(v, &path.key(key), d).map(Some),
                None => Some(None),
            };
            let min = bound("min");
            let max = bound("max");
            Some(SchemaNode::Integer {
                min: min?,
                max: max?,
            })
        }
        SchemaType::Boolean => {
            reject_unknown(m, &["type"], path, d);
            Some(SchemaNode::Boolean)
        }
        SchemaType::Enum => {
            reject_unknown(m, &["type", "values"], path, d);
            required(m, "values", path, d)
                .and_then(|v| read_str_list(v, &path.key("values"), d))
                .map(SchemaNode::Enum)
        }
        SchemaType::Array => {
            reject_unknown(m, &["type", "items", "min_items", "max_items"], path, d);
            let items = required(m, "items", path, d)
                .and_then(|v| read_schema(v, &path.key("items"), d));
            let min_items = read_count(m, "min_items", path, d);
            let max_items = read_count(m, "max_items", path, d);
            Some(SchemaNode::Array {
                items: Box::new(items?),
                min_items: min_items?.unwrap_or(0),
                max_items: max_items?,
            })
        }
        SchemaType::Object => {
            reject_unknown(m, &["type", "properties", "required"], path, d);
            let ppath = path.key("properties");
            let properties = required(m, "properties", path, d)
                .and_then(|v| as_mapping(v, &ppath, d))
                .and_then(|pm| {
                    let mut out = Vec::with_capacity(pm.len());
                    let mut ok = true;
                    for (k, v) in pm {
                        let Some(name) = k.as_str() else {
                            d.error_value(&ppath, "property names must be strings", describe(k));
                            ok = false;
                            continue;
                        };
                        match read_schema(v, &ppath.key(name), d) {
                            Some(node) => out.push((name.to_owned(), node)),
                            None => ok = false,
                        }
                    }
                    ok.then_some(out)
                });
            let required_names = match field(m, "required") {
                Some(v) => read_str_list(v, &path.key("required"), d).map(Some),
                None => Some(None),
            };
            let properties = properties?;
            let required = required_names?
                .unwrap_or_else(|| properties.iter().map(|(n, _)| n.clone()).collect());
            Some(SchemaNode::Object {
                properties,
                required,
            })
        }
    }
}

fn check_bounds<T: PartialOrd + std::fmt::Display>(
    min: Option<T>,
    max: Option<T>,
    path: &SpecPath,
    what: &str,
    d: &mut Diagnostics<'_>,
) {
    if let (Some(lo), Some(hi)) = (min, max)
        && lo > hi
    {
        d.error_value(path, format!("min {what} must be <= max {what}"), format!("{lo} > {hi}"));
    }
}

fn check_schema(node: &SchemaNode, path: &SpecPath, d: &mut Diagnostics<'_>) {
    match node {
        SchemaNode::String(r) => {
            check_bounds(r.min_length, r.max_length, path, "length", d);
            check_bounds(r.min_words, r.max_words, path, "words", d);
        }
        SchemaNode::Number { min, max } => check_bounds(*min, *max, path, "value", d),
        SchemaNode::Integer { min, max } => check_bounds(*min, *max, path, "value", d),
        SchemaNode::Boolean => {}
        SchemaNode::Enum(values) => {
            if values.is_empty() {
                d.error(&path.key("values"), "must list at least one value");
            }
            let mut seen = HashSet::new();
            for (i, v) in values.iter().enumerate() {
                if !seen.insert(v.as_str()) {
                    d.error_value(&path.key("values").index(i), "duplicate enum value", v);
                }
            }
        }
        SchemaNode::Array {
            items,
            min_items,
            max_items,
        } => {
            check_bounds(Some(*min_items), *max_items, path, "items", d);
            check_schema(items, &path.key("items"), d);
        }
        SchemaNode::Object {
            properties,
            required,
        } => {
            let mut seen = HashSet::new();
            for (name, node) in properties {
                seen.insert(name.as_str());
                check_schema(node, &path.key("properties").key(name), d);
            }
            for (i, name) in required.iter().enumerate() {
                if !seen.contains(name.as_str()) {
                    d.error_value(
                        &path.key("required").index(i),
                        "required property is not declared",
                        name,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/spec/ruleset.rs"]
mod tests;
