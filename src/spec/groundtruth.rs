use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::spec::diagnostics::{Diagnostics, SpecErrors, SpecPath};
use crate::spec::hash::canonical_hash;
use crate::spec::reader::{
    as_mapping, as_sequence, describe, field, parse_document, read_bool, read_enum, read_ident,
    read_str, reject_unknown,
};
use crate::spec::source::SourceMap;
use crate::spec::structure::BlockKind;

/// File name used in diagnostics for the ground-truth spec.
pub const GROUNDTRUTH_FILE: &str = "groundtruth.yaml";

/// Annotation level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One box per block.
    Block,
    /// One box per text line.
    Line,
    /// One box per word.
    Word,
}

/// Ground-truth output format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Single JSON document per sample.
    Json,
    /// One JSON record per block, in reading order.
    Jsonl,
    /// COCO detection format.
    Coco,
    /// A user-registered adapter.
    Custom(String),
}

impl OutputFormat {
    /// Name as written in `groundtruth.yaml`.
    pub fn name(&self) -> &str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Coco => "coco",
            Self::Custom(name) => name,
        }
    }
}

/// Validated, immutable ground-truth spec.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundTruthSpec {
    /// Emitted annotation levels (always includes `Block`).
    pub granularity: BTreeSet<Granularity>,
    pub formats: Vec<OutputFormat>,
    pub include_text: bool,
    pub categories: BTreeMap<BlockKind, String>,
    /// Free-form dataset metadata copied into every output.
    pub metadata: BTreeMap<String, String>,
    content_hash: String,
}

impl Default for GroundTruthSpec {
    fn default() -> Self {
        Self {
            granularity: BTreeSet::from([Granularity::Block]),
            formats: vec![OutputFormat::Json],
            include_text: true,
            categories: BTreeMap::new(),
            metadata: BTreeMap::new(),
            content_hash: String::new(),
        }
    }
}

impl GroundTruthSpec {
    /// Parse and validate a ground-truth spec.
    pub fn from_yaml_str(text: &str) -> Result<Self, SpecErrors> {
        parse_groundtruth(text)
    }

    /// Canonical content hash (SHA-256 hex).
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Return `true` when `level` is emitted.
    pub fn includes(&self, level: Granularity) -> bool {
        self.granularity.contains(&level)
    }

    /// Label of a block kind.
    pub fn category(&self, kind: BlockKind) -> &str {
        self.categories
            .get(&kind)
            .map_or_else(|| kind.as_str(), String::as_str)
    }

    /// Distinct labels in block-kind order, used for COCO category ids.
    pub fn category_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for kind in BlockKind::NAMES.iter().map(|(_, k)| *k) {
            let name = self.category(kind);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

const GRANULARITIES: [(&str, Granularity); 3] = [
    ("block", Granularity::Block),
    ("line", Granularity::Line),
    ("word", Granularity::Word),
];

fn parse_groundtruth(text: &str) -> Result<GroundTruthSpec, SpecErrors> {
    let source = SourceMap::build(text);
    let mut d = Diagnostics::new(GROUNDTRUTH_FILE, &source);
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
        &["granularity", "formats", "include_text", "categories", "metadata"],
        &root_path,
        &mut d,
    );
    let defaults = GroundTruthSpec::default();

    let granularity = match field(m, "granularity") {
        Some(v) => read_granularity(v, &root_path.key("granularity"), &mut d),
        None => Some(defaults.granularity),
    };
    let formats = match field(m, "formats") {
        Some(v) => read_formats(v, &root_path.key("formats"), &mut d),
        None => Some(defaults.formats),
    };
    let include_text = match field(m, "include_text") {
        Some(v) => read_bool(v, &root_path.key("include_text"), &mut d),
        None => Some(defaults.include_text),
    };
    let categories = match field(m, "categories") {
        Some(v) => read_categories(v, &root_path.key("categories"), &mut d),
        None => Some(BTreeMap::new()),
    };
    let metadata = match field(m, "metadata") {
        Some(v) => read_metadata(v, &root_path.key("metadata"), &mut d),
        None => Some(BTreeMap::new()),
    };

    let (Some(granularity), Some(formats), Some(include_text), Some(categories), Some(metadata)) =
        (granularity, formats, include_text, categories, metadata)
    else {
        return Err(d.into_errors());
    };
    let errors = d.into_errors();
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(GroundTruthSpec {
        granularity,
        formats,
        include_text,
        categories,
        metadata,
        content_hash,
    })
}

fn read_granularity(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<BTreeSet<Granularity>> {
    let seq = as_sequence(v, path, d)?;
    let mut out = BTreeSet::from([Granularity::Block]);
    let mut ok = true;
    for (i, item) in seq.iter().enumerate() {
        match read_enum(item, &path.index(i), d, &GRANULARITIES) {
            Some(g) => {
                out.insert(g);
            }
            None => ok = false,
        }
    }
    ok.then_some(out)
}

fn read_formats(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<Vec<OutputFormat>> {
    let seq = as_sequence(v, path, d)?;
    if seq.is_empty() {
        d.error(path, "must list at least one format");
        return None;
    }
    let mut out = Vec::with_capacity(seq.len());
    let mut ok = true;
    for (i, item) in seq.iter().enumerate() {
        let ipath = path.index(i);
        let Some(name) = read_ident(item, &ipath, d) else {
            ok = false;
            continue;
        };
        let format = match name.as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "coco" => OutputFormat::Coco,
            other => match other.strip_prefix("custom:") {
                Some(custom) if !custom.trim().is_empty() => {
                    OutputFormat::Custom(custom.to_owned())
                }
                _ => {
                    d.error_value(
                        &ipath,
                        "must be one of: json, jsonl, coco, custom:<name>",
                        describe(item),
                    );
                    ok = false;
                    continue;
                }
            },
        };
        if out.contains(&format) {
            d.error_value(&ipath, "duplicate format", format.name());
            ok = false;
            continue;
        }
        out.push(format);
    }
    ok.then_some(out)
}

fn read_categories(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<BTreeMap<BlockKind, String>> {
    let m = as_mapping(v, path, d)?;
    let mut out = BTreeMap::new();
    let mut ok = true;
    for (k, v) in m {
        let kpath = match k.as_str() {
            Some(name) => path.key(name),
            None => path.clone(),
        };
        let kind = read_enum(k, &kpath, d, &BlockKind::NAMES);
        let label = read_ident(v, &kpath, d);
        match (kind, label) {
            (Some(kind), Some(label)) => {
                out.insert(kind, label);
            }
            _ => ok = false,
        }
    }
    ok.then_some(out)
}

fn read_metadata(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<BTreeMap<String, String>> {
    let m = as_mapping(v, path, d)?;
    let mut out = BTreeMap::new();
    let mut ok = true;
    for (k, v) in m {
        let Some(key) = k.as_str() else {
            d.error_value(path, "metadata keys must be strings", describe(k));
            ok = false;
            continue;
        };
        let value = match v {
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => read_str(other, &path.key(key), d),
        };
        match value {
            Some(value) => {
                out.insert(key.to_owned(), value);
            }
            None => ok = false,
        }
    }
    ok.then_some(out)
}

#[cfg(test)]
#[path = "../../tests/unit/spec/groundtruth.rs"]
mod tests;
