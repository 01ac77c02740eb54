use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::error::SynthResult;
use crate::spec::diagnostics::{Diagnostics, SpecErrors};
use crate::spec::groundtruth::{GROUNDTRUTH_FILE, GroundTruthSpec};
use crate::spec::ruleset::{ContentRuleset, RULESET_FILE, SchemaNode};
use crate::spec::structure::{BlockKind, DocumentSpec, STRUCTURE_FILE, parse_structure};

/// Content hashes of the three spec documents.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecHashes {
    /// Hash of `structure.yaml`.
    pub structure: String,
    /// Hash of `groundtruth.yaml`.
    pub groundtruth: String,
    /// Hash of `ruleset.yaml`.
    pub ruleset: String,
}

/// The validated, read-only spec set shared by every sample of a batch.
///
/// Cloning is cheap: each document sits behind an [`Arc`].
#[derive(Clone, Debug)]
pub struct SpecSet {
    pub structure: Arc<DocumentSpec>,
    pub groundtruth: Arc<GroundTruthSpec>,
    pub ruleset: Arc<ContentRuleset>,
}

impl SpecSet {
    /// Validate three spec documents together.
    ///
    /// Every document is checked even when an earlier one fails, so the returned list covers all
    /// three files. Cross-file slot checks run only once both the structure and the ruleset are
    /// individually valid.
    pub fn from_strs(
        structure: &str,
        groundtruth: &str,
        ruleset: &str,
    ) -> Result<Self, SpecErrors> {
        let mut errors = SpecErrors::default();
        let structure = parse_structure(structure).map_err(|e| errors.extend(e)).ok();
        let groundtruth = GroundTruthSpec::from_yaml_str(groundtruth)
            .map_err(|e| errors.extend(e))
            .ok();
        let ruleset = ContentRuleset::from_yaml_str(ruleset)
            .map_err(|e| errors.extend(e))
            .ok();

        if let (Some((doc, source)), Some(rules)) = (&structure, &ruleset) {
            let mut d = Diagnostics::new(STRUCTURE_FILE, source);
            check_slots(doc, rules, &mut d);
            errors.extend(d.into_errors());
        }

        match (structure, groundtruth, ruleset) {
            (Some((structure, _)), Some(groundtruth), Some(ruleset)) if errors.is_empty() => {
                Ok(Self {
                    structure: Arc::new(structure),
                    groundtruth: Arc::new(groundtruth),
                    ruleset: Arc::new(ruleset),
                })
            }
            _ => Err(errors),
        }
    }

    /// Load `structure.yaml`, `groundtruth.yaml` and `ruleset.yaml` from a directory.
    #[tracing::instrument]
    pub fn load_dir(dir: &Path) -> SynthResult<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).with_context(|| format!("read '{}'", path.display()))
        };
        let structure = read(STRUCTURE_FILE)?;
        let groundtruth = read(GROUNDTRUTH_FILE)?;
        let ruleset = read(RULESET_FILE)?;
        let set = Self::from_strs(&structure, &groundtruth, &ruleset)?;
        tracing::debug!(structure = set.structure.content_hash(), "spec set validated");
        Ok(set)
    }

    /// Content hashes of the three documents.
    pub fn hashes(&self) -> SpecHashes {
        SpecHashes {
            structure: self.structure.content_hash().to_owned(),
            groundtruth: self.groundtruth.content_hash().to_owned(),
            ruleset: self.ruleset.content_hash().to_owned(),
        }
    }
}

fn check_slots(doc: &DocumentSpec, rules: &ContentRuleset, d: &mut Diagnostics<'_>) {
    for r in doc.slot_refs() {
        let Some(schema) = rules.schema(r.slot) else {
            d.error_value(
                &r.path,
                format!("unknown content slot (not defined in {RULESET_FILE})"),
                r.slot,
            );
            continue;
        };
        if !fits_kind(r.kind, schema) {
            d.error_value(
                &r.path,
                format!(
                    "slot has a {} schema, which cannot fill a {} block",
                    schema.type_name(),
                    r.kind.as_str()
                ),
                r.slot,
            );
        }
    }
}

/// Text blocks take scalars; tables take a list of records or a list of scalar rows.
fn fits_kind(kind: BlockKind, schema: &SchemaNode) -> bool {
    match kind {
        BlockKind::Paragraph | BlockKind::Header => schema.is_scalar(),
        BlockKind::Table => match schema {
            SchemaNode::Array { items, .. } => match items.as_ref() {
                SchemaNode::Object { properties, .. } => {
                    !properties.is_empty() && properties.iter().all(|(_, p)| p.is_scalar())
                }
                SchemaNode::Array { items, .. } => items.is_scalar(),
                _ => false,
            },
            _ => false,
        },
        BlockKind::Image | BlockKind::Line => false,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/spec/set.rs"]
mod tests;
