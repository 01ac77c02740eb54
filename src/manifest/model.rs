use serde::{Deserialize, Serialize};

use crate::content::provider::ProviderIdentity;
use crate::layout::block::{ContentOrigin, ResolvedLayoutBlock};
use crate::render::backend::BackendIdentity;
use crate::spec::set::SpecHashes;

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Every input hash a sample depends on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleHashes {
    pub specs: SpecHashes,
    /// Canonical hash of the resolved provider configuration.
    pub provider: String,
}

/// Recorded content of one generated slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub block_id: String,
    pub slot: String,
    pub origin: ContentOrigin,
    pub attempts: u32,
    pub value: serde_json::Value,
}

impl SlotRecord {
    /// Records of every generated slot in `blocks`, in reading order.
    pub fn collect(blocks: &[ResolvedLayoutBlock]) -> Vec<Self> {
        blocks
            .iter()
            .filter_map(|b| {
                b.slot.as_ref().map(|s| Self {
                    block_id: b.id.clone(),
                    slot: s.slot.clone(),
                    origin: s.origin,
                    attempts: s.attempts,
                    value: s.value.clone(),
                })
            })
            .collect()
    }
}

/// One generated sample. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// `sample_000042`.
    pub id: String,
    pub index: u64,
    pub seed: u64,
    pub hashes: SampleHashes,
    pub renderer: BackendIdentity,
    pub provider: ProviderIdentity,
    pub nondeterministic_render: bool,
    /// Page images, relative to the output directory.
    pub images: Vec<String>,
    /// Ground-truth artifacts, relative to the output directory.
    pub ground_truth: Vec<String>,
    pub blocks: u32,
    pub pages: u32,
    /// At least one slot fell back to synthesized content.
    pub degraded: bool,
    pub slots: Vec<SlotRecord>,
    pub layout_fingerprint: String,
    pub truth_fingerprint: String,
}

/// Batch-level settings shared by every sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// `docsynth` version that wrote the manifest.
    pub tool_version: String,
    pub global_seed: u64,
    pub specs: SpecHashes,
    pub provider_hash: String,
    pub provider: ProviderIdentity,
    pub renderer: BackendIdentity,
}

impl BatchInfo {
    /// Names of the reproducibility inputs that differ between two batches.
    ///
    /// The tool version is not an input: `verify` catches engine changes.
    pub fn changed_inputs(&self, other: &BatchInfo) -> Vec<&'static str> {
        let mut changed = spec_changes(&self.specs, &other.specs);
        if self.global_seed != other.global_seed {
            changed.push("global_seed");
        }
        if self.provider_hash != other.provider_hash || self.provider != other.provider {
            changed.push("provider");
        }
        if self.renderer != other.renderer {
            changed.push("renderer");
        }
        changed
    }
}

/// How the recorded sample at one index relates to the inputs of a new run.
#[derive(Clone, Debug, PartialEq)]
pub enum Recorded<'a> {
    Absent,
    Unchanged(&'a Sample),
    /// Recorded from other inputs; names the ones that differ.
    Changed(Vec<&'static str>),
}

/// The reproducibility record of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub batch: BatchInfo,
    pub samples: Vec<Sample>,
}

impl Manifest {
    pub fn new(batch: BatchInfo) -> Self {
        Self {
            version: MANIFEST_VERSION,
            batch,
            samples: Vec::new(),
        }
    }

    /// Compare the sample recorded at `index` with the inputs a new run would use.
    pub fn lookup(
        &self,
        index: u64,
        seed: u64,
        hashes: &SampleHashes,
        renderer: &BackendIdentity,
    ) -> Recorded<'_> {
        let Some(s) = self.samples.iter().find(|s| s.index == index) else {
            return Recorded::Absent;
        };
        let mut changed = spec_changes(&s.hashes.specs, &hashes.specs);
        if s.seed != seed {
            changed.push("seed");
        }
        if s.hashes.provider != hashes.provider {
            changed.push("provider");
        }
        if &s.renderer != renderer {
            changed.push("renderer");
        }
        if changed.is_empty() {
            Recorded::Unchanged(s)
        } else {
            Recorded::Changed(changed)
        }
    }

    /// Recorded sample for `index` produced from exactly these inputs.
    pub fn completed(
        &self,
        index: u64,
        seed: u64,
        hashes: &SampleHashes,
        renderer: &BackendIdentity,
    ) -> Option<&Sample> {
        match self.lookup(index, seed, hashes, renderer) {
            Recorded::Unchanged(s) => Some(s),
            Recorded::Absent | Recorded::Changed(_) => None,
        }
    }

    pub fn degraded_count(&self) -> usize {
        self.samples.iter().filter(|s| s.degraded).count()
    }
}

fn spec_changes(a: &SpecHashes, b: &SpecHashes) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if a.structure != b.structure {
        changed.push("spec.structure");
    }
    if a.groundtruth != b.groundtruth {
        changed.push("spec.groundtruth");
    }
    if a.ruleset != b.ruleset {
        changed.push("spec.ruleset");
    }
    changed
}
