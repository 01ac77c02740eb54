//! Reproducibility check: regenerate every recorded sample from the manifest and compare.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::content::enforcer::{Enforcer, EnforcerPolicy};
use crate::content::replay::ReplayProvider;
use crate::foundation::error::SynthResult;
use crate::layout::engine::resolve_layout;
use crate::manifest::fingerprint::{fingerprint_layout, fingerprint_truth};
use crate::manifest::model::{Manifest, Sample};
use crate::pipeline::sample::render_and_derive;
use crate::render::backend::{RenderBackend, RenderTarget, ensure_dir};
use crate::spec::set::SpecSet;

/// One field that did not reproduce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub sample: String,
    /// What differed (`layout_fingerprint`, `spec.structure`, ...).
    pub field: String,
    pub recorded: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} recorded {} but regenerated {}",
            self.sample, self.field, self.recorded, self.actual
        )
    }
}

/// Result of [`verify_manifest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    /// Return `true` when every sample reproduced exactly.
    pub fn is_reproducible(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Regenerate layout and ground truth of every sample from its recorded seed and slot contents.
///
/// Generated slots are served by a [`ReplayProvider`], so the check holds even for samples whose
/// content came from a non-deterministic provider. Page images go to `scratch`.
#[tracing::instrument(skip(specs, manifest, backend), fields(samples = manifest.samples.len()))]
pub fn verify_manifest(
    specs: &SpecSet,
    manifest: &Manifest,
    backend: &dyn RenderBackend,
    scratch: &Path,
) -> SynthResult<VerifyReport> {
    ensure_dir(scratch)?;
    let hashes = specs.hashes();
    let identity = backend.identity();
    let mut report = VerifyReport::default();

    for sample in &manifest.samples {
        report.checked += 1;
        let mut mismatch = |field: &str, recorded: &str, actual: &str| {
            if recorded != actual {
                report.mismatches.push(Mismatch {
                    sample: sample.id.clone(),
                    field: field.to_owned(),
                    recorded: recorded.to_owned(),
                    actual: actual.to_owned(),
                });
            }
        };
        let recorded = &sample.hashes.specs;
        mismatch("spec.structure", &recorded.structure, &hashes.structure);
        mismatch("spec.groundtruth", &recorded.groundtruth, &hashes.groundtruth);
        mismatch("spec.ruleset", &recorded.ruleset, &hashes.ruleset);
        mismatch("renderer", &sample.renderer.to_string(), &identity.to_string());

        match regenerate(specs, sample, backend, scratch) {
            Ok((layout, truth)) => {
                mismatch("layout_fingerprint", &sample.layout_fingerprint, &layout);
                mismatch("truth_fingerprint", &sample.truth_fingerprint, &truth);
            }
            Err(e) => mismatch("regeneration", "ok", &format!("{} ({e})", e.class())),
        }
    }
    if !report.is_reproducible() {
        tracing::warn!(mismatches = report.mismatches.len(), "manifest does not reproduce");
    }
    Ok(report)
}

fn regenerate(
    specs: &SpecSet,
    sample: &Sample,
    backend: &dyn RenderBackend,
    scratch: &Path,
) -> SynthResult<(String, String)> {
    let replay = ReplayProvider::new(
        sample
            .slots
            .iter()
            .map(|s| (s.block_id.clone(), s.value.clone())),
    );
    let enforcer = Enforcer::new(
        &replay,
        &specs.ruleset,
        EnforcerPolicy { repair_attempts: 0 },
        None,
    );
    let blocks = resolve_layout(specs, sample.seed, &enforcer)?;
    let target = RenderTarget::new(scratch, sample.id.clone());
    let (_, gt) = render_and_derive(specs, backend, &blocks, &sample.id, &target)?;
    Ok((
        fingerprint_layout(&blocks).to_hex(),
        fingerprint_truth(&gt).to_hex(),
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/reproduce.rs"]
mod tests;
