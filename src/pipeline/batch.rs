use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::foundation::error::{SynthError, SynthResult};
use crate::foundation::math::derive_sample_seed;
use crate::manifest::model::{BatchInfo, Recorded};
use crate::manifest::recorder::{ManifestMode, ManifestRecorder};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::sample::{Pipeline, sample_id};
use crate::render::backend::ensure_dir;

/// A sample that did not make it into the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SampleFailure {
    pub index: u64,
    pub id: String,
    /// Error class (`LayoutConstraintError`, ...).
    pub class: String,
    pub diagnostic: String,
}

/// Outcome counts of one batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub requested: u64,
    /// Persisted with provider or literal content only.
    pub succeeded: u64,
    /// Persisted with at least one fallback slot.
    pub degraded: u64,
    pub failed: Vec<SampleFailure>,
    /// Already recorded, unchanged, in a resumed manifest.
    pub skipped: u64,
    /// Not run or abandoned because of cancellation.
    pub cancelled: u64,
    pub manifest: PathBuf,
}

impl BatchReport {
    /// Samples persisted by this run (clean or degraded).
    pub fn completed(&self) -> u64 {
        self.succeeded + self.degraded
    }

    /// Return `true` when no sample failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested: {} succeeded, {} degraded, {} failed, {} skipped, {} cancelled",
            self.requested,
            self.succeeded,
            self.degraded,
            self.failed.len(),
            self.skipped,
            self.cancelled
        )?;
        for fail in &self.failed {
            write!(f, "\n  {} [{}]: {}", fail.id, fail.class, fail.diagnostic)?;
        }
        Ok(())
    }
}

enum Outcome {
    Persisted { degraded: bool },
    Skipped,
    Cancelled,
    Failed(SampleFailure),
}

impl Pipeline {
    /// Run every sample of the batch on a bounded worker pool and record them in the manifest.
    ///
    /// Sample failures are reported, never propagated; only setup errors (output directory,
    /// manifest, thread pool) fail the whole call.
    #[tracing::instrument(
        skip_all,
        fields(samples = self.config.samples, seed = self.config.global_seed)
    )]
    pub fn run_batch(&self, cancel: &CancelToken) -> SynthResult<BatchReport> {
        let cfg = &self.config;
        ensure_dir(&cfg.output_dir)?;
        let hashes = self.sample_hashes();
        let renderer = self.backend.identity();
        let batch = BatchInfo {
            tool_version: env!("CARGO_PKG_VERSION").to_owned(),
            global_seed: cfg.global_seed,
            specs: hashes.specs.clone(),
            provider_hash: hashes.provider.clone(),
            provider: self.provider.identity(),
            renderer: renderer.clone(),
        };
        let recorder = ManifestRecorder::open(&cfg.manifest_path(), batch, cfg.mode)?;
        if cfg.mode == ManifestMode::Overwrite {
            tracing::info!("discarding previous artifacts");
            remove_dir(&cfg.images_dir())?;
            remove_dir(&cfg.groundtruth_dir())?;
        }
        ensure_dir(&cfg.images_dir())?;
        ensure_dir(&cfg.groundtruth_dir())?;
        let existing = recorder.snapshot()?;
        let pool = build_thread_pool(cfg.workers)?;

        let outcomes: Vec<Outcome> = pool.install(|| {
            (0..cfg.samples)
                .into_par_iter()
                .map(|index| {
                    if cancel.is_cancelled() {
                        return Outcome::Cancelled;
                    }
                    let seed = derive_sample_seed(cfg.global_seed, index);
                    match existing.lookup(index, seed, &hashes, &renderer) {
                        Recorded::Absent => {}
                        Recorded::Unchanged(_) => {
                            tracing::debug!(index, "already in manifest");
                            return Outcome::Skipped;
                        }
                        Recorded::Changed(fields) => {
                            let e = SynthError::conflict(format!(
                                "{} was recorded with a different {}",
                                sample_id(index),
                                fields.join(", ")
                            ));
                            return Outcome::Failed(failure(index, &e));
                        }
                    }
                    let span = tracing::info_span!("sample", index, seed);
                    let _enter = span.enter();
                    let result = self.run_sample(index, cancel).and_then(|s| {
                        let degraded = s.degraded;
                        recorder.append(s).map(|()| degraded)
                    });
                    match result {
                        Ok(degraded) => Outcome::Persisted { degraded },
                        Err(SynthError::Cancelled) => Outcome::Cancelled,
                        Err(e) => {
                            tracing::warn!(class = e.class(), error = %e, "sample failed");
                            Outcome::Failed(failure(index, &e))
                        }
                    }
                })
                .collect()
        });

        let mut report = BatchReport {
            requested: cfg.samples,
            manifest: recorder.path().to_owned(),
            ..BatchReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Persisted { degraded: false } => report.succeeded += 1,
                Outcome::Persisted { degraded: true } => report.degraded += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Cancelled => report.cancelled += 1,
                Outcome::Failed(f) => report.failed.push(f),
            }
        }
        tracing::info!(
            succeeded = report.succeeded,
            degraded = report.degraded,
            failed = report.failed.len(),
            skipped = report.skipped,
            cancelled = report.cancelled,
            "batch finished"
        );
        Ok(report)
    }
}

fn failure(index: u64, e: &SynthError) -> SampleFailure {
    SampleFailure {
        index,
        id: sample_id(index),
        class: e.class().to_owned(),
        diagnostic: e.to_string(),
    }
}

fn remove_dir(dir: &Path) -> SynthResult<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SynthError::persistence(format!(
            "remove '{}': {e}",
            dir.display()
        ))),
    }
}

fn build_thread_pool(workers: Option<usize>) -> SynthResult<rayon::ThreadPool> {
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("docsynth-worker-{i}"));
    if let Some(n) = workers {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SynthError::Other(anyhow::anyhow!("failed to build worker pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/batch.rs"]
mod tests;
