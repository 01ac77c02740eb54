use std::path::PathBuf;

use crate::content::enforcer::EnforcerPolicy;
use crate::foundation::error::{SynthError, SynthResult};
use crate::manifest::model::MANIFEST_FILE;
use crate::manifest::recorder::ManifestMode;
use crate::render::backend::BackendKind;

/// Sub-directory of the output directory holding page images.
pub const IMAGES_DIR: &str = "images";

/// Sub-directory of the output directory holding ground-truth artifacts.
pub const GROUNDTRUTH_DIR: &str = "groundtruth";

/// Immutable batch configuration, built once and threaded through the orchestrator.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Dataset root: manifest, `images/`, `groundtruth/`.
    pub output_dir: PathBuf,
    pub samples: u64,
    /// Seed every per-sample seed is derived from.
    pub global_seed: u64,
    /// Worker threads (`None` = one per core).
    pub workers: Option<usize>,
    /// Handling of a manifest already in `output_dir`.
    pub mode: ManifestMode,
    pub policy: EnforcerPolicy,
    pub backend: BackendKind,
}

impl PipelineConfig {
    /// Defaults for everything except the output directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            samples: 1,
            global_seed: 0,
            workers: None,
            mode: ManifestMode::Create,
            policy: EnforcerPolicy::default(),
            backend: BackendKind::default(),
        }
    }

    /// Reject settings no batch can run with.
    pub fn validate(&self) -> SynthResult<()> {
        if self.workers == Some(0) {
            return Err(SynthError::Other(anyhow::anyhow!(
                "pipeline 'workers' must be >= 1 when set"
            )));
        }
        Ok(())
    }

    /// `manifest.json` inside the output directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_FILE)
    }

    /// Page image directory.
    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIR)
    }

    /// Ground-truth artifact directory.
    pub fn groundtruth_dir(&self) -> PathBuf {
        self.output_dir.join(GROUNDTRUTH_DIR)
    }

    /// Output-relative path of an artifact, with `/` separators.
    pub(crate) fn relative(dir: &str, file: &str) -> String {
        format!("{dir}/{file}")
    }
}
