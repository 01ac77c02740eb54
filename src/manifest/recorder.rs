use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::foundation::error::{SynthError, SynthResult};
use crate::manifest::model::{BatchInfo, Manifest, Sample};
use crate::manifest::store::{load_manifest, store_manifest};

/// What to do with a manifest already present at the output path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManifestMode {
    /// Start a new dataset; refuse if recorded samples exist.
    #[default]
    Create,
    /// Keep recorded samples and add missing ones. Inputs must be unchanged.
    Resume,
    /// Discard the recorded dataset.
    Overwrite,
}

/// Serializes manifest appends from concurrent workers and persists after every append.
#[derive(Debug)]
pub struct ManifestRecorder {
    path: PathBuf,
    inner: Mutex<Manifest>,
}

impl ManifestRecorder {
    /// Open the manifest at `path` for a batch with settings `batch`.
    ///
    /// Recorded samples are never dropped implicitly: `Create` fails over a non-empty manifest
    /// and `Resume` fails when the recorded batch was made from different inputs.
    pub fn open(path: &Path, batch: BatchInfo, mode: ManifestMode) -> SynthResult<Self> {
        let existing = match mode {
            ManifestMode::Overwrite => None,
            ManifestMode::Create | ManifestMode::Resume if path.exists() => {
                Some(load_manifest(path)?)
            }
            ManifestMode::Create | ManifestMode::Resume => None,
        };

        let manifest = match existing {
            Some(m) if m.samples.is_empty() => Manifest::new(batch),
            Some(m) if mode == ManifestMode::Create => {
                return Err(SynthError::conflict(format!(
                    "'{}' already records {} samples; resume or overwrite it explicitly",
                    path.display(),
                    m.samples.len()
                )));
            }
            Some(mut m) => {
                let changed = m.batch.changed_inputs(&batch);
                if !changed.is_empty() {
                    return Err(SynthError::conflict(format!(
                        "cannot resume '{}': {} changed since its samples were recorded",
                        path.display(),
                        changed.join(", ")
                    )));
                }
                tracing::info!(samples = m.samples.len(), "resuming from existing manifest");
                m.batch.tool_version = batch.tool_version;
                m
            }
            None => Manifest::new(batch),
        };
        store_manifest(path, &manifest)?;
        Ok(Self {
            path: path.to_owned(),
            inner: Mutex::new(manifest),
        })
    }

    /// Record a sample and persist the manifest.
    ///
    /// An index that is already recorded is a conflict; recorded samples are immutable. On
    /// failure the in-memory manifest is left as it was.
    pub fn append(&self, sample: Sample) -> SynthResult<()> {
        let mut m = self
            .inner
            .lock()
            .map_err(|_| SynthError::persistence("manifest lock poisoned"))?;
        if m.samples.iter().any(|s| s.index == sample.index) {
            return Err(SynthError::conflict(format!(
                "{} is already recorded",
                sample.id
            )));
        }
        m.samples.push(sample);
        if let Err(e) = store_manifest(&self.path, &m) {
            m.samples.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Copy of the current manifest.
    pub fn snapshot(&self) -> SynthResult<Manifest> {
        self.inner
            .lock()
            .map(|m| m.clone())
            .map_err(|_| SynthError::persistence("manifest lock poisoned"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/recorder.rs"]
mod tests;
