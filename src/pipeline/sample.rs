use std::sync::Arc;

use crate::content::enforcer::Enforcer;
use crate::content::provider::{ContentProvider, ProviderConfig, create_provider};
use crate::foundation::error::{SynthError, SynthResult};
use crate::foundation::math::derive_sample_seed;
use crate::layout::block::{ContentOrigin, ResolvedLayoutBlock, page_count};
use crate::layout::engine::resolve_layout;
use crate::manifest::fingerprint::{fingerprint_layout, fingerprint_truth};
use crate::manifest::model::{Sample, SampleHashes, SlotRecord};
use crate::manifest::store::write_atomic;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::config::{GROUNDTRUTH_DIR, IMAGES_DIR, PipelineConfig};
use crate::render::backend::{
    RenderBackend, RenderResult, RenderTarget, check_contract, create_backend, ensure_dir,
};
use crate::spec::set::SpecSet;
use crate::truth::adapters::{AdapterRegistry, GroundTruthAdapter, artifact_file};
use crate::truth::derive::{check_alignment, derive_ground_truth};
use crate::truth::model::GroundTruth;

/// Stable sample id for a batch position.
pub fn sample_id(index: u64) -> String {
    format!("sample_{index:06}")
}

/// Everything a worker needs, shared read-only across the batch.
pub struct Pipeline {
    pub(crate) specs: SpecSet,
    pub(crate) config: PipelineConfig,
    pub(crate) provider: Arc<dyn ContentProvider>,
    pub(crate) provider_hash: String,
    pub(crate) backend: Arc<dyn RenderBackend>,
    pub(crate) adapters: Vec<Arc<dyn GroundTruthAdapter>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("provider", &self.provider.identity())
            .field("backend", &self.backend.identity())
            .field("adapters", &self.adapters.iter().map(|a| a.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline from configuration, with the built-in ground-truth adapters.
    pub fn new(
        specs: SpecSet,
        config: PipelineConfig,
        provider: &ProviderConfig,
    ) -> SynthResult<Self> {
        Self::with_registry(specs, config, provider, &AdapterRegistry::with_builtin())
    }

    /// Build a pipeline resolving output formats against `registry`.
    pub fn with_registry(
        specs: SpecSet,
        config: PipelineConfig,
        provider: &ProviderConfig,
        registry: &AdapterRegistry,
    ) -> SynthResult<Self> {
        let backend: Arc<dyn RenderBackend> = Arc::from(create_backend(config.backend)?);
        Self::from_parts(
            specs,
            config,
            create_provider(provider)?,
            provider.config_hash()?,
            backend,
            registry,
        )
    }

    /// Assemble a pipeline from already-built parts.
    pub fn from_parts(
        specs: SpecSet,
        config: PipelineConfig,
        provider: Arc<dyn ContentProvider>,
        provider_hash: String,
        backend: Arc<dyn RenderBackend>,
        registry: &AdapterRegistry,
    ) -> SynthResult<Self> {
        config.validate()?;
        let adapters = registry.resolve(&specs.groundtruth.formats)?;
        Ok(Self {
            specs,
            config,
            provider,
            provider_hash,
            backend,
            adapters,
        })
    }

    /// Batch configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validated spec set.
    pub fn specs(&self) -> &SpecSet {
        &self.specs
    }

    /// Render backend.
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Every input hash a sample of this pipeline depends on.
    pub fn sample_hashes(&self) -> SampleHashes {
        SampleHashes {
            specs: self.specs.hashes(),
            provider: self.provider_hash.clone(),
        }
    }

    /// Resolve the layout of one seed through the structured-output enforcer.
    pub fn layout(
        &self,
        seed: u64,
        cancel: Option<&CancelToken>,
    ) -> SynthResult<Vec<ResolvedLayoutBlock>> {
        let enforcer = Enforcer::new(
            self.provider.as_ref(),
            &self.specs.ruleset,
            self.config.policy,
            cancel,
        );
        resolve_layout(&self.specs, seed, &enforcer)
    }

    /// Run one sample end to end and return its manifest record.
    ///
    /// Cancellation is honored between stages up to ground-truth emission. Page images of an
    /// abandoned sample are removed.
    pub fn run_sample(&self, index: u64, cancel: &CancelToken) -> SynthResult<Sample> {
        let id = sample_id(index);
        let seed = derive_sample_seed(self.config.global_seed, index);
        checkpoint(cancel)?;

        let blocks = self.layout(seed, Some(cancel))?;
        checkpoint(cancel)?;

        let target = RenderTarget::new(self.config.images_dir(), id.clone());
        let rendered = render_and_derive(&self.specs, self.backend.as_ref(), &blocks, &id, &target)
            .and_then(|out| checkpoint(cancel).map(|()| out));
        let (render, gt) = match rendered {
            Ok(out) => out,
            Err(e) => {
                remove_pages(&target, &blocks);
                return Err(e);
            }
        };

        let ground_truth = self.emit(&id, &gt)?;
        let slots = SlotRecord::collect(&blocks);
        let degraded = slots.iter().any(|s| s.origin == ContentOrigin::Fallback);
        if degraded {
            tracing::warn!(sample = %id, "sample uses fallback content");
        }
        Ok(Sample {
            id,
            index,
            seed,
            hashes: self.sample_hashes(),
            renderer: render.backend.clone(),
            provider: self.provider.identity(),
            nondeterministic_render: render.nondeterministic,
            images: render
                .pages
                .iter()
                .filter_map(|p| p.image.as_deref())
                .map(|f| PipelineConfig::relative(IMAGES_DIR, f))
                .collect(),
            ground_truth,
            blocks: blocks.len() as u32,
            pages: render.pages.len() as u32,
            degraded,
            slots,
            layout_fingerprint: fingerprint_layout(&blocks).to_hex(),
            truth_fingerprint: fingerprint_truth(&gt).to_hex(),
        })
    }

    fn emit(&self, id: &str, gt: &GroundTruth) -> SynthResult<Vec<String>> {
        let dir = self.config.groundtruth_dir();
        ensure_dir(&dir)?;
        let mut out = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let file = artifact_file(id, adapter.as_ref());
            let bytes = adapter.encode(gt)?;
            write_atomic(&dir.join(&file), &bytes)?;
            out.push(PipelineConfig::relative(GROUNDTRUTH_DIR, &file));
        }
        Ok(out)
    }
}

/// Render `blocks`, check the renderer contract, then derive and check ground truth.
pub(crate) fn render_and_derive(
    specs: &SpecSet,
    backend: &dyn RenderBackend,
    blocks: &[ResolvedLayoutBlock],
    id: &str,
    target: &RenderTarget,
) -> SynthResult<(RenderResult, GroundTruth)> {
    let render = backend.render(&specs.structure, blocks, target)?;
    check_contract(&specs.structure, blocks, &render)?;
    let gt = derive_ground_truth(id, &specs.groundtruth, blocks, &render)?;
    check_alignment(&gt, blocks)?;
    Ok((render, gt))
}

fn checkpoint(cancel: &CancelToken) -> SynthResult<()> {
    if cancel.is_cancelled() {
        Err(SynthError::Cancelled)
    } else {
        Ok(())
    }
}

fn remove_pages(target: &RenderTarget, blocks: &[ResolvedLayoutBlock]) {
    for p in 0..page_count(blocks).max(1) {
        let _ = std::fs::remove_file(target.page_path(p));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/sample.rs"]
mod tests;
