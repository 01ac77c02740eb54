use crate::foundation::error::SynthResult;
use crate::layout::block::ResolvedLayoutBlock;
use crate::render::backend::{
    BackendIdentity, PaintedBlock, RenderBackend, RenderResult, RenderTarget, page_list,
    used_metrics,
};
use crate::spec::structure::DocumentSpec;

/// Paints nothing and reports the requested geometry verbatim. Used for layout-only datasets and
/// as the exact baseline in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutOnlyBackend;

impl RenderBackend for LayoutOnlyBackend {
    fn identity(&self) -> BackendIdentity {
        BackendIdentity {
            name: "layout-only".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    fn render(
        &self,
        spec: &DocumentSpec,
        blocks: &[ResolvedLayoutBlock],
        _target: &RenderTarget,
    ) -> SynthResult<RenderResult> {
        Ok(RenderResult {
            backend: self.identity(),
            pages: page_list(spec, blocks, None),
            painted: blocks
                .iter()
                .map(|b| PaintedBlock {
                    id: b.id.clone(),
                    page: b.page,
                    rect: b.bbox,
                })
                .collect(),
            metrics: used_metrics(spec, blocks),
            tolerance_px: self.tolerance_px(),
            snap: self.snap_rule(),
            nondeterministic: false,
        })
    }
}
