use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{PxRect, SnapRule};
use crate::foundation::error::{SynthError, SynthResult};
use crate::layout::block::{ResolvedLayoutBlock, page_count};
use crate::spec::structure::DocumentSpec;
use crate::text::metrics::FontMetrics;

/// Name and version of a renderer backend, recorded in every sample.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendIdentity {
    pub name: String,
    pub version: String,
}

impl std::fmt::Display for BackendIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Where a backend writes page images.
#[derive(Clone, Debug)]
pub struct RenderTarget {
    pub dir: PathBuf,
    /// File stem shared by every page of the sample.
    pub stem: String,
}

impl RenderTarget {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// File name of a page image, relative to `dir`.
    pub fn page_file(&self, page: u32) -> String {
        format!("{}_p{page}.png", self.stem)
    }

    /// Full path of a page image.
    pub fn page_path(&self, page: u32) -> PathBuf {
        self.dir.join(self.page_file(page))
    }
}

/// One rendered page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRender {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    /// Image file relative to the target directory, when the backend produces pixels.
    pub image: Option<String>,
}

/// Rectangle a backend actually painted for one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintedBlock {
    pub id: String,
    pub page: u32,
    pub rect: PxRect,
}

/// Output of one render call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    pub backend: BackendIdentity,
    pub pages: Vec<PageRender>,
    /// Painted rectangle per block, in reading order.
    pub painted: Vec<PaintedBlock>,
    pub metrics: BTreeMap<String, FontMetrics>,
    /// Largest deviation between a requested and a painted edge, in pixels.
    pub tolerance_px: u32,
    pub snap: SnapRule,
    /// Pixel output may differ between runs with identical input.
    pub nondeterministic: bool,
}

/// A renderer that paints resolved blocks.
///
/// Backends must paint every block inside its box (within the declared tolerance) and measure
/// text with [`FontMetrics`]. [`check_contract`] verifies both.
pub trait RenderBackend: Send + Sync {
    fn identity(&self) -> BackendIdentity;

    /// Declared maximum edge deviation in pixels.
    fn tolerance_px(&self) -> u32 {
        0
    }

    /// Snap rule applied to fractional text geometry.
    fn snap_rule(&self) -> SnapRule {
        SnapRule::RoundHalfUp
    }

    /// Whether pixel output can vary between identical runs.
    fn nondeterministic(&self) -> bool {
        false
    }

    /// Render one sample.
    fn render(
        &self,
        spec: &DocumentSpec,
        blocks: &[ResolvedLayoutBlock],
        target: &RenderTarget,
    ) -> SynthResult<RenderResult>;
}

/// Built-in backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// PNG pages painted with `image`.
    #[default]
    Raster,
    /// No pixels; geometry only.
    LayoutOnly,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raster" => Ok(Self::Raster),
            "layout-only" | "layout_only" => Ok(Self::LayoutOnly),
            other => Err(format!("unknown backend '{other}' (expected raster or layout-only)")),
        }
    }
}

/// Create a rendering backend.
pub fn create_backend(kind: BackendKind) -> SynthResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Raster => Ok(Box::new(crate::render::raster::RasterBackend::new())),
        BackendKind::LayoutOnly => Ok(Box::new(crate::render::layout_only::LayoutOnlyBackend)),
    }
}

/// Metrics of every style used by `blocks`.
pub fn used_metrics(
    spec: &DocumentSpec,
    blocks: &[ResolvedLayoutBlock],
) -> BTreeMap<String, FontMetrics> {
    blocks
        .iter()
        .filter_map(|b| b.style.as_ref())
        .map(|(name, style)| (name.clone(), FontMetrics::new(style, spec.page.dpi)))
        .collect()
}

/// Page list for `blocks` (at least one page).
pub fn page_list(
    spec: &DocumentSpec,
    blocks: &[ResolvedLayoutBlock],
    target: Option<&RenderTarget>,
) -> Vec<PageRender> {
    (0..page_count(blocks).max(1))
        .map(|index| PageRender {
            index,
            width: spec.page.width,
            height: spec.page.height,
            dpi: spec.page.dpi,
            image: target.map(|t| t.page_file(index)),
        })
        .collect()
}

/// Verify that a render result honors the renderer contract for `blocks`.
///
/// Violations are reported verbatim and never corrected.
pub fn check_contract(
    spec: &DocumentSpec,
    blocks: &[ResolvedLayoutBlock],
    result: &RenderResult,
) -> SynthResult<()> {
    let backend = &result.backend.name;
    if result.painted.len() != blocks.len() {
        return Err(SynthError::renderer_contract(format!(
            "{backend} painted {} blocks, expected {}",
            result.painted.len(),
            blocks.len()
        )));
    }
    for (block, painted) in blocks.iter().zip(&result.painted) {
        if painted.id != block.id || painted.page != block.page {
            return Err(SynthError::renderer_contract(format!(
                "{backend} painted `{}` on page {} where `{}` on page {} was expected",
                painted.id, painted.page, block.id, block.page
            )));
        }
        let deviation = painted.rect.max_edge_deviation(block.bbox);
        if deviation > result.tolerance_px {
            return Err(SynthError::renderer_contract(format!(
                "{backend} painted `{}` at {:?}, {deviation}px from {:?} (tolerance {}px)",
                block.id, painted.rect, block.bbox, result.tolerance_px
            )));
        }
    }

    for (name, expected) in used_metrics(spec, blocks) {
        match result.metrics.get(&name) {
            Some(used) if *used == expected => {}
            Some(used) => {
                return Err(SynthError::renderer_contract(format!(
                    "{backend} measured style `{name}` with {used:?}, expected {expected:?}"
                )));
            }
            None => {
                return Err(SynthError::renderer_contract(format!(
                    "{backend} did not report metrics for style `{name}`"
                )));
            }
        }
    }

    let expected_pages = page_count(blocks).max(1);
    if result.pages.len() != expected_pages as usize {
        return Err(SynthError::renderer_contract(format!(
            "{backend} produced {} pages, expected {expected_pages}",
            result.pages.len()
        )));
    }
    for page in &result.pages {
        let expected = (spec.page.width, spec.page.height, spec.page.dpi);
        if (page.width, page.height, page.dpi) != expected {
            return Err(SynthError::renderer_contract(format!(
                "{backend} page {} is {}x{}@{}dpi, expected {}x{}@{}dpi",
                page.index,
                page.width,
                page.height,
                page.dpi,
                spec.page.width,
                spec.page.height,
                spec.page.dpi
            )));
        }
    }
    Ok(())
}

/// Create the target directory if needed.
pub(crate) fn ensure_dir(dir: &Path) -> SynthResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| SynthError::persistence(format!("create '{}': {e}", dir.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
