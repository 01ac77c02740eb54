use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use crate::foundation::core::{FRect, PxRect, SnapRule};
use crate::foundation::error::{SynthError, SynthResult};
use crate::layout::block::{ResolvedContent, ResolvedLayoutBlock};
use crate::layout::geometry::text_geometry;
use crate::manifest::store::write_atomic;
use crate::render::backend::{
    BackendIdentity, PaintedBlock, RenderBackend, RenderResult, RenderTarget, ensure_dir,
    page_list, used_metrics,
};
use crate::spec::structure::{BlockKind, DocumentSpec};

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([32, 32, 32]);
const GRID: Rgb<u8> = Rgb([150, 150, 150]);
const PLACEHOLDER: Rgb<u8> = Rgb([222, 222, 222]);

/// Reference raster backend: one PNG per page.
///
/// Words are painted as solid bars over the glyph band of their line, so every painted pixel
/// comes from the same geometry ground truth is derived from.
#[derive(Debug, Clone, Default)]
pub struct RasterBackend {
    snap: SnapRule,
}

impl RasterBackend {
    /// Create a raster backend with round-half-up snapping.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for RasterBackend {
    fn identity(&self) -> BackendIdentity {
        BackendIdentity {
            name: "raster".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    fn tolerance_px(&self) -> u32 {
        1
    }

    fn snap_rule(&self) -> SnapRule {
        self.snap
    }

    #[tracing::instrument(skip(self, spec, blocks), fields(stem = %target.stem))]
    fn render(
        &self,
        spec: &DocumentSpec,
        blocks: &[ResolvedLayoutBlock],
        target: &RenderTarget,
    ) -> SynthResult<RenderResult> {
        let pages = page_list(spec, blocks, Some(target));
        let mut canvases: Vec<RgbImage> = pages
            .iter()
            .map(|p| RgbImage::from_pixel(p.width, p.height, PAPER))
            .collect();

        let mut painted = Vec::with_capacity(blocks.len());
        for block in blocks {
            let Some(canvas) = canvases.get_mut(block.page as usize) else {
                return Err(SynthError::renderer_contract(format!(
                    "block `{}` is on page {} but only {} pages exist",
                    block.id,
                    block.page,
                    pages.len()
                )));
            };
            let rect = self.paint_block(canvas, block);
            painted.push(PaintedBlock {
                id: block.id.clone(),
                page: block.page,
                rect,
            });
        }

        ensure_dir(&target.dir)?;
        for (page, canvas) in pages.iter().zip(&canvases) {
            let path = target.page_path(page.index);
            let mut png = Vec::new();
            canvas
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| SynthError::persistence(format!("encode '{}': {e}", path.display())))?;
            write_atomic(&path, &png)?;
        }
        tracing::debug!(pages = pages.len(), "pages written");

        Ok(RenderResult {
            backend: self.identity(),
            pages,
            painted,
            metrics: used_metrics(spec, blocks),
            tolerance_px: self.tolerance_px(),
            snap: self.snap,
            nondeterministic: self.nondeterministic(),
        })
    }
}

impl RasterBackend {
    fn paint_block(&self, canvas: &mut RgbImage, block: &ResolvedLayoutBlock) -> PxRect {
        let rect = self.snap.snap(FRect {
            x: f64::from(block.bbox.x),
            y: f64::from(block.bbox.y),
            w: f64::from(block.bbox.width),
            h: f64::from(block.bbox.height),
        });

        match (&block.content, block.kind) {
            (_, BlockKind::Line) => fill(canvas, rect, INK),
            (ResolvedContent::Image { .. }, _) => {
                fill(canvas, rect, PLACEHOLDER);
                outline(canvas, rect, GRID);
            }
            (ResolvedContent::Table { layout, .. }, _) => {
                for cell in &layout.cells {
                    let cell_rect = self.snap.snap(
                        FRect {
                            x: cell.x,
                            y: cell.y,
                            w: cell.width,
                            h: cell.height,
                        }
                        .offset(rect.x, rect.y),
                    );
                    outline(canvas, cell_rect, GRID);
                }
            }
            _ => {}
        }

        for line in text_geometry(block) {
            for word in &line.words {
                let r = self.snap.snap(word.rect);
                // Glyph band: the middle of the line box.
                let inset = r.height / 5;
                fill(
                    canvas,
                    PxRect::new(r.x, r.y + inset, r.width, r.height.saturating_sub(2 * inset)),
                    INK,
                );
            }
        }
        rect
    }
}

fn fill(canvas: &mut RgbImage, r: PxRect, color: Rgb<u8>) {
    let x1 = r.right().min(canvas.width());
    let y1 = r.bottom().min(canvas.height());
    for y in r.y.min(y1)..y1 {
        for x in r.x.min(x1)..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn outline(canvas: &mut RgbImage, r: PxRect, color: Rgb<u8>) {
    if r.width == 0 || r.height == 0 {
        return;
    }
    fill(canvas, PxRect::new(r.x, r.y, r.width, 1), color);
    fill(canvas, PxRect::new(r.x, r.bottom() - 1, r.width, 1), color);
    fill(canvas, PxRect::new(r.x, r.y, 1, r.height), color);
    fill(canvas, PxRect::new(r.right() - 1, r.y, 1, r.height), color);
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
