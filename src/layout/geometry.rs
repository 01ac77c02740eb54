//! Page-space text geometry shared by renderer backends and ground truth.

use crate::foundation::core::{FRect, PxRect};
use crate::layout::block::{ResolvedContent, ResolvedLayoutBlock};
use crate::text::wrap::TextLine;

/// One word in page pixels, before snapping.
#[derive(Clone, Debug, PartialEq)]
pub struct WordGeometry {
    pub text: String,
    /// Word box spanning the full line height.
    pub rect: FRect,
}

/// One text line in page pixels, before snapping.
#[derive(Clone, Debug, PartialEq)]
pub struct LineGeometry {
    pub text: String,
    pub rect: FRect,
    /// Table cell `(row, col)` the line belongs to.
    pub cell: Option<(usize, usize)>,
    pub words: Vec<WordGeometry>,
}

/// Lines and words of a block, in reading order, clipped to the block box.
pub fn text_geometry(block: &ResolvedLayoutBlock) -> Vec<LineGeometry> {
    let mut out = Vec::new();
    match &block.content {
        ResolvedContent::Text { layout, .. } => {
            for line in &layout.lines {
                out.extend(line_geometry(block.bbox, line, None));
            }
        }
        ResolvedContent::Table { layout, .. } => {
            for cell in &layout.cells {
                for line in &cell.text.lines {
                    out.extend(line_geometry(block.bbox, line, Some((cell.row, cell.col))));
                }
            }
        }
        ResolvedContent::Empty | ResolvedContent::Image { .. } => {}
    }
    out
}

fn line_geometry(
    bbox: PxRect,
    line: &TextLine,
    cell: Option<(usize, usize)>,
) -> Option<LineGeometry> {
    if line.words.is_empty() {
        return None;
    }
    let rect = clip(
        FRect {
            x: line.x,
            y: line.y,
            w: line.width,
            h: line.height,
        }
        .offset(bbox.x, bbox.y),
        bbox,
    )?;
    let words = line
        .words
        .iter()
        .filter_map(|w| {
            let r = FRect {
                x: w.x,
                y: line.y,
                w: w.width,
                h: line.height,
            }
            .offset(bbox.x, bbox.y);
            clip(r, bbox).map(|rect| WordGeometry {
                text: w.text.clone(),
                rect,
            })
        })
        .collect();
    Some(LineGeometry {
        text: line.text(),
        rect,
        cell,
        words,
    })
}

/// Intersect with the block box; `None` when nothing is left.
fn clip(r: FRect, bbox: PxRect) -> Option<FRect> {
    let x0 = r.x.max(f64::from(bbox.x));
    let y0 = r.y.max(f64::from(bbox.y));
    let x1 = (r.x + r.w).min(f64::from(bbox.right()));
    let y1 = (r.y + r.h).min(f64::from(bbox.bottom()));
    (x1 > x0 && y1 > y0).then(|| FRect {
        x: x0,
        y: y0,
        w: x1 - x0,
        h: y1 - y0,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/layout/geometry.rs"]
mod tests;
