//! Ground truth from the render-consumed layout.
//!
//! Boxes come from the same [`ResolvedLayoutBlock`] values the backend painted, snapped with the
//! backend's declared rule. Nothing here re-runs layout.

use crate::foundation::core::PxRect;
use crate::foundation::error::{SynthError, SynthResult};
use crate::layout::block::{ResolvedContent, ResolvedLayoutBlock};
use crate::layout::geometry::text_geometry;
use crate::render::backend::RenderResult;
use crate::spec::groundtruth::{Granularity, GroundTruthSpec};
use crate::truth::model::{BlockAnnotation, GroundTruth, LineAnnotation, PageInfo, WordAnnotation};

/// Derive the ground truth of one sample.
pub fn derive_ground_truth(
    sample: &str,
    spec: &GroundTruthSpec,
    blocks: &[ResolvedLayoutBlock],
    render: &RenderResult,
) -> SynthResult<GroundTruth> {
    let snap = render.snap;
    let with_text = spec.include_text;
    let mut gt = GroundTruth {
        sample: sample.to_owned(),
        pages: render
            .pages
            .iter()
            .map(|p| PageInfo {
                index: p.index,
                width: p.width,
                height: p.height,
                dpi: p.dpi,
                image: p.image.clone(),
            })
            .collect(),
        categories: category_list(spec),
        blocks: Vec::with_capacity(blocks.len()),
        lines: Vec::new(),
        words: Vec::new(),
        reading_order: blocks.iter().map(|b| b.id.clone()).collect(),
        tolerance_px: render.tolerance_px,
        snap,
        metadata: spec.metadata.clone(),
    };

    for block in blocks {
        gt.blocks.push(BlockAnnotation {
            id: block.id.clone(),
            kind: block.kind,
            category: spec.category(block.kind).to_owned(),
            page: block.page,
            bbox: block.bbox,
            reading_order: block.reading_order,
            text: with_text.then(|| block_text(block)).flatten(),
            truncated: block.truncated,
            origin: block.origin,
        });

        if !spec.includes(Granularity::Line) && !spec.includes(Granularity::Word) {
            continue;
        }
        for (index, line) in text_geometry(block).into_iter().enumerate() {
            let index = index as u32;
            if spec.includes(Granularity::Line) {
                gt.lines.push(LineAnnotation {
                    block_id: block.id.clone(),
                    index,
                    page: block.page,
                    bbox: snap.snap(line.rect),
                    cell: line.cell.map(|(r, c)| [r as u32, c as u32]),
                    text: with_text.then(|| line.text.clone()),
                });
            }
            if spec.includes(Granularity::Word) {
                for word in line.words {
                    gt.words.push(WordAnnotation {
                        block_id: block.id.clone(),
                        line: index,
                        page: block.page,
                        bbox: snap.snap(word.rect),
                        text: with_text.then_some(word.text),
                    });
                }
            }
        }
    }

    check_alignment(&gt, blocks)?;
    Ok(gt)
}

/// Every box must lie within the declared tolerance of its source block.
pub fn check_alignment(gt: &GroundTruth, blocks: &[ResolvedLayoutBlock]) -> SynthResult<()> {
    let tolerance = gt.tolerance_px;
    for (ann, block) in gt.blocks.iter().zip(blocks) {
        if ann.id != block.id || ann.bbox.max_edge_deviation(block.bbox) > tolerance {
            return Err(misaligned("block", &ann.id, ann.bbox, block));
        }
    }
    let find = |id: &str| blocks.iter().find(|b| b.id == id);
    for line in &gt.lines {
        match find(&line.block_id) {
            Some(b) if b.page == line.page && b.bbox.contains_within(line.bbox, tolerance) => {}
            Some(b) => return Err(misaligned("line", &line.block_id, line.bbox, b)),
            None => return Err(orphan("line", &line.block_id)),
        }
    }
    for word in &gt.words {
        match find(&word.block_id) {
            Some(b) if b.page == word.page && b.bbox.contains_within(word.bbox, tolerance) => {}
            Some(b) => return Err(misaligned("word", &word.block_id, word.bbox, b)),
            None => return Err(orphan("word", &word.block_id)),
        }
    }
    Ok(())
}

fn misaligned(level: &str, id: &str, rect: PxRect, block: &ResolvedLayoutBlock) -> SynthError {
    SynthError::renderer_contract(format!(
        "{level} box {rect:?} of `{id}` is outside block {:?} on page {}",
        block.bbox, block.page
    ))
}

fn orphan(level: &str, id: &str) -> SynthError {
    SynthError::renderer_contract(format!("{level} box references unknown block `{id}`"))
}

fn block_text(block: &ResolvedLayoutBlock) -> Option<String> {
    match &block.content {
        ResolvedContent::Text { text, .. } => Some(text.clone()),
        ResolvedContent::Table { rows, .. } => Some(
            rows.iter()
                .map(|r| r.join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        ResolvedContent::Image { .. } | ResolvedContent::Empty => None,
    }
}

fn category_list(spec: &GroundTruthSpec) -> Vec<String> {
    let mut out: Vec<String> = spec.category_names().into_iter().map(str::to_owned).collect();
    for extra in ["text_line", "word"] {
        if !out.iter().any(|c| c == extra) {
            out.push(extra.to_owned());
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/truth/derive.rs"]
mod tests;
