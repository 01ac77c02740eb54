//! Stable xxh3 fingerprints of resolved layouts and ground truth.
//!
//! Content provenance is deliberately left out: replaying recorded slot values reports every slot
//! as provider content, and the fingerprints must still match.

use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::PxRect;
use crate::layout::block::{ResolvedContent, ResolvedLayoutBlock};
use crate::text::wrap::TextLayout;
use crate::truth::model::GroundTruth;

const XXH3_SEED: u64 = 0x6d5a_1c3e_94b2_f071;

/// 128-bit fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub hi: u64,
    pub lo: u64,
}

impl Fingerprint {
    /// 32 lowercase hex digits.
    pub fn to_hex(self) -> String {
        format!("{:016x}{:016x}", self.hi, self.lo)
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn write_opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.write_u8(1);
                self.write_str(s);
            }
            None => self.write_u8(0),
        }
    }

    fn write_rect(&mut self, r: PxRect) {
        for v in r.to_xywh() {
            self.write_u32(v);
        }
    }

    fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

/// Fingerprint of a resolved block sequence.
pub fn fingerprint_layout(blocks: &[ResolvedLayoutBlock]) -> Fingerprint {
    let mut h = StableHasher::new();
    h.write_u64(blocks.len() as u64);
    for b in blocks {
        h.write_str(&b.id);
        h.write_str(&b.template);
        h.write_str(b.kind.as_str());
        h.write_u32(b.page);
        h.write_rect(b.bbox);
        match &b.style {
            Some((name, style)) => {
                h.write_u8(1);
                h.write_str(name);
                h.write_str(&style.font_family);
                h.write_f64(style.font_size);
                h.write_f64(style.line_spacing);
                h.write_u8(style.align as u8);
            }
            None => h.write_u8(0),
        }
        match &b.content {
            ResolvedContent::Empty => h.write_u8(0),
            ResolvedContent::Text { text, layout } => {
                h.write_u8(1);
                h.write_str(text);
                write_text_layout(&mut h, layout);
            }
            ResolvedContent::Table { rows, layout } => {
                h.write_u8(2);
                h.write_u64(rows.len() as u64);
                for row in rows {
                    h.write_u64(row.len() as u64);
                    for cell in row {
                        h.write_str(cell);
                    }
                }
                h.write_u64(layout.cells.len() as u64);
                for cell in &layout.cells {
                    h.write_u64(cell.row as u64);
                    h.write_u64(cell.col as u64);
                    h.write_f64(cell.x);
                    h.write_f64(cell.y);
                    h.write_f64(cell.width);
                    h.write_f64(cell.height);
                    write_text_layout(&mut h, &cell.text);
                }
            }
            ResolvedContent::Image { asset } => {
                h.write_u8(3);
                h.write_opt_str(asset.as_deref());
            }
        }
        h.write_u32(b.reading_order);
        h.write_bool(b.truncated);
    }
    h.finish()
}

fn write_text_layout(h: &mut StableHasher, layout: &TextLayout) {
    h.write_f64(layout.line_height);
    h.write_u64(layout.lines.len() as u64);
    for line in &layout.lines {
        h.write_f64(line.x);
        h.write_f64(line.y);
        h.write_f64(line.width);
        h.write_f64(line.baseline);
        h.write_bool(line.paragraph_end);
        h.write_u64(line.words.len() as u64);
        for w in &line.words {
            h.write_str(&w.text);
            h.write_f64(w.x);
            h.write_f64(w.width);
        }
    }
}

/// Fingerprint of canonical ground truth.
pub fn fingerprint_truth(gt: &GroundTruth) -> Fingerprint {
    let mut h = StableHasher::new();
    h.write_str(&gt.sample);
    h.write_u64(gt.pages.len() as u64);
    for p in &gt.pages {
        h.write_u32(p.index);
        h.write_u32(p.width);
        h.write_u32(p.height);
        h.write_u32(p.dpi);
        h.write_opt_str(p.image.as_deref());
    }
    h.write_u64(gt.categories.len() as u64);
    for c in &gt.categories {
        h.write_str(c);
    }
    h.write_u64(gt.blocks.len() as u64);
    for b in &gt.blocks {
        h.write_str(&b.id);
        h.write_str(b.kind.as_str());
        h.write_str(&b.category);
        h.write_u32(b.page);
        h.write_rect(b.bbox);
        h.write_u32(b.reading_order);
        h.write_opt_str(b.text.as_deref());
        h.write_bool(b.truncated);
    }
    h.write_u64(gt.lines.len() as u64);
    for l in &gt.lines {
        h.write_str(&l.block_id);
        h.write_u32(l.index);
        h.write_u32(l.page);
        h.write_rect(l.bbox);
        match l.cell {
            Some([r, c]) => {
                h.write_u8(1);
                h.write_u32(r);
                h.write_u32(c);
            }
            None => h.write_u8(0),
        }
        h.write_opt_str(l.text.as_deref());
    }
    h.write_u64(gt.words.len() as u64);
    for w in &gt.words {
        h.write_str(&w.block_id);
        h.write_u32(w.line);
        h.write_u32(w.page);
        h.write_rect(w.bbox);
        h.write_opt_str(w.text.as_deref());
    }
    h.write_u64(gt.reading_order.len() as u64);
    for id in &gt.reading_order {
        h.write_str(id);
    }
    h.write_u32(gt.tolerance_px);
    h.write_u8(gt.snap as u8);
    h.write_u64(gt.metadata.len() as u64);
    for (k, v) in &gt.metadata {
        h.write_str(k);
        h.write_str(v);
    }
    h.finish()
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/fingerprint.rs"]
mod tests;
