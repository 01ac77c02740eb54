//! The one line-breaking algorithm.
//!
//! Hard breaks on `\n`, greedy first-fit over whitespace-separated words, words wider than the
//! line split by characters. Coordinates are block-local pixels, not yet snapped.

use serde::{Deserialize, Serialize};

use crate::spec::structure::Align;
use crate::text::metrics::FontMetrics;

const EPS: f64 = 1e-9;

/// A positioned word.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub text: String,
    pub x: f64,
    pub width: f64,
}

/// A positioned line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub x: f64,
    pub y: f64,
    /// Painted width (first word start to last word end).
    pub width: f64,
    pub height: f64,
    pub baseline: f64,
    pub words: Vec<WordBox>,
    pub paragraph_end: bool,
}

impl TextLine {
    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        let words: Vec<&str> = self.words.iter().map(|w| w.text.as_str()).collect();
        words.join(" ")
    }
}

/// Lines of one text run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLayout {
    pub lines: Vec<TextLine>,
    pub line_height: f64,
}

impl TextLayout {
    /// Total height of all line boxes.
    pub fn height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }

    /// Text with `\n` at paragraph ends and spaces at soft breaks.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            out.push_str(&line.text());
            if i + 1 < self.lines.len() {
                out.push(if line.paragraph_end { '\n' } else { ' ' });
            }
        }
        out
    }

    /// Number of whole lines fitting in `height`.
    pub fn lines_fitting(&self, height: f64) -> usize {
        if self.line_height <= 0.0 {
            return self.lines.len();
        }
        let n = ((height + EPS) / self.line_height).floor().max(0.0) as usize;
        n.min(self.lines.len())
    }

    /// Split after `n` lines; the tail is moved up to start at `y = 0`.
    pub fn split_at(mut self, n: usize) -> (Self, Self) {
        let n = n.min(self.lines.len());
        let tail_lines = self.lines.split_off(n);
        let mut tail = Self {
            lines: tail_lines,
            line_height: self.line_height,
        };
        let dy = n as f64 * self.line_height;
        tail.translate(0.0, -dy);
        (self, tail)
    }

    /// Shift every line and word.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for line in &mut self.lines {
            line.x += dx;
            line.y += dy;
            line.baseline += dy;
            for w in &mut line.words {
                w.x += dx;
            }
        }
    }
}

struct RawLine<'a> {
    words: Vec<&'a str>,
    paragraph_end: bool,
}

/// Break `text` into lines no wider than `max_width` and position them.
pub fn layout_text(text: &str, metrics: &FontMetrics, max_width: f64, align: Align) -> TextLayout {
    let raw = break_lines(text, metrics, max_width);
    let space = metrics.space_width();
    let gap = (metrics.line_height - (metrics.ascent + metrics.descent)) / 2.0;
    let mut lines = Vec::with_capacity(raw.len());

    for (i, r) in raw.iter().enumerate() {
        let widths: Vec<f64> = r.words.iter().map(|w| metrics.text_width(w)).collect();
        let natural = widths.iter().sum::<f64>() + space * r.words.len().saturating_sub(1) as f64;
        let slack = (max_width - natural).max(0.0);

        let (x0, word_gap) = match align {
            Align::Start => (0.0, space),
            Align::Center => (slack / 2.0, space),
            Align::End => (slack, space),
            Align::Justify if !r.paragraph_end && r.words.len() > 1 => {
                (0.0, space + slack / (r.words.len() - 1) as f64)
            }
            Align::Justify => (0.0, space),
        };

        let mut x = x0;
        let mut words = Vec::with_capacity(r.words.len());
        for (w, width) in r.words.iter().zip(&widths) {
            words.push(WordBox {
                text: (*w).to_owned(),
                x,
                width: *width,
            });
            x += width + word_gap;
        }
        let width = words.last().map_or(0.0, |w| w.x + w.width - x0);
        let y = i as f64 * metrics.line_height;
        lines.push(TextLine {
            x: x0,
            y,
            width,
            height: metrics.line_height,
            baseline: y + gap + metrics.ascent,
            words,
            paragraph_end: r.paragraph_end,
        });
    }

    TextLayout {
        lines,
        line_height: metrics.line_height,
    }
}

fn break_lines<'a>(text: &'a str, metrics: &FontMetrics, max_width: f64) -> Vec<RawLine<'a>> {
    let mut out = Vec::new();
    let text = text.trim_end_matches(['\n', '\r']);
    if text.trim().is_empty() {
        return out;
    }
    let space = metrics.space_width();

    for paragraph in text.split('\n') {
        let mut current: Vec<&str> = Vec::new();
        let mut width = 0.0;
        for word in paragraph.split_whitespace() {
            let w = metrics.text_width(word);
            if w > max_width + EPS {
                if !current.is_empty() {
                    out.push(RawLine {
                        words: std::mem::take(&mut current),
                        paragraph_end: false,
                    });
                }
                let mut chunks = split_word(word, metrics, max_width);
                let last = chunks.pop();
                for chunk in chunks {
                    out.push(RawLine {
                        words: vec![chunk],
                        paragraph_end: false,
                    });
                }
                if let Some(last) = last {
                    width = metrics.text_width(last);
                    current.push(last);
                }
                continue;
            }
            if current.is_empty() {
                current.push(word);
                width = w;
            } else if width + space + w <= max_width + EPS {
                current.push(word);
                width += space + w;
            } else {
                out.push(RawLine {
                    words: std::mem::take(&mut current),
                    paragraph_end: false,
                });
                current.push(word);
                width = w;
            }
        }
        out.push(RawLine {
            words: current,
            paragraph_end: true,
        });
    }
    out
}

/// Cut a word into chunks that fit, at least one character each.
fn split_word<'a>(word: &'a str, metrics: &FontMetrics, max_width: f64) -> Vec<&'a str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut width = 0.0;
    for (i, c) in word.char_indices() {
        let a = metrics.char_advance(c);
        if i > start && width + a > max_width + EPS {
            chunks.push(&word[start..i]);
            start = i;
            width = 0.0;
        }
        width += a;
    }
    if start < word.len() {
        chunks.push(&word[start..]);
    }
    chunks
}

#[cfg(test)]
#[path = "../../tests/unit/text/wrap.rs"]
mod tests;
