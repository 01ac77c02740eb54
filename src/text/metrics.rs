use serde::{Deserialize, Serialize};

use crate::spec::structure::Style;

/// Font metrics shared by layout, every renderer backend and ground truth.
///
/// Advances are fixed per character class so that measurement is identical everywhere and
/// independent of installed fonts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub size_px: f64,
    pub line_height: f64,
    pub ascent: f64,
    pub descent: f64,
    /// Every character advances by the same amount.
    pub monospace: bool,
}

const MONO_ADVANCE: f64 = 0.6;
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

impl FontMetrics {
    /// Metrics of `style` at `dpi` (points are 1/72 inch).
    pub fn new(style: &Style, dpi: u32) -> Self {
        let size_px = style.font_size * f64::from(dpi) / 72.0;
        let family = style.font_family.to_ascii_lowercase();
        Self {
            size_px,
            line_height: size_px * style.line_spacing,
            ascent: size_px * ASCENT,
            descent: size_px * DESCENT,
            monospace: family.contains("mono") || family.contains("courier"),
        }
    }

    /// Horizontal advance of one character.
    pub fn char_advance(&self, c: char) -> f64 {
        if self.monospace {
            return self.size_px * MONO_ADVANCE;
        }
        let em = match c {
            ' ' => 0.28,
            'i' | 'j' | 'l' | 'I' | '.' | ',' | ';' | ':' | '\'' | '!' | '|' => 0.28,
            'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.36,
            'm' | 'w' | 'M' | 'W' | '@' => 0.83,
            c if c.is_ascii_digit() => 0.55,
            c if c.is_uppercase() => 0.66,
            _ => 0.5,
        };
        self.size_px * em
    }

    /// Advance of a whole string.
    pub fn text_width(&self, s: &str) -> f64 {
        s.chars().map(|c| self.char_advance(c)).sum()
    }

    /// Advance of one inter-word space.
    pub fn space_width(&self) -> f64 {
        self.char_advance(' ')
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/metrics.rs"]
mod tests;
