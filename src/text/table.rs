use serde::{Deserialize, Serialize};

use crate::spec::structure::Align;
use crate::text::metrics::FontMetrics;
use crate::text::wrap::{TextLayout, layout_text};

/// Inner padding of every cell, in pixels.
pub const CELL_PADDING: f64 = 4.0;

/// One positioned cell. Text lines are already in block-local coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: TextLayout,
}

/// Grid of equal-width columns; each row is as tall as its tallest cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
    pub cells: Vec<TableCell>,
    pub columns: usize,
    pub row_heights: Vec<f64>,
    pub width: f64,
}

impl TableLayout {
    /// Total height.
    pub fn height(&self) -> f64 {
        self.row_heights.iter().sum()
    }
}

/// Lay out `rows` into `width` pixels.
pub fn layout_table(
    rows: &[Vec<String>],
    metrics: &FontMetrics,
    width: f64,
    align: Align,
) -> TableLayout {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let col_width = width / columns as f64;
    let inner = (col_width - 2.0 * CELL_PADDING).max(1.0);
    let min_row = metrics.line_height + 2.0 * CELL_PADDING;

    let mut cells = Vec::new();
    let mut row_heights = Vec::with_capacity(rows.len());
    let mut y = 0.0;
    for (r, row) in rows.iter().enumerate() {
        let texts: Vec<TextLayout> = row
            .iter()
            .map(|cell| layout_text(cell, metrics, inner, align))
            .collect();
        let height = texts
            .iter()
            .map(|t| t.height() + 2.0 * CELL_PADDING)
            .fold(min_row, f64::max);
        for (c, mut text) in texts.into_iter().enumerate() {
            let x = c as f64 * col_width;
            text.translate(x + CELL_PADDING, y + CELL_PADDING);
            cells.push(TableCell {
                row: r,
                col: c,
                x,
                y,
                width: col_width,
                height,
                text,
            });
        }
        row_heights.push(height);
        y += height;
    }

    TableLayout {
        cells,
        columns,
        row_heights,
        width,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/table.rs"]
mod tests;
