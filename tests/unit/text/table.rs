use super::*;

use crate::spec::structure::Style;

fn courier10() -> FontMetrics {
    FontMetrics::new(
        &Style {
            font_family: "Courier".to_owned(),
            font_size: 10.0,
            line_spacing: 1.2,
            align: Align::Start,
        },
        72,
    )
}

fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|r| r.iter().map(|c| (*c).to_owned()).collect())
        .collect()
}

#[test]
fn equal_columns_and_padded_rows() {
    let m = courier10();
    let t = layout_table(&rows(&[&["Item", "Qty"], &["Apples", "3"]]), &m, 200.0, Align::Start);
    assert_eq!(t.columns, 2);
    assert_eq!(t.cells.len(), 4);
    assert_eq!(t.row_heights, vec![20.0, 20.0]);
    assert_eq!(t.height(), 40.0);

    let qty = &t.cells[3];
    assert_eq!((qty.row, qty.col, qty.x, qty.y), (1, 1, 100.0, 20.0));
    assert_eq!(qty.text.lines[0].words[0].x, 104.0);
    assert_eq!(qty.text.lines[0].y, 24.0);
}

#[test]
fn tallest_cell_sets_row_height() {
    let m = courier10();
    let t = layout_table(&rows(&[&["a b c d e f", "x"]]), &m, 60.0, Align::Start);
    // 30px columns leave 22px of text: two letters per line.
    assert_eq!(t.cells[0].text.lines.len(), 3);
    assert_eq!(t.row_heights, vec![3.0 * 12.0 + 8.0]);
    assert_eq!(t.cells[1].height, t.row_heights[0]);
}

#[test]
fn ragged_rows_use_widest_row() {
    let m = courier10();
    let t = layout_table(&rows(&[&["a"], &["b", "c", "d"]]), &m, 300.0, Align::Start);
    assert_eq!(t.columns, 3);
    assert_eq!(t.cells.len(), 4);
}
