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

fn helvetica10() -> FontMetrics {
    FontMetrics::new(
        &Style {
            font_family: "Helvetica".to_owned(),
            font_size: 10.0,
            line_spacing: 1.2,
            align: Align::Start,
        },
        72,
    )
}

fn texts(layout: &TextLayout) -> Vec<String> {
    layout.lines.iter().map(TextLine::text).collect()
}

#[test]
fn golden_greedy_wrap() {
    let m = courier10();
    let layout = layout_text("the quick brown fox jumps over the lazy dog", &m, 60.0, Align::Start);
    assert_eq!(
        texts(&layout),
        vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]
    );
    assert_eq!(layout.lines[2].width, 60.0);
    assert_eq!(layout.lines[1].y, 12.0);
    assert_eq!(layout.height(), 60.0);
    let words: Vec<f64> = layout.lines[0].words.iter().map(|w| w.x).collect();
    assert_eq!(words, vec![0.0, 24.0]);
}

#[test]
fn golden_proportional_wrap() {
    let m = helvetica10();
    assert!(!m.monospace);
    let layout = layout_text(
        "Will the tiny ink fill Mumma's wide warm room",
        &m,
        80.0,
        Align::Start,
    );
    // Narrow letters let four words share the first line; monospace would fit two.
    assert_eq!(
        texts(&layout),
        vec!["Will the tiny ink", "fill Mumma's", "wide warm room"]
    );
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
    for (line, expected) in layout.lines.iter().zip([67.9, 57.5, 73.8]) {
        assert!(close(line.width, expected), "{line:?}");
    }
    let tiny = &layout.lines[0].words[2];
    assert!(close(tiny.x, 35.9) && close(tiny.width, 16.4), "{tiny:?}");
}

#[test]
fn hard_breaks_and_blank_lines() {
    let m = courier10();
    let layout = layout_text("one two\n\nthree\n", &m, 600.0, Align::Start);
    assert_eq!(texts(&layout), vec!["one two", "", "three"]);
    assert!(layout.lines.iter().all(|l| l.paragraph_end));
    assert_eq!(layout.text(), "one two\n\nthree");
}

#[test]
fn long_words_split_by_characters() {
    let m = courier10();
    let layout = layout_text("ab abcdefghijklm cd", &m, 30.0, Align::Start);
    assert_eq!(texts(&layout), vec!["ab", "abcde", "fghij", "klm", "cd"]);
}

#[test]
fn alignment_offsets() {
    let m = courier10();
    let center = layout_text("abc", &m, 60.0, Align::Center);
    assert_eq!(center.lines[0].x, 21.0);
    let end = layout_text("abc", &m, 60.0, Align::End);
    assert_eq!(end.lines[0].x, 42.0);
    assert_eq!(end.lines[0].words[0].x, 42.0);
}

#[test]
fn justify_stretches_all_but_paragraph_last_line() {
    let m = courier10();
    let layout = layout_text("aa bb cc dd", &m, 60.0, Align::Justify);
    assert_eq!(texts(&layout), vec!["aa bb cc", "dd"]);
    let first = &layout.lines[0];
    assert_eq!(first.width, 60.0);
    assert_eq!(first.words[2].x + first.words[2].width, 60.0);
    assert_eq!(layout.lines[1].width, 12.0);
}

#[test]
fn empty_text_has_no_lines() {
    let m = courier10();
    assert!(layout_text("  \n", &m, 60.0, Align::Start).lines.is_empty());
}

#[test]
fn split_rebases_tail() {
    let m = courier10();
    let layout = layout_text("the quick brown fox jumps over the lazy dog", &m, 60.0, Align::Start);
    assert_eq!(layout.lines_fitting(30.0), 2);
    let (head, tail) = layout.split_at(2);
    assert_eq!(texts(&head), vec!["the quick", "brown fox"]);
    assert_eq!(tail.lines.len(), 3);
    assert_eq!(tail.lines[0].y, 0.0);
    assert_eq!(tail.text(), "jumps over the lazy dog");
}
