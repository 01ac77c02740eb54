use super::*;

fn spec(blocks: &str) -> DocumentSpec {
    let text = format!(
        "page: {{width: 600, height: 800, margins: 50}}\nstyles:\n  body: {{font_family: Courier, font_size: 10}}\nblocks:\n{blocks}"
    );
    DocumentSpec::from_yaml_str(&text).unwrap()
}

fn ids(plan: &LayoutPlan) -> Vec<&str> {
    plan.blocks.iter().map(|b| b.id.as_str()).collect()
}

const SCENARIO: &str = "  - {id: title, kind: header, style: body, weight: 0.5, content: Report}
  - {id: body, kind: paragraph, style: body, repeat: 3, content: text}
";

#[test]
fn seed_42_skips_the_optional_header() {
    // First draw for seed 42 is 0.7416 >= 0.5.
    let plan = plan_layout(&spec(SCENARIO), 42).unwrap();
    assert_eq!(ids(&plan), vec!["body[0]", "body[1]", "body[2]"]);
    assert!(!plan.is_included("title"));
}

#[test]
fn seed_3_includes_the_optional_header() {
    // First draw for seed 3 is 0.1135 < 0.5.
    let plan = plan_layout(&spec(SCENARIO), 3).unwrap();
    assert_eq!(ids(&plan), vec!["title", "body[0]", "body[1]", "body[2]"]);
}

#[test]
fn planning_is_repeatable() {
    let s = spec(SCENARIO);
    for seed in 0..32 {
        assert_eq!(plan_layout(&s, seed).unwrap(), plan_layout(&s, seed).unwrap());
    }
}

#[test]
fn range_counts_round_half_up() {
    assert_eq!(draw_count(3, 7, 0.0), 3);
    assert_eq!(draw_count(3, 7, 0.125), 4);
    assert_eq!(draw_count(3, 7, 0.1), 3);
    assert_eq!(draw_count(3, 7, 0.999), 7);
    assert_eq!(draw_count(5, 5, 0.7), 5);

    // 3 + 0.7416 * 4 = 5.97 -> 6.
    let plan = plan_layout(
        &spec("  - {id: p, kind: paragraph, style: body, repeat: {min: 3, max: 7}, content: x}\n"),
        42,
    )
    .unwrap();
    assert_eq!(plan.blocks.len(), 6);
    assert_eq!(plan.blocks[5].id, "p[5]");
}

#[test]
fn choice_groups_pick_exactly_one_member() {
    let blocks = "  - {id: a, kind: header, style: body, group: title, weight: 1, content: A}
  - {id: b, kind: header, style: body, group: title, weight: 3, content: B}
";
    // 0.7416 * 4 = 2.97 falls in b's interval [1, 4).
    assert_eq!(ids(&plan_layout(&spec(blocks), 42).unwrap()), vec!["b"]);
    // 0.1135 * 4 = 0.45 falls in a's interval [0, 1).
    assert_eq!(ids(&plan_layout(&spec(blocks), 3).unwrap()), vec!["a"]);
}

#[test]
fn range_sizes_draw_after_the_count() {
    let blocks = "  - id: p
    kind: paragraph
    style: body
    content: x
    bbox: {relative: {width: {min: 0.5, max: 1.0}, height: {min: 100, max: 200}}}
";
    let plan = plan_layout(&spec(blocks), 42).unwrap();
    let b = &plan.blocks[0];
    // Draws: width 0.7416, height 0.1599.
    assert!((b.width_fraction.unwrap() - (0.5 + 0.5 * 0.741_564_878_771_823_3)).abs() < 1e-12);
    assert_eq!(b.height_px, Some(116.0));
}

#[test]
fn min_blocks_shortfall_is_a_layout_error() {
    let text = "\
page: {width: 600, height: 800}
constraints: {min_blocks: 2}
styles:
  body: {font_family: Courier, font_size: 10}
blocks:
  - {id: a, kind: paragraph, style: body, content: x}
  - {id: b, kind: paragraph, style: body, weight: 0.5, content: y}
";
    let s = DocumentSpec::from_yaml_str(text).unwrap();
    let err = plan_layout(&s, 42).unwrap_err();
    assert_eq!(err.class(), "LayoutConstraintError");
    assert_eq!(plan_layout(&s, 3).unwrap().blocks.len(), 2);
}
