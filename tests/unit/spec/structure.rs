use super::*;

const MINIMAL: &str = "\
name: report
page:
  width: 600
  height: 800
  margins: 50
styles:
  body:
    font_family: Courier
    font_size: 10
blocks:
  - id: header
    kind: header
    style: body
    weight: 0.5
    content: Quarterly report
  - id: body
    kind: paragraph
    style: body
    repeat: 3
    bbox:
      relative:
        height: auto
        gap: 8
    content:
      generated: paragraph
";

fn errors(text: &str) -> SpecErrors {
    DocumentSpec::from_yaml_str(text).unwrap_err()
}

#[test]
fn parses_minimal_structure() {
    let spec = DocumentSpec::from_yaml_str(MINIMAL).unwrap();
    assert_eq!(spec.name, "report");
    assert_eq!(spec.page.dpi, 72);
    assert_eq!(spec.page.content_rect(), PxRect::new(50, 50, 500, 700));
    assert_eq!(spec.blocks.len(), 2);
    assert_eq!(spec.blocks[0].inclusion, Inclusion::Optional { weight: 0.5 });
    assert!(spec.blocks[1].is_mandatory());
    assert_eq!(spec.blocks[1].repeat, Repeat::Fixed(3));
    assert_eq!(spec.style("body").unwrap().line_spacing, 1.2);
    assert_eq!(spec.max_block_count(), 4);
    assert_eq!(spec.content_hash().len(), 64);

    let refs = spec.slot_refs();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].slot, "paragraph");
    assert_eq!(refs[0].path.to_string(), "blocks[1].content.generated");
}

#[test]
fn content_hash_ignores_formatting() {
    let a = DocumentSpec::from_yaml_str(MINIMAL).unwrap();
    let reformatted = MINIMAL.replace("  margins: 50\n", "  margins:   50   # uniform\n");
    let b = DocumentSpec::from_yaml_str(&reformatted).unwrap();
    assert_eq!(a.content_hash(), b.content_hash());
}

#[test]
fn reports_every_structural_error_with_lines() {
    let text = "\
page:
  width: wide
  height: 800
styles: {}
blocks:
  - id: a
    kind: paragraf
  - kind: table
";
    let errs = errors(text);
    let paths: Vec<&str> = errs.errors.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.contains(&"page.width"), "{errs}");
    assert!(paths.contains(&"blocks[0].kind"), "{errs}");
    assert!(paths.contains(&"blocks[1].id"), "{errs}");
    let width = errs.errors.iter().find(|e| e.path == "page.width").unwrap();
    assert_eq!(width.line, Some(2));
    assert_eq!(width.value.as_deref(), Some("\"wide\""));
    let kind = errs.errors.iter().find(|e| e.path == "blocks[0].kind").unwrap();
    assert_eq!(kind.line, Some(7));
}

#[test]
fn semantic_errors_are_collected_together() {
    let text = "\
page: {width: 100, height: 100, margins: 60}
styles:
  body: {font_family: Arial, font_size: 10}
blocks:
  - id: a
    kind: paragraph
    style: missing
  - id: a
    kind: table
    bbox:
      absolute: {x: 90, y: 0, width: 20, height: 10}
  - id: c
    kind: paragraph
    style: body
    weight: 1.5
";
    let errs = errors(text);
    let messages: Vec<String> = errs
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect();
    let has = |needle: &str| messages.iter().any(|m| m.contains(needle));
    assert!(has("page.margins"), "{messages:?}");
    assert!(has("blocks[0].style: unknown style"), "{messages:?}");
    assert!(has("blocks[1].id: duplicate block id"), "{messages:?}");
    assert!(has("blocks[1].style: required for table blocks"), "{messages:?}");
    assert!(has("blocks[1].bbox.absolute: rectangle is outside the page"), "{messages:?}");
    assert!(has("blocks[2].weight: must be in (0, 1]"), "{messages:?}");
}

#[test]
fn unsatisfiable_min_blocks_is_rejected() {
    let text = MINIMAL.replace("styles:", "constraints:\n  min_blocks: 9\nstyles:");
    let errs = errors(&text);
    assert_eq!(errs.len(), 1, "{errs}");
    assert_eq!(errs.errors[0].path, "constraints.min_blocks");
    assert!(errs.errors[0].message.contains("at most 4"));
}

#[test]
fn choice_groups_count_once() {
    let text = "\
page: {width: 400, height: 400}
styles:
  s: {font_family: Arial, font_size: 12}
blocks:
  - {id: a, kind: header, style: s, group: title, weight: 2, content: A}
  - {id: b, kind: header, style: s, group: title, content: B, repeat: {min: 1, max: 3}}
  - {id: c, kind: line}
";
    let spec = DocumentSpec::from_yaml_str(text).unwrap();
    let groups = spec.choice_groups();
    assert_eq!(groups["title"], vec![(0, 2.0), (1, 1.0)]);
    assert_eq!(spec.max_block_count(), 4);
}

#[test]
fn conditional_must_reference_earlier_template() {
    let text = "\
page: {width: 400, height: 400}
styles:
  s: {font_family: Arial, font_size: 12}
blocks:
  - id: a
    kind: paragraph
    style: s
    content:
      conditional:
        if_included: b
        then: shown
  - {id: b, kind: header, style: s, weight: 0.3, content: B}
";
    let errs = errors(text);
    assert_eq!(errs.len(), 1, "{errs}");
    assert_eq!(errs.errors[0].path, "blocks[0].content.conditional.if_included");
}

#[test]
fn kind_and_content_must_agree() {
    let text = "\
page: {width: 400, height: 400}
styles:
  s: {font_family: Arial, font_size: 12}
blocks:
  - {id: t, kind: table, style: s, content: not rows}
  - {id: l, kind: line, content: {generated: x}}
  - id: i
    kind: image
    bbox: {relative: {height: auto}}
";
    let errs = errors(text);
    let paths: Vec<&str> = errs.errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["blocks[0].content", "blocks[1].content", "blocks[2].bbox.relative.height"]
    );
}

#[test]
fn syntax_errors_carry_a_line() {
    let errs = errors("page:\n  width: [1, 2\n");
    assert_eq!(errs.len(), 1);
    assert!(errs.errors[0].message.starts_with("YAML syntax"));
    assert!(errs.errors[0].line.is_some());
}

#[test]
fn table_literals_accept_scalar_cells() {
    let text = "\
page: {width: 400, height: 400}
styles:
  s: {font_family: Arial, font_size: 12}
blocks:
  - id: t
    kind: table
    style: s
    content:
      literal:
        - [Item, Qty]
        - [Apples, 3]
";
    let spec = DocumentSpec::from_yaml_str(text).unwrap();
    assert_eq!(
        spec.blocks[0].content,
        ContentSlot::Literal(LiteralContent::Rows(vec![
            vec!["Item".into(), "Qty".into()],
            vec!["Apples".into(), "3".into()],
        ]))
    );
}
