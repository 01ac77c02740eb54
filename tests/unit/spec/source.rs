use super::*;

const DOC: &str = "\
# comment
name: invoice
page:
  width: 100
  margins: {top: 1, right: 2, bottom: 3, left: 4}
blocks:
  - id: title
    kind: header
    bbox:
      relative:
        width: 0.5
  - id: body
    content: |
      key: not a key
      more text
    kind: paragraph
other:
- a
- b: 1
";

#[test]
fn locates_nested_keys_and_items() {
    let map = SourceMap::build(DOC);
    assert_eq!(map.line_of("name"), Some(2));
    assert_eq!(map.line_of("page.width"), Some(4));
    assert_eq!(map.line_of("blocks[0]"), Some(7));
    assert_eq!(map.line_of("blocks[0].id"), Some(7));
    assert_eq!(map.line_of("blocks[0].kind"), Some(8));
    assert_eq!(map.line_of("blocks[0].bbox.relative.width"), Some(11));
    assert_eq!(map.line_of("blocks[1].id"), Some(12));
    assert_eq!(map.line_of("blocks[1].kind"), Some(16));
}

#[test]
fn flow_nodes_fall_back_to_enclosing_key() {
    let map = SourceMap::build(DOC);
    assert_eq!(map.line_of("page.margins.left"), Some(5));
    assert_eq!(map.line_of("blocks[1].content.key"), Some(13));
}

#[test]
fn sequences_at_key_indent_are_children() {
    let map = SourceMap::build(DOC);
    assert_eq!(map.line_of("other[0]"), Some(18));
    assert_eq!(map.line_of("other[1].b"), Some(19));
}

#[test]
fn unknown_root_paths_are_unlocated() {
    let map = SourceMap::build(DOC);
    assert_eq!(map.line_of("missing"), None);
}
