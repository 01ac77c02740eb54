use super::*;

const STRUCTURE: &str = "\
page: {width: 600, height: 800, margins: 50}
styles:
  body: {font_family: Helvetica, font_size: 10}
blocks:
  - id: intro
    kind: paragraph
    style: body
    content:
      generated: paragraph
  - id: items
    kind: table
    style: body
    content:
      generated: line_items
";

const RULESET: &str = "\
schemas:
  paragraph: {type: string, max_words: 40}
  line_items:
    type: array
    items:
      type: object
      properties:
        description: {type: string}
        quantity: {type: integer, min: 1}
";

const GROUNDTRUTH: &str = "formats: [json]\n";

#[test]
fn valid_set_exposes_hashes() {
    let set = SpecSet::from_strs(STRUCTURE, GROUNDTRUTH, RULESET).unwrap();
    let hashes = set.hashes();
    assert_eq!(hashes.structure, set.structure.content_hash());
    assert_ne!(hashes.structure, hashes.ruleset);
    assert_eq!(hashes.groundtruth.len(), 64);
}

#[test]
fn unknown_and_incompatible_slots_are_located() {
    let structure = STRUCTURE
        .replace("generated: paragraph", "generated: summary")
        .replace("generated: line_items", "generated: paragraph");
    let errs = SpecSet::from_strs(&structure, GROUNDTRUTH, RULESET).unwrap_err();
    assert_eq!(errs.len(), 2);
    assert_eq!(errs.errors[0].path, "blocks[0].content.generated");
    assert_eq!(errs.errors[0].line, Some(9));
    assert!(errs.errors[0].message.contains("unknown content slot"));
    assert_eq!(errs.errors[1].path, "blocks[1].content.generated");
    assert!(errs.errors[1].message.contains("cannot fill a table block"));
    assert!(errs.errors.iter().all(|e| e.file == STRUCTURE_FILE));
}

#[test]
fn errors_from_every_file_are_reported_together() {
    let errs = SpecSet::from_strs("page: 3\n", "formats: [pdf]\n", "schemas: 1\n").unwrap_err();
    let files: Vec<&str> = errs.errors.iter().map(|e| e.file.as_str()).collect();
    assert!(files.contains(&STRUCTURE_FILE));
    assert!(files.contains(&GROUNDTRUTH_FILE));
    assert!(files.contains(&RULESET_FILE));
}

#[test]
fn tables_accept_scalar_row_arrays() {
    let rules = "\
schemas:
  paragraph: {type: string}
  line_items:
    type: array
    items: {type: array, items: {type: string}}
";
    assert!(SpecSet::from_strs(STRUCTURE, GROUNDTRUTH, rules).is_ok());
}

#[test]
fn load_dir_reads_the_three_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(STRUCTURE_FILE), STRUCTURE).unwrap();
    std::fs::write(dir.path().join(GROUNDTRUTH_FILE), GROUNDTRUTH).unwrap();
    std::fs::write(dir.path().join(RULESET_FILE), RULESET).unwrap();
    let set = SpecSet::load_dir(dir.path()).unwrap();
    assert_eq!(set.structure.blocks.len(), 2);

    std::fs::remove_file(dir.path().join(RULESET_FILE)).unwrap();
    let err = SpecSet::load_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains(RULESET_FILE));
}
