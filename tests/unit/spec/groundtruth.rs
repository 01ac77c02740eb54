use super::*;

#[test]
fn block_granularity_is_always_present() {
    let spec =
        GroundTruthSpec::from_yaml_str("granularity: [word]\nformats: [coco, jsonl]\n").unwrap();
    assert!(spec.includes(Granularity::Block));
    assert!(spec.includes(Granularity::Word));
    assert!(!spec.includes(Granularity::Line));
    assert_eq!(spec.formats, vec![OutputFormat::Coco, OutputFormat::Jsonl]);
    assert!(spec.include_text);
}

#[test]
fn defaults_apply_to_missing_fields() {
    let spec = GroundTruthSpec::from_yaml_str("include_text: false\n").unwrap();
    assert_eq!(spec.formats, vec![OutputFormat::Json]);
    assert!(!spec.include_text);
    assert_eq!(spec.category(BlockKind::Header), "header");
}

#[test]
fn custom_formats_and_categories() {
    let src = "\
formats: [json, 'custom:funsd']
categories:
  header: title
  paragraph: text
metadata:
  license: cc-by
  version: 3
";
    let spec = GroundTruthSpec::from_yaml_str(src).unwrap();
    assert_eq!(spec.formats[1], OutputFormat::Custom("funsd".to_owned()));
    assert_eq!(spec.formats[1].name(), "funsd");
    assert_eq!(spec.category(BlockKind::Header), "title");
    assert_eq!(spec.category(BlockKind::Table), "table");
    assert_eq!(spec.metadata["version"], "3");
    assert_eq!(
        spec.category_names(),
        vec!["text", "title", "table", "image", "line"]
    );
}

#[test]
fn errors_are_collected_with_paths() {
    let src = "\
granularity: [block, glyph]
formats: [json, json, pdf]
categories:
  chart: figure
";
    let errs = GroundTruthSpec::from_yaml_str(src).unwrap_err();
    let paths: Vec<&str> = errs.errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["granularity[1]", "formats[1]", "formats[2]", "categories.chart"]
    );
    assert!(errs.errors.iter().all(|e| e.file == GROUNDTRUTH_FILE));
}

#[test]
fn empty_format_list_is_rejected() {
    let errs = GroundTruthSpec::from_yaml_str("formats: []\n").unwrap_err();
    assert_eq!(errs.errors[0].path, "formats");
}
