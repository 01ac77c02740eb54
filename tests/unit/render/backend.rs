use super::*;
use crate::content::enforcer::{SlotOutcome, SlotRequest};
use crate::layout::engine::{ContentResolver, resolve_layout};
use crate::render::layout_only::LayoutOnlyBackend;
use crate::spec::set::SpecSet;

struct NoSlots;

impl ContentResolver for NoSlots {
    fn resolve_slot(&self, req: SlotRequest<'_>) -> SynthResult<SlotOutcome> {
        Err(SynthError::schema(format!("unexpected slot {}", req.slot)))
    }
}

fn fixture() -> (SpecSet, Vec<ResolvedLayoutBlock>) {
    let structure = "\
page: {width: 400, height: 300, margins: 20}
styles:
  body: {font_family: Helvetica, font_size: 12}
blocks:
  - {id: title, kind: header, style: body, content: Hello}
  - {id: rule, kind: line}
  - {id: text, kind: paragraph, style: body, content: some words here}
";
    let set = SpecSet::from_strs(structure, "formats: [json]\n", "schemas: {}\n").unwrap();
    let blocks = resolve_layout(&set, 9, &NoSlots).unwrap();
    (set, blocks)
}

fn target() -> RenderTarget {
    RenderTarget::new(std::env::temp_dir(), "unused")
}

#[test]
fn layout_only_satisfies_the_contract() {
    let (set, blocks) = fixture();
    let result = LayoutOnlyBackend.render(&set.structure, &blocks, &target()).unwrap();
    check_contract(&set.structure, &blocks, &result).unwrap();
    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].image, None);
    assert_eq!(result.metrics.len(), 1);
    assert!(!result.nondeterministic);
}

#[test]
fn deviation_beyond_tolerance_is_a_violation() {
    let (set, blocks) = fixture();
    let mut result = LayoutOnlyBackend.render(&set.structure, &blocks, &target()).unwrap();
    result.painted[1].rect.x += 1;
    result.tolerance_px = 1;
    check_contract(&set.structure, &blocks, &result).unwrap();

    result.painted[1].rect.x += 1;
    let err = check_contract(&set.structure, &blocks, &result).unwrap_err();
    assert_eq!(err.class(), "RendererContractViolationError");
    assert!(err.to_string().contains("`rule`"));
}

#[test]
fn metric_mismatch_is_a_violation() {
    let (set, blocks) = fixture();
    let mut result = LayoutOnlyBackend.render(&set.structure, &blocks, &target()).unwrap();
    if let Some(m) = result.metrics.get_mut("body") {
        m.line_height += 0.5;
    }
    let err = check_contract(&set.structure, &blocks, &result).unwrap_err();
    assert!(err.to_string().contains("style `body`"));

    result.metrics.clear();
    let err = check_contract(&set.structure, &blocks, &result).unwrap_err();
    assert!(err.to_string().contains("did not report metrics"));
}

#[test]
fn missing_or_reordered_blocks_are_violations() {
    let (set, blocks) = fixture();
    let mut result = LayoutOnlyBackend.render(&set.structure, &blocks, &target()).unwrap();
    result.painted.swap(0, 1);
    assert!(check_contract(&set.structure, &blocks, &result).is_err());
    result.painted.pop();
    assert!(check_contract(&set.structure, &blocks, &result).is_err());
}

#[test]
fn backend_kinds_parse_and_construct() {
    assert_eq!("raster".parse::<BackendKind>().unwrap(), BackendKind::Raster);
    assert_eq!("layout-only".parse::<BackendKind>().unwrap(), BackendKind::LayoutOnly);
    assert!("gpu".parse::<BackendKind>().is_err());
    assert_eq!(create_backend(BackendKind::LayoutOnly).unwrap().identity().name, "layout-only");
    assert_eq!(create_backend(BackendKind::Raster).unwrap().tolerance_px(), 1);
}

#[test]
fn target_names_pages() {
    let t = RenderTarget::new("/data/out", "sample_000004");
    assert_eq!(t.page_file(1), "sample_000004_p1.png");
    assert_eq!(t.page_path(0), Path::new("/data/out/sample_000004_p0.png"));
}
