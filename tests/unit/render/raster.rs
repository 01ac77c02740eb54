use super::*;
use crate::content::enforcer::{SlotOutcome, SlotRequest};
use crate::layout::engine::{ContentResolver, resolve_layout};
use crate::render::backend::check_contract;
use crate::spec::set::SpecSet;

struct NoSlots;

impl ContentResolver for NoSlots {
    fn resolve_slot(&self, req: SlotRequest<'_>) -> SynthResult<SlotOutcome> {
        Err(SynthError::schema(format!("unexpected slot {}", req.slot)))
    }
}

#[test]
fn paints_pages_that_match_the_layout() {
    let structure = "\
page: {width: 300, height: 200, margins: 10}
styles:
  body: {font_family: Courier, font_size: 10}
blocks:
  - {id: text, kind: paragraph, style: body, content: abc def, bbox: {relative: {gap: 4}}}
  - {id: grid, kind: table, style: body, content: {literal: [[a, b], [c, d]]}}
  - {id: pic, kind: image, bbox: {relative: {height: 170}}}
";
    let set = SpecSet::from_strs(structure, "formats: [json]\n", "schemas: {}\n").unwrap();
    let blocks = resolve_layout(&set, 1, &NoSlots).unwrap();
    assert_eq!(blocks[2].page, 1);

    let dir = tempfile::tempdir().unwrap();
    let target = RenderTarget::new(dir.path(), "s0");
    let backend = RasterBackend::new();
    let result = backend.render(&set.structure, &blocks, &target).unwrap();
    check_contract(&set.structure, &blocks, &result).unwrap();

    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.pages[1].image.as_deref(), Some("s0_p1.png"));
    let page0 = image::open(dir.path().join("s0_p0.png")).unwrap().to_rgb8();
    assert_eq!(page0.dimensions(), (300, 200));

    // First word "abc" spans x 10..28 on the line 10..22; its glyph band is inked.
    assert_eq!(*page0.get_pixel(15, 16), INK);
    // The gap between the two words stays blank.
    assert_eq!(*page0.get_pixel(31, 16), PAPER);
    // Table outline starts right below the paragraph (12px + 4px gap).
    assert_eq!(*page0.get_pixel(10, 26), GRID);

    let page1 = image::open(dir.path().join("s0_p1.png")).unwrap().to_rgb8();
    assert_eq!(*page1.get_pixel(150, 100), PLACEHOLDER);

    let mut files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, ["s0_p0.png", "s0_p1.png"]);
}
