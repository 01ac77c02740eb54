use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::foundation::core::{Edges, PxRect};
use crate::spec::diagnostics::{Diagnostics, SpecErrors, SpecPath};
use crate::spec::hash::canonical_hash;
use crate::spec::reader::{
    as_mapping, as_sequence, describe, field, parse_document, read_enum, read_f64, read_ident,
    read_str, read_u32, reject_unknown, required,
};
use crate::spec::source::SourceMap;

/// File name used in diagnostics for the structure spec.
pub const STRUCTURE_FILE: &str = "structure.yaml";

/// Kind of a layout block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Running text.
    Paragraph,
    /// Heading text.
    Header,
    /// Grid of text cells.
    Table,
    /// Picture placeholder.
    Image,
    /// Horizontal rule.
    Line,
}

impl BlockKind {
    pub(crate) const NAMES: [(&'static str, BlockKind); 5] = [
        ("paragraph", BlockKind::Paragraph),
        ("header", BlockKind::Header),
        ("table", BlockKind::Table),
        ("image", BlockKind::Image),
        ("line", BlockKind::Line),
    ];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Header => "header",
            Self::Table => "table",
            Self::Image => "image",
            Self::Line => "line",
        }
    }

    /// Blocks whose content is flowed text.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Paragraph | Self::Header)
    }

    /// Blocks that must reference a style.
    pub fn needs_style(self) -> bool {
        matches!(self, Self::Paragraph | Self::Header | Self::Table)
    }
}

/// Horizontal text alignment inside a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    /// Flush left.
    #[default]
    Start,
    /// Centered.
    Center,
    /// Flush right.
    End,
    /// Stretched to both edges (last line of a paragraph stays flush left).
    Justify,
}

/// Shared, immutable text style referenced by blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub font_family: String,
    pub font_size: f64,
    /// Line height as a multiple of the font size.
    pub line_spacing: f64,
    pub align: Align,
}

/// Page geometry in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSpec {
    pub width: u32,
    pub height: u32,
    /// Resolution used to convert points to pixels.
    pub dpi: u32,
    pub margins: Edges,
}

impl PageSpec {
    /// Area inside the margins.
    pub fn content_rect(&self) -> PxRect {
        let m = self.margins;
        PxRect::new(
            m.left,
            m.top,
            self.width.saturating_sub(m.left + m.right),
            self.height.saturating_sub(m.top + m.bottom),
        )
    }
}

/// Document-wide layout constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutConstraints {
    /// Minimum number of emitted blocks a sample must contain.
    pub min_blocks: u32,
    /// Maximum number of pages a sample may span.
    pub max_pages: u32,
}

impl Default for LayoutConstraints {
    fn default() -> Self {
        Self {
            min_blocks: 0,
            max_pages: 16,
        }
    }
}

/// A fixed value or a seeded draw from `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dist {
    /// Always this value.
    Fixed(f64),
    /// Uniform draw between the bounds.
    Range {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

impl Dist {
    /// Smallest value the distribution can produce.
    pub fn min(self) -> f64 {
        match self {
            Self::Fixed(v) => v,
            Self::Range { min, .. } => min,
        }
    }

    /// Largest value the distribution can produce.
    pub fn max(self) -> f64 {
        match self {
            Self::Fixed(v) => v,
            Self::Range { max, .. } => max,
        }
    }

    /// Map a `[0, 1)` draw onto the distribution.
    pub fn sample(self, u: f64) -> f64 {
        match self {
            Self::Fixed(v) => v,
            Self::Range { min, max } => min + u * (max - min),
        }
    }
}

/// Height rule of a relative box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HeightRule {
    /// Height follows the content.
    Auto,
    /// Height in pixels.
    Px(Dist),
}

/// Horizontal placement of a relative box narrower than its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HAlign {
    /// Left edge.
    #[default]
    Start,
    /// Centered.
    Center,
    /// Right edge.
    End,
}

/// Box resolved against the parent (page content area) in flow order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativeRule {
    /// Left offset from the parent's left edge, in pixels.
    pub x: u32,
    /// Width as a fraction of the parent width.
    pub width: Dist,
    pub height: HeightRule,
    pub gap: u32,
    pub align: HAlign,
}

impl Default for RelativeRule {
    fn default() -> Self {
        Self {
            x: 0,
            width: Dist::Fixed(1.0),
            height: HeightRule::Auto,
            gap: 0,
            align: HAlign::Start,
        }
    }
}

/// Bounding-box rule of a block template.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoxRule {
    /// Page-pixel rectangle used verbatim.
    Absolute(PxRect),
    /// Flowed box resolved against the parent.
    Relative(RelativeRule),
}

/// Literal content written directly in `structure.yaml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralContent {
    /// Text, or an asset reference for image blocks.
    Text(String),
    /// Table rows.
    Rows(Vec<Vec<String>>),
}

/// Where a block's content comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentSlot {
    /// No content (rules, bare placeholders).
    Empty,
    /// Literal content.
    Literal(LiteralContent),
    /// Structured content generated against a ruleset schema.
    Generated {
        /// Ruleset schema name.
        slot: String,
        /// Optional instruction added to the request.
        prompt: Option<String>,
    },
    /// Content chosen by whether an earlier template was included.
    Conditional {
        /// Earlier template id.
        if_included: String,
        /// Content when the template was included.
        then: Box<ContentSlot>,
        /// Content otherwise.
        otherwise: Box<ContentSlot>,
    },
}

/// Inclusion rule of a template.
#[derive(Clone, Debug, PartialEq)]
pub enum Inclusion {
    /// Always emitted.
    Required,
    /// Emitted when one draw falls below `weight`.
    Optional {
        /// Probability in `(0, 1]`.
        weight: f64,
    },
    /// One member of a mutually exclusive weighted group.
    Choice {
        /// Group name.
        group: String,
        /// Relative weight.
        weight: f64,
    },
}

/// Repetition rule of a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// Exactly this many occurrences.
    Fixed(u32),
    /// Seeded count in `[min, max]`.
    Range {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
}

impl Repeat {
    /// Largest possible occurrence count.
    pub fn max(self) -> u32 {
        match self {
            Self::Fixed(n) => n,
            Self::Range { max, .. } => max,
        }
    }
}

/// One declared block template.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutBlockTemplate {
    pub id: String,
    pub kind: BlockKind,
    pub bbox: BoxRule,
    pub style: Option<String>,
    pub content: ContentSlot,
    pub inclusion: Inclusion,
    pub repeat: Repeat,
}

impl LayoutBlockTemplate {
    /// Return `true` when the template is always emitted.
    pub fn is_mandatory(&self) -> bool {
        matches!(self.inclusion, Inclusion::Required)
    }
}

/// Validated, immutable structure spec.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSpec {
    pub name: String,
    pub page: PageSpec,
    pub constraints: LayoutConstraints,
    pub styles: BTreeMap<String, Arc<Style>>,
    pub blocks: Vec<LayoutBlockTemplate>,
    content_hash: String,
}

/// A generated-content reference found in the structure spec.
#[derive(Debug, Clone)]
pub(crate) struct SlotRef<'a> {
    pub(crate) template: usize,
    pub(crate) kind: BlockKind,
    pub(crate) slot: &'a str,
    pub(crate) path: SpecPath,
}

impl DocumentSpec {
    /// Parse and validate a structure spec (without cross-checks against the ruleset).
    pub fn from_yaml_str(text: &str) -> Result<Self, SpecErrors> {
        parse_structure(text).map(|(spec, _)| spec)
    }

    /// Canonical content hash (SHA-256 hex).
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Look up a style by name.
    pub fn style(&self, name: &str) -> Option<&Arc<Style>> {
        self.styles.get(name)
    }

    /// Look up a template by id.
    pub fn template(&self, id: &str) -> Option<&LayoutBlockTemplate> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Members of each choice group as `(template index, weight)`, in template order.
    pub(crate) fn choice_groups(&self) -> BTreeMap<&str, Vec<(usize, f64)>> {
        let mut groups: BTreeMap<&str, Vec<(usize, f64)>> = BTreeMap::new();
        for (i, t) in self.blocks.iter().enumerate() {
            if let Inclusion::Choice { group, weight } = &t.inclusion {
                groups.entry(group.as_str()).or_default().push((i, *weight));
            }
        }
        groups
    }

    /// Largest number of blocks any seed can produce (before page splitting).
    pub fn max_block_count(&self) -> u64 {
        let mut total = 0u64;
        for t in &self.blocks {
            if !matches!(t.inclusion, Inclusion::Choice { .. }) {
                total += u64::from(t.repeat.max());
            }
        }
        for members in self.choice_groups().values() {
            let best = members
                .iter()
                .map(|(i, _)| u64::from(self.blocks[*i].repeat.max()))
                .max()
                .unwrap_or(0);
            total += best;
        }
        total
    }

    /// Every generated slot reference, including those nested in conditionals.
    pub(crate) fn slot_refs(&self) -> Vec<SlotRef<'_>> {
        let mut out = Vec::new();
        for (i, t) in self.blocks.iter().enumerate() {
            let path = SpecPath::root().key("blocks").index(i).key("content");
            collect_slot_refs(&t.content, i, t.kind, path, &mut out);
        }
        out
    }
}

fn collect_slot_refs<'a>(
    c: &'a ContentSlot,
    template: usize,
    kind: BlockKind,
    path: SpecPath,
    out: &mut Vec<SlotRef<'a>>,
) {
    match c {
        ContentSlot::Generated { slot, .. } => out.push(SlotRef {
            template,
            kind,
            slot,
            path: path.key("generated"),
        }),
        ContentSlot::Conditional {
            then, otherwise, ..
        } => {
            let base = path.key("conditional");
            collect_slot_refs(then, template, kind, base.key("then"), out);
            collect_slot_refs(otherwise, template, kind, base.key("else"), out);
        }
        ContentSlot::Empty | ContentSlot::Literal(_) => {}
    }
}

/// Parse a structure spec and keep its source map for later cross-file diagnostics.
pub(crate) fn parse_structure(text: &str) -> Result<(DocumentSpec, SourceMap), SpecErrors> {
    let source = SourceMap::build(text);
    let mut d = Diagnostics::new(STRUCTURE_FILE, &source);
    let Some(root) = parse_document(text, &mut d) else {
        return Err(d.into_errors());
    };
    let content_hash = canonical_hash(&root);
    let root_path = SpecPath::root();
    let Some(m) = as_mapping(&root, &root_path, &mut d) else {
        return Err(d.into_errors());
    };
    reject_unknown(
        m,
        &["name", "page", "constraints", "styles", "blocks"],
        &root_path,
        &mut d,
    );

    let name = match field(m, "name") {
        Some(v) => read_ident(v, &root_path.key("name"), &mut d),
        None => Some("document".to_owned()),
    };
    let page = required(m, "page", &root_path, &mut d)
        .and_then(|v| read_page(v, &root_path.key("page"), &mut d));
    let constraints = match field(m, "constraints") {
        Some(v) => read_constraints(v, &root_path.key("constraints"), &mut d),
        None => Some(LayoutConstraints::default()),
    };
    let styles = required(m, "styles", &root_path, &mut d)
        .and_then(|v| read_styles(v, &root_path.key("styles"), &mut d));
    let blocks = required(m, "blocks", &root_path, &mut d)
        .and_then(|v| read_blocks(v, &root_path.key("blocks"), &mut d));

    let (Some(name), Some(page), Some(constraints), Some(styles), Some(blocks)) =
        (name, page, constraints, styles, blocks)
    else {
        return Err(d.into_errors());
    };
    if d.has_errors() {
        return Err(d.into_errors());
    }

    let spec = DocumentSpec {
        name,
        page,
        constraints,
        styles,
        blocks,
        content_hash,
    };
    check_semantics(&spec, &mut d);
    let errors = d.into_errors();
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok((spec, source))
}

fn read_page(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<PageSpec> {
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["width", "height", "dpi", "margins"], path, d);
    let width = required(m, "width", path, d).and_then(|v| read_u32(v, &path.key("width"), d));
    let height =
        required(m, "height", path, d).and_then(|v| read_u32(v, &path.key("height"), d));
    let dpi = match field(m, "dpi") {
        Some(v) => read_u32(v, &path.key("dpi"), d),
        None => Some(72),
    };
    let margins = match field(m, "margins") {
        Some(v) => read_margins(v, &path.key("margins"), d),
        None => Some(Edges::default()),
    };
    Some(PageSpec {
        width: width?,
        height: height?,
        dpi: dpi?,
        margins: margins?,
    })
}

fn read_margins(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<Edges> {
    if v.is_number() {
        return read_u32(v, path, d).map(Edges::uniform);
    }
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["top", "right", "bottom", "left"], path, d);
    let mut edge = |name: &str| match field(m, name) {
        Some(v) => read_u32(v, &path.key(name), d),
        None => Some(0),
    };
    let top = edge("top");
    let right = edge("right");
    let bottom = edge("bottom");
    let left = edge("left");
    Some(Edges {
        top: top?,
        right: right?,
        bottom: bottom?,
        left: left?,
    })
}

fn read_constraints(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<LayoutConstraints> {
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["min_blocks", "max_pages"], path, d);
    let defaults = LayoutConstraints::default();
    let min_blocks = match field(m, "min_blocks") {
        Some(v) => read_u32(v, &path.key("min_blocks"), d),
        None => Some(defaults.min_blocks),
    };
    let max_pages = match field(m, "max_pages") {
        Some(v) => read_u32(v, &path.key("max_pages"), d),
        None => Some(defaults.max_pages),
    };
    Some(LayoutConstraints {
        min_blocks: min_blocks?,
        max_pages: max_pages?,
    })
}

fn read_styles(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<BTreeMap<String, Arc<Style>>> {
    let m = as_mapping(v, path, d)?;
    let mut out = BTreeMap::new();
    let mut ok = true;
    for (k, v) in m {
        let Some(name) = k.as_str() else {
            d.error_value(path, "style names must be strings", describe(k));
            ok = false;
            continue;
        };
        match read_style(v, &path.key(name), d) {
            Some(style) => {
                out.insert(name.to_owned(), Arc::new(style));
            }
            None => ok = false,
        }
    }
    ok.then_some(out)
}

const ALIGNS: [(&str, Align); 4] = [
    ("start", Align::Start),
    ("center", Align::Center),
    ("end", Align::End),
    ("justify", Align::Justify),
];

fn read_style(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<Style> {
    let m = as_mapping(v, path, d)?;
    reject_unknown(
        m,
        &["font_family", "font_size", "line_spacing", "align"],
        path,
        d,
    );
    let font_family = required(m, "font_family", path, d)
        .and_then(|v| read_ident(v, &path.key("font_family"), d));
    let font_size =
        required(m, "font_size", path, d).and_then(|v| read_f64(v, &path.key("font_size"), d));
    let line_spacing = match field(m, "line_spacing") {
        Some(v) => read_f64(v, &path.key("line_spacing"), d),
        None => Some(1.2),
    };
    let align = match field(m, "align") {
        Some(v) => read_enum(v, &path.key("align"), d, &ALIGNS),
        None => Some(Align::Start),
    };
    Some(Style {
        font_family: font_family?,
        font_size: font_size?,
        line_spacing: line_spacing?,
        align: align?,
    })
}

fn read_blocks(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<Vec<LayoutBlockTemplate>> {
    let seq = as_sequence(v, path, d)?;
    let mut out = Vec::with_capacity(seq.len());
    let mut ok = true;
    for (i, item) in seq.iter().enumerate() {
        match read_template(item, &path.index(i), d) {
            Some(t) => out.push(t),
            None => ok = false,
        }
    }
    ok.then_some(out)
}

fn read_template(
    v: &Value,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) -> Option<LayoutBlockTemplate> {
    let m = as_mapping(v, path, d)?;
    reject_unknown(
        m,
        &[
            "id", "kind", "style", "bbox", "content", "weight", "group", "repeat",
        ],
        path,
        d,
    );
    let id = required(m, "id", path, d).and_then(|v| read_ident(v, &path.key("id"), d));
    let kind = required(m, "kind", path, d)
        .and_then(|v| read_enum(v, &path.key("kind"), d, &BlockKind::NAMES));
    let style = match field(m, "style") {
        Some(v) => read_ident(v, &path.key("style"), d).map(Some),
        None => Some(None),
    };
    let bbox = match field(m, "bbox") {
        Some(v) => read_box_rule(v, &path.key("bbox"), d),
        None => Some(BoxRule::Relative(RelativeRule::default())),
    };
    let content = match field(m, "content") {
        Some(v) => read_content(v, &path.key("content"), d),
        None => Some(ContentSlot::Empty),
    };
    let weight = match field(m, "weight") {
        Some(v) => read_f64(v, &path.key("weight"), d).map(Some),
        None => Some(None),
    };
    let group = match field(m, "group") {
        Some(v) => read_ident(v, &path.key("group"), d).map(Some),
        None => Some(None),
    };
    let repeat = match field(m, "repeat") {
        Some(v) => read_repeat(v, &path.key("repeat"), d),
        None => Some(Repeat::Fixed(1)),
    };

    let inclusion = match (weight?, group?) {
        (None, None) => Inclusion::Required,
        (Some(weight), None) => Inclusion::Optional { weight },
        (weight, Some(group)) => Inclusion::Choice {
            group,
            weight: weight.unwrap_or(1.0),
        },
    };
    Some(LayoutBlockTemplate {
        id: id?,
        kind: kind?,
        bbox: bbox?,
        style: style?,
        content: content?,
        inclusion,
        repeat: repeat?,
    })
}

fn read_repeat(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<Repeat> {
    if v.is_number() {
        return read_u32(v, path, d).map(Repeat::Fixed);
    }
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["min", "max"], path, d);
    let min = required(m, "min", path, d).and_then(|v| read_u32(v, &path.key("min"), d));
    let max = required(m, "max", path, d).and_then(|v| read_u32(v, &path.key("max"), d));
    Some(Repeat::Range {
        min: min?,
        max: max?,
    })
}

fn read_dist(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<Dist> {
    if v.is_number() {
        return read_f64(v, path, d).map(Dist::Fixed);
    }
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["min", "max"], path, d);
    let min = required(m, "min", path, d).and_then(|v| read_f64(v, &path.key("min"), d));
    let max = required(m, "max", path, d).and_then(|v| read_f64(v, &path.key("max"), d));
    Some(Dist::Range {
        min: min?,
        max: max?,
    })
}

fn read_box_rule(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<BoxRule> {
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["absolute", "relative"], path, d);
    match (field(m, "absolute"), field(m, "relative")) {
        (Some(a), None) => read_absolute(a, &path.key("absolute"), d).map(BoxRule::Absolute),
        (None, Some(r)) => read_relative(r, &path.key("relative"), d).map(BoxRule::Relative),
        _ => {
            d.error(path, "exactly one of `absolute` or `relative` is required");
            None
        }
    }
}

fn read_absolute(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<PxRect> {
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["x", "y", "width", "height"], path, d);
    let mut px = |name: &str| {
        required(m, name, path, d).and_then(|v| read_u32(v, &path.key(name), d))
    };
    let x = px("x");
    let y = px("y");
    let width = px("width");
    let height = px("height");
    Some(PxRect::new(x?, y?, width?, height?))
}

const HALIGNS: [(&str, HAlign); 3] = [
    ("start", HAlign::Start),
    ("center", HAlign::Center),
    ("end", HAlign::End),
];

fn read_relative(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<RelativeRule> {
    let m = as_mapping(v, path, d)?;
    reject_unknown(m, &["x", "width", "height", "gap", "align"], path, d);
    let defaults = RelativeRule::default();
    let x = match field(m, "x") {
        Some(v) => read_u32(v, &path.key("x"), d),
        None => Some(defaults.x),
    };
    let width = match field(m, "width") {
        Some(v) => read_dist(v, &path.key("width"), d),
        None => Some(defaults.width),
    };
    let height = match field(m, "height") {
        Some(Value::String(s)) if s == "auto" => Some(HeightRule::Auto),
        Some(v) if v.is_string() => {
            d.error_value(
                &path.key("height"),
                "expected `auto`, a pixel height or {min, max}",
                describe(v),
            );
            None
        }
        Some(v) => read_dist(v, &path.key("height"), d).map(HeightRule::Px),
        None => Some(defaults.height),
    };
    let gap = match field(m, "gap") {
        Some(v) => read_u32(v, &path.key("gap"), d),
        None => Some(defaults.gap),
    };
    let align = match field(m, "align") {
        Some(v) => read_enum(v, &path.key("align"), d, &HALIGNS),
        None => Some(defaults.align),
    };
    Some(RelativeRule {
        x: x?,
        width: width?,
        height: height?,
        gap: gap?,
        align: align?,
    })
}

fn read_content(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<ContentSlot> {
    if let Value::String(s) = v {
        return Some(ContentSlot::Literal(LiteralContent::Text(s.clone())));
    }
    let m = as_mapping(v, path, d)?;
    if let Some(lit) = field(m, "literal") {
        reject_unknown(m, &["literal"], path, d);
        return read_literal(lit, &path.key("literal"), d).map(ContentSlot::Literal);
    }
    if let Some(slot) = field(m, "generated") {
        reject_unknown(m, &["generated", "prompt"], path, d);
        let slot = read_ident(slot, &path.key("generated"), d);
        let prompt = match field(m, "prompt") {
            Some(v) => read_str(v, &path.key("prompt"), d).map(Some),
            None => Some(None),
        };
        return Some(ContentSlot::Generated {
            slot: slot?,
            prompt: prompt?,
        });
    }
    if let Some(cond) = field(m, "conditional") {
        reject_unknown(m, &["conditional"], path, d);
        let cpath = path.key("conditional");
        let cm = as_mapping(cond, &cpath, d)?;
        reject_unknown(cm, &["if_included", "then", "else"], &cpath, d);
        let if_included = required(cm, "if_included", &cpath, d)
            .and_then(|v| read_ident(v, &cpath.key("if_included"), d));
        let then = required(cm, "then", &cpath, d)
            .and_then(|v| read_content(v, &cpath.key("then"), d));
        let otherwise = match field(cm, "else") {
            Some(v) => read_content(v, &cpath.key("else"), d),
            None => Some(ContentSlot::Empty),
        };
        return Some(ContentSlot::Conditional {
            if_included: if_included?,
            then: Box::new(then?),
            otherwise: Box::new(otherwise?),
        });
    }
    d.error(
        path,
        "content must be a string or one of {literal}, {generated}, {conditional}",
    );
    None
}

fn read_literal(v: &Value, path: &SpecPath, d: &mut Diagnostics<'_>) -> Option<LiteralContent> {
    match v {
        Value::String(s) => Some(LiteralContent::Text(s.clone())),
        Value::Sequence(rows) => {
            let mut out = Vec::with_capacity(rows.len());
            let mut ok = true;
            for (i, row) in rows.iter().enumerate() {
                let rpath = path.index(i);
                let Some(cells) = as_sequence(row, &rpath, d) else {
                    ok = false;
                    continue;
                };
                let mut r = Vec::with_capacity(cells.len());
                for (j, cell) in cells.iter().enumerate() {
                    match scalar_text(cell) {
                        Some(s) => r.push(s),
                        None => {
                            d.error_value(
                                &rpath.index(j),
                                "table cells must be scalars",
                                describe(cell),
                            );
                            ok = false;
                        }
                    }
                }
                out.push(r);
            }
            ok.then_some(LiteralContent::Rows(out))
        }
        other => {
            d.error_value(path, "literal must be a string or a list of rows", describe(other));
            None
        }
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn check_semantics(spec: &DocumentSpec, d: &mut Diagnostics<'_>) {
    let root = SpecPath::root();
    let page_path = root.key("page");
    let page = &spec.page;
    if page.width == 0 {
        d.error_value(&page_path.key("width"), "must be > 0", page.width);
    }
    if page.height == 0 {
        d.error_value(&page_path.key("height"), "must be > 0", page.height);
    }
    if page.dpi == 0 {
        d.error_value(&page_path.key("dpi"), "must be > 0", page.dpi);
    }
    let m = page.margins;
    if u64::from(m.left) + u64::from(m.right) >= u64::from(page.width)
        || u64::from(m.top) + u64::from(m.bottom) >= u64::from(page.height)
    {
        d.error(
            &page_path.key("margins"),
            "margins leave no content area on the page",
        );
    }
    if spec.constraints.max_pages == 0 {
        d.error(&root.key("constraints").key("max_pages"), "must be >= 1");
    }

    for (name, style) in &spec.styles {
        let spath = root.key("styles").key(name);
        if !(style.font_size > 0.0 && style.font_size <= 512.0) {
            d.error_value(&spath.key("font_size"), "must be in (0, 512] points", style.font_size);
        }
        if !(style.line_spacing > 0.0 && style.line_spacing <= 10.0) {
            d.error_value(&spath.key("line_spacing"), "must be in (0, 10]", style.line_spacing);
        }
    }

    let blocks_path = root.key("blocks");
    if spec.blocks.is_empty() {
        d.error(&blocks_path, "must declare at least one block");
    }

    let content = page.content_rect();
    let mut seen = HashSet::new();
    for (i, t) in spec.blocks.iter().enumerate() {
        let bpath = blocks_path.index(i);
        if !seen.insert(t.id.as_str()) {
            d.error_value(&bpath.key("id"), "duplicate block id", &t.id);
        }
        if t.id.contains(['[', ']', '~']) {
            d.error_value(&bpath.key("id"), "block ids must not contain '[', ']' or '~'", &t.id);
        }

        match &t.style {
            None if t.kind.needs_style() => d.error(
                &bpath.key("style"),
                format!("required for {} blocks", t.kind.as_str()),
            ),
            Some(s) if !spec.styles.contains_key(s) => {
                d.error_value(&bpath.key("style"), "unknown style", s)
            }
            _ => {}
        }

        match &t.inclusion {
            Inclusion::Optional { weight } if !(*weight > 0.0 && *weight <= 1.0) => {
                d.error_value(&bpath.key("weight"), "must be in (0, 1]", weight)
            }
            Inclusion::Choice { weight, .. } if *weight < 0.0 => {
                d.error_value(&bpath.key("weight"), "choice weights must be >= 0", weight)
            }
            _ => {}
        }

        match t.repeat {
            Repeat::Fixed(0) => d.error(&bpath.key("repeat"), "must be >= 1"),
            Repeat::Range { min, max } if min > max => d.error_value(
                &bpath.key("repeat"),
                "min must be <= max",
                format!("{min}..{max}"),
            ),
            Repeat::Range { min: 0, .. } => {
                d.error(&bpath.key("repeat").key("min"), "must be >= 1")
            }
            _ => {}
        }

        check_box_rule(spec, t, &bpath.key("bbox"), content, d);
        check_content(spec, i, t.kind, &t.content, &bpath.key("content"), d);
    }

    for (group, members) in spec.choice_groups() {
        let total: f64 = members.iter().map(|(_, w)| *w).sum();
        if total <= 0.0 {
            let first = members.first().map(|(i, _)| *i).unwrap_or(0);
            d.error_value(
                &blocks_path.index(first).key("group"),
                "choice group weights must sum to a positive total",
                group,
            );
        }
    }

    let max = spec.max_block_count();
    if u64::from(spec.constraints.min_blocks) > max {
        d.error_value(
            &root.key("constraints").key("min_blocks"),
            format!("cannot be satisfied: at most {max} blocks can be produced"),
            spec.constraints.min_blocks,
        );
    }
}

fn check_box_rule(
    spec: &DocumentSpec,
    t: &LayoutBlockTemplate,
    path: &SpecPath,
    content: PxRect,
    d: &mut Diagnostics<'_>,
) {
    match t.bbox {
        BoxRule::Absolute(r) => {
            let apath = path.key("absolute");
            if r.width == 0 || r.height == 0 {
                d.error(&apath, "width and height must be > 0");
            }
            if r.right() > spec.page.width || r.bottom() > spec.page.height {
                d.error_value(
                    &apath,
                    format!(
                        "rectangle is outside the page ({}x{})",
                        spec.page.width, spec.page.height
                    ),
                    format!("{}x{}+{}+{}", r.width, r.height, r.x, r.y),
                );
            }
        }
        BoxRule::Relative(rule) => {
            let rpath = path.key("relative");
            if rule.x >= content.width {
                d.error_value(
                    &rpath.key("x"),
                    "offset leaves no room inside the content area",
                    rule.x,
                );
            }
            check_dist(rule.width, &rpath.key("width"), d);
            if !(rule.width.min() > 0.0 && rule.width.max() <= 1.0) {
                d.error(&rpath.key("width"), "width fractions must be in (0, 1]");
            }
            match rule.height {
                HeightRule::Auto if t.kind == BlockKind::Image => {
                    d.error(&rpath.key("height"), "image blocks need a pixel height")
                }
                HeightRule::Auto => {}
                HeightRule::Px(h) => {
                    check_dist(h, &rpath.key("height"), d);
                    if h.min() < 1.0 {
                        d.error(&rpath.key("height"), "pixel heights must be >= 1");
                    }
                }
            }
        }
    }
}

fn check_dist(dist: Dist, path: &SpecPath, d: &mut Diagnostics<'_>) {
    if let Dist::Range { min, max } = dist
        && min > max
    {
        d.error_value(path, "min must be <= max", format!("{min}..{max}"));
    }
}

fn check_content(
    spec: &DocumentSpec,
    index: usize,
    kind: BlockKind,
    c: &ContentSlot,
    path: &SpecPath,
    d: &mut Diagnostics<'_>,
) {
    match c {
        ContentSlot::Empty => {}
        ContentSlot::Literal(LiteralContent::Text(_)) if kind == BlockKind::Table => {
            d.error(path, "table literals must be a list of rows")
        }
        ContentSlot::Literal(LiteralContent::Rows(_)) if kind != BlockKind::Table => d.error(
            path,
            format!("{} literals must be a string", kind.as_str()),
        ),
        ContentSlot::Literal(_) if kind == BlockKind::Line => {
            d.error(path, "line blocks carry no content")
        }
        ContentSlot::Literal(_) => {}
        ContentSlot::Generated { .. } if matches!(kind, BlockKind::Image | BlockKind::Line) => d
            .error(
                path,
                format!("{} blocks cannot use generated content", kind.as_str()),
            ),
        ContentSlot::Generated { .. } => {}
        ContentSlot::Conditional {
            if_included,
            then,
            otherwise,
        } => {
            let cpath = path.key("conditional");
            match spec.blocks.iter().position(|b| &b.id == if_included) {
                Some(j) if j < index => {}
                Some(_) => d.error_value(
                    &cpath.key("if_included"),
                    "must reference an earlier block template",
                    if_included,
                ),
                None => d.error_value(
                    &cpath.key("if_included"),
                    "unknown block template",
                    if_included,
                ),
            }
            check_content(spec, index, kind, then, &cpath.key("then"), d);
            check_content(spec, index, kind, otherwise, &cpath.key("else"), d);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/spec/structure.rs"]
mod tests;
