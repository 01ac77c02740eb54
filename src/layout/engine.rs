//! Placement: turns a [`LayoutPlan`] into positioned blocks across pages.
//!
//! Relative boxes stack top to bottom inside the page content area. A block that does not fit
//! opens a new page; auto-height text taller than a whole page is split into `~2`, `~3`, ...
//! continuation fragments at line boundaries. Absolute boxes are placed verbatim on the current
//! page and push the flow cursor below them.

use std::sync::Arc;

use serde_json::Value;

use crate::content::enforcer::{Enforcer, SlotOutcome, SlotRequest};
use crate::foundation::core::{PxRect, round_half_up, to_px};
use crate::foundation::error::{SynthError, SynthResult};
use crate::layout::block::{ContentOrigin, ResolvedContent, ResolvedLayoutBlock, SlotProvenance};
use crate::layout::plan::{LayoutPlan, PlannedBlock, plan_layout};
use crate::spec::ruleset::SchemaNode;
use crate::spec::set::SpecSet;
use crate::spec::structure::{
    Align, BlockKind, BoxRule, ContentSlot, DocumentSpec, HAlign, HeightRule, LayoutBlockTemplate,
    LiteralContent, RelativeRule, Style,
};
use crate::text::metrics::FontMetrics;
use crate::text::table::{TableLayout, layout_table};
use crate::text::wrap::{TextLayout, layout_text};

/// Height of a `line` block with an automatic height.
const RULE_HEIGHT: u32 = 2;

/// Source of generated slot content.
pub trait ContentResolver {
    /// Produce schema-valid content for one slot.
    fn resolve_slot(&self, req: SlotRequest<'_>) -> SynthResult<SlotOutcome>;
}

impl ContentResolver for Enforcer<'_> {
    fn resolve_slot(&self, req: SlotRequest<'_>) -> SynthResult<SlotOutcome> {
        self.resolve(req)
    }
}

/// Resolve the layout of one sample.
///
/// The same `(specs, seed)` and the same slot values always produce the same blocks.
#[tracing::instrument(skip(specs, content), fields(document = %specs.structure.name))]
pub fn resolve_layout(
    specs: &SpecSet,
    seed: u64,
    content: &dyn ContentResolver,
) -> SynthResult<Vec<ResolvedLayoutBlock>> {
    let spec = specs.structure.as_ref();
    let plan = plan_layout(spec, seed)?;
    let mut flow = Flow::new(spec);

    for planned in &plan.blocks {
        let t = &spec.blocks[planned.template];
        let draft = fill_content(specs, t, planned, &plan, seed, content)?;
        flow.place(t, planned, draft)?;
    }

    tracing::debug!(
        blocks = flow.out.len(),
        pages = flow.page + 1,
        "layout resolved"
    );
    Ok(flow.out)
}

/// Content before measurement.
enum Draft {
    Empty,
    Text(String),
    Rows(Vec<Vec<String>>),
    Image(Option<String>),
}

struct Filled {
    draft: Draft,
    origin: ContentOrigin,
    slot: Option<SlotProvenance>,
}

fn fill_content(
    specs: &SpecSet,
    t: &LayoutBlockTemplate,
    planned: &PlannedBlock,
    plan: &LayoutPlan,
    seed: u64,
    content: &dyn ContentResolver,
) -> SynthResult<Filled> {
    let mut slot = &t.content;
    while let ContentSlot::Conditional {
        if_included,
        then,
        otherwise,
    } = slot
    {
        slot = if plan.is_included(if_included) {
            then.as_ref()
        } else {
            otherwise.as_ref()
        };
    }

    let literal = |draft| Filled {
        draft,
        origin: ContentOrigin::Literal,
        slot: None,
    };
    match slot {
        ContentSlot::Empty => Ok(literal(match t.kind {
            BlockKind::Image => Draft::Image(None),
            _ => Draft::Empty,
        })),
        ContentSlot::Literal(LiteralContent::Text(s)) => Ok(literal(match t.kind {
            BlockKind::Image => Draft::Image(Some(s.clone())),
            _ => Draft::Text(s.clone()),
        })),
        ContentSlot::Literal(LiteralContent::Rows(rows)) => Ok(literal(Draft::Rows(rows.clone()))),
        ContentSlot::Generated { slot, prompt } => {
            let outcome = content.resolve_slot(SlotRequest {
                slot,
                block_id: &planned.id,
                prompt: prompt.as_deref(),
                document: &specs.structure.name,
                sample_seed: seed,
            })?;
            let schema = specs.ruleset.schema(slot);
            let draft = match t.kind {
                BlockKind::Table => Draft::Rows(value_rows(&outcome.value, schema)),
                _ => Draft::Text(value_text(&outcome.value)),
            };
            Ok(Filled {
                draft,
                origin: outcome.origin,
                slot: Some(SlotProvenance {
                    slot: slot.clone(),
                    origin: outcome.origin,
                    attempts: outcome.attempts,
                    value: outcome.value,
                }),
            })
        }
        ContentSlot::Conditional { .. } => Ok(literal(Draft::Empty)),
    }
}

/// Scalar value as display text. `null` renders empty.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

/// Table rows from a generated value.
///
/// A list of records becomes a header row of property names (declaration order) followed by one
/// row per record; a list of lists is used as-is.
pub fn value_rows(v: &Value, schema: Option<&SchemaNode>) -> Vec<Vec<String>> {
    let Value::Array(items) = v else {
        return vec![vec![value_text(v)]];
    };
    let columns: Option<Vec<&str>> = match schema {
        Some(SchemaNode::Array { items, .. }) => match items.as_ref() {
            SchemaNode::Object { properties, .. } => {
                Some(properties.iter().map(|(n, _)| n.as_str()).collect())
            }
            _ => None,
        },
        _ => None,
    };

    match columns {
        Some(columns) => {
            let mut rows = Vec::with_capacity(items.len() + 1);
            rows.push(columns.iter().map(|c| (*c).to_owned()).collect());
            for item in items {
                rows.push(
                    columns
                        .iter()
                        .map(|c| item.get(c).map(value_text).unwrap_or_default())
                        .collect(),
                );
            }
            rows
        }
        None => items
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(value_text).collect(),
                other => vec![value_text(other)],
            })
            .collect(),
    }
}

/// Flow cursor over pages.
struct Flow<'a> {
    spec: &'a DocumentSpec,
    content: PxRect,
    page: u32,
    cursor: u32,
    out: Vec<ResolvedLayoutBlock>,
}

/// Everything a block needs besides its geometry and measured content.
struct Meta<'t> {
    template: &'t LayoutBlockTemplate,
    style: Option<(String, Arc<Style>)>,
    origin: ContentOrigin,
}

impl<'a> Flow<'a> {
    fn new(spec: &'a DocumentSpec) -> Self {
        let content = spec.page.content_rect();
        Self {
            spec,
            content,
            page: 0,
            cursor: content.y,
            out: Vec::new(),
        }
    }

    fn place(
        &mut self,
        t: &LayoutBlockTemplate,
        planned: &PlannedBlock,
        filled: Filled,
    ) -> SynthResult<()> {
        let style = t
            .style
            .as_ref()
            .and_then(|name| self.spec.style(name).map(|s| (name.clone(), Arc::clone(s))));
        let metrics = style
            .as_ref()
            .map(|(_, s)| FontMetrics::new(s, self.spec.page.dpi));
        let Filled {
            draft,
            origin,
            slot,
        } = filled;
        let meta = Meta {
            template: t,
            style,
            origin,
        };

        let rule = match t.bbox {
            BoxRule::Absolute(rect) => {
                if let Some(under) = self
                    .out
                    .iter()
                    .find(|b| b.page == self.page && b.bbox.intersects(rect))
                {
                    return Err(SynthError::layout(format!(
                        "absolute block `{}` overlaps `{}` on page {}",
                        planned.id, under.id, self.page
                    )));
                }
                let (content, truncated) = measure_fixed(draft, metrics, rect, &meta.style);
                self.cursor = self.cursor.max(rect.bottom());
                self.emit(&meta, &planned.id, rect, content, slot, truncated);
                return Ok(());
            }
            BoxRule::Relative(rule) => rule,
        };

        let (x, width) = self.resolve_columns(rule, planned.width_fraction.unwrap_or(1.0));
        let page_height = self.content.height;

        if let HeightRule::Px(_) = rule.height {
            let height = to_px(planned.height_px.unwrap_or(0.0)).max(1);
            if height > page_height {
                return Err(oversize(&planned.id, height, page_height));
            }
            self.open_space(height)?;
            let rect = PxRect::new(x, self.cursor, width, height);
            let (content, truncated) = measure_fixed(draft, metrics, rect, &meta.style);
            self.emit(&meta, &planned.id, rect, content, slot, truncated);
            self.advance(height, rule.gap);
            return Ok(());
        }

        let content = match draft {
            Draft::Text(text) => {
                let layout = match metrics {
                    Some(m) => layout_text(&text, &m, f64::from(width), align_of(&meta.style)),
                    None => TextLayout::default(),
                };
                return self.place_text(&meta, &planned.id, x, width, rule.gap, layout, slot);
            }
            Draft::Rows(rows) => {
                let layout = match metrics {
                    Some(m) => layout_table(&rows, &m, f64::from(width), align_of(&meta.style)),
                    None => TableLayout::default(),
                };
                ResolvedContent::Table { rows, layout }
            }
            Draft::Image(asset) => ResolvedContent::Image { asset },
            Draft::Empty => ResolvedContent::Empty,
        };
        let height = match &content {
            ResolvedContent::Table { layout, .. } => to_px(layout.height().ceil()).max(1),
            _ if t.kind == BlockKind::Line => RULE_HEIGHT,
            _ => 1,
        };
        if height > page_height {
            return Err(oversize(&planned.id, height, page_height));
        }
        self.open_space(height)?;
        let rect = PxRect::new(x, self.cursor, width, height);
        self.emit(&meta, &planned.id, rect, content, slot, false);
        self.advance(height, rule.gap);
        Ok(())
    }

    fn emit(
        &mut self,
        meta: &Meta<'_>,
        id: &str,
        bbox: PxRect,
        content: ResolvedContent,
        slot: Option<SlotProvenance>,
        truncated: bool,
    ) {
        let reading_order = self.out.len() as u32;
        self.out.push(ResolvedLayoutBlock {
            id: id.to_owned(),
            template: meta.template.id.clone(),
            kind: meta.template.kind,
            page: self.page,
            bbox,
            style: meta.style.clone(),
            content,
            origin: meta.origin,
            slot,
            reading_order,
            truncated,
        });
    }

    /// Place auto-height text, splitting it into continuation fragments when it is taller than
    /// a whole page.
    #[allow(clippy::too_many_arguments)]
    fn place_text(
        &mut self,
        meta: &Meta<'_>,
        id: &str,
        x: u32,
        width: u32,
        gap: u32,
        layout: TextLayout,
        slot: Option<SlotProvenance>,
    ) -> SynthResult<()> {
        let page_height = self.content.height;
        let height = to_px(layout.height().ceil()).max(1);
        if height <= page_height {
            self.open_space(height)?;
            let rect = PxRect::new(x, self.cursor, width, height);
            let content = ResolvedContent::Text {
                text: layout.text(),
                layout,
            };
            self.emit(meta, id, rect, content, slot, false);
            self.advance(height, gap);
            return Ok(());
        }

        let per_page = layout.lines_fitting(f64::from(page_height));
        if per_page == 0 {
            return Err(oversize(id, to_px(layout.line_height.ceil()), page_height));
        }
        let mut rest = layout;
        let mut slot = slot;
        let mut fragment = 1u32;
        while !rest.lines.is_empty() {
            let (head, tail) = rest.split_at(per_page);
            rest = tail;
            let height = to_px(head.height().ceil()).max(1);
            self.open_space(height)?;
            let fragment_id = match fragment {
                1 => id.to_owned(),
                n => format!("{id}~{n}"),
            };
            let rect = PxRect::new(x, self.cursor, width, height);
            let content = ResolvedContent::Text {
                text: head.text(),
                layout: head,
            };
            // Provenance stays on the first fragment.
            self.emit(meta, &fragment_id, rect, content, slot.take(), false);
            self.advance(height, gap);
            fragment += 1;
        }
        tracing::debug!(block = id, fragments = fragment - 1, "text split across pages");
        Ok(())
    }

    /// Left edge and width of a relative box.
    fn resolve_columns(&self, rule: RelativeRule, fraction: f64) -> (u32, u32) {
        let available = self.content.width.saturating_sub(rule.x);
        let width = to_px(round_half_up(f64::from(self.content.width) * fraction))
            .clamp(1, available.max(1));
        let slack = available.saturating_sub(width);
        let offset = match rule.align {
            HAlign::Start => 0,
            HAlign::Center => slack / 2,
            HAlign::End => slack,
        };
        (self.content.x + rule.x + offset, width)
    }

    /// Move to a new page when `height` does not fit below the cursor.
    fn open_space(&mut self, height: u32) -> SynthResult<()> {
        if self.cursor.saturating_add(height) <= self.content.bottom() {
            return Ok(());
        }
        self.page += 1;
        if self.page >= self.spec.constraints.max_pages {
            return Err(SynthError::layout(format!(
                "layout needs more than max_pages ({}) pages",
                self.spec.constraints.max_pages
            )));
        }
        self.cursor = self.content.y;
        Ok(())
    }

    fn advance(&mut self, height: u32, gap: u32) {
        self.cursor = self.cursor.saturating_add(height).saturating_add(gap);
    }
}

fn align_of(style: &Option<(String, Arc<Style>)>) -> Align {
    style.as_ref().map(|(_, s)| s.align).unwrap_or_default()
}

fn oversize(id: &str, height: u32, page_height: u32) -> SynthError {
    SynthError::layout(format!(
        "block `{id}` needs {height}px but the page content area is {page_height}px tall"
    ))
}

/// Measure content into a fixed box, cutting text at a line boundary and tables at a row
/// boundary when it overflows.
fn measure_fixed(
    draft: Draft,
    metrics: Option<FontMetrics>,
    rect: PxRect,
    style: &Option<(String, Arc<Style>)>,
) -> (ResolvedContent, bool) {
    let width = f64::from(rect.width);
    let height = f64::from(rect.height);
    match (draft, metrics) {
        (Draft::Text(text), Some(m)) => {
            let layout = layout_text(&text, &m, width, align_of(style));
            let fit = layout.lines_fitting(height);
            let truncated = fit < layout.lines.len();
            let (layout, _) = layout.split_at(fit);
            (
                ResolvedContent::Text {
                    text: layout.text(),
                    layout,
                },
                truncated,
            )
        }
        (Draft::Rows(rows), Some(m)) => {
            let mut layout = layout_table(&rows, &m, width, align_of(style));
            let mut fit = 0;
            let mut acc = 0.0;
            for h in &layout.row_heights {
                if acc + h > height + 1e-9 {
                    break;
                }
                acc += h;
                fit += 1;
            }
            let truncated = fit < layout.row_heights.len();
            layout.row_heights.truncate(fit);
            layout.cells.retain(|c| c.row < fit);
            let mut rows = rows;
            rows.truncate(fit);
            (ResolvedContent::Table { rows, layout }, truncated)
        }
        (Draft::Image(asset), _) => (ResolvedContent::Image { asset }, false),
        (Draft::Text(_) | Draft::Rows(_), None) | (Draft::Empty, _) => {
            (ResolvedContent::Empty, false)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/engine.rs"]
mod tests;
