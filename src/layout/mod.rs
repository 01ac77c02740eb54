//! Deterministic layout: seeded planning, content filling and page placement.

pub mod block;
pub mod engine;
pub mod geometry;
pub mod plan;

pub use block::{ContentOrigin, ResolvedContent, ResolvedLayoutBlock, SlotProvenance, page_count};
pub use engine::{ContentResolver, resolve_layout};
pub use geometry::{LineGeometry, WordGeometry, text_geometry};
pub use plan::{LayoutPlan, PlannedBlock, plan_layout};
