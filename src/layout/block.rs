use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::foundation::core::PxRect;
use crate::spec::structure::{BlockKind, Style};
use crate::text::table::TableLayout;
use crate::text::wrap::TextLayout;

/// Where a block's content came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    /// Written in the structure spec.
    Literal,
    /// Accepted from the content provider.
    Provider,
    /// Synthesized by the deterministic fallback generator.
    Fallback,
}

/// Content of a resolved block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedContent {
    /// No content.
    Empty,
    /// Flowed text, already broken into lines.
    Text {
        /// Full text of this fragment.
        text: String,
        /// Line layout in block-local coordinates.
        layout: TextLayout,
    },
    /// Table grid.
    Table {
        /// Cell text, row-major.
        rows: Vec<Vec<String>>,
        /// Cell and line layout in block-local coordinates.
        layout: TableLayout,
    },
    /// Image placeholder with an optional asset reference.
    Image {
        /// Asset path as written in `structure.yaml`.
        asset: Option<String>,
    },
}

/// Generated-slot provenance attached to a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotProvenance {
    pub slot: String,
    pub origin: ContentOrigin,
    pub attempts: u32,
    pub value: serde_json::Value,
}

/// A fully positioned block. Immutable once produced; the same value feeds rendering and ground
/// truth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLayoutBlock {
    /// Block id: `<template>`, `<template>[<rep>]`, plus `~<n>` for continuation fragments.
    pub id: String,
    /// Template id the block was produced from.
    pub template: String,
    pub kind: BlockKind,
    pub page: u32,
    pub bbox: PxRect,
    pub style: Option<(String, Arc<Style>)>,
    pub content: ResolvedContent,
    pub origin: ContentOrigin,
    /// Generated-slot provenance (first fragment of a split block only).
    pub slot: Option<SlotProvenance>,
    /// 0-based position in reading order across the whole sample.
    pub reading_order: u32,
    /// Text was cut at a line boundary to fit a fixed-height box.
    pub truncated: bool,
}

impl ResolvedLayoutBlock {
    /// Style name, if any.
    pub fn style_name(&self) -> Option<&str> {
        self.style.as_ref().map(|(n, _)| n.as_str())
    }
}

/// Highest page index used, plus one.
pub fn page_count(blocks: &[ResolvedLayoutBlock]) -> u32 {
    blocks.iter().map(|b| b.page + 1).max().unwrap_or(0)
}
