use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{PxRect, SnapRule};
use crate::layout::block::ContentOrigin;
use crate::spec::structure::BlockKind;

/// Page description copied from the render result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    /// Page image file, when the backend produced one.
    pub image: Option<String>,
}

/// Block-level annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAnnotation {
    pub id: String,
    pub kind: BlockKind,
    pub category: String,
    pub page: u32,
    pub bbox: PxRect,
    pub reading_order: u32,
    /// Text content (`include_text` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Content was cut to fit a fixed box.
    pub truncated: bool,
    pub origin: ContentOrigin,
}

/// Line-level annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnnotation {
    pub block_id: String,
    pub index: u32,
    pub page: u32,
    pub bbox: PxRect,
    /// Table cell `[row, col]` for table lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<[u32; 2]>,
    /// Line text (`include_text` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Word-level annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordAnnotation {
    pub block_id: String,
    /// Index of the owning line within the block.
    pub line: u32,
    pub page: u32,
    pub bbox: PxRect,
    /// Word text (`include_text` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Canonical ground truth of one sample. Every adapter serializes this value and nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub sample: String,
    pub pages: Vec<PageInfo>,
    /// Label names in id order (COCO category ids are 1-based positions in this list).
    pub categories: Vec<String>,
    pub blocks: Vec<BlockAnnotation>,
    /// Line annotations in reading order (empty unless requested).
    pub lines: Vec<LineAnnotation>,
    /// Word annotations in reading order (empty unless requested).
    pub words: Vec<WordAnnotation>,
    pub reading_order: Vec<String>,
    /// Renderer tolerance the boxes were checked against.
    pub tolerance_px: u32,
    /// Snap rule used for line and word boxes.
    pub snap: SnapRule,
    pub metadata: BTreeMap<String, String>,
}

impl GroundTruth {
    /// Lines of one block.
    pub fn lines_of<'a>(
        &'a self,
        block_id: &'a str,
    ) -> impl Iterator<Item = &'a LineAnnotation> + 'a {
        self.lines.iter().filter(move |l| l.block_id == block_id)
    }

    /// Words of one block.
    pub fn words_of<'a>(
        &'a self,
        block_id: &'a str,
    ) -> impl Iterator<Item = &'a WordAnnotation> + 'a {
        self.words.iter().filter(move |w| w.block_id == block_id)
    }

    /// 1-based COCO category id of a label.
    pub fn category_id(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == name).map(|i| i + 1)
    }
}
