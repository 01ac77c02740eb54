//! Output-format adapters. Each one is a pure function of [`GroundTruth`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::foundation::core::PxRect;
use crate::foundation::error::{SynthError, SynthResult};
use crate::spec::groundtruth::OutputFormat;
use crate::truth::model::GroundTruth;

/// Serializes ground truth into one artifact.
pub trait GroundTruthAdapter: Send + Sync {
    /// Format name.
    fn name(&self) -> &str;

    /// File extension without the dot.
    fn extension(&self) -> &str {
        "json"
    }

    /// Encode one sample. Output must follow reading order.
    fn encode(&self, gt: &GroundTruth) -> SynthResult<Vec<u8>>;
}

/// The canonical entity as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

impl GroundTruthAdapter for JsonAdapter {
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, gt: &GroundTruth) -> SynthResult<Vec<u8>> {
        let mut out = serde_json::to_vec_pretty(gt).map_err(|e| SynthError::serde(e.to_string()))?;
        out.push(b'\n');
        Ok(out)
    }
}

/// One record per block, in reading order, with its lines and words nested.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlAdapter;

impl GroundTruthAdapter for JsonlAdapter {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn extension(&self) -> &str {
        "jsonl"
    }

    fn encode(&self, gt: &GroundTruth) -> SynthResult<Vec<u8>> {
        let mut out = Vec::new();
        for block in &gt.blocks {
            let record = json!({
                "sample": gt.sample,
                "block": block,
                "lines": gt.lines_of(&block.id).collect::<Vec<_>>(),
                "words": gt.words_of(&block.id).collect::<Vec<_>>(),
            });
            serde_json::to_writer(&mut out, &record).map_err(|e| SynthError::serde(e.to_string()))?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

/// COCO detection format: one image per page, block, line and word annotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CocoAdapter;

impl GroundTruthAdapter for CocoAdapter {
    fn name(&self) -> &str {
        "coco"
    }

    fn encode(&self, gt: &GroundTruth) -> SynthResult<Vec<u8>> {
        let images: Vec<Value> = gt
            .pages
            .iter()
            .map(|p| {
                json!({
                    "id": p.index + 1,
                    "file_name": p.image.clone().unwrap_or_default(),
                    "width": p.width,
                    "height": p.height,
                })
            })
            .collect();
        let categories: Vec<Value> = gt
            .categories
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"id": i + 1, "name": name, "supercategory": "document"}))
            .collect();

        let mut annotations = Vec::new();
        let mut push = |page: u32, category: &str, bbox: PxRect, attributes: Value| {
            let id = annotations.len() + 1;
            annotations.push(json!({
                "id": id,
                "image_id": page + 1,
                "category_id": gt.category_id(category).unwrap_or(0),
                "bbox": bbox.to_xywh(),
                "area": u64::from(bbox.width) * u64::from(bbox.height),
                "iscrowd": 0,
                "attributes": attributes,
            }));
        };
        for block in &gt.blocks {
            push(
                block.page,
                &block.category,
                block.bbox,
                json!({
                    "level": "block",
                    "block_id": block.id,
                    "reading_order": block.reading_order,
                    "text": block.text,
                }),
            );
            for line in gt.lines_of(&block.id) {
                push(
                    line.page,
                    "text_line",
                    line.bbox,
                    json!({
                        "level": "line",
                        "block_id": line.block_id,
                        "line": line.index,
                        "text": line.text,
                    }),
                );
            }
            for word in gt.words_of(&block.id) {
                push(
                    word.page,
                    "word",
                    word.bbox,
                    json!({
                        "level": "word",
                        "block_id": word.block_id,
                        "line": word.line,
                        "text": word.text,
                    }),
                );
            }
        }

        let doc = json!({
            "info": {"description": gt.sample, "metadata": gt.metadata},
            "images": images,
            "categories": categories,
            "annotations": annotations,
        });
        let mut out =
            serde_json::to_vec_pretty(&doc).map_err(|e| SynthError::serde(e.to_string()))?;
        out.push(b'\n');
        Ok(out)
    }
}

/// Adapters by format name: the built-in ones plus user registrations.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn GroundTruthAdapter>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("formats", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl AdapterRegistry {
    /// JSON, JSONL and COCO.
    pub fn with_builtin() -> Self {
        let mut r = Self {
            adapters: BTreeMap::new(),
        };
        r.register(Arc::new(JsonAdapter));
        r.register(Arc::new(JsonlAdapter));
        r.register(Arc::new(CocoAdapter));
        r
    }

    /// Add or replace an adapter under its own name.
    pub fn register(&mut self, adapter: Arc<dyn GroundTruthAdapter>) {
        self.adapters.insert(adapter.name().to_owned(), adapter);
    }

    /// Adapters for `formats`, in order. Unknown custom formats are an error.
    pub fn resolve(
        &self,
        formats: &[OutputFormat],
    ) -> SynthResult<Vec<Arc<dyn GroundTruthAdapter>>> {
        formats
            .iter()
            .map(|f| {
                self.adapters.get(f.name()).cloned().ok_or_else(|| {
                    SynthError::Other(anyhow::anyhow!(
                        "no ground-truth adapter registered for format '{}'",
                        f.name()
                    ))
                })
            })
            .collect()
    }
}

/// File name of an emitted artifact.
pub fn artifact_file(stem: &str, adapter: &dyn GroundTruthAdapter) -> String {
    if adapter.name() == adapter.extension() {
        format!("{stem}.{}", adapter.extension())
    } else {
        format!("{stem}.{}.{}", adapter.name(), adapter.extension())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/truth/adapters.rs"]
mod tests;
