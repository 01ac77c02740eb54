use crate::content::provider::ProviderIdentity;
use crate::layout::block::ContentOrigin;
use crate::manifest::model::{BatchInfo, Sample, SampleHashes, SlotRecord};
use crate::render::backend::BackendIdentity;
use crate::spec::set::SpecHashes;

pub fn hashes() -> SampleHashes {
    SampleHashes {
        specs: SpecHashes {
            structure: "a".repeat(64),
            groundtruth: "b".repeat(64),
            ruleset: "c".repeat(64),
        },
        provider: "d".repeat(64),
    }
}

pub fn batch() -> BatchInfo {
    BatchInfo {
        tool_version: "0.1.0".to_owned(),
        global_seed: 7,
        specs: hashes().specs,
        provider_hash: hashes().provider,
        provider: ProviderIdentity {
            kind: "fallback".to_owned(),
            model: "docsynth-fallback-1".to_owned(),
        },
        renderer: BackendIdentity {
            name: "raster".to_owned(),
            version: "1".to_owned(),
        },
    }
}

pub fn sample(index: u64) -> Sample {
    Sample {
        id: format!("sample_{index:06}"),
        index,
        seed: u64::MAX - index,
        hashes: hashes(),
        renderer: batch().renderer,
        provider: batch().provider,
        nondeterministic_render: false,
        images: vec![format!("images/sample_{index:06}_p0.png")],
        ground_truth: vec![format!("groundtruth/sample_{index:06}.json")],
        blocks: 3,
        pages: 1,
        degraded: index % 2 == 1,
        slots: vec![SlotRecord {
            block_id: "body[0]".to_owned(),
            slot: "paragraph".to_owned(),
            origin: ContentOrigin::Fallback,
            attempts: 3,
            value: serde_json::json!({"text": "Quarterly totals", "n": 2.5, "rows": [[1, null]]}),
        }],
        layout_fingerprint: "0".repeat(32),
        truth_fingerprint: "f".repeat(32),
    }
}
