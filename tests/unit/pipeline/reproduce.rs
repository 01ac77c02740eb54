use std::sync::Arc;

use super::*;
use crate::manifest::store::load_manifest;
use crate::pipeline::cancel::CancelToken;
use crate::render::raster::RasterBackend;

#[path = "fixtures.rs"]
#[allow(dead_code)]
mod fixtures;

use fixtures::{Dead, config, fallback_raster, pipeline, specs};

#[test]
fn a_generated_batch_reproduces_from_its_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let report = fallback_raster(config(dir.path(), 4)).run_batch(&CancelToken::new()).unwrap();
    let manifest = load_manifest(&report.manifest).unwrap();

    let scratch = dir.path().join("verify");
    let verify = verify_manifest(&specs(), &manifest, &RasterBackend::new(), &scratch).unwrap();
    assert_eq!(verify.checked, 4);
    assert!(verify.is_reproducible(), "{:?}", verify.mismatches);
}

#[test]
fn fallback_content_replays_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(config(dir.path(), 2), Arc::new(Dead), Arc::new(RasterBackend::new()));
    let report = p.run_batch(&CancelToken::new()).unwrap();
    assert_eq!(report.degraded, 2);
    let manifest = load_manifest(&report.manifest).unwrap();

    let scratch = dir.path().join("v");
    let verify = verify_manifest(&specs(), &manifest, &RasterBackend::new(), &scratch).unwrap();
    assert!(verify.is_reproducible(), "{:?}", verify.mismatches);
}

#[test]
fn tampered_records_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let report = fallback_raster(config(dir.path(), 1)).run_batch(&CancelToken::new()).unwrap();
    let mut manifest = load_manifest(&report.manifest).unwrap();
    let sample = &mut manifest.samples[0];
    let para = sample.slots.iter_mut().find(|s| s.slot == "paragraph").unwrap();
    para.value = serde_json::json!("a different replayed paragraph here");
    sample.hashes.specs.ruleset = "0".repeat(64);

    let scratch = dir.path().join("v");
    let verify = verify_manifest(&specs(), &manifest, &RasterBackend::new(), &scratch).unwrap();
    let fields: Vec<&str> = verify.mismatches.iter().map(|m| m.field.as_str()).collect();
    assert!(fields.contains(&"spec.ruleset"), "{fields:?}");
    assert!(fields.contains(&"layout_fingerprint"), "{fields:?}");
    assert!(fields.contains(&"truth_fingerprint"), "{fields:?}");
    let first = verify.mismatches[0].to_string();
    assert!(first.starts_with("sample_000000: spec.ruleset recorded 000"), "{first}");
}
