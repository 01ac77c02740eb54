//! Reproducibility record: samples, hashes, fingerprints and atomic persistence.

pub mod fingerprint;
pub mod model;
pub mod recorder;
pub mod store;

pub use fingerprint::{Fingerprint, fingerprint_layout, fingerprint_truth};
pub use model::{BatchInfo, MANIFEST_FILE, Manifest, Recorded, Sample, SampleHashes, SlotRecord};
pub use recorder::{ManifestMode, ManifestRecorder};
pub use store::{load_manifest, store_manifest, write_atomic};
