//! Synthetic labeled document images from declarative specs.
//!
//! A batch turns three YAML documents (`structure.yaml`, `ruleset.yaml`, `groundtruth.yaml`) into
//! rendered pages plus ground truth derived from the exact geometry the renderer painted:
//!
//! 1. [`spec`] parses and validates the documents, collecting every error with its source line.
//! 2. [`layout`] resolves a seeded, bit-exact block sequence across pages.
//! 3. [`content`] fills generated slots through a structured-output enforcer that always ends with
//!    schema-valid content.
//! 4. [`render`] paints pages behind the [`RenderBackend`] contract.
//! 5. [`truth`] derives block, line and word boxes and serializes them through adapters.
//! 6. [`manifest`] records hashes, seeds and slot contents so every sample can be regenerated.
//! 7. [`pipeline`] runs samples on a worker pool with cancellation and resume.
#![forbid(unsafe_code)]

mod foundation;

pub mod content;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod render;
pub mod spec;
pub mod text;
pub mod truth;

pub use foundation::core::{Edges, FRect, PxRect, SnapRule, round_half_up};
pub use foundation::error::{SynthError, SynthResult};
pub use foundation::math::{Rng64, derive_sample_seed};

pub use content::enforcer::{Enforcer, EnforcerPolicy};
pub use content::provider::{ContentProvider, ProviderConfig, ProviderKind, create_provider};
pub use layout::{ResolvedLayoutBlock, resolve_layout};
pub use manifest::{Manifest, ManifestMode, Sample, load_manifest};
pub use pipeline::{BatchReport, CancelToken, Pipeline, PipelineConfig, verify_manifest};
pub use render::{BackendKind, RenderBackend, create_backend};
pub use spec::set::SpecSet;
pub use spec::{SpecError, SpecErrors};
pub use truth::{AdapterRegistry, GroundTruth, GroundTruthAdapter};
