//! Ground truth: derivation from the rendered layout and output adapters.

pub mod adapters;
pub mod derive;
pub mod model;

pub use adapters::{AdapterRegistry, GroundTruthAdapter};
pub use derive::{check_alignment, derive_ground_truth};
pub use model::GroundTruth;
