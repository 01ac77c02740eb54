//! Spec documents: parsing, validation and content hashing.

pub(crate) mod diagnostics;
pub mod groundtruth;
pub(crate) mod hash;
pub(crate) mod reader;
pub mod ruleset;
pub mod set;
pub(crate) mod source;
pub mod structure;

pub use diagnostics::{SpecError, SpecErrors};
