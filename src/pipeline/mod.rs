//! Batch orchestration: per-sample runs, worker pool, cancellation, resume and verification.

pub mod batch;
pub mod cancel;
pub mod config;
pub mod reproduce;
pub mod sample;

pub use batch::{BatchReport, SampleFailure};
pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use reproduce::{Mismatch, VerifyReport, verify_manifest};
pub use sample::{Pipeline, sample_id};
