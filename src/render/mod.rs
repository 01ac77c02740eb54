//! Renderer contract and the built-in backends.

pub mod backend;
pub mod layout_only;
pub mod raster;

pub use backend::{
    BackendIdentity, BackendKind, PageRender, PaintedBlock, RenderBackend, RenderResult,
    RenderTarget, check_contract, create_backend,
};
