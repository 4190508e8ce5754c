//! Backend-agnostic rendering interface

pub mod render_backend;

pub use render_backend::{
    BackendResult, CullMode, GpuMeshHandle, PolygonMode, ProgramHandle, RasterState, RenderBackend,
    RenderError, TextureHandle,
};
