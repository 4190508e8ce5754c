//! Rendering: materials, meshes, render modes, the frame driver and backends
//!
//! ## Organization
//!
//! - [`api`]: the [`RenderBackend`](api::RenderBackend) trait and handle types
//! - [`vulkan`]: the Vulkan implementation on `ash`
//! - [`headless`]: a recording implementation with no GPU
//! - [`renderer`]: walks the scene once per pass of the active [`RenderMode`]

pub mod api;
pub mod camera;
pub mod frame;
pub mod headless;
pub mod material;
pub mod mesh;
pub mod render_mode;
pub mod renderer;
pub mod vulkan;

pub use api::{RenderBackend, RenderError};
pub use camera::{Camera, CameraMove};
pub use frame::{DrawStats, FrameUniforms};
pub use headless::HeadlessBackend;
pub use material::{names, Material, MaterialError, ProgramBuilder, ShaderProgram, UniformSet, UniformValue};
pub use mesh::{Aabb, MeshData, MeshHandle, Topology, Vertex};
pub use render_mode::{MaterialOverride, PassConfig, RenderMode};
pub use renderer::Renderer;
