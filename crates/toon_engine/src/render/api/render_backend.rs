//! Backend abstraction traits for the rendering system
//!
//! The scene and renderer only talk to the GPU through [`RenderBackend`].
//! Resources are referred to by opaque handles the backend hands out.
//! Two implementations exist: the Vulkan backend used by applications and
//! the recording headless backend used by tests and smoke runs.

use thiserror::Error;

use crate::assets::{ImageData, ShaderSource};
use crate::foundation::math::Vec4;
use crate::render::material::UniformSet;
use crate::render::mesh::Vertex;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to vertex and index buffers stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuMeshHandle(pub u64);

/// Handle to a linked shader program stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

/// Handle to a sampled texture stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Which triangle faces are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// Draw both faces
    None,
    /// Discard front faces
    Front,
    /// Discard back faces
    Back,
}

/// How triangles are rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Filled triangles
    Fill,
    /// Triangle edges only
    Line,
}

/// Fixed-function state for one render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterState {
    /// Face culling
    pub cull: CullMode,
    /// Fill mode
    pub polygon: PolygonMode,
    /// Line width used when `polygon` is [`PolygonMode::Line`]
    pub line_width: f32,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            cull: CullMode::None,
            polygon: PolygonMode::Fill,
            line_width: 1.0,
        }
    }
}

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Backend could not be created
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
    /// A handle that the backend does not know
    #[error("Unknown {kind} handle {id}")]
    UnknownHandle {
        /// Resource kind
        kind: &'static str,
        /// Raw handle value
        id: u64,
    },
    /// Program stages were refused
    #[error("Program '{name}' failed to link: {reason}")]
    LinkFailed {
        /// Program name
        name: String,
        /// Backend diagnostic
        reason: String,
    },
    /// Draw issued outside begin_frame/end_frame
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    /// Any other backend failure
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Main rendering backend trait
pub trait RenderBackend {
    /// Current drawable extent (width, height)
    fn extent(&self) -> (u32, u32);

    /// Link a vertex and fragment module into a program
    fn create_program(
        &mut self,
        name: &str,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> BackendResult<ProgramHandle>;

    /// Upload interleaved vertices and a triangle list
    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> BackendResult<GpuMeshHandle>;

    /// Upload an RGBA8 image
    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle>;

    /// Free a mesh
    fn destroy_mesh(&mut self, mesh: GpuMeshHandle);

    /// Free a program
    fn destroy_program(&mut self, program: ProgramHandle);

    /// Free a texture
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Start a frame cleared to `clear_colour`.
    ///
    /// Returns `Ok(false)` when no image can be drawn this frame (for example
    /// while the swapchain is being recreated); the caller skips the frame.
    fn begin_frame(&mut self, clear_colour: Vec4) -> BackendResult<bool>;

    /// Set cull and fill state for subsequent draws
    fn set_raster_state(&mut self, state: RasterState) -> BackendResult<()>;

    /// Make `program` current with the given uniform values
    fn bind_program(&mut self, program: ProgramHandle, uniforms: &UniformSet) -> BackendResult<()>;

    /// Clear the current program
    fn unbind_program(&mut self) {}

    /// Draw a mesh with the current program and uniforms
    fn draw_mesh(&mut self, mesh: GpuMeshHandle) -> BackendResult<()>;

    /// Finish and present the frame
    fn end_frame(&mut self) -> BackendResult<()>;

    /// Window framebuffer changed size
    fn resize(&mut self, width: u32, height: u32);

    /// Block until the GPU is idle
    fn wait_idle(&mut self) -> BackendResult<()> {
        Ok(())
    }
}
