//! Recording backend without a GPU
//!
//! Implements [`RenderBackend`] by validating calls and appending them to a
//! command log. Used by unit tests to observe exactly what the scene asked
//! for, and by the application's headless smoke mode.

use std::collections::{BTreeMap, BTreeSet};

use crate::assets::{ImageData, ShaderSource, ShaderStage};
use crate::foundation::math::Vec4;
use crate::render::api::{
    BackendResult, GpuMeshHandle, ProgramHandle, RasterState, RenderBackend, RenderError, TextureHandle,
};
use crate::render::material::UniformSet;
use crate::render::mesh::Vertex;

/// A call observed by the headless backend
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// Frame started
    BeginFrame {
        /// Clear colour
        clear_colour: Vec4,
    },
    /// Raster state changed
    SetRasterState(RasterState),
    /// Program bound
    BindProgram {
        /// Program
        program: ProgramHandle,
        /// Merged uniforms as seen by the shader
        uniforms: UniformSet,
    },
    /// Program unbound
    UnbindProgram,
    /// Mesh drawn
    Draw {
        /// Mesh
        mesh: GpuMeshHandle,
        /// Program current at the time
        program: ProgramHandle,
    },
    /// Frame finished
    EndFrame,
}

#[derive(Debug, Clone)]
struct MeshRecord {
    index_count: usize,
}

/// Headless [`RenderBackend`]
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    extent: (u32, u32),
    next_id: u64,
    meshes: BTreeMap<u64, MeshRecord>,
    programs: BTreeMap<u64, String>,
    textures: BTreeSet<u64>,
    refused_programs: BTreeSet<String>,
    commands: Vec<RecordedCommand>,
    in_frame: bool,
    current_program: Option<ProgramHandle>,
    frames: u64,
}

impl HeadlessBackend {
    /// Backend reporting the given extent
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: (width, height),
            next_id: 1,
            ..Default::default()
        }
    }

    /// Make `create_program` fail for this program name
    pub fn refuse_program(&mut self, name: impl Into<String>) {
        self.refused_programs.insert(name.into());
    }

    /// Commands recorded since the last [`HeadlessBackend::take_commands`]
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Drain the command log
    pub fn take_commands(&mut self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of draw commands in the log
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::Draw { .. }))
            .count()
    }

    /// Live meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Live programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Frames completed
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Index count of an uploaded mesh
    pub fn index_count(&self, mesh: GpuMeshHandle) -> Option<usize> {
        self.meshes.get(&mesh.0).map(|m| m.index_count)
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn require_frame(&self, what: &str) -> BackendResult<()> {
        if self.in_frame {
            Ok(())
        } else {
            Err(RenderError::InvalidOperation(format!("{} outside of a frame", what)))
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn create_program(
        &mut self,
        name: &str,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> BackendResult<ProgramHandle> {
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err(RenderError::LinkFailed {
                name: name.to_string(),
                reason: "stages attached in the wrong slots".to_string(),
            });
        }
        if self.refused_programs.contains(name) {
            return Err(RenderError::LinkFailed {
                name: name.to_string(),
                reason: "refused by headless backend".to_string(),
            });
        }
        let id = self.allocate();
        self.programs.insert(id, name.to_string());
        Ok(ProgramHandle(id))
    }

    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> BackendResult<GpuMeshHandle> {
        if vertices.is_empty() || indices.is_empty() || indices.len() % 3 != 0 {
            return Err(RenderError::BackendError(format!(
                "mesh with {} vertices and {} indices is not a triangle list",
                vertices.len(),
                indices.len()
            )));
        }
        let id = self.allocate();
        self.meshes.insert(id, MeshRecord { index_count: indices.len() });
        Ok(GpuMeshHandle(id))
    }

    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.data.len() != expected {
            return Err(RenderError::BackendError(format!(
                "texture data is {} bytes, expected {}",
                image.data.len(),
                expected
            )));
        }
        let id = self.allocate();
        self.textures.insert(id);
        Ok(TextureHandle(id))
    }

    fn destroy_mesh(&mut self, mesh: GpuMeshHandle) {
        self.meshes.remove(&mesh.0);
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
    }

    fn begin_frame(&mut self, clear_colour: Vec4) -> BackendResult<bool> {
        if self.in_frame {
            return Err(RenderError::InvalidOperation("begin_frame called twice".to_string()));
        }
        self.in_frame = true;
        self.current_program = None;
        self.commands.push(RecordedCommand::BeginFrame { clear_colour });
        Ok(true)
    }

    fn set_raster_state(&mut self, state: RasterState) -> BackendResult<()> {
        self.require_frame("set_raster_state")?;
        self.commands.push(RecordedCommand::SetRasterState(state));
        Ok(())
    }

    fn bind_program(&mut self, program: ProgramHandle, uniforms: &UniformSet) -> BackendResult<()> {
        if !self.programs.contains_key(&program.0) {
            return Err(RenderError::UnknownHandle { kind: "program", id: program.0 });
        }
        if let Some(texture) = uniforms.texture() {
            if !self.textures.contains(&texture.0) {
                return Err(RenderError::UnknownHandle { kind: "texture", id: texture.0 });
            }
        }
        self.current_program = Some(program);
        self.commands.push(RecordedCommand::BindProgram {
            program,
            uniforms: uniforms.clone(),
        });
        Ok(())
    }

    fn unbind_program(&mut self) {
        self.current_program = None;
        self.commands.push(RecordedCommand::UnbindProgram);
    }

    fn draw_mesh(&mut self, mesh: GpuMeshHandle) -> BackendResult<()> {
        self.require_frame("draw_mesh")?;
        if !self.meshes.contains_key(&mesh.0) {
            return Err(RenderError::UnknownHandle { kind: "mesh", id: mesh.0 });
        }
        let program = self
            .current_program
            .ok_or_else(|| RenderError::InvalidOperation("draw without a bound program".to_string()))?;
        self.commands.push(RecordedCommand::Draw { mesh, program });
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.require_frame("end_frame")?;
        self.in_frame = false;
        self.frames += 1;
        self.commands.push(RecordedCommand::EndFrame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.extent = (width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::shader_loader::SPIRV_MAGIC;
    use crate::render::api::{CullMode, PolygonMode};

    fn stage(stage: ShaderStage) -> ShaderSource {
        ShaderSource {
            name: "stage.spv".to_string(),
            stage,
            code: vec![SPIRV_MAGIC, 0x0001_0000, 0, 1, 0],
        }
    }

    fn vertex() -> Vertex {
        Vertex {
            position: [0.0, 0.0, 0.0],
            normal: [0.0, 1.0, 0.0],
            tex_coord: [0.0, 0.0],
            colour: [1.0, 1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_refused_and_misplaced_programs() {
        let mut backend = HeadlessBackend::new(4, 4);
        backend.refuse_program("outline");

        let refused = backend.create_program("outline", &stage(ShaderStage::Vertex), &stage(ShaderStage::Fragment));
        assert!(matches!(refused, Err(RenderError::LinkFailed { .. })));

        let swapped = backend.create_program("toon", &stage(ShaderStage::Fragment), &stage(ShaderStage::Vertex));
        assert!(matches!(swapped, Err(RenderError::LinkFailed { .. })));

        assert!(backend
            .create_program("toon", &stage(ShaderStage::Vertex), &stage(ShaderStage::Fragment))
            .is_ok());
        assert_eq!(backend.program_count(), 1);
    }

    #[test]
    fn test_frame_records_in_order() {
        let mut backend = HeadlessBackend::new(4, 4);
        let program = backend
            .create_program("default", &stage(ShaderStage::Vertex), &stage(ShaderStage::Fragment))
            .unwrap();
        let mesh = backend.create_mesh(&[vertex(); 3], &[0, 1, 2]).unwrap();
        let state = RasterState {
            cull: CullMode::Back,
            polygon: PolygonMode::Fill,
            line_width: 1.0,
        };

        assert!(backend.begin_frame(Vec4::zeros()).unwrap());
        backend.set_raster_state(state).unwrap();
        backend.bind_program(program, &UniformSet::new()).unwrap();
        backend.draw_mesh(mesh).unwrap();
        backend.end_frame().unwrap();

        assert_eq!(backend.draw_count(), 1);
        assert_eq!(backend.frames(), 1);
        assert_eq!(backend.index_count(mesh), Some(3));
        assert_eq!(backend.commands()[3], RecordedCommand::Draw { mesh, program });
    }

    #[test]
    fn test_misuse_is_rejected() {
        let mut backend = HeadlessBackend::new(4, 4);
        let mesh = backend.create_mesh(&[vertex(); 3], &[0, 1, 2]).unwrap();

        assert!(backend.draw_mesh(mesh).is_err());
        assert!(backend.end_frame().is_err());
        assert!(backend.create_mesh(&[vertex(); 4], &[0, 1, 2, 3]).is_err());
        assert!(backend.create_texture(&ImageData::solid_color(2, 2, [0; 4])).is_ok());

        backend.begin_frame(Vec4::zeros()).unwrap();
        assert!(backend.begin_frame(Vec4::zeros()).is_err());
        // No program bound yet
        assert!(backend.draw_mesh(mesh).is_err());
    }
}
