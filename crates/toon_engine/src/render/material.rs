//! Materials: a shader program plus named uniform values
//!
//! A [`Material`] is shared by every node that references it, so drawing
//! never writes into it. Per-draw values (matrices, tint, light) travel in a
//! separate transient [`UniformSet`] that is overlaid on the stored uniforms
//! at bind time and then discarded.
//!
//! A material whose program failed to link refuses every bind. The first
//! refusal is logged at error level, later ones at trace level.

use std::cell::Cell;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::assets::{ShaderSource, ShaderStage};
use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::api::{ProgramHandle, RenderBackend, RenderError, TextureHandle};

/// Well-known uniform names filled in by the scene at draw time
pub mod names {
    /// Model (world) matrix of the node being drawn
    pub const MODEL: &str = "u_model";
    /// Camera view matrix
    pub const VIEW: &str = "u_view";
    /// Camera projection matrix
    pub const PROJECTION: &str = "u_projection";
    /// Light position in view space
    pub const LIGHT_POSITION: &str = "u_lightPos";
    /// Object colour, multiplied with vertex colour
    pub const COLOUR: &str = "u_colour";
    /// Number of toon shading bands
    pub const TOON_BANDS: &str = "u_toonBands";
    /// Ambient light term
    pub const AMBIENT: &str = "u_ambient";
    /// Diffuse texture
    pub const TEXTURE: &str = "u_texture";
}

/// A typed uniform value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Single float
    Float(f32),
    /// Single signed integer
    Int(i32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// 3x3 matrix
    Mat3(Mat3),
    /// 4x4 matrix
    Mat4(Mat4),
    /// Texture bound to a sampler unit
    Texture {
        /// Sampler unit
        unit: u32,
        /// Backend texture
        texture: TextureHandle,
    },
}

impl UniformValue {
    /// Float payload, if this is a float
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// 4-vector payload; 3-vectors are extended with `w = 1`
    pub fn as_vec4(&self) -> Option<Vec4> {
        match self {
            Self::Vec4(v) => Some(*v),
            Self::Vec3(v) => Some(v.push(1.0)),
            _ => None,
        }
    }

    /// Matrix payload, if this is a 4x4 matrix
    pub fn as_mat4(&self) -> Option<Mat4> {
        match self {
            Self::Mat4(m) => Some(*m),
            _ => None,
        }
    }
}

/// Uniform name to value, ordered by name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UniformSet {
    values: BTreeMap<String, UniformValue>,
}

impl UniformSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value
    pub fn set(&mut self, name: impl Into<String>, value: UniformValue) {
        self.values.insert(name.into(), value);
    }

    /// Look up a value
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    /// Float value by name
    pub fn float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(UniformValue::as_float)
    }

    /// 4-vector value by name
    pub fn vec4(&self, name: &str) -> Option<Vec4> {
        self.get(name).and_then(UniformValue::as_vec4)
    }

    /// Matrix value by name
    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        self.get(name).and_then(UniformValue::as_mat4)
    }

    /// First texture value in the set
    pub fn texture(&self) -> Option<TextureHandle> {
        self.values.values().find_map(|v| match v {
            UniformValue::Texture { texture, .. } => Some(*texture),
            _ => None,
        })
    }

    /// Copy of `self` with every entry of `overlay` written on top
    pub fn overlaid(&self, overlay: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in &overlay.values {
            merged.values.insert(name.clone(), *value);
        }
        merged
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of linking a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Usable program
    Linked(ProgramHandle),
    /// Link failed; the reason is kept for diagnostics
    Failed(String),
}

/// A named, linked (or failed) shader program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    name: String,
    status: LinkStatus,
}

impl ShaderProgram {
    /// Program name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link outcome
    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    /// Backend handle if linked
    pub fn handle(&self) -> Option<ProgramHandle> {
        match self.status {
            LinkStatus::Linked(handle) => Some(handle),
            LinkStatus::Failed(_) => None,
        }
    }

    /// Whether the program linked
    pub fn is_linked(&self) -> bool {
        self.handle().is_some()
    }

    /// A program that can never be bound
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: LinkStatus::Failed(reason.into()),
        }
    }
}

/// Collects shader stages and links them
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    name: String,
    vertex: Option<ShaderSource>,
    fragment: Option<ShaderSource>,
    load_errors: Vec<String>,
}

impl ProgramBuilder {
    /// Start a program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach a loaded stage, replacing any earlier module for that stage
    #[must_use]
    pub fn attach(mut self, source: ShaderSource) -> Self {
        match source.stage {
            ShaderStage::Vertex => self.vertex = Some(source),
            ShaderStage::Fragment => self.fragment = Some(source),
        }
        self
    }

    /// Attach the result of a load; a failed load is remembered and makes linking fail
    #[must_use]
    pub fn attach_result<E: std::fmt::Display>(self, source: Result<ShaderSource, E>) -> Self {
        match source {
            Ok(source) => self.attach(source),
            Err(e) => {
                let mut builder = self;
                log::warn!("Shader stage for '{}' failed to load: {}", builder.name, e);
                builder.load_errors.push(e.to_string());
                builder
            }
        }
    }

    /// Link the attached stages.
    ///
    /// Never errors: a missing stage, a failed load or a backend refusal
    /// yields a program with [`LinkStatus::Failed`].
    pub fn link(self, backend: &mut dyn RenderBackend) -> ShaderProgram {
        let status = match (&self.vertex, &self.fragment) {
            _ if !self.load_errors.is_empty() => LinkStatus::Failed(self.load_errors.join("; ")),
            (Some(vertex), Some(fragment)) => match backend.create_program(&self.name, vertex, fragment) {
                Ok(handle) => LinkStatus::Linked(handle),
                Err(e) => LinkStatus::Failed(e.to_string()),
            },
            (None, _) => LinkStatus::Failed("no vertex stage attached".to_string()),
            (_, None) => LinkStatus::Failed("no fragment stage attached".to_string()),
        };

        match &status {
            LinkStatus::Linked(handle) => log::debug!("Linked program '{}' as {:?}", self.name, handle),
            LinkStatus::Failed(reason) => log::error!("Program '{}' failed to link: {}", self.name, reason),
        }

        ShaderProgram {
            name: self.name,
            status,
        }
    }
}

/// Material errors
#[derive(Error, Debug)]
pub enum MaterialError {
    /// The program never linked
    #[error("material '{material}' has an unlinked program: {reason}")]
    Unlinked {
        /// Material name
        material: String,
        /// Link diagnostic
        reason: String,
    },
    /// The backend refused the bind
    #[error(transparent)]
    Backend(#[from] RenderError),
}

/// Shader program plus stored uniform values
#[derive(Debug)]
pub struct Material {
    name: String,
    program: ShaderProgram,
    uniforms: UniformSet,
    accepts_tint: bool,
    refusal_logged: Cell<bool>,
}

impl Material {
    /// Create a material over `program`
    pub fn new(name: impl Into<String>, program: ShaderProgram) -> Self {
        Self {
            name: name.into(),
            program,
            uniforms: UniformSet::new(),
            accepts_tint: true,
            refusal_logged: Cell::new(false),
        }
    }

    /// Builder form of [`Material::set_uniform`]
    #[must_use]
    pub fn with_uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.set_uniform(name, value);
        self
    }

    /// Whether node tints override the material's own `u_colour`
    #[must_use]
    pub fn with_tint(mut self, accepts_tint: bool) -> Self {
        self.accepts_tint = accepts_tint;
        self
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Program
    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Stored uniforms
    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    /// Look up a stored uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// Whether node tints are applied when drawing with this material
    pub fn accepts_tint(&self) -> bool {
        self.accepts_tint
    }

    /// Store a uniform; the last write for a name wins
    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        self.uniforms.set(name, value);
    }

    /// Bind the program with stored uniforms overlaid by `transient`
    pub fn bind(&self, backend: &mut dyn RenderBackend, transient: &UniformSet) -> Result<(), MaterialError> {
        let Some(handle) = self.program.handle() else {
            let reason = match self.program.status() {
                LinkStatus::Failed(reason) => reason.clone(),
                LinkStatus::Linked(_) => String::new(),
            };
            if self.refusal_logged.replace(true) {
                log::trace!("Refusing bind of material '{}'", self.name);
            } else {
                log::error!(
                    "Refusing to bind material '{}': program '{}' is not linked ({})",
                    self.name,
                    self.program.name(),
                    reason
                );
            }
            return Err(MaterialError::Unlinked {
                material: self.name.clone(),
                reason,
            });
        };

        backend.bind_program(handle, &self.uniforms.overlaid(transient))?;
        Ok(())
    }

    /// Clear the bound program
    pub fn unbind(&self, backend: &mut dyn RenderBackend) {
        backend.unbind_program();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::shader_loader::{ShaderError, SPIRV_MAGIC};
    use crate::render::headless::{HeadlessBackend, RecordedCommand};

    fn stage(name: &str, stage: ShaderStage) -> ShaderSource {
        ShaderSource {
            name: name.to_string(),
            stage,
            code: vec![SPIRV_MAGIC, 0x0001_0000, 0, 1, 0],
        }
    }

    fn linked(backend: &mut HeadlessBackend) -> ShaderProgram {
        ProgramBuilder::new("default")
            .attach(stage("default.vert", ShaderStage::Vertex))
            .attach(stage("default.frag", ShaderStage::Fragment))
            .link(backend)
    }

    #[test]
    fn test_set_uniform_last_write_wins() {
        let mut material = Material::new("m", ShaderProgram::failed("p", "unused"));
        material.set_uniform(names::AMBIENT, UniformValue::Float(0.1));
        material.set_uniform(names::AMBIENT, UniformValue::Float(0.3));
        assert_eq!(material.uniform(names::AMBIENT), Some(&UniformValue::Float(0.3)));
        assert_eq!(material.uniforms().len(), 1);
    }

    #[test]
    fn test_missing_stage_fails_link() {
        let mut backend = HeadlessBackend::new(8, 8);
        let program = ProgramBuilder::new("half")
            .attach(stage("default.vert", ShaderStage::Vertex))
            .link(&mut backend);
        assert!(!program.is_linked());
        assert_eq!(backend.program_count(), 0);
    }

    #[test]
    fn test_failed_load_fails_link() {
        let mut backend = HeadlessBackend::new(8, 8);
        let program = ProgramBuilder::new("toon")
            .attach(stage("default.vert", ShaderStage::Vertex))
            .attach_result(Err::<ShaderSource, _>(ShaderError::BadMagic(0)))
            .link(&mut backend);
        assert!(matches!(program.status(), LinkStatus::Failed(reason) if reason.contains("magic")));
    }

    #[test]
    fn test_unlinked_material_refuses_every_bind() {
        let mut backend = HeadlessBackend::new(8, 8);
        let material = Material::new("broken", ShaderProgram::failed("p", "syntax error"));

        for _ in 0..2 {
            let err = material.bind(&mut backend, &UniformSet::new()).unwrap_err();
            assert!(matches!(err, MaterialError::Unlinked { .. }));
        }
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn test_bind_overlays_transient_without_mutating() {
        let mut backend = HeadlessBackend::new(8, 8);
        let program = linked(&mut backend);
        let material = Material::new("default", program)
            .with_uniform(names::COLOUR, UniformValue::Vec4(Vec4::new(1.0, 1.0, 1.0, 1.0)))
            .with_uniform(names::AMBIENT, UniformValue::Float(0.2));

        let mut transient = UniformSet::new();
        transient.set(names::COLOUR, UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        material.bind(&mut backend, &transient).unwrap();

        let RecordedCommand::BindProgram { uniforms, .. } = &backend.commands()[0] else {
            panic!("expected a bind");
        };
        assert_eq!(uniforms.vec4(names::COLOUR), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(uniforms.float(names::AMBIENT), Some(0.2));
        assert_eq!(
            material.uniform(names::COLOUR),
            Some(&UniformValue::Vec4(Vec4::new(1.0, 1.0, 1.0, 1.0)))
        );
    }
}
