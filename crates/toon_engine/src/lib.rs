//! # Toon Engine
//!
//! A small Vulkan renderer built around a scene graph with swappable
//! shading modes.
//!
//! ## Features
//!
//! - **Scene forest**: arena-backed nodes with cached world matrices and
//!   per-node behaviours
//! - **Shared assets**: meshes, textures and materials referenced by key
//! - **Render modes**: flat, toon and toon with outlines, switched at runtime
//! - **Backends**: Vulkan through `ash`, plus a recording headless backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toon_engine::prelude::*;
//!
//! struct Demo;
//!
//! impl Application for Demo {
//!     fn initialize(
//!         &mut self,
//!         _backend: &mut dyn RenderBackend,
//!         _config: &ApplicationConfig,
//!     ) -> Result<SceneContext, EngineError> {
//!         Err(EngineError::Application("build your scene here".into()))
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(ApplicationConfig::default())?;
//!     engine.run(&mut Demo)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]

pub mod assets;
pub mod config;
pub mod core;
pub mod foundation;
pub mod input;
pub mod render;
pub mod scene;

mod engine;

pub use engine::{Application, Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetTable, ImageData, MaterialId, MeshId, ObjLoader, ShaderLoader, ShaderStage, TextureId},
        config::Config,
        core::ApplicationConfig,
        foundation::{
            colour::colour_from_hue,
            math::{Mat4, Transform, Vec3, Vec4},
            time::Timer,
        },
        input::{InputEvent, InputState},
        render::{
            api::{RenderBackend, RenderError},
            names, Camera, CameraMove, HeadlessBackend, Material, MeshData, RenderMode, Renderer, UniformValue,
        },
        scene::{GameObject, HueCycle, LightOrbit, LightSource, ModeMaterials, NodeId, SceneContext, SceneGraph, Spin},
        Application, Engine, EngineError,
    };
}
