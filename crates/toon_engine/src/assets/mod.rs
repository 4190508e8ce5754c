//! Asset loading and the shared asset table
//!
//! Loaders turn files into CPU-side data ([`MeshData`](crate::render::mesh::MeshData),
//! [`ImageData`], [`ShaderSource`]). The [`AssetTable`] uploads that data
//! through a backend and owns the resulting meshes, textures and materials
//! for the lifetime of the scene.

pub mod asset_table;
pub mod image_loader;
pub mod obj_loader;
pub mod shader_loader;

pub use asset_table::{AssetTable, MaterialId, MeshId, TextureEntry, TextureId};
pub use image_loader::ImageData;
pub use obj_loader::{ObjError, ObjLoader};
pub use shader_loader::{ShaderError, ShaderLoader, ShaderSource, ShaderStage};

/// Asset errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Load failed
    #[error("Load failed: {0}")]
    LoadFailed(String),
}
