//! Shared meshes, textures and materials
//!
//! Nodes hold slotmap keys into this table instead of owning assets, so one
//! mesh or material can back any number of nodes. Load failures never abort
//! scene construction: the key is still handed out, the problem is logged,
//! and whatever references the asset draws nothing.

use std::collections::HashMap;
use std::path::Path;

use slotmap::{new_key_type, SlotMap};

use super::{ImageData, ObjLoader, ShaderLoader, ShaderStage};
use crate::render::api::{RenderBackend, TextureHandle};
use crate::render::material::{Material, ProgramBuilder, ShaderProgram, UniformValue};
use crate::render::mesh::{MeshData, MeshHandle};

new_key_type! {
    /// Key of a mesh in the asset table
    pub struct MeshId;
    /// Key of a material in the asset table
    pub struct MaterialId;
    /// Key of a texture in the asset table
    pub struct TextureId;
}

/// A texture slot; `handle` is `None` when the image failed to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    /// Texture name
    pub name: String,
    /// Backend texture
    pub handle: Option<TextureHandle>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Owner of every shared asset
#[derive(Debug, Default)]
pub struct AssetTable {
    meshes: SlotMap<MeshId, MeshHandle>,
    mesh_names: HashMap<String, MeshId>,
    materials: SlotMap<MaterialId, Material>,
    material_names: HashMap<String, MaterialId>,
    textures: SlotMap<TextureId, TextureEntry>,
    texture_names: HashMap<String, TextureId>,
}

impl AssetTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an OBJ file and upload it. A failed load still returns a key
    /// whose mesh draws nothing.
    pub fn load_mesh(&mut self, name: &str, path: impl AsRef<Path>, backend: &mut dyn RenderBackend) -> MeshId {
        let path = path.as_ref();
        match ObjLoader::load_obj(path) {
            Ok(data) => self.add_mesh(name, &data, backend),
            Err(e) => {
                log::warn!("Failed to load mesh '{}' from {}: {}", name, path.display(), e);
                self.insert_mesh(MeshHandle::missing(name))
            }
        }
    }

    /// Upload in-memory geometry
    pub fn add_mesh(&mut self, name: &str, data: &MeshData, backend: &mut dyn RenderBackend) -> MeshId {
        self.insert_mesh(MeshHandle::upload(name, data, backend))
    }

    fn insert_mesh(&mut self, mesh: MeshHandle) -> MeshId {
        let name = mesh.name().to_string();
        let id = self.meshes.insert(mesh);
        if self.mesh_names.insert(name.clone(), id).is_some() {
            log::warn!("Mesh name '{}' reused; lookups now return the newest", name);
        }
        id
    }

    /// Mesh by key
    pub fn mesh(&self, id: MeshId) -> Option<&MeshHandle> {
        self.meshes.get(id)
    }

    /// Mesh key by name
    pub fn mesh_id(&self, name: &str) -> Option<MeshId> {
        self.mesh_names.get(name).copied()
    }

    /// Number of meshes, including absent ones
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Load and upload an image
    pub fn load_texture(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        flip: bool,
        backend: &mut dyn RenderBackend,
    ) -> TextureId {
        match ImageData::from_file(path.as_ref(), flip) {
            Ok(image) => self.add_texture(name, &image, backend),
            Err(e) => {
                log::warn!("Failed to load texture '{}': {}", name, e);
                self.insert_texture(TextureEntry {
                    name: name.to_string(),
                    handle: None,
                    width: 0,
                    height: 0,
                })
            }
        }
    }

    /// Upload decoded image data
    pub fn add_texture(&mut self, name: &str, image: &ImageData, backend: &mut dyn RenderBackend) -> TextureId {
        let handle = backend
            .create_texture(image)
            .map_err(|e| log::warn!("Texture '{}' upload failed: {}", name, e))
            .ok();
        self.insert_texture(TextureEntry {
            name: name.to_string(),
            handle,
            width: image.width,
            height: image.height,
        })
    }

    fn insert_texture(&mut self, entry: TextureEntry) -> TextureId {
        let name = entry.name.clone();
        let id = self.textures.insert(entry);
        self.texture_names.insert(name, id);
        id
    }

    /// Texture by key
    pub fn texture(&self, id: TextureId) -> Option<&TextureEntry> {
        self.textures.get(id)
    }

    /// Texture key by name
    pub fn texture_id(&self, name: &str) -> Option<TextureId> {
        self.texture_names.get(name).copied()
    }

    /// Sampler uniform for a loaded texture
    pub fn texture_uniform(&self, id: TextureId, unit: u32) -> Option<UniformValue> {
        let texture = self.textures.get(id)?.handle?;
        Some(UniformValue::Texture { unit, texture })
    }

    /// Load both SPIR-V stages and link them. Never fails; see [`ShaderProgram::is_linked`].
    pub fn load_program(
        &self,
        name: &str,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        backend: &mut dyn RenderBackend,
    ) -> ShaderProgram {
        ProgramBuilder::new(name)
            .attach_result(ShaderLoader::load(vertex_path, ShaderStage::Vertex))
            .attach_result(ShaderLoader::load(fragment_path, ShaderStage::Fragment))
            .link(backend)
    }

    /// Take ownership of a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let name = material.name().to_string();
        let id = self.materials.insert(material);
        if self.material_names.insert(name.clone(), id).is_some() {
            log::warn!("Material name '{}' reused; lookups now return the newest", name);
        }
        id
    }

    /// Material by key
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Mutable material by key, for changing stored uniforms between frames
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Material key by name
    pub fn material_id(&self, name: &str) -> Option<MaterialId> {
        self.material_names.get(name).copied()
    }

    /// Free every GPU resource. Keys stay valid; their assets draw nothing.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        for mesh in self.meshes.values_mut() {
            mesh.release(backend);
        }

        let mut programs: Vec<_> = self
            .materials
            .values()
            .filter_map(|m| m.program().handle())
            .collect();
        programs.sort_unstable();
        programs.dedup();
        for program in programs {
            backend.destroy_program(program);
        }

        for texture in self.textures.values_mut() {
            if let Some(handle) = texture.handle.take() {
                backend.destroy_texture(handle);
            }
        }
        log::info!(
            "Released {} meshes, {} materials, {} textures",
            self.meshes.len(),
            self.materials.len(),
            self.textures.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessBackend;
    use crate::render::mesh::Topology;

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            topology: Some(Topology::Triangles),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_mesh_file_yields_absent_mesh() {
        let mut backend = HeadlessBackend::new(8, 8);
        let mut assets = AssetTable::new();

        let id = assets.load_mesh("ghost", "no/such/file.obj", &mut backend);
        let mesh = assets.mesh(id).unwrap();
        assert_eq!(mesh.name(), "ghost");
        assert!(!mesh.is_drawable());
        assert_eq!(assets.mesh_id("ghost"), Some(id));
    }

    #[test]
    fn test_missing_shader_gives_unlinked_program() {
        let mut backend = HeadlessBackend::new(8, 8);
        let assets = AssetTable::new();
        let program = assets.load_program("toon", "no/toon.vert.spv", "no/toon.frag.spv", &mut backend);
        assert!(!program.is_linked());
    }

    #[test]
    fn test_texture_uniform_requires_upload() {
        let mut backend = HeadlessBackend::new(8, 8);
        let mut assets = AssetTable::new();

        let good = assets.add_texture("white", &ImageData::solid_color(2, 2, [255; 4]), &mut backend);
        let bad = assets.load_texture("missing", "no/such.png", true, &mut backend);

        assert!(matches!(assets.texture_uniform(good, 0), Some(UniformValue::Texture { unit: 0, .. })));
        assert_eq!(assets.texture_uniform(bad, 0), None);
    }

    #[test]
    fn test_release_frees_backend_resources() {
        let mut backend = HeadlessBackend::new(8, 8);
        let mut assets = AssetTable::new();
        let mesh = assets.add_mesh("tri", &triangle(), &mut backend);
        assets.add_texture("white", &ImageData::solid_color(1, 1, [255; 4]), &mut backend);
        assert_eq!(backend.mesh_count(), 1);

        assets.release(&mut backend);
        assert_eq!(backend.mesh_count(), 0);
        assert_eq!(backend.texture_count(), 0);
        assert!(!assets.mesh(mesh).unwrap().is_drawable());
    }
}
