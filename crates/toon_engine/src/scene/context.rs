//! The explicitly constructed state shared by update and draw
//!
//! Everything that would otherwise be global lives here: the asset table,
//! the scene forest, the active render mode and the light.

use super::{NodeId, SceneGraph};
use crate::assets::{AssetTable, MaterialId};
use crate::foundation::math::Vec3;
use crate::render::render_mode::{MaterialOverride, RenderMode};

/// Materials substituted by the toon modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeMaterials {
    /// Toon fill material
    pub toon: MaterialId,
    /// Outline material
    pub outline: MaterialId,
}

/// Where the light is each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSource {
    /// Fixed world position
    Fixed(Vec3),
    /// Follows a node's world position
    Node(NodeId),
}

/// Scene state passed through every update and draw
#[derive(Debug)]
pub struct SceneContext {
    /// Shared meshes, textures and materials
    pub assets: AssetTable,
    /// Scene forest
    pub graph: SceneGraph,
    mode: RenderMode,
    mode_materials: ModeMaterials,
    light: LightSource,
}

impl SceneContext {
    /// Context in [`RenderMode::Default`] with a light at the origin
    pub fn new(assets: AssetTable, mode_materials: ModeMaterials) -> Self {
        Self {
            assets,
            graph: SceneGraph::new(),
            mode: RenderMode::Default,
            mode_materials,
            light: LightSource::Fixed(Vec3::zeros()),
        }
    }

    /// Active render mode
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Switch render mode; takes effect on the next drawn frame
    pub fn set_mode(&mut self, mode: RenderMode) {
        if mode != self.mode {
            log::info!("Render mode {} -> {}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Toon and outline materials
    pub fn mode_materials(&self) -> ModeMaterials {
        self.mode_materials
    }

    /// Material to force for a pass, if any
    pub fn override_for(&self, material: MaterialOverride) -> Option<MaterialId> {
        match material {
            MaterialOverride::None => None,
            MaterialOverride::Toon => Some(self.mode_materials.toon),
            MaterialOverride::Outline => Some(self.mode_materials.outline),
        }
    }

    /// Set where the light comes from
    pub fn set_light(&mut self, light: LightSource) {
        self.light = light;
    }

    /// Light position in world space
    pub fn light_position(&self) -> Vec3 {
        match self.light {
            LightSource::Fixed(position) => position,
            LightSource::Node(id) => self.graph.world_position(id).unwrap_or_else(|| {
                log::trace!("Light node {:?} is gone; using origin", id);
                Vec3::zeros()
            }),
        }
    }

    /// Advance every root by `dt` seconds. Returns the number of nodes updated.
    pub fn update(&mut self, dt: f32) -> usize {
        self.graph.update(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::material::{Material, ShaderProgram};
    use crate::scene::GameObject;
    use approx::assert_relative_eq;

    fn context() -> SceneContext {
        let mut assets = AssetTable::new();
        let toon = assets.add_material(Material::new("toon", ShaderProgram::failed("toon", "test")));
        let outline = assets.add_material(Material::new("outline", ShaderProgram::failed("outline", "test")));
        SceneContext::new(assets, ModeMaterials { toon, outline })
    }

    #[test]
    fn test_overrides_per_pass() {
        let ctx = context();
        let materials = ctx.mode_materials();
        assert_eq!(ctx.override_for(MaterialOverride::None), None);
        assert_eq!(ctx.override_for(MaterialOverride::Toon), Some(materials.toon));
        assert_eq!(ctx.override_for(MaterialOverride::Outline), Some(materials.outline));
    }

    #[test]
    fn test_light_follows_node() {
        let mut ctx = context();
        let material = ctx.mode_materials().toon;
        let sphere = ctx
            .graph
            .spawn(GameObject::new("sphere", material).with_position(Vec3::new(0.0, 5.0, 0.0)))
            .unwrap();
        ctx.set_light(LightSource::Node(sphere));
        ctx.update(0.0);

        assert_relative_eq!(ctx.light_position(), Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_mode_switch() {
        let mut ctx = context();
        assert_eq!(ctx.mode(), RenderMode::Default);
        ctx.set_mode(RenderMode::ToonOutlines);
        assert_eq!(ctx.mode(), RenderMode::ToonOutlines);
    }
}
