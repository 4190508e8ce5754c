//! Frame driver: runs the active mode's passes over the scene forest

use crate::render::api::{RenderBackend, RenderError};
use crate::render::camera::Camera;
use crate::render::frame::{DrawStats, FrameUniforms};
use crate::render::render_mode::DEFAULT_OUTLINE_WIDTH;
use crate::scene::SceneContext;

/// Draws a [`SceneContext`] through a [`RenderBackend`]
#[derive(Debug, Clone)]
pub struct Renderer {
    outline_width: f32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_OUTLINE_WIDTH)
    }
}

impl Renderer {
    /// Renderer drawing outlines `outline_width` pixels wide
    pub fn new(outline_width: f32) -> Self {
        Self { outline_width }
    }

    /// Outline line width
    pub fn outline_width(&self) -> f32 {
        self.outline_width
    }

    /// Clear, traverse the forest once per pass of the current mode, present.
    ///
    /// Each pass sets its raster state and material override, then every
    /// root is drawn. The override lives only for the pass; no node or
    /// material is modified. Failed draws are counted in the stats and a
    /// pass whose setup fails is skipped; once the frame has begun it is
    /// always ended. Only `begin_frame` and `end_frame` errors are returned.
    pub fn draw_frame(
        &self,
        ctx: &SceneContext,
        camera: &Camera,
        backend: &mut dyn RenderBackend,
    ) -> Result<DrawStats, RenderError> {
        let mode = ctx.mode();
        let mut stats = DrawStats::default();

        if !backend.begin_frame(mode.clear_colour())? {
            log::debug!("Frame skipped by backend");
            return Ok(stats);
        }

        let frame = FrameUniforms::new(camera, ctx.light_position());

        for pass in mode.passes(self.outline_width) {
            let override_material = ctx.override_for(pass.material);
            let result = match backend.set_raster_state(pass.raster) {
                Ok(()) => ctx
                    .graph
                    .draw(&frame, override_material, &ctx.assets, backend, &mut stats),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => stats.passes += 1,
                Err(e) => log::error!("Pass {:?} of {} abandoned: {}", pass.material, mode, e),
            }
        }

        backend.unbind_program();
        backend.end_frame()?;
        stats.presented = true;

        log::trace!(
            "Frame ({}): {} passes, {} draws, {} skipped, {} refused, {} failed",
            mode,
            stats.passes,
            stats.draws,
            stats.skipped_meshes,
            stats.refused_binds,
            stats.failed_draws
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::shader_loader::SPIRV_MAGIC;
    use crate::assets::{AssetTable, MaterialId, ShaderSource, ShaderStage};
    use crate::foundation::math::{Vec3, Vec4};
    use crate::render::api::{CullMode, PolygonMode, ProgramHandle};
    use crate::render::headless::{HeadlessBackend, RecordedCommand};
    use crate::render::material::{names, Material, ProgramBuilder, ShaderProgram, UniformValue};
    use crate::render::mesh::{MeshData, Topology};
    use crate::render::render_mode::RenderMode;
    use crate::scene::{GameObject, ModeMaterials, NodeId};

    fn program(backend: &mut HeadlessBackend, name: &str) -> ShaderProgram {
        let stage = |stage| ShaderSource {
            name: format!("{name}.spv"),
            stage,
            code: vec![SPIRV_MAGIC, 0x0001_0000, 0, 1, 0],
        };
        ProgramBuilder::new(name)
            .attach(stage(ShaderStage::Vertex))
            .attach(stage(ShaderStage::Fragment))
            .link(backend)
    }

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            topology: Some(Topology::Triangles),
            ..Default::default()
        }
    }

    struct Fixture {
        backend: HeadlessBackend,
        ctx: SceneContext,
        camera: Camera,
        default_material: MaterialId,
        sphere: NodeId,
        torus: NodeId,
    }

    fn fixture() -> Fixture {
        let mut backend = HeadlessBackend::new(800, 600);
        let mut assets = AssetTable::new();

        let default_program = program(&mut backend, "default");
        let default_material = assets.add_material(
            Material::new("default", default_program)
                .with_uniform(names::COLOUR, UniformValue::Vec4(Vec4::new(1.0, 1.0, 1.0, 1.0)))
                .with_uniform(names::AMBIENT, UniformValue::Float(0.2)),
        );
        let toon_program = program(&mut backend, "toon");
        let toon = assets.add_material(
            Material::new("toon", toon_program).with_uniform(names::TOON_BANDS, UniformValue::Float(4.0)),
        );
        let outline_program = program(&mut backend, "outline");
        let outline = assets.add_material(
            Material::new("outline", outline_program)
                .with_uniform(names::COLOUR, UniformValue::Vec4(Vec4::new(0.0, 0.0, 0.0, 1.0)))
                .with_tint(false),
        );
        let mesh = assets.add_mesh("tri", &triangle(), &mut backend);

        let mut ctx = SceneContext::new(assets, ModeMaterials { toon, outline });
        let sphere = ctx
            .graph
            .spawn(
                GameObject::new("sphere", default_material)
                    .with_mesh(mesh)
                    .with_position(Vec3::new(0.0, 5.0, 0.0))
                    .with_tint(Vec4::new(1.0, 1.0, 1.0, 1.0)),
            )
            .unwrap();
        let torus = ctx
            .graph
            .spawn_child(
                sphere,
                GameObject::new("torus", default_material)
                    .with_mesh(mesh)
                    .with_uniform_scale(3.0)
                    .with_tint(Vec4::new(1.0, 0.0, 0.0, 1.0)),
            )
            .unwrap();
        ctx.update(0.0);

        Fixture {
            backend,
            ctx,
            camera: Camera::perspective(Vec3::new(0.0, 5.0, 20.0), 45.0, 800.0 / 600.0, 0.1, 100.0),
            default_material,
            sphere,
            torus,
        }
    }

    fn binds(commands: &[RecordedCommand]) -> Vec<(ProgramHandle, crate::render::material::UniformSet)> {
        commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BindProgram { program, uniforms } => Some((*program, uniforms.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_default_mode_single_pass() {
        let mut f = fixture();
        let stats = Renderer::default().draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();

        assert!(stats.presented);
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.draws, 2);
        assert_eq!(
            f.backend.commands()[0],
            RecordedCommand::BeginFrame { clear_colour: RenderMode::Default.clear_colour() }
        );
        assert_eq!(f.backend.commands().last(), Some(&RecordedCommand::EndFrame));
    }

    #[test]
    fn test_toon_outlines_draws_forest_twice() {
        let mut f = fixture();
        f.ctx.set_mode(RenderMode::ToonOutlines);
        let stats = Renderer::default().draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();

        assert_eq!(stats.passes, 2);
        assert_eq!(stats.draws, 4);

        let raster: Vec<_> = f
            .backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::SetRasterState(state) => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(raster[0].cull, CullMode::Front);
        assert_eq!(raster[0].polygon, PolygonMode::Line);
        assert_eq!(raster[0].line_width, 6.0);
        assert_eq!(raster[1].cull, CullMode::Back);
        assert_eq!(raster[1].polygon, PolygonMode::Fill);

        let outline = f.ctx.assets.material(f.ctx.mode_materials().outline).unwrap();
        let toon = f.ctx.assets.material(f.ctx.mode_materials().toon).unwrap();
        let bound = binds(f.backend.commands());
        assert_eq!(bound.len(), 4);
        assert!(bound[..2].iter().all(|(p, _)| Some(*p) == outline.program().handle()));
        assert!(bound[2..].iter().all(|(p, _)| Some(*p) == toon.program().handle()));

        // Outlines keep the material colour; the toon pass takes the tint
        assert_eq!(bound[1].1.vec4(names::COLOUR), Some(Vec4::new(0.0, 0.0, 0.0, 1.0)));
        assert_eq!(bound[3].1.vec4(names::COLOUR), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_outline_pass_does_not_touch_materials() {
        let mut f = fixture();
        let renderer = Renderer::default();

        renderer.draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        let before = binds(&f.backend.take_commands());

        f.ctx.set_mode(RenderMode::ToonOutlines);
        renderer.draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        f.backend.take_commands();

        for node in [f.sphere, f.torus] {
            assert_eq!(f.ctx.graph.get(node).unwrap().material(), f.default_material);
        }
        assert_eq!(
            f.ctx.assets.material(f.default_material).unwrap().uniform(names::COLOUR),
            Some(&UniformValue::Vec4(Vec4::new(1.0, 1.0, 1.0, 1.0)))
        );

        f.ctx.set_mode(RenderMode::Default);
        renderer.draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        let after = binds(f.backend.commands());
        assert_eq!(before, after);
    }

    #[test]
    fn test_mode_round_trip_leaves_scene_identical() {
        let mut f = fixture();
        let renderer = Renderer::default();
        let snapshot = |ctx: &SceneContext| {
            [f.sphere, f.torus]
                .iter()
                .map(|id| {
                    let node = ctx.graph.get(*id).unwrap();
                    (node.tint(), node.material(), node.mesh())
                })
                .collect::<Vec<_>>()
        };
        let initial = snapshot(&f.ctx);

        for mode in [RenderMode::Default, RenderMode::ToonOutlines, RenderMode::Default] {
            f.ctx.set_mode(mode);
            f.ctx.update(0.0);
            renderer.draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        }

        assert_eq!(snapshot(&f.ctx), initial);
        assert_eq!(f.backend.frames(), 3);
    }

    #[test]
    fn test_absent_mesh_and_unlinked_material_are_skipped() {
        let mut f = fixture();
        let broken = f
            .ctx
            .assets
            .add_material(Material::new("broken", ShaderProgram::failed("broken", "link error")));
        let missing = f.ctx.assets.load_mesh("ghost", "no/such.obj", &mut f.backend);
        let mesh = f.ctx.graph.get(f.sphere).unwrap().mesh().unwrap();

        f.ctx.graph.spawn(GameObject::new("ghost", f.default_material).with_mesh(missing)).unwrap();
        let refused = f.ctx.graph.spawn(GameObject::new("refused", broken).with_mesh(mesh)).unwrap();
        f.ctx
            .graph
            .spawn_child(refused, GameObject::new("below", f.default_material).with_mesh(mesh))
            .unwrap();

        let stats = Renderer::default().draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        assert_eq!(stats.skipped_meshes, 1);
        assert_eq!(stats.refused_binds, 1);
        // sphere, torus and the child of the refused node
        assert_eq!(stats.draws, 3);
    }

    #[test]
    fn test_backend_failure_skips_node_and_ends_frame() {
        let mut f = fixture();
        let texture = f
            .backend
            .create_texture(&crate::assets::ImageData::solid_color(2, 2, [255, 255, 255, 255]))
            .unwrap();
        f.backend.destroy_texture(texture);

        let bad_program = program(&mut f.backend, "textured");
        let bad = f.ctx.assets.add_material(
            Material::new("textured", bad_program)
                .with_uniform(names::TEXTURE, UniformValue::Texture { unit: 0, texture }),
        );
        let mesh = f.ctx.graph.get(f.sphere).unwrap().mesh().unwrap();
        let a_bad = f.ctx.graph.spawn(GameObject::new("a_bad", bad).with_mesh(mesh)).unwrap();
        f.ctx
            .graph
            .spawn_child(a_bad, GameObject::new("a_child", f.default_material).with_mesh(mesh))
            .unwrap();
        f.ctx
            .graph
            .spawn(GameObject::new("b_good", f.default_material).with_mesh(mesh))
            .unwrap();
        f.ctx.update(0.0);

        let renderer = Renderer::default();
        let stats = renderer.draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        assert!(stats.presented);
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.failed_draws, 1);
        // a_child, b_good, sphere and torus
        assert_eq!(stats.draws, 4);
        assert_eq!(f.backend.commands().last(), Some(&RecordedCommand::EndFrame));

        let stats = renderer.draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        assert!(stats.presented);
        assert_eq!(stats.failed_draws, 1);
        assert_eq!(f.backend.frames(), 2);
    }

    #[test]
    fn test_outline_pass_failure_still_draws_toon_pass() {
        let mut f = fixture();
        let texture = crate::render::api::TextureHandle(999);
        let outline = f.ctx.mode_materials().outline;
        let outline_program = program(&mut f.backend, "outline_textured");
        *f.ctx.assets.material_mut(outline).unwrap() = Material::new("outline", outline_program)
            .with_uniform(names::TEXTURE, UniformValue::Texture { unit: 0, texture });
        f.ctx.set_mode(RenderMode::ToonOutlines);

        let stats = Renderer::default().draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();
        assert!(stats.presented);
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.failed_draws, 2);
        assert_eq!(stats.draws, 2);
        assert_eq!(f.backend.frames(), 1);
    }

    #[test]
    fn test_light_uniform_is_view_space() {
        let mut f = fixture();
        f.ctx.set_light(crate::scene::LightSource::Fixed(Vec3::new(0.0, 5.0, 0.0)));
        Renderer::default().draw_frame(&f.ctx, &f.camera, &mut f.backend).unwrap();

        let expected = f.camera.view_matrix() * Vec4::new(0.0, 5.0, 0.0, 1.0);
        let bound = binds(f.backend.commands());
        assert_eq!(bound[0].1.vec4(names::LIGHT_POSITION), Some(expected));
    }
}
