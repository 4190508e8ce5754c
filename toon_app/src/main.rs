//! Toon shading demo
//!
//! A textured floor, a light-carrying sphere orbiting above it, a big torus
//! cycling through the colour wheel and a ring of twelve tori. Keys 1, 2 and
//! 3 switch between plain, toon and outlined toon shading.
//!
//! ```text
//! toon_app [--config PATH] [--headless FRAMES]
//! ```

mod shapes;

use std::error::Error;
use std::path::PathBuf;

use thiserror::Error;
use toon_engine::assets::{AssetTable, ImageData, MaterialId, MeshId};
use toon_engine::config::Config;
use toon_engine::core::ApplicationConfig;
use toon_engine::foundation::colour::{colour_from_hue, rgb};
use toon_engine::foundation::logging;
use toon_engine::foundation::math::{Vec3, Vec4};
use toon_engine::render::api::RenderBackend;
use toon_engine::render::{names, HeadlessBackend, Material, MeshData, UniformValue};
use toon_engine::scene::layout::ring_positions;
use toon_engine::scene::{GameObject, HueCycle, LightOrbit, LightSource, ModeMaterials, SceneContext};
use toon_engine::{Application, Engine, EngineError};

const DEFAULT_CONFIG: &str = "config/toon_app.toml";
const RING_COUNT: usize = 12;
const AMBIENT: f32 = 0.15;
const TOON_BANDS: f32 = 4.0;
const HEADLESS_DELTA: f32 = 1.0 / 60.0;

/// Command line problems
#[derive(Error, Debug, PartialEq, Eq)]
enum ArgsError {
    #[error("{0} expects a value")]
    MissingValue(&'static str),
    #[error("invalid frame count '{0}'")]
    InvalidFrames(String),
    #[error("unknown argument '{0}'")]
    Unknown(String),
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    config: PathBuf,
    headless_frames: Option<u32>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            headless_frames: None,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    parsed.config = args.next().map(PathBuf::from).ok_or(ArgsError::MissingValue("--config"))?;
                }
                "--headless" => {
                    let value = args.next().ok_or(ArgsError::MissingValue("--headless"))?;
                    let frames = value.parse().map_err(|_| ArgsError::InvalidFrames(value))?;
                    parsed.headless_frames = Some(frames);
                }
                _ => return Err(ArgsError::Unknown(arg)),
            }
        }
        Ok(parsed)
    }
}

/// Builds the demo scene
#[derive(Debug, Default)]
struct ToonDemo;

impl ToonDemo {
    /// Load `file` from the model directory, or upload the procedural stand-in
    fn mesh(
        assets: &mut AssetTable,
        config: &ApplicationConfig,
        backend: &mut dyn RenderBackend,
        name: &str,
        file: &str,
        fallback: impl FnOnce() -> MeshData,
    ) -> MeshId {
        let path = config.assets.model_path(file);
        if path.exists() {
            assets.load_mesh(name, &path, backend)
        } else {
            log::debug!("{} not found, generating '{}'", path.display(), name);
            assets.add_mesh(name, &fallback(), backend)
        }
    }

    /// Floor texture from disk, or a generated checkerboard
    fn floor_texture(
        assets: &mut AssetTable,
        config: &ApplicationConfig,
        backend: &mut dyn RenderBackend,
    ) -> Option<UniformValue> {
        let path = config.assets.texture_path("floor.png");
        let id = if path.exists() {
            assets.load_texture("floor", &path, config.assets.flip_textures, backend)
        } else {
            assets.add_texture("floor", &checkerboard(64, 8), backend)
        };
        assets.texture_uniform(id, 0)
    }

    fn materials(
        assets: &mut AssetTable,
        config: &ApplicationConfig,
        backend: &mut dyn RenderBackend,
    ) -> (MaterialId, MaterialId, ModeMaterials) {
        let shader = |file: &str| config.renderer.shader_path(file);
        let default_program = assets.load_program(
            "default",
            shader("default_vert.spv"),
            shader("default_frag.spv"),
            backend,
        );
        let toon_program =
            assets.load_program("toon", shader("default_vert.spv"), shader("toon_frag.spv"), backend);
        let outline_program = assets.load_program(
            "outline",
            shader("passthru_vert.spv"),
            shader("solid_colour_frag.spv"),
            backend,
        );

        let mut floor = Material::new("floor", default_program.clone())
            .with_uniform(names::COLOUR, UniformValue::Vec4(rgb(0.8, 0.8, 0.8)))
            .with_uniform(names::AMBIENT, UniformValue::Float(AMBIENT));
        if let Some(texture) = Self::floor_texture(assets, config, backend) {
            floor.set_uniform(names::TEXTURE, texture);
        }

        let default = assets.add_material(
            Material::new("default", default_program)
                .with_uniform(names::COLOUR, UniformValue::Vec4(rgb(1.0, 1.0, 1.0)))
                .with_uniform(names::AMBIENT, UniformValue::Float(AMBIENT)),
        );
        let floor = assets.add_material(floor);
        let toon = assets.add_material(
            Material::new("toon", toon_program)
                .with_uniform(names::TOON_BANDS, UniformValue::Float(TOON_BANDS))
                .with_uniform(names::AMBIENT, UniformValue::Float(AMBIENT)),
        );
        let outline = assets.add_material(
            Material::new("outline", outline_program)
                .with_uniform(names::COLOUR, UniformValue::Vec4(Vec4::new(0.0, 0.0, 0.0, 1.0)))
                .with_tint(false),
        );

        (default, floor, ModeMaterials { toon, outline })
    }
}

impl Application for ToonDemo {
    fn initialize(
        &mut self,
        backend: &mut dyn RenderBackend,
        config: &ApplicationConfig,
    ) -> Result<SceneContext, EngineError> {
        let mut assets = AssetTable::new();
        let (default, floor_material, mode_materials) = Self::materials(&mut assets, config, backend);

        let floor_mesh = Self::mesh(&mut assets, config, backend, "floor", "floor.obj", || shapes::floor(40.0, 4));
        let sphere_mesh = Self::mesh(&mut assets, config, backend, "sphere", "sphere.obj", || {
            shapes::uv_sphere(1.0, 16, 32)
        });
        let torus_mesh = Self::mesh(&mut assets, config, backend, "torus", "torus.obj", || {
            shapes::torus(1.0, 0.3, 32, 16)
        });

        let mut ctx = SceneContext::new(assets, mode_materials);

        ctx.graph.spawn(GameObject::new("floor", floor_material).with_mesh(floor_mesh))?;

        let sphere = ctx.graph.spawn(
            GameObject::new("sphere", default)
                .with_mesh(sphere_mesh)
                .with_position(Vec3::new(0.0, 5.0, 0.0))
                .with_tint(rgb(1.0, 1.0, 1.0))
                .with_behaviour(LightOrbit::new(10.0, 10.0, 2.0)),
        )?;
        ctx.set_light(LightSource::Node(sphere));

        ctx.graph.spawn(
            GameObject::new("bigTorus", default)
                .with_mesh(torus_mesh)
                .with_position(Vec3::new(0.0, 2.0, 0.0))
                .with_uniform_scale(3.0)
                .with_behaviour(HueCycle::new(0.1)),
        )?;

        for (i, position) in ring_positions(RING_COUNT, 10.0, 2.0).into_iter().enumerate() {
            ctx.graph.spawn(
                GameObject::new(format!("torus{i}"), default)
                    .with_mesh(torus_mesh)
                    .with_position(position)
                    .with_tint(colour_from_hue(i as f32 / RING_COUNT as f32)),
            )?;
        }

        ctx.update(0.0);
        log::info!(
            "Scene ready: {} nodes, {} roots",
            ctx.graph.len(),
            ctx.graph.root_count()
        );
        Ok(ctx)
    }
}

/// `size` x `size` RGBA checkerboard with `cells` squares per side
fn checkerboard(size: u32, cells: u32) -> ImageData {
    let cell = (size / cells.max(1)).max(1);
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let value = if light { 230 } else { 90 };
            data.extend_from_slice(&[value, value, value, 255]);
        }
    }
    ImageData {
        data,
        width: size,
        height: size,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse(std::env::args().skip(1))?;
    let config = ApplicationConfig::load_or_default(&args.config)?;
    logging::init_with_filter(&config.logging.level);

    log::info!("Starting toon demo with {}", args.config.display());
    let engine = Engine::new(config)?;
    let mut demo = ToonDemo;

    match args.headless_frames {
        Some(frames) => {
            let (width, height) = (engine.config().window.width, engine.config().window.height);
            let mut backend = HeadlessBackend::new(width, height);
            let stats = engine.run_frames(&mut demo, &mut backend, frames, HEADLESS_DELTA)?;
            log::info!(
                "Headless run: {} frames, {} passes, {} draws, {} refused, {} failed",
                backend.frames(),
                stats.passes,
                stats.draws,
                stats.refused_binds,
                stats.failed_draws
            );
        }
        None => engine.run(&mut demo)?,
    }

    log::info!("Toon demo shut down cleanly");
    Ok(())
}
