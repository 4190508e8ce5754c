//! Main loop: window events, update, draw
//!
//! [`Engine`] owns the camera, input state and clock. The scene itself is
//! built by an [`Application`] and passed back in explicitly every tick.

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::ApplicationConfig;
use crate::foundation::time::{FrameLimiter, Timer};
use crate::input::{InputEvent, InputState};
use crate::render::api::{RenderBackend, RenderError};
use crate::render::vulkan::{VulkanBackend, Window, WindowError};
use crate::render::{Camera, DrawStats, Renderer};
use crate::scene::{SceneContext, SceneError};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Startup failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Configuration rejected
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Window system failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Backend failure
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Scene construction failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Reported by the application
    #[error("Application error: {0}")]
    Application(String),
}

/// What a program built on the engine provides
pub trait Application {
    /// Load assets through `backend` and build the scene
    fn initialize(
        &mut self,
        backend: &mut dyn RenderBackend,
        config: &ApplicationConfig,
    ) -> Result<SceneContext, EngineError>;

    /// Per-frame hook before the scene update
    fn update(&mut self, _ctx: &mut SceneContext, _delta_time: f32) {}

    /// Release GPU resources before the backend goes away
    fn cleanup(&mut self, ctx: &mut SceneContext, backend: &mut dyn RenderBackend) {
        ctx.assets.release(backend);
    }
}

/// Camera, input and clock driving a [`SceneContext`] through a backend
pub struct Engine {
    config: ApplicationConfig,
    renderer: Renderer,
    camera: Camera,
    input: InputState,
    running: bool,
}

impl Engine {
    /// Engine for a validated configuration
    pub fn new(config: ApplicationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let aspect = config.window.width as f32 / config.window.height as f32;

        Ok(Self {
            renderer: Renderer::new(config.renderer.outline_line_width),
            camera: Camera::from_config(&config.camera, aspect),
            input: InputState::new(),
            running: true,
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Current camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// False once a quit was requested
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// React to one input event
    pub fn apply(
        &mut self,
        event: InputEvent,
        ctx: &mut SceneContext,
        backend: &mut dyn RenderBackend,
        delta_time: f32,
    ) {
        match event {
            InputEvent::SetMode(mode) => ctx.set_mode(mode),
            InputEvent::Move(direction) => self
                .camera
                .translate(direction, self.config.camera.move_speed * delta_time),
            InputEvent::Look { dx, dy } => {
                let sensitivity = self.config.camera.look_sensitivity;
                self.camera.rotate(dx * sensitivity, -dy * sensitivity);
            }
            InputEvent::Resize { width, height } => {
                backend.resize(width, height);
                if width > 0 && height > 0 {
                    self.camera.set_aspect_ratio(width as f32 / height as f32);
                }
            }
            InputEvent::Quit => {
                log::info!("Quit requested");
                self.running = false;
            }
        }
    }

    /// One frame: apply queued input, update the scene, draw it
    pub fn tick<A: Application + ?Sized>(
        &mut self,
        app: &mut A,
        ctx: &mut SceneContext,
        backend: &mut dyn RenderBackend,
        delta_time: f32,
    ) -> Result<DrawStats, EngineError> {
        for event in self.input.frame_events() {
            self.apply(event, ctx, backend, delta_time);
        }

        app.update(ctx, delta_time);
        let updated = ctx.update(delta_time);
        log::trace!("Updated {} nodes in {:.4}s", updated, delta_time);

        Ok(self.renderer.draw_frame(ctx, &self.camera, backend)?)
    }

    /// Open a window, run until it closes, then tear everything down
    pub fn run<A: Application>(mut self, app: &mut A) -> Result<(), EngineError> {
        let window_config = self.config.window.clone();
        let mut window = Window::new(&window_config.title, window_config.width, window_config.height)?;
        let mut backend = VulkanBackend::new(&mut window, &self.config.renderer)?;

        let (width, height) = backend.extent();
        if height > 0 {
            self.camera.set_aspect_ratio(width as f32 / height as f32);
        }

        let mut ctx = app.initialize(&mut backend, &self.config)?;
        let mut timer = Timer::new();
        let mut limiter = FrameLimiter::new(self.config.renderer.target_fps);

        log::info!("Starting main loop");
        while self.running && !window.should_close() {
            limiter.begin_frame();
            window.poll_events();
            for event in window.flush_events() {
                self.input.handle_event(&event);
            }

            let (width, height) = window.framebuffer_size();
            if width == 0 || height == 0 {
                window.wait_events();
                continue;
            }

            timer.update();
            if let Err(e) = self.tick(app, &mut ctx, &mut backend, timer.delta_time()) {
                log::error!("Frame failed: {}", e);
                return Err(e);
            }
            limiter.end_frame();
        }

        log::info!(
            "Main loop finished after {} frames ({:.1} fps average)",
            timer.frame_count(),
            timer.average_fps()
        );
        backend.wait_idle()?;
        app.cleanup(&mut ctx, &mut backend);
        Ok(())
    }

    /// Drive `frames` ticks of fixed `delta_time` through any backend, no window
    pub fn run_frames<A: Application>(
        mut self,
        app: &mut A,
        backend: &mut dyn RenderBackend,
        frames: u32,
        delta_time: f32,
    ) -> Result<DrawStats, EngineError> {
        let mut ctx = app.initialize(backend, &self.config)?;
        let mut totals = DrawStats::default();

        for _ in 0..frames {
            if !self.running {
                break;
            }
            let stats = self.tick(app, &mut ctx, backend, delta_time)?;
            totals.passes += stats.passes;
            totals.draws += stats.draws;
            totals.skipped_meshes += stats.skipped_meshes;
            totals.refused_binds += stats.refused_binds;
            totals.failed_draws += stats.failed_draws;
            totals.presented |= stats.presented;
        }

        app.cleanup(&mut ctx, backend);
        Ok(totals)
    }

    /// Queue a raw window event as if it came from the window
    pub fn handle_window_event(&mut self, event: &glfw::WindowEvent) {
        self.input.handle_event(event);
    }
}
