//! # Application Configuration
//!
//! Every tunable the engine reads at startup, grouped by subsystem:
//!
//! - **Window**: title and initial framebuffer size
//! - **Renderer**: validation layers, frames in flight, outline width, shaders
//! - **Assets**: where meshes and textures are looked up
//! - **Camera**: starting pose, field of view and control speeds
//! - **Logging**: default filter when `RUST_LOG` is not set
//!
//! The defaults reproduce the demo scene's expectations, so a missing config
//! file is never an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::config::{Config, ConfigError};

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in pixels
    pub width: u32,
    /// Initial height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Toon Scene".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// # Renderer Configuration
///
/// Settings for the Vulkan backend and the render-mode passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Whether to enable Vulkan validation layers; `None` follows the build type
    pub enable_validation: Option<bool>,
    /// Maximum frames in flight
    pub max_frames_in_flight: usize,
    /// Rasterized line width of the outline pass
    pub outline_line_width: f32,
    /// Directory holding compiled `.spv` shaders
    pub shader_dir: PathBuf,
    /// Frame rate cap; `None` runs unthrottled
    pub target_fps: Option<u32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Toon Scene".to_string(),
            enable_validation: None,
            max_frames_in_flight: 2,
            outline_line_width: 6.0,
            shader_dir: PathBuf::from("target/shaders"),
            target_fps: Some(60),
        }
    }
}

impl RendererConfig {
    /// Enable or disable validation layers
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Full path of a compiled shader inside [`RendererConfig::shader_dir`]
    pub fn shader_path(&self, file_name: &str) -> PathBuf {
        self.shader_dir.join(file_name)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }
        if self.max_frames_in_flight == 0 {
            return Err("Max frames in flight must be at least 1".to_string());
        }
        if self.max_frames_in_flight > 8 {
            return Err("Max frames in flight should not exceed 8".to_string());
        }
        if !(self.outline_line_width > 0.0) {
            return Err(format!("Outline line width must be positive, got {}", self.outline_line_width));
        }
        Ok(())
    }
}

/// Asset lookup locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding `.obj` meshes
    pub model_dir: PathBuf,
    /// Directory holding textures
    pub texture_dir: PathBuf,
    /// Flip textures vertically on load
    pub flip_textures: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("resources/models"),
            texture_dir: PathBuf::from("resources/textures"),
            flip_textures: true,
        }
    }
}

impl AssetConfig {
    /// Full path of a model file
    pub fn model_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.model_dir.join(file_name)
    }

    /// Full path of a texture file
    pub fn texture_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.texture_dir.join(file_name)
    }
}

/// Starting camera and control speeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial eye position
    pub position: [f32; 3],
    /// Initial look target
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Units per second for keyboard movement
    pub move_speed: f32,
    /// Radians per pixel of mouse drag
    pub look_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 8.0, 25.0],
            target: [0.0, 2.0, 0.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 200.0,
            move_speed: 5.0,
            look_sensitivity: 0.005,
        }
    }
}

/// Logging defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration read once at startup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Rendering settings
    pub renderer: RendererConfig,
    /// Asset locations
    pub assets: AssetConfig,
    /// Camera settings
    pub camera: CameraConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera fov must be in (0, 180), got {}",
                self.camera.fov_degrees
            )));
        }
        self.renderer.validate().map_err(ConfigError::Invalid)
    }
}

impl Config for ApplicationConfig {}
