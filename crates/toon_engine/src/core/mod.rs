//! # Core Engine Module
//!
//! Shared configuration types used by the engine and applications built on it.

pub mod config;

pub use config::{
    ApplicationConfig, AssetConfig, CameraConfig, Config, ConfigError, LoggingConfig,
    RendererConfig, WindowConfig,
};
