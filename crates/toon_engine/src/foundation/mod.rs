//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and the node transform
//! - Frame timing
//! - Colour helpers
//! - Logging setup

pub mod colour;
pub mod logging;
pub mod math;
pub mod time;
