//! Vulkan implementation of [`RenderBackend`](crate::render::api::RenderBackend)
//!
//! Thin RAII wrappers over the Vulkan objects the forward renderer needs,
//! and [`VulkanBackend`] which drives them from the backend trait.

pub mod backend;
pub mod buffer;
pub mod commands;
pub mod context;
pub mod framebuffer;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod window;

pub use backend::VulkanBackend;
pub use context::VulkanContext;
pub use window::{Window, WindowError};

use ash::vk;
use thiserror::Error;

use crate::render::api::RenderError;

/// Vulkan-specific errors
#[derive(Error, Debug)]
pub enum VulkanError {
    /// A Vulkan call returned an error code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// The loader or a required object could not be created
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Call made in the wrong state
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// What went wrong
        reason: String,
    },

    /// No memory type satisfies the request
    #[error("No suitable memory type")]
    NoSuitableMemoryType,

    /// Window system failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

impl From<VulkanError> for RenderError {
    fn from(error: VulkanError) -> Self {
        match error {
            VulkanError::InitializationFailed(reason) => RenderError::InitializationFailed(reason),
            VulkanError::Window(e) => RenderError::InitializationFailed(e.to_string()),
            VulkanError::InvalidOperation { reason } => RenderError::InvalidOperation(reason),
            other => RenderError::BackendError(other.to_string()),
        }
    }
}
