//! Shader modules

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};
use crate::assets::ShaderSource;

/// Compiled SPIR-V module
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from already validated SPIR-V words
    pub fn from_source(device: Device, source: &ShaderSource) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(&source.code);
        let module = unsafe { device.create_shader_module(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, module })
    }

    /// Get the module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
