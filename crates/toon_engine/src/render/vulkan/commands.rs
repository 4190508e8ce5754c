//! Command pools and one-shot submissions

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};

/// Resettable command pool for one queue family
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create the pool
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe { device.create_command_pool(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&alloc_info).map_err(VulkanError::Api) }
    }

    /// Record with `record`, submit to `queue` and wait for completion
    pub fn submit_once<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let command_buffer = self
            .allocate_command_buffers(1)?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "No command buffer allocated".to_string(),
            })?;

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        let buffers = [command_buffer];

        let result = unsafe {
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .and_then(|_| {
                    record(&self.device, command_buffer);
                    self.device.end_command_buffer(command_buffer)
                })
                .and_then(|_| {
                    let submit = vk::SubmitInfo::builder().command_buffers(&buffers).build();
                    self.device.queue_submit(queue, &[submit], vk::Fence::null())
                })
                .and_then(|_| self.device.queue_wait_idle(queue))
        };

        unsafe {
            self.device.free_command_buffers(self.command_pool, &buffers);
        }
        result.map_err(VulkanError::Api)
    }

    /// Get the pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
