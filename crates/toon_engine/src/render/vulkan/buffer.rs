//! Host-visible buffers

use std::mem;

use ash::{vk, Device, Instance};

use super::{VulkanError, VulkanResult};

/// Find a memory type index with the required properties
pub fn find_memory_type(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let memory = unsafe { instance.get_physical_device_memory_properties(physical_device) };

    (0..memory.memory_type_count)
        .find(|&i| {
            type_filter & (1 << i) != 0 && memory.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

/// Buffer plus its dedicated allocation
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Allocate a buffer of `size` bytes
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };
        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory_type_index =
            match find_memory_type(instance, physical_device, requirements.memory_type_bits, properties) {
                Ok(index) => index,
                Err(e) => {
                    unsafe { device.destroy_buffer(buffer, None) };
                    return Err(e);
                }
            };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(VulkanError::Api(e));
            }
        };

        unsafe {
            device.bind_buffer_memory(buffer, memory, 0).map_err(VulkanError::Api)?;
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Host-visible coherent buffer filled with `data`
    pub fn with_data<T: bytemuck::Pod>(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        let size = (data.len() * mem::size_of::<T>()) as vk::DeviceSize;
        let buffer = Self::new(
            device,
            instance,
            physical_device,
            size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.write_bytes(0, bytemuck::cast_slice(data))?;
        Ok(buffer)
    }

    /// Copy `bytes` into the buffer at `offset`
    pub fn write_bytes(&self, offset: vk::DeviceSize, bytes: &[u8]) -> VulkanResult<()> {
        let len = bytes.len() as vk::DeviceSize;
        if offset + len > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes at {} overflows buffer of {}", len, offset, self.size),
            });
        }

        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, offset, len, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
