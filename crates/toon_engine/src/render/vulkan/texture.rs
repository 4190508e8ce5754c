//! Sampled 2D textures

use ash::{vk, Device, Instance};

use super::buffer::{find_memory_type, Buffer};
use super::commands::CommandPool;
use super::swapchain::create_image_view;
use super::{VulkanError, VulkanResult};
use crate::assets::ImageData;

const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Device-local RGBA texture with its view and sampler
pub struct GpuTexture {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    sampler: vk::Sampler,
}

impl GpuTexture {
    /// 1x1 opaque white texture bound when a material has none
    pub fn default_white(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        pool: &CommandPool,
        queue: vk::Queue,
    ) -> VulkanResult<Self> {
        Self::upload(
            device,
            instance,
            physical_device,
            pool,
            queue,
            &ImageData::solid_color(1, 1, [255, 255, 255, 255]),
        )
    }

    /// Copy `image` through a staging buffer into a shader-readable image
    pub fn upload(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        pool: &CommandPool,
        queue: vk::Queue,
        image_data: &ImageData,
    ) -> VulkanResult<Self> {
        let staging = Buffer::with_data(
            device.clone(),
            instance,
            physical_device,
            vk::BufferUsageFlags::TRANSFER_SRC,
            &image_data.data,
        )?;

        let extent = vk::Extent3D {
            width: image_data.width,
            height: image_data.height,
            depth: 1,
        };
        let create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .format(TEXTURE_FORMAT)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { device.create_image(&create_info, None).map_err(VulkanError::Api)? };
        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory_type_index = find_memory_type(
            instance,
            physical_device,
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let memory = unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api)? };
        unsafe {
            device.bind_image_memory(image, memory, 0).map_err(VulkanError::Api)?;
        }

        pool.submit_once(queue, |device, cmd| unsafe {
            transition(
                device,
                cmd,
                image,
                (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
                (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
                (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER),
            );

            let region = vk::BufferImageCopy::builder()
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(extent)
                .build();
            device.cmd_copy_buffer_to_image(
                cmd,
                staging.handle(),
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            transition(
                device,
                cmd,
                image,
                (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
                (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
            );
        })?;

        let view = create_image_view(&device, image, TEXTURE_FORMAT, vk::ImageAspectFlags::COLOR)?;

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR);
        let sampler = unsafe { device.create_sampler(&sampler_info, None).map_err(VulkanError::Api)? };

        log::debug!("Uploaded {}x{} texture", image_data.width, image_data.height);
        Ok(Self {
            device,
            image,
            memory,
            view,
            sampler,
        })
    }

    /// Image view
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Sampler
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

unsafe fn transition(
    device: &Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    (old_layout, new_layout): (vk::ImageLayout, vk::ImageLayout),
    (src_access, dst_access): (vk::AccessFlags, vk::AccessFlags),
    (src_stage, dst_stage): (vk::PipelineStageFlags, vk::PipelineStageFlags),
) {
    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .build();

    device.cmd_pipeline_barrier(
        cmd,
        src_stage,
        dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}
