//! Swapchain and its image views

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use super::context::VulkanContext;
use super::{VulkanError, VulkanResult};

/// Swapchain wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain sized to `window_extent`, retiring `old` if given
    pub fn new(context: &VulkanContext, window_extent: vk::Extent2D, old: Option<&Swapchain>) -> VulkanResult<Self> {
        let physical = context.physical_device.device;
        let surface = context.surface;
        let loader = &context.surface_loader;

        let caps = unsafe {
            loader
                .get_physical_device_surface_capabilities(physical, surface)
                .map_err(VulkanError::Api)?
        };
        let formats = unsafe {
            loader
                .get_physical_device_surface_formats(physical, surface)
                .map_err(VulkanError::Api)?
        };
        let present_modes = unsafe {
            loader
                .get_physical_device_surface_present_modes(physical, surface)
                .map_err(VulkanError::Api)?
        };

        let format = Self::choose_surface_format(&formats)?;
        let present_mode = Self::choose_present_mode(&present_modes);
        let extent = Self::choose_extent(&caps, window_extent);

        let mut image_count = caps.min_image_count + 1;
        if caps.max_image_count > 0 {
            image_count = image_count.min(caps.max_image_count);
        }

        let families = [context.physical_device.graphics_family, context.physical_device.present_family];
        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old.map_or(vk::SwapchainKHR::null(), |s| s.swapchain));

        create_info = if families[0] != families[1] {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain_loader = context.device.swapchain_loader.clone();
        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let device = context.raw_device().clone();
        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain).map_err(VulkanError::Api)? };
        let image_views = images
            .iter()
            .map(|&image| create_image_view(&device, image, format.format, vk::ImageAspectFlags::COLOR))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::debug!(
            "Swapchain {}x{} with {} images ({:?})",
            extent.width,
            extent.height,
            image_views.len(),
            present_mode
        );

        Ok(Self {
            device,
            swapchain_loader,
            swapchain,
            image_views,
            format,
            extent,
        })
    }

    fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> VulkanResult<vk::SurfaceFormatKHR> {
        formats
            .iter()
            .find(|f| f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
            .or_else(|| formats.first())
            .copied()
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))
    }

    fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
        if modes.contains(&vk::PresentModeKHR::MAILBOX) {
            vk::PresentModeKHR::MAILBOX
        } else {
            vk::PresentModeKHR::FIFO
        }
    }

    fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
        if caps.current_extent.width != u32::MAX {
            caps.current_extent
        } else {
            vk::Extent2D {
                width: window_extent
                    .width
                    .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
                height: window_extent
                    .height
                    .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
            }
        }
    }

    /// Acquire the next image; `Ok(None)` when the swapchain is out of date
    pub fn acquire_next_image(&self, signal: vk::Semaphore) -> VulkanResult<Option<(u32, bool)>> {
        let result = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, signal, vk::Fence::null())
        };
        match result {
            Ok((index, suboptimal)) => Ok(Some((index, suboptimal))),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Present `image_index`; returns true when the swapchain needs recreating
    pub fn present(&self, queue: vk::Queue, image_index: u32, wait: vk::Semaphore) -> VulkanResult<bool> {
        let swapchains = [self.swapchain];
        let indices = [image_index];
        let waits = [wait];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&indices);

        match unsafe { self.swapchain_loader.queue_present(queue, &present_info) } {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Image views, one per swapchain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Surface format
    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// 2D single-mip image view
pub fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
) -> VulkanResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&create_info, None).map_err(VulkanError::Api) }
}
