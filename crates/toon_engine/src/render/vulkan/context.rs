//! Instance, device and surface setup

use std::ffi::{CStr, CString};

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};

use super::window::Window;
use super::{VulkanError, VulkanResult};

const VALIDATION_LAYER: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") };

/// Loader entry, instance and optional validation messenger
pub struct VulkanInstance {
    entry: Entry,
    instance: Instance,
    debug: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create an instance with the window system extensions enabled
    pub fn new(window: &Window, app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {}", e)))?;

        let app_name = CString::new(app_name).unwrap_or_default();
        let engine_name = CString::new("toon_engine").unwrap_or_default();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extensions = window
            .required_instance_extensions()?
            .into_iter()
            .filter_map(|name| CString::new(name).ok())
            .collect::<Vec<_>>();

        let validation = enable_validation && Self::has_validation_layer(&entry);
        if enable_validation && !validation {
            log::warn!("Validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }
        if validation {
            extensions.push(DebugUtils::name().to_owned());
        }

        let extension_ptrs = extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();
        let layer_ptrs = if validation { vec![VALIDATION_LAYER.as_ptr()] } else { Vec::new() };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None).map_err(VulkanError::Api)? };

        let debug = if validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(debug_callback));
            let messenger = unsafe {
                debug_utils
                    .create_debug_utils_messenger(&messenger_info, None)
                    .map_err(VulkanError::Api)?
            };
            log::info!("Vulkan validation enabled");
            Some((debug_utils, messenger))
        } else {
            None
        };

        Ok(Self { entry, instance, debug })
    }

    fn has_validation_layer(entry: &Entry) -> bool {
        entry
            .enumerate_instance_layer_properties()
            .map(|layers| {
                layers.iter().any(|layer| {
                    let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
                    name == VALIDATION_LAYER
                })
            })
            .unwrap_or(false)
    }

    /// Loader entry
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Instance functions
    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Chosen physical device and what it supports
pub struct PhysicalDeviceInfo {
    /// Device handle
    pub device: vk::PhysicalDevice,
    /// Properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported features
    pub features: vk::PhysicalDeviceFeatures,
    /// Graphics queue family
    pub graphics_family: u32,
    /// Presentation queue family
    pub present_family: u32,
}

impl PhysicalDeviceInfo {
    /// Pick the first device with graphics, presentation and swapchain support,
    /// preferring discrete GPUs
    pub fn select_suitable_device(
        instance: &Instance,
        surface_loader: &Surface,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices().map_err(VulkanError::Api)? };

        let mut candidates = devices
            .into_iter()
            .filter_map(|device| Self::evaluate_device(instance, surface_loader, surface, device))
            .collect::<Vec<_>>();
        candidates.sort_by_key(|info| info.properties.device_type != vk::PhysicalDeviceType::DISCRETE_GPU);

        let info = candidates
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InitializationFailed("No suitable GPU found".to_string()))?;

        let name = unsafe { CStr::from_ptr(info.properties.device_name.as_ptr()) };
        log::info!("Using GPU {}", name.to_string_lossy());
        Ok(info)
    }

    fn evaluate_device(
        instance: &Instance,
        surface_loader: &Surface,
        surface: vk::SurfaceKHR,
        device: vk::PhysicalDevice,
    ) -> Option<Self> {
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let graphics_family = families
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;
        let present_family = (0..families.len() as u32).find(|&index| unsafe {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .unwrap_or(false)
        })?;

        let extensions = unsafe { instance.enumerate_device_extension_properties(device).ok()? };
        let has_swapchain = extensions.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == SwapchainLoader::name()
        });
        if !has_swapchain {
            return None;
        }

        Some(Self {
            device,
            properties: unsafe { instance.get_physical_device_properties(device) },
            features: unsafe { instance.get_physical_device_features(device) },
            graphics_family,
            present_family,
        })
    }
}

/// Logical device and its queues
pub struct LogicalDevice {
    /// Device functions
    pub device: Device,
    /// Graphics queue
    pub graphics_queue: vk::Queue,
    /// Presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension functions
    pub swapchain_loader: SwapchainLoader,
    /// Line rasterization is available
    pub fill_mode_non_solid: bool,
    /// Line widths other than 1.0 are available
    pub wide_lines: bool,
}

impl LogicalDevice {
    /// Create the device, enabling line rasterization features when present
    pub fn new(instance: &Instance, physical: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let priorities = [1.0f32];
        let mut families = vec![physical.graphics_family];
        if physical.present_family != physical.graphics_family {
            families.push(physical.present_family);
        }
        let queue_infos = families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect::<Vec<_>>();

        let fill_mode_non_solid = physical.features.fill_mode_non_solid == vk::TRUE;
        let wide_lines = physical.features.wide_lines == vk::TRUE;
        if !fill_mode_non_solid {
            log::warn!("GPU lacks fillModeNonSolid; outlines fall back to filled polygons");
        }
        if !wide_lines {
            log::warn!("GPU lacks wideLines; outlines are drawn one pixel wide");
        }

        let features = vk::PhysicalDeviceFeatures::builder()
            .fill_mode_non_solid(fill_mode_non_solid)
            .wide_lines(wide_lines);
        let extension_names = [SwapchainLoader::name().as_ptr()];

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .create_device(physical.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };
        let graphics_queue = unsafe { device.get_device_queue(physical.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(physical.present_family, 0) };
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
            fill_mode_non_solid,
            wide_lines,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Everything below the swapchain: instance, surface, physical and logical device.
///
/// Field order matters: the device is destroyed before the surface, and
/// both before the instance.
pub struct VulkanContext {
    /// Logical device
    pub device: LogicalDevice,
    /// Surface functions
    pub surface_loader: Surface,
    /// Window surface
    pub surface: vk::SurfaceKHR,
    /// Chosen GPU
    pub physical_device: PhysicalDeviceInfo,
    /// Instance
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Bring up Vulkan for `window`
    pub fn new(window: &mut Window, app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, app_name, enable_validation)?;
        let surface_loader = Surface::new(instance.entry(), instance.instance());
        let surface = window.create_vulkan_surface(instance.instance().handle())?;
        let physical_device = PhysicalDeviceInfo::select_suitable_device(instance.instance(), &surface_loader, surface)?;
        let device = LogicalDevice::new(instance.instance(), &physical_device)?;

        Ok(Self {
            device,
            surface_loader,
            surface,
            physical_device,
            instance,
        })
    }

    /// Device functions
    pub fn raw_device(&self) -> &Device {
        &self.device.device
    }

    /// Instance functions
    pub fn raw_instance(&self) -> &Instance {
        self.instance.instance()
    }

    /// Block until the GPU is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device.device_wait_idle().map_err(VulkanError::Api) }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
            // Swapchains are owned by the backend and already destroyed here
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
