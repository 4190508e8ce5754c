//! Window management using GLFW
//!
//! Creates a Vulkan-ready (no client API) window and exposes its events.

use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not start
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// Window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Open a resizable window without an OpenGL context
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_mouse_button_polling(true);
        window.set_cursor_pos_polling(true);

        log::info!("Opened {}x{} window '{}'", width, height, title);
        Ok(Self { glfw, window, events })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request the window to close
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Pump the OS event queue
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Block until at least one event arrives (used while minimized)
    pub fn wait_events(&mut self) {
        self.glfw.wait_events();
    }

    /// Drain events received since the last call
    pub fn flush_events(&self) -> Vec<glfw::WindowEvent> {
        glfw::flush_messages(&self.events).map(|(_, event)| event).collect()
    }

    /// Framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    /// Required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Vulkan is not supported by GLFW".to_string()))
    }

    /// Create a Vulkan surface for this window
    pub fn create_vulkan_surface(&mut self, instance: ash::vk::Instance) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }
}
