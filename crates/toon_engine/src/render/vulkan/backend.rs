//! [`RenderBackend`] on top of Vulkan
//!
//! One forward render pass per frame. Each bind writes a [`DrawUniforms`]
//! block into the current frame's dynamic uniform buffer and binds it at
//! its own offset, so consecutive draws never overwrite each other's
//! values. Pipelines are built lazily per (program, cull, fill) and reused
//! across frames and swapchain recreation.

use std::collections::HashMap;
use std::mem;

use ash::{vk, Device};

use super::buffer::Buffer;
use super::commands::CommandPool;
use super::context::VulkanContext;
use super::framebuffer::{DepthBuffer, Framebuffer};
use super::pipeline::{DrawUniforms, GraphicsPipeline, ProgramModules, SharedLayout};
use super::render_pass::RenderPass;
use super::shader::ShaderModule;
use super::swapchain::Swapchain;
use super::sync::FrameSync;
use super::texture::GpuTexture;
use super::window::Window;
use super::{VulkanError, VulkanResult};
use crate::assets::{ImageData, ShaderSource, ShaderStage};
use crate::core::RendererConfig;
use crate::foundation::math::Vec4;
use crate::render::api::{
    BackendResult, CullMode, GpuMeshHandle, PolygonMode, ProgramHandle, RasterState, RenderBackend, RenderError,
    TextureHandle,
};
use crate::render::material::UniformSet;
use crate::render::mesh::Vertex;

/// Uniform blocks available per frame
pub const MAX_DRAWS_PER_FRAME: u32 = 4096;
/// Descriptor sets (one per texture) available per frame
const MAX_TEXTURE_SETS: u32 = 128;

type PipelineKey = (ProgramHandle, CullMode, PolygonMode);

struct GpuMesh {
    vertices: Buffer,
    indices: Buffer,
    index_count: u32,
}

/// Swapchain plus the per-image targets built on it. Declared so that
/// framebuffers drop before the views they reference.
struct RenderTargets {
    framebuffers: Vec<Framebuffer>,
    _depth: DepthBuffer,
    swapchain: Swapchain,
}

impl RenderTargets {
    fn new(
        context: &VulkanContext,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        old: Option<&Swapchain>,
    ) -> VulkanResult<Self> {
        let swapchain = Swapchain::new(context, extent, old)?;
        Self::from_swapchain(context, render_pass, swapchain)
    }

    fn from_swapchain(context: &VulkanContext, render_pass: &RenderPass, swapchain: Swapchain) -> VulkanResult<Self> {
        let device = context.raw_device().clone();
        let depth = DepthBuffer::new(
            device.clone(),
            context.raw_instance(),
            context.physical_device.device,
            swapchain.extent(),
        )?;
        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass.handle(),
                    &[view, depth.view()],
                    swapchain.extent(),
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self {
            framebuffers,
            _depth: depth,
            swapchain,
        })
    }
}

/// Resources owned by one frame in flight
struct FrameResources {
    device: Device,
    sync: FrameSync,
    command_buffer: vk::CommandBuffer,
    uniforms: Buffer,
    descriptor_pool: vk::DescriptorPool,
    descriptor_sets: HashMap<Option<TextureHandle>, vk::DescriptorSet>,
    draws: u32,
}

impl FrameResources {
    fn new(
        context: &VulkanContext,
        command_buffer: vk::CommandBuffer,
        uniform_stride: vk::DeviceSize,
    ) -> VulkanResult<Self> {
        let device = context.raw_device().clone();
        let uniforms = Buffer::new(
            device.clone(),
            context.raw_instance(),
            context.physical_device.device,
            uniform_stride * vk::DeviceSize::from(MAX_DRAWS_PER_FRAME),
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: MAX_TEXTURE_SETS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: MAX_TEXTURE_SETS,
            },
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(MAX_TEXTURE_SETS)
            .pool_sizes(&pool_sizes);
        let descriptor_pool = unsafe { device.create_descriptor_pool(&pool_info, None).map_err(VulkanError::Api)? };

        Ok(Self {
            sync: FrameSync::new(device.clone())?,
            device,
            command_buffer,
            uniforms,
            descriptor_pool,
            descriptor_sets: HashMap::new(),
            draws: 0,
        })
    }

    /// Descriptor set pointing at this frame's uniforms and `texture`
    fn descriptor_set(
        &mut self,
        layout: vk::DescriptorSetLayout,
        key: Option<TextureHandle>,
        texture: &GpuTexture,
    ) -> VulkanResult<vk::DescriptorSet> {
        if let Some(&set) = self.descriptor_sets.get(&key) {
            return Ok(set);
        }

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&layouts);
        let set = unsafe { self.device.allocate_descriptor_sets(&alloc_info).map_err(VulkanError::Api)? }
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "Descriptor pool returned no set".to_string(),
            })?;

        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: self.uniforms.handle(),
            offset: 0,
            range: mem::size_of::<DrawUniforms>() as vk::DeviceSize,
        }];
        let image_info = [vk::DescriptorImageInfo {
            sampler: texture.sampler(),
            image_view: texture.view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let writes = [
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                .buffer_info(&buffer_info)
                .build(),
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info)
                .build(),
        ];
        unsafe { self.device.update_descriptor_sets(&writes, &[]) };

        self.descriptor_sets.insert(key, set);
        Ok(set)
    }

    fn forget_texture(&mut self, texture: TextureHandle) {
        if let Some(set) = self.descriptor_sets.remove(&Some(texture)) {
            unsafe {
                let _ = self.device.free_descriptor_sets(self.descriptor_pool, &[set]);
            }
        }
    }
}

impl Drop for FrameResources {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
        }
    }
}

/// Vulkan implementation of [`RenderBackend`].
///
/// Field order is drop order: every GPU object goes before the context.
pub struct VulkanBackend {
    pipelines: HashMap<PipelineKey, GraphicsPipeline>,
    programs: HashMap<ProgramHandle, ProgramModules>,
    meshes: HashMap<GpuMeshHandle, GpuMesh>,
    textures: HashMap<TextureHandle, GpuTexture>,
    default_texture: GpuTexture,
    frames: Vec<FrameResources>,
    layout: SharedLayout,
    targets: Option<RenderTargets>,
    render_pass: RenderPass,
    command_pool: CommandPool,
    context: VulkanContext,

    next_id: u64,
    uniform_stride: vk::DeviceSize,
    line_width_range: [f32; 2],
    window_extent: vk::Extent2D,
    resize_pending: bool,
    current_frame: usize,
    active_image: Option<u32>,
    raster: RasterState,
    bound_pipeline: Option<vk::Pipeline>,
    current_program: Option<ProgramHandle>,
    line_fallback_logged: bool,
}

impl VulkanBackend {
    /// Bring up Vulkan on `window`
    pub fn new(window: &mut Window, config: &RendererConfig) -> Result<Self, RenderError> {
        Self::create(window, config).map_err(RenderError::from)
    }

    fn create(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, &config.application_name, config.validation_enabled())?;
        let device = context.raw_device().clone();
        let (width, height) = window.framebuffer_size();
        let window_extent = vk::Extent2D { width, height };

        let command_pool = CommandPool::new(device.clone(), context.physical_device.graphics_family)?;

        let swapchain = Swapchain::new(&context, window_extent, None)?;
        let render_pass = RenderPass::new_forward_pass(device.clone(), swapchain.format())?;
        let targets = RenderTargets::from_swapchain(&context, &render_pass, swapchain)?;

        let layout = SharedLayout::new(device.clone())?;

        let limits = context.physical_device.properties.limits;
        let alignment = limits.min_uniform_buffer_offset_alignment.max(1);
        let block = mem::size_of::<DrawUniforms>() as vk::DeviceSize;
        let uniform_stride = block.div_ceil(alignment) * alignment;
        let line_width_range = if context.device.wide_lines {
            limits.line_width_range
        } else {
            [1.0, 1.0]
        };

        let frame_count = config.max_frames_in_flight.max(1) as u32;
        let frames = command_pool
            .allocate_command_buffers(frame_count)?
            .into_iter()
            .map(|cmd| FrameResources::new(&context, cmd, uniform_stride))
            .collect::<VulkanResult<Vec<_>>>()?;

        let default_texture = GpuTexture::default_white(
            device,
            context.raw_instance(),
            context.physical_device.device,
            &command_pool,
            context.device.graphics_queue,
        )?;

        log::info!(
            "Vulkan backend ready: {} frames in flight, {}x{}",
            frame_count,
            targets.swapchain.extent().width,
            targets.swapchain.extent().height
        );

        Ok(Self {
            pipelines: HashMap::new(),
            programs: HashMap::new(),
            meshes: HashMap::new(),
            textures: HashMap::new(),
            default_texture,
            frames,
            layout,
            targets: Some(targets),
            render_pass,
            command_pool,
            context,
            next_id: 1,
            uniform_stride,
            line_width_range,
            window_extent,
            resize_pending: false,
            current_frame: 0,
            active_image: None,
            raster: RasterState::default(),
            bound_pipeline: None,
            current_program: None,
            line_fallback_logged: false,
        })
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn device(&self) -> &Device {
        self.context.raw_device()
    }

    fn recreate_swapchain(&mut self) -> VulkanResult<()> {
        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            return Ok(());
        }
        self.context.wait_idle()?;

        let old = self.targets.take();
        let targets = RenderTargets::new(
            &self.context,
            &self.render_pass,
            self.window_extent,
            old.as_ref().map(|t| &t.swapchain),
        )?;
        drop(old);

        log::info!(
            "Swapchain recreated at {}x{}",
            targets.swapchain.extent().width,
            targets.swapchain.extent().height
        );
        self.targets = Some(targets);
        self.resize_pending = false;
        Ok(())
    }

    fn require_frame(&self, what: &str) -> BackendResult<vk::CommandBuffer> {
        match self.active_image {
            Some(_) => Ok(self.frames[self.current_frame].command_buffer),
            None => Err(RenderError::InvalidOperation(format!("{} outside of a frame", what))),
        }
    }

    fn effective_polygon(&mut self) -> PolygonMode {
        if self.raster.polygon == PolygonMode::Line && !self.context.device.fill_mode_non_solid {
            if !self.line_fallback_logged {
                log::warn!("Line rasterization unavailable, drawing filled polygons instead");
                self.line_fallback_logged = true;
            }
            PolygonMode::Fill
        } else {
            self.raster.polygon
        }
    }

    fn pipeline(&mut self, program: ProgramHandle) -> VulkanResult<vk::Pipeline> {
        let key = (program, self.raster.cull, self.effective_polygon());
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.handle());
        }

        let modules = self.programs.get(&program).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Unknown program {}", program.0),
        })?;
        let pipeline = GraphicsPipeline::new(
            self.device().clone(),
            self.render_pass.handle(),
            &self.layout,
            modules,
            key.1,
            key.2,
        )?;
        let handle = pipeline.handle();
        self.pipelines.insert(key, pipeline);
        Ok(handle)
    }

    fn record_begin(&mut self, image_index: u32, clear_colour: Vec4) -> VulkanResult<()> {
        let targets = self.targets.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "No swapchain".to_string(),
        })?;
        let extent = targets.swapchain.extent();
        let framebuffer = targets
            .framebuffers
            .get(image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("Swapchain image {} has no framebuffer", image_index),
            })?
            .handle();

        let device = self.context.raw_device();
        let cmd = self.frames[self.current_frame].command_buffer;
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_colour.into(),
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass.handle())
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(&clear_values);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            device.begin_command_buffer(cmd, &begin_info).map_err(VulkanError::Api)?;
            device.cmd_begin_render_pass(cmd, &pass_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[render_area]);
            device.cmd_set_line_width(cmd, 1.0);
        }
        Ok(())
    }

    fn submit_and_present(&mut self, image_index: u32) -> VulkanResult<()> {
        let frame = &self.frames[self.current_frame];
        let device = self.context.raw_device();
        let cmd = frame.command_buffer;

        unsafe {
            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd).map_err(VulkanError::Api)?;
        }

        let wait_semaphores = [frame.sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.sync.render_finished.handle()];
        let command_buffers = [cmd];
        let submit = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            device
                .queue_submit(self.context.device.graphics_queue, &[submit], frame.sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let targets = self.targets.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "No swapchain".to_string(),
        })?;
        let stale = targets.swapchain.present(
            self.context.device.present_queue,
            image_index,
            frame.sync.render_finished.handle(),
        )?;

        self.current_frame = (self.current_frame + 1) % self.frames.len();
        if stale || self.resize_pending {
            self.recreate_swapchain()?;
        }
        Ok(())
    }

    fn write_uniforms(&mut self, program: ProgramHandle, uniforms: &UniformSet) -> VulkanResult<()> {
        let texture_key = uniforms.texture();
        let pipeline = self.pipeline(program)?;
        let cmd = self.frames[self.current_frame].command_buffer;

        if self.bound_pipeline != Some(pipeline) {
            unsafe {
                self.device()
                    .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
            }
            self.bound_pipeline = Some(pipeline);
        }

        let texture = match texture_key {
            Some(handle) => self.textures.get(&handle).ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("Unknown texture {}", handle.0),
            })?,
            None => &self.default_texture,
        };

        let frame = &mut self.frames[self.current_frame];
        if frame.draws >= MAX_DRAWS_PER_FRAME {
            return Err(VulkanError::InvalidOperation {
                reason: format!("More than {} binds in one frame", MAX_DRAWS_PER_FRAME),
            });
        }
        let offset = vk::DeviceSize::from(frame.draws) * self.uniform_stride;
        let block = DrawUniforms::from_uniforms(uniforms);
        frame.uniforms.write_bytes(offset, bytemuck::bytes_of(&block))?;
        frame.draws += 1;

        let set = frame.descriptor_set(self.layout.set_layout(), texture_key, texture)?;
        unsafe {
            frame.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout.pipeline_layout(),
                0,
                &[set],
                &[offset as u32],
            );
        }
        Ok(())
    }
}

impl RenderBackend for VulkanBackend {
    fn extent(&self) -> (u32, u32) {
        match &self.targets {
            Some(targets) => {
                let extent = targets.swapchain.extent();
                (extent.width, extent.height)
            }
            None => (self.window_extent.width, self.window_extent.height),
        }
    }

    fn create_program(
        &mut self,
        name: &str,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> BackendResult<ProgramHandle> {
        let link_failed = |reason: String| RenderError::LinkFailed {
            name: name.to_string(),
            reason,
        };
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err(link_failed("stages attached in the wrong slots".to_string()));
        }

        let device = self.device().clone();
        let vertex_module =
            ShaderModule::from_source(device.clone(), vertex).map_err(|e| link_failed(format!("{}: {}", vertex.name, e)))?;
        let fragment_module =
            ShaderModule::from_source(device, fragment).map_err(|e| link_failed(format!("{}: {}", fragment.name, e)))?;

        let handle = ProgramHandle(self.allocate_id());
        self.programs.insert(
            handle,
            ProgramModules {
                name: name.to_string(),
                vertex: vertex_module,
                fragment: fragment_module,
            },
        );
        log::debug!("Created program '{}' ({})", name, handle.0);
        Ok(handle)
    }

    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> BackendResult<GpuMeshHandle> {
        if vertices.is_empty() || indices.is_empty() || indices.len() % 3 != 0 {
            return Err(RenderError::BackendError(format!(
                "mesh with {} vertices and {} indices is not a triangle list",
                vertices.len(),
                indices.len()
            )));
        }

        let device = self.device().clone();
        let instance = self.context.raw_instance();
        let physical = self.context.physical_device.device;
        let mesh = GpuMesh {
            vertices: Buffer::with_data(device.clone(), instance, physical, vk::BufferUsageFlags::VERTEX_BUFFER, vertices)?,
            indices: Buffer::with_data(device, instance, physical, vk::BufferUsageFlags::INDEX_BUFFER, indices)?,
            index_count: indices.len() as u32,
        };

        let handle = GpuMeshHandle(self.allocate_id());
        self.meshes.insert(handle, mesh);
        Ok(handle)
    }

    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.data.len() != expected || expected == 0 {
            return Err(RenderError::BackendError(format!(
                "texture data is {} bytes, expected {}",
                image.data.len(),
                expected
            )));
        }

        let texture = GpuTexture::upload(
            self.device().clone(),
            self.context.raw_instance(),
            self.context.physical_device.device,
            &self.command_pool,
            self.context.device.graphics_queue,
            image,
        )?;
        let handle = TextureHandle(self.allocate_id());
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn destroy_mesh(&mut self, mesh: GpuMeshHandle) {
        let _ = self.context.wait_idle();
        self.meshes.remove(&mesh);
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        let _ = self.context.wait_idle();
        self.pipelines.retain(|key, _| key.0 != program);
        self.programs.remove(&program);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        let _ = self.context.wait_idle();
        for frame in &mut self.frames {
            frame.forget_texture(texture);
        }
        self.textures.remove(&texture);
    }

    fn begin_frame(&mut self, clear_colour: Vec4) -> BackendResult<bool> {
        if self.active_image.is_some() {
            return Err(RenderError::InvalidOperation("begin_frame called twice".to_string()));
        }
        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            return Ok(false);
        }
        if self.resize_pending || self.targets.is_none() {
            self.recreate_swapchain()?;
        }

        let acquired = {
            let frame = &self.frames[self.current_frame];
            frame.sync.in_flight.wait(u64::MAX)?;
            let targets = self
                .targets
                .as_ref()
                .ok_or_else(|| RenderError::InvalidOperation("No swapchain".to_string()))?;
            targets.swapchain.acquire_next_image(frame.sync.image_available.handle())?
        };

        let image_index = match acquired {
            Some((index, _suboptimal)) => index,
            None => {
                log::debug!("Swapchain out of date, skipping frame");
                self.recreate_swapchain()?;
                return Ok(false);
            }
        };

        self.frames[self.current_frame].sync.in_flight.reset()?;
        self.frames[self.current_frame].draws = 0;
        self.record_begin(image_index, clear_colour)?;

        self.active_image = Some(image_index);
        self.raster = RasterState::default();
        self.bound_pipeline = None;
        self.current_program = None;
        Ok(true)
    }

    fn set_raster_state(&mut self, state: RasterState) -> BackendResult<()> {
        let cmd = self.require_frame("set_raster_state")?;
        self.raster = state;
        self.bound_pipeline = None;

        let [min, max] = self.line_width_range;
        let width = state.line_width.clamp(min, max);
        unsafe {
            self.device().cmd_set_line_width(cmd, width);
        }
        Ok(())
    }

    fn bind_program(&mut self, program: ProgramHandle, uniforms: &UniformSet) -> BackendResult<()> {
        self.require_frame("bind_program")?;
        if !self.programs.contains_key(&program) {
            return Err(RenderError::UnknownHandle { kind: "program", id: program.0 });
        }
        if let Some(texture) = uniforms.texture() {
            if !self.textures.contains_key(&texture) {
                return Err(RenderError::UnknownHandle { kind: "texture", id: texture.0 });
            }
        }

        self.write_uniforms(program, uniforms)?;
        self.current_program = Some(program);
        Ok(())
    }

    fn unbind_program(&mut self) {
        self.current_program = None;
    }

    fn draw_mesh(&mut self, mesh: GpuMeshHandle) -> BackendResult<()> {
        let cmd = self.require_frame("draw_mesh")?;
        if self.current_program.is_none() {
            return Err(RenderError::InvalidOperation("draw without a bound program".to_string()));
        }
        let gpu = self
            .meshes
            .get(&mesh)
            .ok_or(RenderError::UnknownHandle { kind: "mesh", id: mesh.0 })?;

        let device = self.context.raw_device();
        unsafe {
            device.cmd_bind_vertex_buffers(cmd, 0, &[gpu.vertices.handle()], &[0]);
            device.cmd_bind_index_buffer(cmd, gpu.indices.handle(), 0, vk::IndexType::UINT32);
            device.cmd_draw_indexed(cmd, gpu.index_count, 1, 0, 0, 0);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        let image_index = self
            .active_image
            .take()
            .ok_or_else(|| RenderError::InvalidOperation("end_frame outside of a frame".to_string()))?;
        self.current_program = None;
        self.submit_and_present(image_index)?;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Framebuffer resized to {}x{}", width, height);
        self.window_extent = vk::Extent2D { width, height };
        self.resize_pending = true;
    }

    fn wait_idle(&mut self) -> BackendResult<()> {
        self.context.wait_idle()?;
        Ok(())
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        let _ = self.context.wait_idle();
    }
}
