//! Graphics pipelines, their layout and the per-draw uniform block
//!
//! Every program shares one pipeline layout: set 0 holds a dynamic uniform
//! buffer with [`DrawUniforms`] at binding 0 and a combined image sampler at
//! binding 1. Pipelines are built per program and raster state; line width,
//! viewport and scissor are dynamic.

use std::ffi::CStr;
use std::mem;

use ash::{vk, Device};

use super::shader::ShaderModule;
use super::{VulkanError, VulkanResult};
use crate::foundation::math::{Mat4, Vec4};
use crate::render::api::{CullMode, PolygonMode};
use crate::render::material::{names, UniformSet};
use crate::render::mesh::Vertex;

const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Toon band count used when a material sets none
pub const DEFAULT_TOON_BANDS: f32 = 4.0;
/// Ambient term used when a material sets none
pub const DEFAULT_AMBIENT: f32 = 0.15;

/// Uniform block shared by every shader, laid out for std140
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    /// Model matrix
    pub model: [[f32; 4]; 4],
    /// View matrix
    pub view: [[f32; 4]; 4],
    /// Projection matrix
    pub projection: [[f32; 4]; 4],
    /// Object colour
    pub colour: [f32; 4],
    /// Light position in view space
    pub light_position: [f32; 4],
    /// x: toon bands, y: ambient, z: 1 when textured
    pub params: [f32; 4],
}

impl DrawUniforms {
    /// Pack the named uniforms into the fixed block, defaulting what is missing
    pub fn from_uniforms(uniforms: &UniformSet) -> Self {
        let mat = |name| columns(&uniforms.mat4(name).unwrap_or_else(Mat4::identity));
        let vec = |name, default: Vec4| -> [f32; 4] { uniforms.vec4(name).unwrap_or(default).into() };

        Self {
            model: mat(names::MODEL),
            view: mat(names::VIEW),
            projection: mat(names::PROJECTION),
            colour: vec(names::COLOUR, Vec4::new(1.0, 1.0, 1.0, 1.0)),
            light_position: vec(names::LIGHT_POSITION, Vec4::new(0.0, 0.0, 0.0, 1.0)),
            params: [
                uniforms.float(names::TOON_BANDS).unwrap_or(DEFAULT_TOON_BANDS),
                uniforms.float(names::AMBIENT).unwrap_or(DEFAULT_AMBIENT),
                if uniforms.texture().is_some() { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

fn columns(m: &Mat4) -> [[f32; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (c, column) in out.iter_mut().enumerate() {
        for (r, value) in column.iter_mut().enumerate() {
            *value = m[(r, c)];
        }
    }
    out
}

/// Vertex input description for [`Vertex`]
pub struct VertexLayout;

impl VertexLayout {
    /// Single interleaved binding
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position, normal, texture coordinate and colour at locations 0..4
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        let attribute = |location, format, offset| vk::VertexInputAttributeDescription {
            binding: 0,
            location,
            format,
            offset,
        };
        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, 0),
            attribute(1, vk::Format::R32G32B32_SFLOAT, 12),
            attribute(2, vk::Format::R32G32_SFLOAT, 24),
            attribute(3, vk::Format::R32G32B32A32_SFLOAT, 32),
        ]
    }
}

/// Descriptor set layout and pipeline layout shared by all programs
pub struct SharedLayout {
    device: Device,
    set_layout: vk::DescriptorSetLayout,
    pipeline_layout: vk::PipelineLayout,
}

impl SharedLayout {
    /// Create both layouts
    pub fn new(device: Device) -> VulkanResult<Self> {
        let bindings = [
            vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build(),
        ];
        let set_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let set_layout = unsafe {
            device
                .create_descriptor_set_layout(&set_info, None)
                .map_err(VulkanError::Api)?
        };

        let set_layouts = [set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let pipeline_layout = match unsafe { device.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(e) => {
                unsafe { device.destroy_descriptor_set_layout(set_layout, None) };
                return Err(VulkanError::Api(e));
            }
        };

        Ok(Self {
            device,
            set_layout,
            pipeline_layout,
        })
    }

    /// Descriptor set layout for set 0
    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.set_layout
    }

    /// Pipeline layout
    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }
}

impl Drop for SharedLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}

/// Vertex and fragment modules of one linked program
pub struct ProgramModules {
    /// Program name for logging
    pub name: String,
    /// Vertex stage
    pub vertex: ShaderModule,
    /// Fragment stage
    pub fragment: ShaderModule,
}

/// Graphics pipeline wrapper with RAII cleanup
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
}

impl GraphicsPipeline {
    /// Build a depth-tested pipeline for `program` with fixed cull and fill modes
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        layout: &SharedLayout,
        program: &ProgramModules,
        cull: CullMode,
        polygon: PolygonMode,
    ) -> VulkanResult<Self> {
        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(program.vertex.handle())
                .name(ENTRY_POINT)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(program.fragment.handle())
                .name(ENTRY_POINT)
                .build(),
        ];

        let bindings = [VertexLayout::binding_description()];
        let attributes = VertexLayout::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::builder().topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(match polygon {
                PolygonMode::Fill => vk::PolygonMode::FILL,
                PolygonMode::Line => vk::PolygonMode::LINE,
            })
            .cull_mode(match cull {
                CullMode::None => vk::CullModeFlags::NONE,
                CullMode::Front => vk::CullModeFlags::FRONT,
                CullMode::Back => vk::CullModeFlags::BACK,
            })
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisampling =
            vk::PipelineMultisampleStateCreateInfo::builder().rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder().attachments(&blend_attachments);

        let dynamic_states = [
            vk::DynamicState::VIEWPORT,
            vk::DynamicState::SCISSOR,
            vk::DynamicState::LINE_WIDTH,
        ];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout.pipeline_layout())
            .render_pass(render_pass)
            .subpass(0)
            .build();

        let pipeline = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| VulkanError::Api(e))?
        }
        .into_iter()
        .next()
        .ok_or_else(|| VulkanError::InitializationFailed("No pipeline returned".to_string()))?;

        log::debug!("Built pipeline for '{}' ({:?}, {:?})", program.name, cull, polygon);
        Ok(Self { device, pipeline })
    }

    /// Get the pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
