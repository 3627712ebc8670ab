use crate::error::{Error, Result};
use crate::lv;
use ash::vk;
use std::ffi::CStr;
use std::sync::Arc;

const SHADER_ENTRY: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Collects fixed-function state and owns every array the create-info structs point
/// into; the pointers are only wired up inside `build`, so nothing dangles.
pub struct PipelineBuilder {
    shader_stages: Vec<(vk::ShaderStageFlags, vk::ShaderModule)>,
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub input_assembly: vk::PipelineInputAssemblyStateCreateInfo,
    pub rasterizer: vk::PipelineRasterizationStateCreateInfo,
    pub multisampling: vk::PipelineMultisampleStateCreateInfo,
    color_blend_attachment: vk::PipelineColorBlendAttachmentState,
    dynamic_states: Vec<vk::DynamicState>,
    viewport_count: u32,
    scissor_count: u32,
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        PipelineBuilder {
            shader_stages: Vec::new(),
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            input_assembly: vk::PipelineInputAssemblyStateCreateInfo {
                s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
                topology: vk::PrimitiveTopology::TRIANGLE_LIST,
                primitive_restart_enable: vk::FALSE,
                ..Default::default()
            },
            rasterizer: vk::PipelineRasterizationStateCreateInfo {
                s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
                depth_clamp_enable: vk::FALSE,
                rasterizer_discard_enable: vk::FALSE,
                polygon_mode: vk::PolygonMode::FILL,
                line_width: 1.0f32,
                cull_mode: vk::CullModeFlags::BACK,
                // The projection flips Y, which turns clockwise winding into counter-clockwise
                front_face: vk::FrontFace::COUNTER_CLOCKWISE,
                depth_bias_enable: vk::FALSE,
                ..Default::default()
            },
            multisampling: vk::PipelineMultisampleStateCreateInfo {
                s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
                sample_shading_enable: vk::FALSE,
                rasterization_samples: vk::SampleCountFlags::TYPE_1,
                min_sample_shading: 1.0f32,
                alpha_to_coverage_enable: vk::FALSE,
                alpha_to_one_enable: vk::FALSE,
                ..Default::default()
            },
            color_blend_attachment: vk::PipelineColorBlendAttachmentState {
                color_write_mask: vk::ColorComponentFlags::R
                    | vk::ColorComponentFlags::G
                    | vk::ColorComponentFlags::B
                    | vk::ColorComponentFlags::A,
                blend_enable: vk::FALSE,
                src_color_blend_factor: vk::BlendFactor::ONE,
                dst_color_blend_factor: vk::BlendFactor::ZERO,
                color_blend_op: vk::BlendOp::ADD,
                src_alpha_blend_factor: vk::BlendFactor::ONE,
                dst_alpha_blend_factor: vk::BlendFactor::ZERO,
                alpha_blend_op: vk::BlendOp::ADD,
            },
            dynamic_states: Vec::new(),
            viewport_count: 1,
            scissor_count: 1,
            set_layouts: Vec::new(),
        }
    }

    pub fn add_shader(mut self, shader: &lv::Shader) -> Self {
        self.shader_stages.push((shader.stage, shader.handle));
        self
    }

    pub fn set_vertex_input(
        mut self,
        bindings: &[vk::VertexInputBindingDescription],
        attributes: &[vk::VertexInputAttributeDescription],
    ) -> Self {
        self.vertex_bindings = bindings.to_vec();
        self.vertex_attributes = attributes.to_vec();
        self
    }

    /// Sets only viewport counts; the rectangles themselves come from dynamic state
    pub fn set_viewport_counts(mut self, viewport_count: u32, scissors_count: u32) -> Self {
        self.viewport_count = viewport_count;
        self.scissor_count = scissors_count;
        self
    }

    pub fn set_dynamic_states(mut self, states: &[vk::DynamicState]) -> Self {
        self.dynamic_states = states.to_vec();
        self
    }

    pub fn set_descriptor_set_layouts(mut self, layouts: &[vk::DescriptorSetLayout]) -> Self {
        self.set_layouts = layouts.to_vec();
        self
    }

    pub fn build(self, device: Arc<lv::Device>, render_pass: &lv::RenderPass) -> Result<Pipeline> {
        Pipeline::from_builder(self, device, render_pass)
    }
}

pub struct Pipeline {
    handle: vk::Pipeline,
    layout: vk::PipelineLayout,

    // Reference-counting
    device: Arc<lv::Device>,
}

impl Pipeline {
    fn from_builder(
        builder: PipelineBuilder,
        device: Arc<lv::Device>,
        render_pass: &lv::RenderPass,
    ) -> Result<Self> {
        let layout_ci = vk::PipelineLayoutCreateInfo {
            s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
            set_layout_count: builder.set_layouts.len() as u32,
            p_set_layouts: builder.set_layouts.as_ptr(),
            ..Default::default()
        };
        let layout = unsafe { device.handle.create_pipeline_layout(&layout_ci, None)? };

        let stages: Vec<vk::PipelineShaderStageCreateInfo> = builder
            .shader_stages
            .iter()
            .map(|&(stage, module)| vk::PipelineShaderStageCreateInfo {
                s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
                stage,
                module,
                p_name: SHADER_ENTRY.as_ptr(),
                ..Default::default()
            })
            .collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
            vertex_binding_description_count: builder.vertex_bindings.len() as u32,
            p_vertex_binding_descriptions: builder.vertex_bindings.as_ptr(),
            vertex_attribute_description_count: builder.vertex_attributes.len() as u32,
            p_vertex_attribute_descriptions: builder.vertex_attributes.as_ptr(),
            ..Default::default()
        };
        let viewport_state = vk::PipelineViewportStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
            viewport_count: builder.viewport_count,
            scissor_count: builder.scissor_count,
            ..Default::default()
        };
        let color_blending = vk::PipelineColorBlendStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
            logic_op_enable: vk::FALSE,
            logic_op: vk::LogicOp::COPY,
            attachment_count: 1,
            p_attachments: &builder.color_blend_attachment,
            blend_constants: [0.0f32; 4],
            ..Default::default()
        };
        let dynamic_state = vk::PipelineDynamicStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_DYNAMIC_STATE_CREATE_INFO,
            dynamic_state_count: builder.dynamic_states.len() as u32,
            p_dynamic_states: builder.dynamic_states.as_ptr(),
            ..Default::default()
        };

        let pipeline_ci = vk::GraphicsPipelineCreateInfo {
            s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
            stage_count: stages.len() as u32,
            p_stages: stages.as_ptr(),
            p_vertex_input_state: &vertex_input,
            p_input_assembly_state: &builder.input_assembly,
            p_viewport_state: &viewport_state,
            p_rasterization_state: &builder.rasterizer,
            p_multisample_state: &builder.multisampling,
            p_color_blend_state: &color_blending,
            p_dynamic_state: &dynamic_state,
            layout,
            render_pass: render_pass.get_handle(),
            subpass: 0,
            ..Default::default()
        };
        let created = unsafe {
            device
                .handle
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_ci], None)
        };
        let handle = match created {
            Ok(mut pipelines) => pipelines.pop(),
            Err((_, err)) => {
                unsafe { device.handle.destroy_pipeline_layout(layout, None) };
                return Err(Error::PipelineCreation(err));
            }
        };
        let Some(handle) = handle else {
            unsafe { device.handle.destroy_pipeline_layout(layout, None) };
            return Err(Error::PipelineCreation(vk::Result::ERROR_UNKNOWN));
        };

        Ok(Pipeline {
            handle,
            layout,
            device,
        })
    }

    pub fn get_handle(&self) -> vk::Pipeline {
        self.handle
    }

    pub fn get_layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_pipeline(self.handle, None);
            self.device
                .handle
                .destroy_pipeline_layout(self.layout, None);
        }
    }
}
