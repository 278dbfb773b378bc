//! Graphics pipelines for the three draw paths.

use std::path::Path;

use ash::vk;

use crate::error::{DriverError, GraphicsResult};
use crate::scheduler::{DrawPathKind, DrawPipelineHandles};
use crate::shader::ShaderModule;

/// Shader stages and the storage buffers bound at set 0 for a draw path.
struct PipelineDesc {
    stages: &'static [(vk::ShaderStageFlags, &'static str)],
    bindings: &'static [vk::ShaderStageFlags],
}

const VERTEX_STAGES: &[(vk::ShaderStageFlags, &str)] = &[
    (vk::ShaderStageFlags::VERTEX, "mesh.vert"),
    (vk::ShaderStageFlags::FRAGMENT, "mesh.frag"),
];

const CLUSTER_STAGES: &[(vk::ShaderStageFlags, &str)] = &[
    (vk::ShaderStageFlags::TASK_EXT, "meshlet.task"),
    (vk::ShaderStageFlags::MESH_EXT, "meshlet.mesh"),
    (vk::ShaderStageFlags::FRAGMENT, "mesh.frag"),
];

const VERTEX_BINDINGS: &[vk::ShaderStageFlags] = &[vk::ShaderStageFlags::VERTEX];

/// Vertices for the mesh stage, meshlets for both task and mesh stages.
const CLUSTER_BINDINGS: &[vk::ShaderStageFlags] = &[
    vk::ShaderStageFlags::MESH_EXT,
    vk::ShaderStageFlags::from_raw(
        vk::ShaderStageFlags::TASK_EXT.as_raw() | vk::ShaderStageFlags::MESH_EXT.as_raw(),
    ),
];

fn describe(kind: DrawPathKind) -> PipelineDesc {
    match kind {
        DrawPathKind::Vertex | DrawPathKind::Indexed => PipelineDesc {
            stages: VERTEX_STAGES,
            bindings: VERTEX_BINDINGS,
        },
        DrawPathKind::Clusters => PipelineDesc {
            stages: CLUSTER_STAGES,
            bindings: CLUSTER_BINDINGS,
        },
    }
}

/// A graphics pipeline whose set 0 is filled with push descriptors.
#[derive(Debug)]
pub struct DrawPipeline {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    set_layout: vk::DescriptorSetLayout,
}

impl DrawPipeline {
    /// Build the pipeline for `kind`, rendering into `color_format`.
    pub fn new(
        device: &ash::Device,
        kind: DrawPathKind,
        shader_dir: &Path,
        color_format: vk::Format,
    ) -> GraphicsResult<Self> {
        let desc = describe(kind);

        // Modules are dropped when this function returns, on every path.
        let modules = desc
            .stages
            .iter()
            .map(|&(stage, name)| ShaderModule::load(device, shader_dir, name).map(|m| (stage, m)))
            .collect::<GraphicsResult<Vec<_>>>()?;

        let set_layout = create_set_layout(device, desc.bindings)?;

        let set_layouts = [set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let layout = match unsafe { device.create_pipeline_layout(&layout_info, None) }
            .driver("vkCreatePipelineLayout")
        {
            Ok(layout) => layout,
            Err(e) => {
                unsafe { device.destroy_descriptor_set_layout(set_layout, None) };
                return Err(e);
            }
        };

        let stages: Vec<vk::PipelineShaderStageCreateInfo> = modules
            .iter()
            .map(|(stage, module)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(*stage)
                    .module(module.handle())
                    .name(c"main")
            })
            .collect();

        match create_graphics_pipeline(device, &stages, kind, layout, color_format) {
            Ok(pipeline) => {
                log::info!("Created {:?} pipeline from {}", kind, shader_dir.display());
                Ok(Self {
                    pipeline,
                    layout,
                    set_layout,
                })
            }
            Err(e) => {
                unsafe {
                    device.destroy_pipeline_layout(layout, None);
                    device.destroy_descriptor_set_layout(set_layout, None);
                }
                Err(e)
            }
        }
    }

    pub fn handles(&self) -> DrawPipelineHandles {
        DrawPipelineHandles {
            pipeline: self.pipeline,
            layout: self.layout,
        }
    }

    /// Destroy the pipeline. The GPU must be done with it.
    pub fn destroy(self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
            device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}

fn create_set_layout(
    device: &ash::Device,
    bindings: &[vk::ShaderStageFlags],
) -> GraphicsResult<vk::DescriptorSetLayout> {
    let bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
        .iter()
        .enumerate()
        .map(|(binding, &stages)| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding as u32)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1)
                .stage_flags(stages)
        })
        .collect();

    let create_info = vk::DescriptorSetLayoutCreateInfo::default()
        .flags(vk::DescriptorSetLayoutCreateFlags::PUSH_DESCRIPTOR_KHR)
        .bindings(&bindings);

    unsafe { device.create_descriptor_set_layout(&create_info, None) }
        .driver("vkCreateDescriptorSetLayout")
}

fn create_graphics_pipeline(
    device: &ash::Device,
    stages: &[vk::PipelineShaderStageCreateInfo<'_>],
    kind: DrawPathKind,
    layout: vk::PipelineLayout,
    color_format: vk::Format,
) -> GraphicsResult<vk::Pipeline> {
    // Vertices are fetched from storage buffers, so there is no vertex input.
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();
    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    // Clockwise front face compensates for the flipped viewport.
    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)];
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let color_attachment_formats = [color_format];
    let mut rendering_info =
        vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_attachment_formats);

    let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(stages)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .push_next(&mut rendering_info);

    // Mesh pipelines must not specify vertex input or input assembly.
    if kind != DrawPathKind::Clusters {
        pipeline_info = pipeline_info
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state);
    }

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
    }
    .map_err(|(_, result)| result)
    .driver("vkCreateGraphicsPipelines")?;

    Ok(pipelines[0])
}
