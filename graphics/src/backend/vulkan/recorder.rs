//! Command recording into a Vulkan command buffer.

use ash::vk;

use crate::scheduler::{CommandRecorder, LayoutTransition};

/// Records [`CommandRecorder`] calls into `cmd`, which must be in the
/// recording state.
pub struct VulkanCommandRecorder<'a> {
    pub(super) device: &'a ash::Device,
    pub(super) dynamic_rendering: &'a ash::khr::dynamic_rendering::Device,
    pub(super) push_descriptor: &'a ash::khr::push_descriptor::Device,
    pub(super) mesh_shader: Option<&'a ash::ext::mesh_shader::Device>,
    pub(super) cmd: vk::CommandBuffer,
}

/// Full-extent viewport with Y pointing up.
pub fn flipped_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: extent.height as f32,
        width: extent.width as f32,
        height: -(extent.height as f32),
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

impl CommandRecorder for VulkanCommandRecorder<'_> {
    fn transition_image(&mut self, image: vk::Image, transition: LayoutTransition) {
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(transition.old_layout())
            .new_layout(transition.new_layout())
            .src_access_mask(transition.src_access())
            .dst_access_mask(transition.dst_access())
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            self.device.cmd_pipeline_barrier(
                self.cmd,
                transition.src_stage(),
                transition.dst_stage(),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    fn begin_rendering(&mut self, view: vk::ImageView, extent: vk::Extent2D, clear_color: [f32; 4]) {
        let color_attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color,
                },
            })];

        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            })
            .layer_count(1)
            .color_attachments(&color_attachments);

        unsafe {
            self.dynamic_rendering
                .cmd_begin_rendering(self.cmd, &rendering_info)
        };
    }

    fn set_viewport(&mut self, extent: vk::Extent2D) {
        let scissor = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        };
        unsafe {
            self.device
                .cmd_set_viewport(self.cmd, 0, &[flipped_viewport(extent)]);
            self.device.cmd_set_scissor(self.cmd, 0, &[scissor]);
        }
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(self.cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        };
    }

    fn push_storage_buffers(&mut self, layout: vk::PipelineLayout, buffers: &[vk::Buffer]) {
        let infos: Vec<vk::DescriptorBufferInfo> = buffers
            .iter()
            .map(|&buffer| {
                vk::DescriptorBufferInfo::default()
                    .buffer(buffer)
                    .offset(0)
                    .range(vk::WHOLE_SIZE)
            })
            .collect();

        let writes: Vec<vk::WriteDescriptorSet> = infos
            .iter()
            .enumerate()
            .map(|(binding, info)| {
                vk::WriteDescriptorSet::default()
                    .dst_binding(binding as u32)
                    .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                    .buffer_info(std::slice::from_ref(info))
            })
            .collect();

        unsafe {
            self.push_descriptor.cmd_push_descriptor_set(
                self.cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &writes,
            );
        }
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.cmd, buffer, 0, vk::IndexType::UINT32)
        };
    }

    fn draw(&mut self, vertex_count: u32) {
        unsafe { self.device.cmd_draw(self.cmd, vertex_count, 1, 0, 0) };
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe {
            self.device
                .cmd_draw_indexed(self.cmd, index_count, 1, 0, 0, 0)
        };
    }

    fn draw_mesh_tasks(&mut self, group_count: u32) {
        match self.mesh_shader {
            Some(mesh_shader) => unsafe {
                mesh_shader.cmd_draw_mesh_tasks(self.cmd, group_count, 1, 1)
            },
            None => log::error!("Mesh task draw recorded without VK_EXT_mesh_shader"),
        }
    }

    fn end_rendering(&mut self) {
        unsafe { self.dynamic_rendering.cmd_end_rendering(self.cmd) };
    }
}
