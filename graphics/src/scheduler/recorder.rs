//! Command recording interface.

use ash::vk;

/// The two layout transitions a frame needs on its swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTransition {
    /// Undefined to color attachment, before rendering.
    ToRenderTarget,
    /// Color attachment to present source, after rendering.
    ToPresent,
}

impl LayoutTransition {
    pub fn old_layout(self) -> vk::ImageLayout {
        match self {
            Self::ToRenderTarget => vk::ImageLayout::UNDEFINED,
            Self::ToPresent => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }
    }

    pub fn new_layout(self) -> vk::ImageLayout {
        match self {
            Self::ToRenderTarget => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            Self::ToPresent => vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }

    pub fn src_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::ToRenderTarget => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::ToPresent => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        }
    }

    pub fn dst_stage(self) -> vk::PipelineStageFlags {
        match self {
            Self::ToRenderTarget => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            Self::ToPresent => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }

    pub fn src_access(self) -> vk::AccessFlags {
        match self {
            Self::ToRenderTarget => vk::AccessFlags::empty(),
            Self::ToPresent => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        }
    }

    pub fn dst_access(self) -> vk::AccessFlags {
        match self {
            Self::ToRenderTarget => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            Self::ToPresent => vk::AccessFlags::empty(),
        }
    }
}

/// Commands recorded into the frame's command buffer.
///
/// Implemented over a real command buffer by the Vulkan backend and by a
/// recording mock in tests.
pub trait CommandRecorder {
    fn transition_image(&mut self, image: vk::Image, transition: LayoutTransition);

    /// Begin dynamic rendering into `view`, clearing it to `clear_color`.
    fn begin_rendering(&mut self, view: vk::ImageView, extent: vk::Extent2D, clear_color: [f32; 4]);

    /// Set a full-extent viewport and scissor.
    fn set_viewport(&mut self, extent: vk::Extent2D);

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);

    /// Push `buffers` as storage-buffer bindings 0.. of set 0.
    fn push_storage_buffers(&mut self, layout: vk::PipelineLayout, buffers: &[vk::Buffer]);

    fn bind_index_buffer(&mut self, buffer: vk::Buffer);

    fn draw(&mut self, vertex_count: u32);

    fn draw_indexed(&mut self, index_count: u32);

    fn draw_mesh_tasks(&mut self, group_count: u32);

    fn end_rendering(&mut self);
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::to_render_target(LayoutTransition::ToRenderTarget)]
    #[case::to_present(LayoutTransition::ToPresent)]
    fn test_transitions_chain(#[case] transition: LayoutTransition) {
        assert_ne!(transition.old_layout(), transition.new_layout());
    }

    #[test]
    fn test_render_target_feeds_present() {
        assert_eq!(
            LayoutTransition::ToRenderTarget.new_layout(),
            LayoutTransition::ToPresent.old_layout()
        );
        assert_eq!(
            LayoutTransition::ToPresent.new_layout(),
            vk::ImageLayout::PRESENT_SRC_KHR
        );
    }

    #[test]
    fn test_render_target_waits_on_color_output() {
        // The acquire semaphore is waited at color output, so the barrier
        // must start in the same stage to chain with it.
        let t = LayoutTransition::ToRenderTarget;
        assert_eq!(t.src_stage(), vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(t.dst_access(), vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
    }
}
