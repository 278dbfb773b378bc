//! Vulkan command pool and buffer management.

use ash::vk;

use crate::error::{DriverError, GraphicsResult};

/// Create a command pool whose buffers can be reset individually.
pub fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> GraphicsResult<vk::CommandPool> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    unsafe { device.create_command_pool(&pool_info, None) }.driver("vkCreateCommandPool")
}

/// Allocate the primary command buffer re-recorded every frame.
pub fn allocate_frame_command_buffer(
    device: &ash::Device,
    pool: vk::CommandPool,
) -> GraphicsResult<vk::CommandBuffer> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
        .driver("vkAllocateCommandBuffers")?;
    Ok(buffers[0])
}
