//! GPU backends.
//!
//! The frame scheduler, surface manager and allocator are written against
//! the [`FrameDriver`](crate::scheduler::FrameDriver) and
//! [`SurfaceDriver`](crate::swapchain::SurfaceDriver) traits. The only
//! implementation shipped is [`vulkan::VulkanBackend`], built directly on ash.

pub mod vulkan;
