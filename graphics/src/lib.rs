//! # Yosemite Graphics
//!
//! Vulkan presentation and resource layer for the Yosemite mesh renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`scheduler::FrameScheduler`] - acquire, record, submit, present, then a
//!   full device sync, once per frame
//! - [`swapchain::SurfaceManager`] - keeps the presentable image set matched
//!   to the surface extent
//! - [`resources::ResourceAllocator`] - first-fit buffer allocation and
//!   synchronous staging uploads
//! - [`scheduler::DrawPath`] - vertex, indexed and meshlet draw strategies
//! - [`backend::vulkan`] - the ash implementation of the driver traits
//!
//! The scheduler and surface manager talk to the GPU only through the
//! [`scheduler::FrameDriver`] and [`swapchain::SurfaceDriver`] traits, so
//! their state machines can be exercised without a device.

pub mod backend;
pub mod device;
pub mod error;
pub mod resources;
pub mod scheduler;
pub mod shader;
pub mod swapchain;

#[cfg(test)]
mod mock;

pub use device::DeviceCapabilities;
pub use error::{DriverError, GraphicsError, GraphicsResult};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
pub fn init() {
    log::info!("Yosemite Graphics v{} initialized", VERSION);
}
