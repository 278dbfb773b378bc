//! GPU buffer resource.

use std::ptr::NonNull;

use ash::vk;

use crate::error::{GraphicsError, GraphicsResult};

/// A Vulkan buffer with its own memory allocation.
///
/// Buffers in host-visible memory stay mapped for their whole lifetime.
/// Created and destroyed by [`ResourceAllocator`](super::ResourceAllocator).
pub struct Buffer {
    pub(crate) handle: vk::Buffer,
    pub(crate) memory: vk::DeviceMemory,
    pub(crate) size: vk::DeviceSize,
    pub(crate) mapped: Option<NonNull<u8>>,
}

impl Buffer {
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    /// Size in bytes as requested at creation.
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Copy `data` into the mapped memory at `offset`.
    ///
    /// Fails if the buffer is not host-visible or the write would run past
    /// the end of the buffer.
    pub fn write(&mut self, offset: vk::DeviceSize, data: &[u8]) -> GraphicsResult<()> {
        let Some(mapped) = self.mapped else {
            return Err(GraphicsError::InvalidParameter(
                "buffer is not host-visible".to_string(),
            ));
        };

        offset
            .checked_add(data.len() as vk::DeviceSize)
            .filter(|&end| end <= self.size)
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "write of {} bytes at offset {} exceeds buffer size {}",
                    data.len(),
                    offset,
                    self.size
                ))
            })?;

        // SAFETY: the mapping covers `size` bytes and the range was checked above.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped.as_ptr().add(offset as usize),
                data.len(),
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("handle", &self.handle)
            .field("size", &self.size)
            .field("mapped", &self.mapped.is_some())
            .finish()
    }
}
