//! Buffer allocation and staging uploads.

use std::ptr::NonNull;

use ash::vk;

use super::buffer::Buffer;
use crate::error::{DriverError, GraphicsError, GraphicsResult};

/// Pick the first memory type allowed by `type_bits` that has all of `flags`.
///
/// Types are scanned in index order and the first match wins, even if a
/// later type would be a tighter fit.
pub fn select_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> GraphicsResult<u32> {
    let count = (properties.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES);

    properties.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(flags)
        })
        .map(|(index, _)| index as u32)
        .ok_or(GraphicsError::NoCompatibleMemoryType { type_bits, flags })
}

/// Queue and command pool used for one-off transfer submissions.
#[derive(Debug, Clone, Copy)]
pub struct UploadContext {
    pub queue: vk::Queue,
    pub command_pool: vk::CommandPool,
}

/// Creates buffers with one dedicated allocation each.
pub struct ResourceAllocator {
    device: ash::Device,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl ResourceAllocator {
    pub fn new(device: ash::Device, memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            device,
            memory_properties,
        }
    }

    /// Create a buffer backed by memory with at least `flags`.
    ///
    /// Host-visible memory is mapped immediately and stays mapped until
    /// [`destroy_buffer`](Self::destroy_buffer).
    pub fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        flags: vk::MemoryPropertyFlags,
    ) -> GraphicsResult<Buffer> {
        if size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size must be non-zero".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let handle =
            unsafe { self.device.create_buffer(&buffer_info, None) }.driver("vkCreateBuffer")?;

        match self.allocate_and_bind(handle, flags) {
            Ok((memory, mapped)) => {
                log::trace!("Created buffer {:?}: {} bytes, {:?}", handle, size, usage);
                Ok(Buffer {
                    handle,
                    memory,
                    size,
                    mapped,
                })
            }
            Err(e) => {
                unsafe { self.device.destroy_buffer(handle, None) };
                Err(e)
            }
        }
    }

    fn allocate_and_bind(
        &self,
        buffer: vk::Buffer,
        flags: vk::MemoryPropertyFlags,
    ) -> GraphicsResult<(vk::DeviceMemory, Option<NonNull<u8>>)> {
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let memory_type_index =
            select_memory_type(&self.memory_properties, requirements.memory_type_bits, flags)?;

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory =
            unsafe { self.device.allocate_memory(&alloc_info, None) }.driver("vkAllocateMemory")?;

        let bound = unsafe { self.device.bind_buffer_memory(buffer, memory, 0) }
            .driver("vkBindBufferMemory")
            .and_then(|()| {
                if !flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
                    return Ok(None);
                }
                let ptr = unsafe {
                    self.device
                        .map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                }
                .driver("vkMapMemory")?;
                Ok(NonNull::new(ptr.cast::<u8>()))
            });

        match bound {
            Ok(mapped) => Ok((memory, mapped)),
            Err(e) => {
                unsafe { self.device.free_memory(memory, None) };
                Err(e)
            }
        }
    }

    /// Copy `size` bytes from `staging` into `dst` and wait for completion.
    ///
    /// Records a single-use command buffer, submits it and waits for the
    /// whole device to go idle before returning.
    pub fn upload_buffer(
        &self,
        context: &UploadContext,
        staging: &Buffer,
        dst: &Buffer,
        size: vk::DeviceSize,
    ) -> GraphicsResult<()> {
        if size > staging.size() || size > dst.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "upload of {} bytes exceeds staging ({}) or destination ({}) size",
                size,
                staging.size(),
                dst.size()
            )));
        }

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(context.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .driver("vkAllocateCommandBuffers")?;

        let result = self.submit_copy(context, command_buffers[0], staging, dst, size);

        unsafe {
            self.device
                .free_command_buffers(context.command_pool, &command_buffers)
        };

        result
    }

    fn submit_copy(
        &self,
        context: &UploadContext,
        cmd: vk::CommandBuffer,
        staging: &Buffer,
        dst: &Buffer,
        size: vk::DeviceSize,
    ) -> GraphicsResult<()> {
        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .begin_command_buffer(cmd, &begin_info)
                .driver("vkBeginCommandBuffer")?;

            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size,
            };
            self.device
                .cmd_copy_buffer(cmd, staging.handle(), dst.handle(), &[region]);

            self.device
                .end_command_buffer(cmd)
                .driver("vkEndCommandBuffer")?;

            let command_buffers = [cmd];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            self.device
                .queue_submit(context.queue, &[submit_info], vk::Fence::null())
                .driver("vkQueueSubmit")?;

            self.device
                .device_wait_idle()
                .driver("vkDeviceWaitIdle")?;
        }

        log::trace!("Uploaded {} bytes into buffer {:?}", size, dst.handle());
        Ok(())
    }

    /// Destroy a buffer and free its memory.
    ///
    /// The GPU must be done with the buffer.
    pub fn destroy_buffer(&self, buffer: Buffer) {
        unsafe {
            if buffer.mapped.is_some() {
                self.device.unmap_memory(buffer.memory);
            }
            self.device.destroy_buffer(buffer.handle, None);
            self.device.free_memory(buffer.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const DEVICE_LOCAL: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
    const HOST_VISIBLE: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_VISIBLE;
    const HOST_COHERENT: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_COHERENT;
    const HOST_CACHED: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_CACHED;

    /// A typical discrete GPU: device-local, host-visible, then a resizable-BAR
    /// type that is both.
    fn properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in properties.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        properties
    }

    fn discrete() -> vk::PhysicalDeviceMemoryProperties {
        properties(&[
            DEVICE_LOCAL,
            HOST_VISIBLE | HOST_COHERENT,
            HOST_VISIBLE | HOST_COHERENT | HOST_CACHED,
            DEVICE_LOCAL | HOST_VISIBLE | HOST_COHERENT,
        ])
    }

    #[rstest]
    #[case::device_local(0b1111, DEVICE_LOCAL, 0)]
    #[case::staging(0b1111, HOST_VISIBLE | HOST_COHERENT, 1)]
    #[case::masked_first(0b1110, DEVICE_LOCAL, 3)]
    #[case::cached(0b1111, HOST_CACHED, 2)]
    #[case::no_flags(0b0100, vk::MemoryPropertyFlags::empty(), 2)]
    fn test_select_memory_type(
        #[case] type_bits: u32,
        #[case] flags: vk::MemoryPropertyFlags,
        #[case] expected: u32,
    ) {
        assert_eq!(select_memory_type(&discrete(), type_bits, flags), Ok(expected));
    }

    #[test]
    fn test_select_memory_type_is_first_fit() {
        // Type 2 would be an exact match, but type 1 comes first and also qualifies.
        let props = properties(&[
            DEVICE_LOCAL,
            HOST_VISIBLE | HOST_COHERENT | HOST_CACHED,
            HOST_VISIBLE | HOST_COHERENT,
        ]);
        assert_eq!(
            select_memory_type(&props, 0b111, HOST_VISIBLE | HOST_COHERENT),
            Ok(1)
        );
    }

    #[test]
    fn test_select_memory_type_no_match() {
        let err = select_memory_type(&discrete(), 0b0001, HOST_VISIBLE).unwrap_err();
        assert_eq!(
            err,
            GraphicsError::NoCompatibleMemoryType {
                type_bits: 0b0001,
                flags: HOST_VISIBLE,
            }
        );
    }

    #[test]
    fn test_select_memory_type_ignores_types_past_count() {
        let mut props = properties(&[DEVICE_LOCAL]);
        props.memory_types[1].property_flags = HOST_VISIBLE;
        assert!(select_memory_type(&props, 0b11, HOST_VISIBLE).is_err());
    }
}
