//! Native Vulkan backend implementation using ash.
//!
//! [`VulkanBackend`] owns the instance, surface, device and the single frame
//! command buffer, and implements [`SurfaceDriver`] and [`FrameDriver`] on
//! top of them. Validation layers are enabled on request.

mod command;
mod debug;
mod device;
mod instance;
mod pipeline;
mod recorder;
mod surface;

pub use device::DeviceSelection;
pub use pipeline::DrawPipeline;
pub use recorder::VulkanCommandRecorder;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::device::DeviceCapabilities;
use crate::error::{DriverError, GraphicsError, GraphicsResult};
use crate::resources::{ResourceAllocator, UploadContext};
use crate::scheduler::{AcquireOutcome, CommandRecorder, FrameDriver, PresentOutcome};
use crate::swapchain::{SurfaceDriver, SwapchainImages};

/// Startup options for [`VulkanBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendConfig {
    /// Enable `VK_LAYER_KHRONOS_validation` if it is installed.
    pub validation: bool,
    /// Present with FIFO. Otherwise the lowest-latency mode available.
    pub vsync: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            vsync: true,
        }
    }
}

/// Vulkan-based GPU backend using ash.
///
/// Buffers, pipelines and image sets created through the backend must be
/// destroyed before it is dropped.
pub struct VulkanBackend {
    /// Vulkan entry points (function loader).
    #[allow(dead_code)]
    entry: ash::Entry,
    /// Vulkan instance.
    instance: ash::Instance,
    /// Debug messenger for validation layer output.
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    /// Surface extension.
    surface_loader: ash::khr::surface::Instance,
    /// The window surface.
    surface: vk::SurfaceKHR,
    /// Selected physical device.
    physical_device: vk::PhysicalDevice,
    /// Features that change how frames are drawn.
    capabilities: DeviceCapabilities,
    /// Logical device.
    device: ash::Device,
    /// Graphics queue, also used for presentation and uploads.
    queue: vk::Queue,
    /// Swapchain extension.
    swapchain_loader: ash::khr::swapchain::Device,
    /// Dynamic rendering extension.
    dynamic_rendering: ash::khr::dynamic_rendering::Device,
    /// Push descriptor extension.
    push_descriptor: ash::khr::push_descriptor::Device,
    /// Mesh shader extension, when the device supports it.
    mesh_shader: Option<ash::ext::mesh_shader::Device>,
    /// Buffer allocation and staging uploads.
    allocator: ResourceAllocator,
    /// Command pool for frame and upload command buffers.
    command_pool: vk::CommandPool,
    /// The command buffer re-recorded every frame.
    frame_commands: vk::CommandBuffer,
    /// Format every swapchain is created with.
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    validation_enabled: bool,
}

impl std::fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackend")
            .field("device", &self.capabilities.name)
            .field("validation_enabled", &self.validation_enabled)
            .field("present_mode", &self.present_mode)
            .finish()
    }
}

impl VulkanBackend {
    /// Load Vulkan and open a device that can present to `window`.
    pub fn new<W>(window: &W, config: &BackendConfig) -> GraphicsResult<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display_handle = window
            .display_handle()
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!("Failed to get display handle: {e}"))
            })?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!("Failed to get window handle: {e}"))
            })?
            .as_raw();

        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
        })?;

        let instance::InstanceBundle {
            instance,
            debug_utils,
        } = instance::create_instance(&entry, display_handle, config.validation)?;
        let validation_enabled = debug_utils.is_some();

        let surface = unsafe {
            ash_window::create_surface(&entry, &instance, display_handle, window_handle, None)
        }
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to create Vulkan surface: {:?}", e))
        })?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let selection = device::select_physical_device(&instance, &surface_loader, surface)?;
        let device = device::create_logical_device(&instance, &selection)?;
        let queue = unsafe { device.get_device_queue(selection.queue_family, 0) };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(selection.physical_device, surface)
        }
        .driver("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
        let surface_format = surface::choose_surface_format(&formats).ok_or_else(|| {
            GraphicsError::InitializationFailed("Surface reports no formats".to_string())
        })?;

        let present_modes = unsafe {
            surface_loader
                .get_physical_device_surface_present_modes(selection.physical_device, surface)
        }
        .driver("vkGetPhysicalDeviceSurfacePresentModesKHR")?;
        let present_mode = surface::choose_present_mode(&present_modes, config.vsync);

        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(selection.physical_device) };
        let allocator = ResourceAllocator::new(device.clone(), memory_properties);

        let command_pool = command::create_command_pool(&device, selection.queue_family)?;
        let frame_commands = command::allocate_frame_command_buffer(&device, command_pool)?;

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        let dynamic_rendering = ash::khr::dynamic_rendering::Device::new(&instance, &device);
        let push_descriptor = ash::khr::push_descriptor::Device::new(&instance, &device);
        let mesh_shader = selection
            .capabilities
            .mesh_shading
            .then(|| ash::ext::mesh_shader::Device::new(&instance, &device));

        log::info!(
            "Vulkan backend initialized on {} (validation: {}, mesh shading: {}, {:?}, {:?})",
            selection.capabilities.name,
            validation_enabled,
            selection.capabilities.mesh_shading,
            surface_format.format,
            present_mode
        );

        Ok(Self {
            entry,
            instance,
            debug_utils,
            surface_loader,
            surface,
            physical_device: selection.physical_device,
            capabilities: selection.capabilities,
            device,
            queue,
            swapchain_loader,
            dynamic_rendering,
            push_descriptor,
            mesh_shader,
            allocator,
            command_pool,
            frame_commands,
            surface_format,
            present_mode,
            validation_enabled,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    /// Queue and pool for synchronous staging uploads.
    pub fn upload_context(&self) -> UploadContext {
        UploadContext {
            queue: self.queue,
            command_pool: self.command_pool,
        }
    }

    /// Color format of every swapchain this backend creates.
    pub fn color_format(&self) -> vk::Format {
        self.surface_format.format
    }

    fn surface_capabilities(&self) -> GraphicsResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
        }
        .driver("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")
    }
}

impl SurfaceDriver for VulkanBackend {
    fn surface_extent(&self, framebuffer: vk::Extent2D) -> GraphicsResult<vk::Extent2D> {
        let capabilities = self.surface_capabilities()?;
        Ok(surface::choose_extent(&capabilities, framebuffer))
    }

    fn create_swapchain(
        &self,
        extent: vk::Extent2D,
        old: vk::SwapchainKHR,
    ) -> GraphicsResult<SwapchainImages> {
        let capabilities = self.surface_capabilities()?;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(surface::choose_image_count(&capabilities))
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(old);

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .driver("vkCreateSwapchainKHR")?;

        let images = match unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
            .driver("vkGetSwapchainImagesKHR")
        {
            Ok(images) => images,
            Err(e) => {
                unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e);
            }
        };

        Ok(SwapchainImages {
            swapchain,
            images,
            format: self.surface_format.format,
            extent,
        })
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
    ) -> GraphicsResult<vk::ImageView> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe { self.device.create_image_view(&view_info, None) }.driver("vkCreateImageView")
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
        unsafe { self.device.device_wait_idle() }.driver("vkDeviceWaitIdle")
    }
}

impl FrameDriver for VulkanBackend {
    fn create_semaphore(&self) -> GraphicsResult<vk::Semaphore> {
        unsafe {
            self.device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
        }
        .driver("vkCreateSemaphore")
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> GraphicsResult<AcquireOutcome> {
        match unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, u64::MAX, signal, vk::Fence::null())
        } {
            Ok((index, suboptimal)) => Ok(AcquireOutcome::Ready { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(result) => Err(GraphicsError::Driver {
                operation: "vkAcquireNextImageKHR",
                result,
            }),
        }
    }

    fn record(&self, commands: &mut dyn FnMut(&mut dyn CommandRecorder)) -> GraphicsResult<()> {
        let cmd = self.frame_commands;
        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .driver("vkResetCommandBuffer")?;
            self.device
                .begin_command_buffer(cmd, &begin_info)
                .driver("vkBeginCommandBuffer")?;
        }

        let mut recorder = VulkanCommandRecorder {
            device: &self.device,
            dynamic_rendering: &self.dynamic_rendering,
            push_descriptor: &self.push_descriptor,
            mesh_shader: self.mesh_shader.as_ref(),
            cmd,
        };
        commands(&mut recorder);

        unsafe { self.device.end_command_buffer(cmd) }.driver("vkEndCommandBuffer")
    }

    fn submit(&self, wait: vk::Semaphore, signal: vk::Semaphore) -> GraphicsResult<()> {
        let wait_semaphores = [wait];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.frame_commands];
        let signal_semaphores = [signal];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .queue_submit(self.queue, &[submit_info], vk::Fence::null())
        }
        .driver("vkQueueSubmit")
    }

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        index: u32,
        wait: vk::Semaphore,
    ) -> GraphicsResult<PresentOutcome> {
        let wait_semaphores = [wait];
        let swapchains = [swapchain];
        let image_indices = [index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(self.queue, &present_info) } {
            Ok(suboptimal) => Ok(PresentOutcome::Presented { suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(result) => Err(GraphicsError::Driver {
                operation: "vkQueuePresentKHR",
                result,
            }),
        }
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to be idle before cleanup
            let _ = self.device.device_wait_idle();

            // Frees the frame command buffer too
            self.device.destroy_command_pool(self.command_pool, None);

            self.device.destroy_device(None);

            self.surface_loader.destroy_surface(self.surface, None);

            if let Some((debug_utils, messenger)) = &self.debug_utils {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
