//! Vulkan physical and logical device management.

use std::ffi::CStr;

use ash::vk;

use super::instance::REQUIRED_API_VERSION;
use crate::device::DeviceCapabilities;
use crate::error::{GraphicsError, GraphicsResult};

/// Extensions every device must support.
const REQUIRED_EXTENSIONS: [&CStr; 3] = [
    ash::khr::swapchain::NAME,
    ash::khr::dynamic_rendering::NAME,
    ash::khr::push_descriptor::NAME,
];

/// The chosen physical device and the queue family used for everything.
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub physical_device: vk::PhysicalDevice,
    pub queue_family: u32,
    pub capabilities: DeviceCapabilities,
}

/// Select the best physical device that can present to `surface`.
///
/// Prefers discrete GPUs, then devices with mesh shading.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> GraphicsResult<DeviceSelection> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
        GraphicsError::InitializationFailed(format!(
            "Failed to enumerate physical devices: {:?}",
            e
        ))
    })?;

    if devices.is_empty() {
        return Err(GraphicsError::InitializationFailed(
            "No Vulkan-capable GPU found".to_string(),
        ));
    }

    let mut best: Option<(u32, DeviceSelection)> = None;

    for device in devices {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let name = properties
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());

        if properties.api_version < REQUIRED_API_VERSION {
            log::info!("Skipping GPU {}: Vulkan 1.3 not supported", name);
            continue;
        }

        let extensions = supported_extensions(instance, device);
        if let Some(missing) = REQUIRED_EXTENSIONS
            .iter()
            .find(|required| !extensions.iter().any(|e| e.as_c_str() == **required))
        {
            log::info!("Skipping GPU {}: missing {:?}", name, missing);
            continue;
        }

        let families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };
        let Some(queue_family) = find_queue_family(&families, |index| unsafe {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .unwrap_or(false)
        }) else {
            log::info!("Skipping GPU {}: no graphics queue that can present", name);
            continue;
        };

        let has_mesh_extension = extensions
            .iter()
            .any(|e| e.as_c_str() == ash::ext::mesh_shader::NAME);
        let capabilities = query_capabilities(instance, device, name, has_mesh_extension);

        let score = device_score(properties.device_type, capabilities.mesh_shading);
        log::info!(
            "Found GPU: {} (type: {:?}, mesh shading: {}, score: {})",
            capabilities.name,
            properties.device_type,
            capabilities.mesh_shading,
            score
        );

        if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
            best = Some((
                score,
                DeviceSelection {
                    physical_device: device,
                    queue_family,
                    capabilities,
                },
            ));
        }
    }

    best.map(|(_, selection)| selection)
        .ok_or_else(|| GraphicsError::InitializationFailed("No suitable GPU found".to_string()))
}

/// Owned copy of an extension name.
struct ExtensionName([std::ffi::c_char; vk::MAX_EXTENSION_NAME_SIZE]);

impl ExtensionName {
    fn as_c_str(&self) -> &CStr {
        // SAFETY: the driver null-terminates extension names within the array
        unsafe { CStr::from_ptr(self.0.as_ptr()) }
    }
}

fn supported_extensions(instance: &ash::Instance, device: vk::PhysicalDevice) -> Vec<ExtensionName> {
    unsafe { instance.enumerate_device_extension_properties(device) }
        .unwrap_or_default()
        .into_iter()
        .map(|e| ExtensionName(e.extension_name))
        .collect()
}

fn query_capabilities(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    name: String,
    has_mesh_extension: bool,
) -> DeviceCapabilities {
    if !has_mesh_extension {
        return DeviceCapabilities {
            name,
            ..Default::default()
        };
    }

    let mut mesh_features = vk::PhysicalDeviceMeshShaderFeaturesEXT::default();
    {
        let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut mesh_features);
        unsafe { instance.get_physical_device_features2(device, &mut features2) };
    }

    let mut mesh_properties = vk::PhysicalDeviceMeshShaderPropertiesEXT::default();
    {
        let mut properties2 =
            vk::PhysicalDeviceProperties2::default().push_next(&mut mesh_properties);
        unsafe { instance.get_physical_device_properties2(device, &mut properties2) };
    }

    let mesh_shading = mesh_features.task_shader == vk::TRUE && mesh_features.mesh_shader == vk::TRUE;
    DeviceCapabilities {
        name,
        mesh_shading,
        max_mesh_output_vertices: mesh_properties.max_mesh_output_vertices,
        max_mesh_output_primitives: mesh_properties.max_mesh_output_primitives,
    }
}

/// First queue family with graphics support that can present.
pub fn find_queue_family(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> Option<u32> {
    families
        .iter()
        .enumerate()
        .map(|(index, family)| (index as u32, family))
        .find(|(index, family)| {
            family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && supports_present(*index)
        })
        .map(|(index, _)| index)
}

/// Higher is better. Zero for CPU and unknown device types.
pub fn device_score(device_type: vk::PhysicalDeviceType, mesh_shading: bool) -> u32 {
    let base = match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 10,
        _ => 1,
    };
    if mesh_shading { base + base / 2 } else { base }
}

/// Create the logical device with one queue from the selected family.
///
/// Mesh and task shaders are enabled only when the device supports them.
pub fn create_logical_device(
    instance: &ash::Instance,
    selection: &DeviceSelection,
) -> GraphicsResult<ash::Device> {
    let queue_priorities = [1.0f32];
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(selection.queue_family)
        .queue_priorities(&queue_priorities)];

    let mesh_shading = selection.capabilities.mesh_shading;

    let mut device_extensions: Vec<*const std::ffi::c_char> =
        REQUIRED_EXTENSIONS.iter().map(|name| name.as_ptr()).collect();
    if mesh_shading {
        device_extensions.push(ash::ext::mesh_shader::NAME.as_ptr());
    }

    let mut vulkan_13_features = vk::PhysicalDeviceVulkan13Features::default()
        .dynamic_rendering(true)
        .synchronization2(true);

    let mut mesh_features = vk::PhysicalDeviceMeshShaderFeaturesEXT::default()
        .task_shader(true)
        .mesh_shader(true);

    let mut create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&device_extensions)
        .push_next(&mut vulkan_13_features);
    if mesh_shading {
        create_info = create_info.push_next(&mut mesh_features);
    }

    unsafe { instance.create_device(selection.physical_device, &create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create logical device: {:?}", e))
    })
}
