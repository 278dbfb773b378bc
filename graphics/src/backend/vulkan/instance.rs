//! Vulkan instance creation and configuration.

use std::ffi::CStr;

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use super::debug;
use crate::error::{DriverError, GraphicsError, GraphicsResult};

/// Dynamic rendering and synchronization2 are core in 1.3.
pub const REQUIRED_API_VERSION: u32 = vk::make_api_version(0, 1, 3, 0);

const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance plus the debug messenger, if validation is on.
pub struct InstanceBundle {
    pub instance: ash::Instance,
    pub debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

/// Create a Vulkan instance able to present to `display`.
///
/// Validation is enabled only if requested and the layer is installed.
pub fn create_instance(
    entry: &ash::Entry,
    display: RawDisplayHandle,
    validation_requested: bool,
) -> GraphicsResult<InstanceBundle> {
    let validation = validation_requested && check_validation_layer_support(entry);
    if validation_requested && !validation {
        log::warn!("Validation layers requested but not available");
    }

    let app_info = vk::ApplicationInfo::default()
        .application_name(c"Yosemite")
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"Yosemite")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(REQUIRED_API_VERSION);

    let mut extensions = ash_window::enumerate_required_extensions(display)
        .driver("vkEnumerateInstanceExtensionProperties")?
        .to_vec();
    if validation {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }

    let layer_names = if validation {
        vec![VALIDATION_LAYER_NAME.as_ptr()]
    } else {
        vec![]
    };

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layer_names);

    let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create Vulkan instance: {:?}", e))
    })?;

    let debug_utils = if validation {
        let loader = ash::ext::debug_utils::Instance::new(entry, &instance);
        match debug::create_debug_messenger(&loader) {
            Ok(messenger) => Some((loader, messenger)),
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        }
    } else {
        None
    };

    log::debug!(
        "Vulkan instance created with {} extensions (validation: {})",
        extensions.len(),
        validation
    );

    Ok(InstanceBundle {
        instance,
        debug_utils,
    })
}

fn check_validation_layer_support(entry: &ash::Entry) -> bool {
    let Ok(available_layers) = (unsafe { entry.enumerate_instance_layer_properties() }) else {
        return false;
    };

    available_layers
        .iter()
        .any(|layer| {
            layer
                .layer_name_as_c_str()
                .is_ok_and(|name| name == VALIDATION_LAYER_NAME)
        })
}
