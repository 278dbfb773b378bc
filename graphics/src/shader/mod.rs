//! Precompiled SPIR-V shader loading.
//!
//! Shaders are compiled offline from the GLSL sources in `shaders/` and
//! loaded at startup as `<dir>/<name>.spv`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ash::vk;

use crate::error::{DriverError, GraphicsError, GraphicsResult};

/// A shader module that is destroyed when dropped.
pub struct ShaderModule {
    device: ash::Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Load `<dir>/<name>.spv` and create a shader module from it.
    pub fn load(device: &ash::Device, dir: &Path, name: &str) -> GraphicsResult<Self> {
        let path = shader_path(dir, name);
        let bytes = std::fs::read(&path).map_err(|e| GraphicsError::ShaderLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let code = parse_spirv(&bytes).map_err(|reason| GraphicsError::ShaderLoad {
            path: path.display().to_string(),
            reason,
        })?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .driver("vkCreateShaderModule")?;

        log::debug!("Loaded shader {} ({} words)", path.display(), code.len());

        Ok(Self {
            device: device.clone(),
            module,
        })
    }

    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe { self.device.destroy_shader_module(self.module, None) };
    }
}

/// Path of the compiled shader `name` inside `dir`.
pub fn shader_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.spv"))
}

/// Decode a SPIR-V binary into words, validating length and magic number.
pub fn parse_spirv(bytes: &[u8]) -> Result<Vec<u32>, String> {
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| e.to_string())
}
