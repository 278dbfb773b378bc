//! Device feature reporting.

/// Optional features of the opened device that change how frames are drawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DeviceCapabilities {
    /// Human-readable device name.
    pub name: String,
    /// Whether `VK_EXT_mesh_shader` task and mesh stages are enabled.
    pub mesh_shading: bool,
    /// Maximum mesh shader output vertices, if mesh shading is available.
    pub max_mesh_output_vertices: u32,
    /// Maximum mesh shader output primitives, if mesh shading is available.
    pub max_mesh_output_primitives: u32,
}

impl DeviceCapabilities {
    /// Whether the device can run the meshlet pipeline with the given limits.
    pub fn supports_meshlets(&self, vertices: usize, triangles: usize) -> bool {
        self.mesh_shading
            && self.max_mesh_output_vertices as usize >= vertices
            && self.max_mesh_output_primitives as usize >= triangles
    }
}
