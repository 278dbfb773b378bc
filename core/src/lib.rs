//! # Yosemite Core
//!
//! CPU-side geometry for the Yosemite renderer: the vertex format, OBJ
//! loading, mesh preparation and meshlet clustering.
//!
//! ## Overview
//!
//! - [`mesh::Vertex`] - 32-byte vertex shared with the shaders
//! - [`mesh::Mesh`] - deduplicated, indexed triangle mesh
//! - [`mesh::load_mesh`] - OBJ file to prepared mesh with meshlets
//! - [`meshlet::MeshletBuilder`] - greedy streaming clusterizer
//! - [`meshlet::GpuMeshlet`] - std430 meshlet record for task/mesh shaders

pub mod mesh;
pub mod meshlet;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core subsystem.
pub fn init() {
    log::info!("Yosemite Core v{} initialized", VERSION);
}
