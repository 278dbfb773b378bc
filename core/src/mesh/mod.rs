//! CPU-side mesh types, loading and preparation.
//!
//! The loading pipeline runs in three steps:
//!
//! 1. [`obj::parse_obj`] expands an OBJ file into a triangle soup
//! 2. [`prep::prepare`] deduplicates vertices and reorders triangles for
//!    post-transform cache reuse
//! 3. [`Mesh::build_meshlets`] clusters the prepared triangles
//!
//! [`load_mesh`] runs all three.

mod data;
mod error;
pub mod generators;
pub mod obj;
pub mod prep;
mod vertex;

use std::path::Path;

pub use data::Mesh;
pub use error::MeshError;
pub use vertex::Vertex;

/// Load an OBJ file and produce a prepared mesh with meshlets built.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    let soup = obj::load_obj(path)?;
    let mut mesh = prep::prepare(&soup)?;
    mesh.build_meshlets();

    log::info!(
        "Loaded {}: {} triangles, {} unique vertices (from {}), {} meshlets",
        path.display(),
        mesh.triangle_count(),
        mesh.vertices().len(),
        soup.len(),
        mesh.meshlets().len()
    );

    Ok(mesh)
}
