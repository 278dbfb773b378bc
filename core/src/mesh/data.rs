//! Indexed triangle mesh.

use crate::meshlet::{self, Meshlet};

use super::error::MeshError;
use super::vertex::Vertex;

/// Deduplicated, indexed triangle mesh with optional meshlets.
///
/// Every index is in range for the vertex list and the index count is a
/// multiple of three. Once [`build_meshlets`](Self::build_meshlets) has run,
/// every triangle appears in exactly one meshlet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    meshlets: Vec<Meshlet>,
}

impl Mesh {
    /// Create a mesh from unique vertices and a triangle list.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, MeshError> {
        let mesh = Self {
            vertices,
            indices,
            meshlets: Vec::new(),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Check the index invariants.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(self.indices.len()));
        }
        if let Some((position, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|&(_, &index)| index as usize >= self.vertices.len())
        {
            return Err(MeshError::IndexOutOfRange {
                position,
                index,
                vertex_count: self.vertices.len(),
            });
        }
        Ok(())
    }

    /// Cluster the triangles into meshlets, replacing any previous result.
    pub fn build_meshlets(&mut self) {
        self.meshlets = meshlet::build_meshlets(&self.vertices, &self.indices);
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Meshlets including trailing padding. Empty until built.
    pub fn meshlets(&self) -> &[Meshlet] {
        &self.meshlets
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Expand the indexed mesh back into a triangle soup.
    ///
    /// Used by the non-indexed draw path, which reads one vertex per corner.
    pub fn unindexed_vertices(&self) -> Vec<Vertex> {
        self.indices
            .iter()
            .map(|&index| self.vertices[index as usize])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        let vertices = vec![
            Vertex::at([0.0, 0.0, 0.0]),
            Vertex::at([1.0, 0.0, 0.0]),
            Vertex::at([1.0, 1.0, 0.0]),
            Vertex::at([0.0, 1.0, 0.0]),
        ];
        (vertices, vec![0, 1, 2, 2, 3, 0])
    }

    #[test]
    fn test_mesh_new() {
        let (vertices, indices) = quad();
        let mesh = Mesh::new(vertices, indices).unwrap();
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.meshlets().is_empty());
    }

    #[test]
    fn test_mesh_rejects_partial_triangle() {
        let (vertices, _) = quad();
        let err = Mesh::new(vertices, vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, MeshError::IndexCount(4)));
    }

    #[test]
    fn test_mesh_rejects_out_of_range_index() {
        let (vertices, _) = quad();
        let err = Mesh::new(vertices, vec![0, 1, 4]).unwrap_err();
        assert!(matches!(
            err,
            MeshError::IndexOutOfRange {
                position: 2,
                index: 4,
                vertex_count: 4
            }
        ));
    }

    #[test]
    fn test_unindexed_vertices() {
        let (vertices, indices) = quad();
        let mesh = Mesh::new(vertices.clone(), indices).unwrap();
        let soup = mesh.unindexed_vertices();
        assert_eq!(soup.len(), 6);
        assert_eq!(soup[3], vertices[2]);
        assert_eq!(soup[5], vertices[0]);
    }

    #[test]
    fn test_build_meshlets_covers_mesh() {
        let (vertices, indices) = quad();
        let mut mesh = Mesh::new(vertices, indices).unwrap();
        mesh.build_meshlets();
        assert_eq!(mesh.meshlets().len(), 32);
        assert_eq!(mesh.meshlets()[0].triangle_count(), 2);
    }
}
