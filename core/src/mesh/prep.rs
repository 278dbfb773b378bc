//! Mesh preparation: vertex deduplication and vertex cache optimization.

use super::data::Mesh;
use super::error::MeshError;
use super::vertex::Vertex;

/// Turn a triangle soup into an indexed mesh ready for clustering.
///
/// Bitwise identical vertices are merged, then triangles are reordered for
/// post-transform cache reuse. Both steps run through meshoptimizer.
pub fn prepare(soup: &[Vertex]) -> Result<Mesh, MeshError> {
    if soup.is_empty() {
        return Err(MeshError::Empty);
    }
    if soup.len() % 3 != 0 {
        return Err(MeshError::IndexCount(soup.len()));
    }

    let (vertex_count, remap) = meshopt::generate_vertex_remap(soup, None);
    let vertices = meshopt::remap_vertex_buffer(soup, vertex_count, &remap);
    let indices = meshopt::remap_index_buffer(None, soup.len(), &remap);
    let indices = meshopt::optimize_vertex_cache(&indices, vertex_count);

    log::debug!(
        "Prepared mesh: {} soup vertices -> {} unique",
        soup.len(),
        vertex_count
    );

    Mesh::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_soup() -> Vec<Vertex> {
        let a = Vertex::at([0.0, 0.0, 0.0]);
        let b = Vertex::at([1.0, 0.0, 0.0]);
        let c = Vertex::at([1.0, 1.0, 0.0]);
        let d = Vertex::at([0.0, 1.0, 0.0]);
        vec![a, b, c, c, d, a]
    }

    #[test]
    fn test_prepare_deduplicates() {
        let mesh = prepare(&quad_soup()).unwrap();
        assert_eq!(mesh.vertices().len(), 4);
        assert_eq!(mesh.indices().len(), 6);
    }

    #[test]
    fn test_prepare_preserves_triangles() {
        let soup = quad_soup();
        let mesh = prepare(&soup).unwrap();

        let mut expected: Vec<[[u32; 3]; 3]> = soup
            .chunks(3)
            .map(|t| sorted_triangle([t[0].position, t[1].position, t[2].position]))
            .collect();
        let mut actual: Vec<[[u32; 3]; 3]> = mesh
            .unindexed_vertices()
            .chunks(3)
            .map(|t| sorted_triangle([t[0].position, t[1].position, t[2].position]))
            .collect();
        expected.sort();
        actual.sort();
        assert_eq!(expected, actual);
    }

    fn sorted_triangle(corners: [[f32; 3]; 3]) -> [[u32; 3]; 3] {
        let mut bits = corners.map(|p| p.map(f32::to_bits));
        bits.sort();
        bits
    }

    #[test]
    fn test_prepare_rejects_empty() {
        assert!(matches!(prepare(&[]), Err(MeshError::Empty)));
    }

    #[test]
    fn test_prepare_rejects_partial_triangle() {
        let soup = &quad_soup()[..4];
        assert!(matches!(prepare(soup), Err(MeshError::IndexCount(4))));
    }
}
