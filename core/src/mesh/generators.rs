//! Procedural meshes for tests and benchmarks.

use super::data::Mesh;
use super::vertex::Vertex;

/// Generate a flat grid of `cells × cells` quads in the XY plane facing +Z.
///
/// The grid spans `[-1, 1]` on both axes with `(cells + 1)²` shared vertices
/// and `2 · cells²` triangles, emitted row by row.
pub fn generate_grid(cells: u32) -> Mesh {
    let cells = cells.max(1);
    let row = cells + 1;
    let step = 2.0 / cells as f32;

    let mut vertices = Vec::with_capacity((row * row) as usize);
    for y in 0..row {
        for x in 0..row {
            vertices.push(Vertex::new(
                [-1.0 + x as f32 * step, -1.0 + y as f32 * step, 0.0],
                [0.0, 0.0, 1.0],
                [x as f32 / cells as f32, y as f32 / cells as f32],
            ));
        }
    }

    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for y in 0..cells {
        for x in 0..cells {
            let i = y * row + x;
            indices.extend_from_slice(&[i, i + 1, i + row + 1, i + row + 1, i + row, i]);
        }
    }

    Mesh::new(vertices, indices).unwrap_or_default()
}

/// Generate a triangle soup of `count` disjoint triangles.
///
/// Each triangle owns three fresh vertices, so clustering these stresses
/// the vertex limit rather than the triangle limit.
pub fn generate_disjoint_triangles(count: u32) -> Vec<Vertex> {
    (0..count)
        .flat_map(|i| {
            let x = i as f32;
            [
                Vertex::at([x, 0.0, 0.0]),
                Vertex::at([x + 1.0, 0.0, 0.0]),
                Vertex::at([x, 1.0, 0.0]),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_grid() {
        let mesh = generate_grid(4);
        assert_eq!(mesh.vertices().len(), 25);
        assert_eq!(mesh.triangle_count(), 32);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_generate_grid_clamps_zero() {
        let mesh = generate_grid(0);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_generate_disjoint_triangles() {
        let soup = generate_disjoint_triangles(5);
        assert_eq!(soup.len(), 15);
        assert_eq!(soup[3].position, [1.0, 0.0, 0.0]);
    }
}
