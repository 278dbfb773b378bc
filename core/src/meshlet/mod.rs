//! Meshlet clustering.
//!
//! A meshlet is a small cluster of triangles with its own local vertex list,
//! sized for one mesh-shader workgroup. [`MeshletBuilder`] packs triangles
//! greedily in input order: a triangle joins the current meshlet unless it
//! would push the meshlet past [`MAX_VERTICES`] unique vertices or
//! [`MAX_TRIANGLES`] triangles, in which case the meshlet is closed and a new
//! one is started. There is no lookahead and closed meshlets are never
//! revisited, so output quality depends on the input being vertex-cache
//! optimized (see [`crate::mesh::prep`]).
//!
//! The finished list is padded with empty meshlets to a multiple of
//! [`TASK_GROUP_SIZE`] so the task shader can always dispatch whole
//! workgroups. Padding meshlets have zero counts and draw nothing.

mod bounds;
mod gpu;

pub use bounds::{NormalCone, compute_cone};
pub use gpu::{GpuMeshlet, PACKED_INDEX_WORDS, pack_meshlets};

use crate::mesh::Vertex;

/// Maximum unique vertices per meshlet.
pub const MAX_VERTICES: usize = 64;

/// Maximum triangles per meshlet.
pub const MAX_TRIANGLES: usize = 124;

/// Task shader workgroup size; the meshlet count is always a multiple of it.
pub const TASK_GROUP_SIZE: usize = 32;

/// Marks a global vertex as absent from the meshlet being built.
const NOT_PRESENT: u8 = u8::MAX;

/// A bounded cluster of triangles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Meshlet {
    /// Global vertex indices, in first-seen order.
    pub vertices: Vec<u32>,
    /// Triangles as indices into [`vertices`](Self::vertices).
    pub triangles: Vec<[u8; 3]>,
    /// Normal cone for back-face cluster culling.
    pub cone: NormalCone,
}

impl Meshlet {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether this is a padding meshlet.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The triangles of this meshlet as global vertex indices.
    pub fn global_triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.triangles
            .iter()
            .map(|t| t.map(|local| self.vertices[local as usize]))
    }
}

/// Streaming greedy meshlet builder.
///
/// Feed triangles with [`push_triangle`](Self::push_triangle) and collect the
/// result with [`finish`](Self::finish).
#[derive(Debug)]
pub struct MeshletBuilder {
    /// Local index of each global vertex in the current meshlet.
    local: Vec<u8>,
    current: Meshlet,
    meshlets: Vec<Meshlet>,
}

impl MeshletBuilder {
    /// Create a builder for a mesh with `vertex_count` unique vertices.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            local: vec![NOT_PRESENT; vertex_count],
            current: Meshlet::default(),
            meshlets: Vec::new(),
        }
    }

    /// Append one triangle.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range for the vertex count given to
    /// [`new`](Self::new).
    pub fn push_triangle(&mut self, triangle: [u32; 3]) {
        for index in triangle {
            assert!(
                (index as usize) < self.local.len(),
                "meshlet builder: vertex index {} out of range for {} vertices",
                index,
                self.local.len()
            );
        }

        let [a, b, c] = triangle;
        let missing = [a, b, c]
            .iter()
            .enumerate()
            .filter(|&(i, &v)| {
                self.local[v as usize] == NOT_PRESENT && !triangle[..i].contains(&v)
            })
            .count();

        if self.current.vertices.len() + missing > MAX_VERTICES
            || self.current.triangles.len() >= MAX_TRIANGLES
        {
            self.close_current();
        }

        let local = triangle.map(|v| self.local_index(v));
        self.current.triangles.push(local);
    }

    /// Close the last meshlet and pad the list to a whole number of task
    /// workgroups.
    pub fn finish(mut self) -> Vec<Meshlet> {
        if !self.current.is_empty() {
            self.close_current();
        }

        let padded = self.meshlets.len().next_multiple_of(TASK_GROUP_SIZE);
        self.meshlets.resize_with(padded, Meshlet::default);
        self.meshlets
    }

    fn local_index(&mut self, vertex: u32) -> u8 {
        let slot = &mut self.local[vertex as usize];
        if *slot == NOT_PRESENT {
            *slot = self.current.vertices.len() as u8;
            self.current.vertices.push(vertex);
        }
        *slot
    }

    fn close_current(&mut self) {
        for &vertex in &self.current.vertices {
            self.local[vertex as usize] = NOT_PRESENT;
        }
        self.meshlets.push(std::mem::take(&mut self.current));
    }
}

/// Cluster an indexed triangle list and compute each meshlet's normal cone.
///
/// # Panics
///
/// Panics if `indices.len()` is not a multiple of three or an index is out
/// of range. [`Mesh`](crate::mesh::Mesh) guarantees neither happens.
pub fn build_meshlets(vertices: &[Vertex], indices: &[u32]) -> Vec<Meshlet> {
    assert!(
        indices.len() % 3 == 0,
        "meshlet builder: index count {} is not a multiple of 3",
        indices.len()
    );

    let mut builder = MeshletBuilder::new(vertices.len());
    for triangle in indices.chunks_exact(3) {
        builder.push_triangle([triangle[0], triangle[1], triangle[2]]);
    }

    let mut meshlets = builder.finish();
    for meshlet in meshlets.iter_mut().filter(|m| !m.is_empty()) {
        meshlet.cone = compute_cone(meshlet, vertices);
    }
    meshlets
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::mesh::generators::{generate_disjoint_triangles, generate_grid};

    fn strip(vertex_count: u32) -> (Vec<Vertex>, Vec<u32>) {
        let vertices = (0..vertex_count)
            .map(|i| Vertex::at([i as f32, (i % 2) as f32, 0.0]))
            .collect();
        let indices = (0..vertex_count - 2).flat_map(|i| [i, i + 1, i + 2]).collect();
        (vertices, indices)
    }

    fn assert_well_formed(meshlets: &[Meshlet]) {
        assert_eq!(meshlets.len() % TASK_GROUP_SIZE, 0);
        let first_padding = meshlets
            .iter()
            .position(Meshlet::is_empty)
            .unwrap_or(meshlets.len());
        for meshlet in &meshlets[..first_padding] {
            assert!((1..=MAX_VERTICES).contains(&meshlet.vertex_count()));
            assert!((1..=MAX_TRIANGLES).contains(&meshlet.triangle_count()));
            for triangle in &meshlet.triangles {
                assert!(triangle.iter().all(|&l| (l as usize) < meshlet.vertex_count()));
            }
        }
        for padding in &meshlets[first_padding..] {
            assert_eq!(padding.vertex_count(), 0);
            assert_eq!(padding.triangle_count(), 0);
        }
    }

    fn assert_covers(meshlets: &[Meshlet], indices: &[u32]) {
        let emitted: Vec<[u32; 3]> = meshlets.iter().flat_map(Meshlet::global_triangles).collect();
        let expected: Vec<[u32; 3]> = indices.chunks(3).map(|t| [t[0], t[1], t[2]]).collect();
        assert_eq!(emitted, expected);
    }

    #[test]
    fn test_two_triangles_single_meshlet() {
        let vertices = vec![
            Vertex::at([0.0, 0.0, 0.0]),
            Vertex::at([1.0, 0.0, 0.0]),
            Vertex::at([1.0, 1.0, 0.0]),
            Vertex::at([0.0, 1.0, 0.0]),
        ];
        let indices = [0, 1, 2, 2, 3, 0];

        let meshlets = build_meshlets(&vertices, &indices);

        assert_eq!(meshlets.len(), 32);
        assert_eq!(meshlets[0].vertex_count(), 4);
        assert_eq!(meshlets[0].triangle_count(), 2);
        assert_eq!(meshlets[0].vertices, vec![0, 1, 2, 3]);
        assert_eq!(meshlets[0].triangles, vec![[0, 1, 2], [2, 3, 0]]);
        assert!(meshlets[1..].iter().all(Meshlet::is_empty));
    }

    #[test]
    fn test_sixty_fifth_vertex_starts_new_meshlet() {
        // Each strip triangle after the first introduces exactly one vertex,
        // so triangle 62 is the one that brings in vertex 64 (the 65th).
        let (vertices, indices) = strip(80);
        let meshlets = build_meshlets(&vertices, &indices);

        assert_eq!(meshlets[0].vertex_count(), 64);
        assert_eq!(meshlets[0].triangle_count(), 62);
        assert_eq!(meshlets[1].global_triangles().next(), Some([62, 63, 64]));
        assert_eq!(meshlets[1].triangles[0], [0, 1, 2]);
        assert_eq!(meshlets[1].vertex_count(), 80 - 62);
        assert_well_formed(&meshlets);
        assert_covers(&meshlets, &indices);
    }

    #[test]
    fn test_exactly_sixty_four_vertices_fit() {
        let (vertices, indices) = strip(64);
        let meshlets = build_meshlets(&vertices, &indices);
        assert_eq!(meshlets[0].vertex_count(), 64);
        assert!(meshlets[1].is_empty());
    }

    #[test]
    fn test_triangle_limit() {
        // Shared vertices keep the vertex count low so only the triangle cap applies.
        let vertices = vec![Vertex::at([0.0; 3]); 3];
        let indices: Vec<u32> = (0..200).flat_map(|_| [0, 1, 2]).collect();

        let meshlets = build_meshlets(&vertices, &indices);

        assert_eq!(meshlets[0].triangle_count(), MAX_TRIANGLES);
        assert_eq!(meshlets[1].triangle_count(), 200 - MAX_TRIANGLES);
        assert_eq!(meshlets[1].vertices, vec![0, 1, 2]);
        assert!(meshlets[2].is_empty());
    }

    #[test]
    fn test_degenerate_triangle_counts_vertex_once() {
        let vertices = vec![Vertex::at([0.0; 3]); 2];
        let meshlets = build_meshlets(&vertices, &[0, 0, 1]);
        assert_eq!(meshlets[0].vertices, vec![0, 1]);
        assert_eq!(meshlets[0].triangles, vec![[0, 0, 1]]);
    }

    #[test]
    fn test_empty_input_produces_no_meshlets() {
        let meshlets = build_meshlets(&[], &[]);
        assert!(meshlets.is_empty());
    }

    #[test]
    fn test_local_map_cleared_between_meshlets() {
        // Vertex 0 appears in the first and the last triangle; after the split
        // it must be re-added to the second meshlet's vertex list.
        let (mut vertices, mut indices) = strip(70);
        vertices.push(Vertex::at([0.0; 3]));
        indices.extend_from_slice(&[0, 69, 70]);

        let meshlets = build_meshlets(&vertices, &indices);

        assert!(meshlets[1].vertices.contains(&0));
        assert_covers(&meshlets, &indices);
    }

    #[rstest]
    #[case::one_meshlet(1)]
    #[case::exact_group(32 * 21)]
    #[case::many_groups(33 * 21)]
    fn test_disjoint_triangles(#[case] triangles: u32) {
        // 21 disjoint triangles = 63 vertices, the most that fit in one meshlet.
        let soup = generate_disjoint_triangles(triangles);
        let indices: Vec<u32> = (0..soup.len() as u32).collect();

        let meshlets = build_meshlets(&soup, &indices);

        let filled = meshlets.iter().filter(|m| !m.is_empty()).count();
        assert_eq!(filled, (triangles as usize).div_ceil(21));
        assert_well_formed(&meshlets);
        assert_covers(&meshlets, &indices);
    }

    #[rstest]
    #[case::small(3)]
    #[case::medium(16)]
    #[case::large(64)]
    fn test_grid_properties(#[case] cells: u32) {
        let mesh = generate_grid(cells);
        let meshlets = build_meshlets(mesh.vertices(), mesh.indices());
        assert_well_formed(&meshlets);
        assert_covers(&meshlets, mesh.indices());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_index_panics() {
        let vertices = vec![Vertex::default(); 3];
        build_meshlets(&vertices, &[0, 1, 3]);
    }

    #[test]
    #[should_panic(expected = "not a multiple of 3")]
    fn test_partial_triangle_panics() {
        let vertices = vec![Vertex::default(); 3];
        build_meshlets(&vertices, &[0, 1]);
    }
}
