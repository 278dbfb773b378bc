use glam::Vec3;

use super::Meshlet;
use crate::mesh::Vertex;

/// Cone bounding the face normals of a meshlet.
///
/// For a view direction `v` (pointing from the eye into the scene) the whole
/// meshlet faces away from the viewer when `dot(axis, v) > cutoff`. A zero
/// axis never satisfies the test, so meshlets without a usable cone are
/// always drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalCone {
    pub axis: [f32; 3],
    pub cutoff: f32,
}

impl NormalCone {
    /// Whether every triangle in the meshlet faces away from `view`.
    pub fn is_backfacing(&self, view: [f32; 3]) -> bool {
        Vec3::from(self.axis).dot(Vec3::from(view)) > self.cutoff
    }
}

/// Compute the normal cone of a meshlet from its triangle geometry.
///
/// The axis is the normalized sum of unit face normals. The cutoff is the
/// sine of the widest angle between the axis and any face normal, or 1 when
/// that angle reaches 90 degrees. Zero-area triangles are ignored.
pub fn compute_cone(meshlet: &Meshlet, vertices: &[Vertex]) -> NormalCone {
    let normals: Vec<Vec3> = meshlet
        .global_triangles()
        .filter_map(|[a, b, c]| {
            let p0 = Vec3::from(vertices[a as usize].position);
            let p1 = Vec3::from(vertices[b as usize].position);
            let p2 = Vec3::from(vertices[c as usize].position);
            (p1 - p0).cross(p2 - p0).try_normalize()
        })
        .collect();

    let Some(axis) = normals.iter().copied().sum::<Vec3>().try_normalize() else {
        return NormalCone::default();
    };

    let min_dot = normals
        .iter()
        .map(|n| n.dot(axis))
        .fold(1.0_f32, f32::min);

    let cutoff = if min_dot <= 0.0 {
        1.0
    } else {
        (1.0 - min_dot * min_dot).sqrt()
    };

    NormalCone {
        axis: axis.to_array(),
        cutoff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meshlet(triangles: Vec<[u8; 3]>, vertex_count: u32) -> Meshlet {
        Meshlet {
            vertices: (0..vertex_count).collect(),
            triangles,
            cone: NormalCone::default(),
        }
    }

    fn quad() -> Vec<Vertex> {
        vec![
            Vertex::at([0.0, 0.0, 0.0]),
            Vertex::at([1.0, 0.0, 0.0]),
            Vertex::at([1.0, 1.0, 0.0]),
            Vertex::at([0.0, 1.0, 0.0]),
        ]
    }

    #[test]
    fn test_flat_meshlet_cone() {
        let cone = compute_cone(&meshlet(vec![[0, 1, 2], [2, 3, 0]], 4), &quad());
        assert_eq!(cone.axis, [0.0, 0.0, 1.0]);
        assert!(cone.cutoff.abs() < 1e-6);
        // Faces +Z: seen from behind when looking down +Z, visible from the front.
        assert!(cone.is_backfacing([0.0, 0.0, 1.0]));
        assert!(!cone.is_backfacing([0.0, 0.0, -1.0]));
    }

    #[test]
    fn test_opposed_triangles_never_culled() {
        let cone = compute_cone(&meshlet(vec![[0, 1, 2], [0, 2, 1]], 4), &quad());
        assert_eq!(cone, NormalCone::default());
        assert!(!cone.is_backfacing([0.0, 0.0, 1.0]));
        assert!(!cone.is_backfacing([0.0, 0.0, -1.0]));
    }

    fn faces_z_x_negz() -> Vec<Vertex> {
        vec![
            // +Z
            Vertex::at([0.0, 0.0, 0.0]),
            Vertex::at([1.0, 0.0, 0.0]),
            Vertex::at([0.0, 1.0, 0.0]),
            // +X
            Vertex::at([0.0, 0.0, -1.0]),
            Vertex::at([0.0, 1.0, 0.0]),
            Vertex::at([0.0, 0.0, 0.0]),
            // -Z
            Vertex::at([0.0, 0.0, 0.0]),
            Vertex::at([0.0, 1.0, 0.0]),
            Vertex::at([1.0, 0.0, 0.0]),
        ]
    }

    #[test]
    fn test_right_angle_cone() {
        let cone = compute_cone(&meshlet(vec![[0, 1, 2], [3, 4, 5]], 6), &faces_z_x_negz());
        assert!(cone.cutoff > 0.7 && cone.cutoff < 0.71);
        assert!(!cone.is_backfacing([0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_hemisphere_cone_disables_culling() {
        let cone = compute_cone(
            &meshlet(vec![[0, 1, 2], [3, 4, 5], [6, 7, 8]], 9),
            &faces_z_x_negz(),
        );
        assert_eq!(cone.cutoff, 1.0);
        assert!(!cone.is_backfacing([1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_degenerate_triangles_ignored() {
        let vertices = vec![Vertex::at([0.0; 3]); 3];
        let cone = compute_cone(&meshlet(vec![[0, 1, 2]], 3), &vertices);
        assert_eq!(cone, NormalCone::default());
    }
}
