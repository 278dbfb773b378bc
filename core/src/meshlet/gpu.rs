//! GPU meshlet record.

use super::{MAX_TRIANGLES, MAX_VERTICES, Meshlet};

/// Number of `u32` words holding the packed triangle indices.
pub const PACKED_INDEX_WORDS: usize = MAX_TRIANGLES * 3 / 4;

/// Meshlet as read by `meshlet.task` and `meshlet.mesh` (std430).
///
/// Triangle corners are local `u8` indices packed four per word, low byte
/// first. The two count bytes share one word in the shader
/// (`counts & 0xff` is the triangle count, `counts >> 8` the vertex count).
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuMeshlet {
    /// Cone axis in `xyz`, cutoff in `w`.
    pub cone: [f32; 4],
    pub vertices: [u32; MAX_VERTICES],
    pub indices: [u32; PACKED_INDEX_WORDS],
    pub triangle_count: u8,
    pub vertex_count: u8,
    pub _padding: [u8; 10],
}

impl GpuMeshlet {
    /// Size of one record in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Local index of triangle corner `corner` (0-based across all triangles).
    pub fn corner(&self, corner: usize) -> u8 {
        (self.indices[corner / 4] >> (8 * (corner % 4))) as u8
    }
}

impl From<&Meshlet> for GpuMeshlet {
    fn from(meshlet: &Meshlet) -> Self {
        let mut gpu: GpuMeshlet = bytemuck::Zeroable::zeroed();

        let [x, y, z] = meshlet.cone.axis;
        gpu.cone = [x, y, z, meshlet.cone.cutoff];
        gpu.vertices[..meshlet.vertices.len()].copy_from_slice(&meshlet.vertices);

        for (corner, &local) in meshlet.triangles.iter().flatten().enumerate() {
            gpu.indices[corner / 4] |= (local as u32) << (8 * (corner % 4));
        }

        gpu.triangle_count = meshlet.triangles.len() as u8;
        gpu.vertex_count = meshlet.vertices.len() as u8;
        gpu
    }
}

/// Convert a meshlet list into GPU records.
pub fn pack_meshlets(meshlets: &[Meshlet]) -> Vec<GpuMeshlet> {
    meshlets.iter().map(GpuMeshlet::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshlet::NormalCone;

    #[test]
    fn test_gpu_meshlet_layout() {
        assert_eq!(GpuMeshlet::SIZE, 656);
        assert_eq!(GpuMeshlet::SIZE % 16, 0);
        assert_eq!(PACKED_INDEX_WORDS, 93);
        assert_eq!(std::mem::offset_of!(GpuMeshlet, vertices), 16);
        assert_eq!(std::mem::offset_of!(GpuMeshlet, indices), 272);
        assert_eq!(std::mem::offset_of!(GpuMeshlet, triangle_count), 644);
        assert_eq!(std::mem::offset_of!(GpuMeshlet, vertex_count), 645);
    }

    #[test]
    fn test_pack_meshlet() {
        let meshlet = Meshlet {
            vertices: vec![10, 11, 12, 13],
            triangles: vec![[0, 1, 2], [2, 3, 0]],
            cone: NormalCone {
                axis: [0.0, 0.0, 1.0],
                cutoff: 0.5,
            },
        };

        let gpu = GpuMeshlet::from(&meshlet);

        assert_eq!(gpu.cone, [0.0, 0.0, 1.0, 0.5]);
        assert_eq!(&gpu.vertices[..4], &[10, 11, 12, 13]);
        assert_eq!(gpu.vertices[4], 0);
        assert_eq!(gpu.indices[0], 0x0202_0100);
        assert_eq!(gpu.indices[1], 0x0000_0003);
        let corners: Vec<u8> = (0..6).map(|c| gpu.corner(c)).collect();
        assert_eq!(corners, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(gpu.triangle_count, 2);
        assert_eq!(gpu.vertex_count, 4);
    }

    #[test]
    fn test_pack_full_meshlet() {
        let meshlet = Meshlet {
            vertices: (0..MAX_VERTICES as u32).collect(),
            triangles: (0..MAX_TRIANGLES)
                .map(|t| [(t % 64) as u8, ((t + 1) % 64) as u8, 63])
                .collect(),
            cone: NormalCone::default(),
        };

        let gpu = GpuMeshlet::from(&meshlet);

        assert_eq!(gpu.triangle_count as usize, MAX_TRIANGLES);
        assert_eq!(gpu.vertex_count as usize, MAX_VERTICES);
        assert_eq!(gpu.corner(MAX_TRIANGLES * 3 - 1), 63);
        assert_eq!(gpu.corner(3 * 100), 100 % 64);
    }

    #[test]
    fn test_pack_padding_meshlet_is_zero() {
        let gpu = GpuMeshlet::from(&Meshlet::default());
        assert!(bytemuck::bytes_of(&gpu).iter().all(|&b| b == 0));
    }
}
