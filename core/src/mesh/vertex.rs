/// Interleaved vertex consumed by every draw path.
///
/// Matches the `Vertex` struct in `shaders/mesh.h` (std430, 32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }

    /// Vertex with only a position; normal and texture coordinate are zero.
    pub const fn at(position: [f32; 3]) -> Self {
        Self::new(position, [0.0; 3], [0.0; 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(Vertex::SIZE, 32);
        assert_eq!(std::mem::align_of::<Vertex>(), 4);
    }

    #[test]
    fn test_vertex_byte_layout() {
        let v = Vertex::new([1.0, 2.0, 3.0], [0.0, 0.0, 1.0], [0.5, 0.25]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 0.0, 1.0, 0.5, 0.25]);
    }
}
