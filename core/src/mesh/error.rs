//! Error types for mesh loading and validation.

use std::path::PathBuf;

/// Errors that can occur while loading or validating a mesh.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// The mesh file could not be opened.
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The OBJ parser rejected the input.
    #[error("OBJ parse error: {0}")]
    Obj(#[from] tobj::LoadError),
    /// The file contained no triangles.
    #[error("mesh contains no triangles")]
    Empty,
    /// The index list length is not a multiple of three.
    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),
    /// An index refers past the end of the vertex list.
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
    /// A face references a position, normal or texture coordinate that does not exist.
    #[error("face references missing {attribute} {index}")]
    MissingAttribute { attribute: &'static str, index: u32 },
}
