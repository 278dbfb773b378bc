//! Wavefront OBJ loading.
//!
//! Produces a triangle soup: three vertices per triangle, no sharing.
//! Polygons are fan-triangulated from their first corner. Deduplication is
//! left to [`prep`](super::prep).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::error::MeshError;
use super::vertex::Vertex;

/// Load an OBJ file from disk into a triangle soup.
pub fn load_obj(path: &Path) -> Result<Vec<Vertex>, MeshError> {
    let file = File::open(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_obj(&mut BufReader::new(file))
}

/// Parse OBJ text into a triangle soup. Material libraries are ignored.
pub fn parse_obj(reader: &mut impl BufRead) -> Result<Vec<Vertex>, MeshError> {
    let options = tobj::LoadOptions {
        single_index: false,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };

    let (models, _materials) =
        tobj::load_obj_buf(reader, &options, |_| Err(tobj::LoadError::OpenFileFailed))?;

    let mut soup = Vec::new();
    for model in &models {
        append_model(&model.mesh, &mut soup)?;
    }

    if soup.is_empty() {
        return Err(MeshError::Empty);
    }
    Ok(soup)
}

fn append_model(mesh: &tobj::Mesh, soup: &mut Vec<Vertex>) -> Result<(), MeshError> {
    let corner_count = mesh.indices.len();

    // tobj leaves face_arities empty when every face is a triangle.
    let arities: Box<dyn Iterator<Item = usize>> = if mesh.face_arities.is_empty() {
        Box::new(std::iter::repeat_n(3, corner_count / 3))
    } else {
        Box::new(mesh.face_arities.iter().map(|&arity| arity as usize))
    };

    let mut start = 0;
    for arity in arities {
        if arity >= 3 {
            for i in 1..arity - 1 {
                for corner in [start, start + i, start + i + 1] {
                    soup.push(corner_vertex(mesh, corner)?);
                }
            }
        }
        start += arity;
    }

    Ok(())
}

fn corner_vertex(mesh: &tobj::Mesh, corner: usize) -> Result<Vertex, MeshError> {
    let position = mesh.indices[corner];
    let position = read::<3>(&mesh.positions, position).ok_or(MeshError::MissingAttribute {
        attribute: "position",
        index: position,
    })?;

    let normal = match mesh.normal_indices.get(corner) {
        Some(&index) => read::<3>(&mesh.normals, index).ok_or(MeshError::MissingAttribute {
            attribute: "normal",
            index,
        })?,
        None => [0.0; 3],
    };

    let tex_coord = match mesh.texcoord_indices.get(corner) {
        Some(&index) => read::<2>(&mesh.texcoords, index).ok_or(MeshError::MissingAttribute {
            attribute: "texture coordinate",
            index,
        })?,
        None => [0.0; 2],
    };

    Ok(Vertex::new(position, normal, tex_coord))
}

fn read<const N: usize>(data: &[f32], index: u32) -> Option<[f32; N]> {
    let start = index as usize * N;
    data.get(start..start + N)?.try_into().ok()
}
