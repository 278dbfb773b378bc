//! Device-local mesh buffers.

use std::borrow::Cow;

use ash::vk;
use yosemite_core::mesh::Mesh;
use yosemite_core::meshlet::pack_meshlets;

use super::allocator::{ResourceAllocator, UploadContext};
use super::buffer::Buffer;
use crate::error::{GraphicsError, GraphicsResult};
use crate::scheduler::DrawPathKind;

/// What a mesh buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRole {
    Vertices,
    Indices,
    Meshlets,
}

/// Bytes destined for one device-local buffer.
#[derive(Debug)]
pub struct MeshPayload<'a> {
    pub role: PayloadRole,
    pub bytes: Cow<'a, [u8]>,
    pub usage: vk::BufferUsageFlags,
    /// Number of vertices, indices or meshlets in `bytes`.
    pub count: u32,
}

/// The buffers a draw path needs, in upload order.
///
/// - Vertex: the expanded triangle soup
/// - Indexed: unique vertices and the index list
/// - Clusters: unique vertices and the packed meshlets
pub fn mesh_payloads(mesh: &Mesh, path: DrawPathKind) -> Vec<MeshPayload<'_>> {
    let unique_vertices = || MeshPayload {
        role: PayloadRole::Vertices,
        bytes: Cow::Borrowed(bytemuck::cast_slice(mesh.vertices())),
        usage: vk::BufferUsageFlags::STORAGE_BUFFER,
        count: mesh.vertices().len() as u32,
    };

    match path {
        DrawPathKind::Vertex => {
            let soup = mesh.unindexed_vertices();
            vec![MeshPayload {
                role: PayloadRole::Vertices,
                count: soup.len() as u32,
                bytes: Cow::Owned(bytemuck::cast_slice(&soup).to_vec()),
                usage: vk::BufferUsageFlags::STORAGE_BUFFER,
            }]
        }
        DrawPathKind::Indexed => vec![
            unique_vertices(),
            MeshPayload {
                role: PayloadRole::Indices,
                bytes: Cow::Borrowed(bytemuck::cast_slice(mesh.indices())),
                usage: vk::BufferUsageFlags::INDEX_BUFFER,
                count: mesh.indices().len() as u32,
            },
        ],
        DrawPathKind::Clusters => {
            let packed = pack_meshlets(mesh.meshlets());
            vec![
                unique_vertices(),
                MeshPayload {
                    role: PayloadRole::Meshlets,
                    count: packed.len() as u32,
                    bytes: Cow::Owned(bytemuck::cast_slice(&packed).to_vec()),
                    usage: vk::BufferUsageFlags::STORAGE_BUFFER,
                },
            ]
        }
    }
}

/// Mesh data resident in device-local memory.
#[derive(Debug)]
pub struct GpuMesh {
    pub vertices: Buffer,
    pub indices: Option<Buffer>,
    pub meshlets: Option<Buffer>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub meshlet_count: u32,
}

impl GpuMesh {
    /// Upload the buffers `path` reads, through one shared staging buffer.
    pub fn upload(
        allocator: &ResourceAllocator,
        context: &UploadContext,
        mesh: &Mesh,
        path: DrawPathKind,
    ) -> GraphicsResult<Self> {
        let payloads = mesh_payloads(mesh, path);
        let staging_size = payloads
            .iter()
            .map(|p| p.bytes.len() as vk::DeviceSize)
            .max()
            .unwrap_or(0);

        let mut staging = allocator.create_buffer(
            staging_size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let mut uploaded: Vec<(PayloadRole, u32, Buffer)> = Vec::with_capacity(payloads.len());
        let result = payloads.iter().try_for_each(|payload| -> GraphicsResult<()> {
            let buffer = upload_payload(allocator, context, &mut staging, payload)?;
            uploaded.push((payload.role, payload.count, buffer));
            Ok(())
        });

        allocator.destroy_buffer(staging);

        if let Err(e) = result {
            for (_, _, buffer) in uploaded {
                allocator.destroy_buffer(buffer);
            }
            return Err(e);
        }

        let (mut vertex_count, mut index_count, mut meshlet_count) = (0, 0, 0);
        let mut vertices = None;
        let mut indices = None;
        let mut meshlets = None;
        for (role, count, buffer) in uploaded {
            match role {
                PayloadRole::Vertices => {
                    vertex_count = count;
                    vertices = Some(buffer);
                }
                PayloadRole::Indices => {
                    index_count = count;
                    indices = Some(buffer);
                }
                PayloadRole::Meshlets => {
                    meshlet_count = count;
                    meshlets = Some(buffer);
                }
            }
        }

        // Every path uploads a vertex payload first.
        let Some(vertices) = vertices else {
            for buffer in indices.into_iter().chain(meshlets) {
                allocator.destroy_buffer(buffer);
            }
            return Err(GraphicsError::InvalidParameter(
                "mesh has no vertex data".to_string(),
            ));
        };

        log::info!(
            "Uploaded mesh for {:?} path: {} vertices, {} indices, {} meshlets",
            path,
            vertex_count,
            index_count,
            meshlet_count
        );

        Ok(Self {
            vertices,
            indices,
            meshlets,
            vertex_count,
            index_count,
            meshlet_count,
        })
    }

    /// Release all buffers. The GPU must be idle.
    pub fn destroy(self, allocator: &ResourceAllocator) {
        allocator.destroy_buffer(self.vertices);
        for buffer in self.indices.into_iter().chain(self.meshlets) {
            allocator.destroy_buffer(buffer);
        }
    }
}

fn upload_payload(
    allocator: &ResourceAllocator,
    context: &UploadContext,
    staging: &mut Buffer,
    payload: &MeshPayload<'_>,
) -> GraphicsResult<Buffer> {
    let size = payload.bytes.len() as vk::DeviceSize;
    staging.write(0, &payload.bytes)?;

    let buffer = allocator.create_buffer(
        size,
        payload.usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    if let Err(e) = allocator.upload_buffer(context, staging, &buffer, size) {
        allocator.destroy_buffer(buffer);
        return Err(e);
    }
    Ok(buffer)
}
