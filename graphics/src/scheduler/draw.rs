//! Draw path strategies.
//!
//! A draw path is chosen once at startup and records the same draw every
//! frame. All three read vertices from a storage buffer bound through push
//! descriptors.

use ash::vk;
use yosemite_core::meshlet::{MAX_TRIANGLES, MAX_VERTICES, TASK_GROUP_SIZE};

use super::recorder::CommandRecorder;
use crate::device::DeviceCapabilities;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::GpuMesh;

/// Which draw path to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPathKind {
    /// Non-indexed triangle soup.
    Vertex,
    /// Unique vertices plus an index buffer.
    Indexed,
    /// Task and mesh shaders over packed meshlets.
    Clusters,
}

/// Choose the draw path for a device.
///
/// Without a preference, clusters are used whenever the device can run the
/// meshlet pipeline, and indexed drawing otherwise. Forcing clusters on a
/// device without mesh shading is an error.
pub fn select_draw_path(
    preference: Option<DrawPathKind>,
    capabilities: &DeviceCapabilities,
) -> GraphicsResult<DrawPathKind> {
    let clusters_supported = capabilities.supports_meshlets(MAX_VERTICES, MAX_TRIANGLES);

    match preference {
        Some(DrawPathKind::Clusters) if !clusters_supported => {
            Err(GraphicsError::FeatureNotSupported(format!(
                "{} does not support mesh shaders with {} vertices and {} triangles per meshlet",
                capabilities.name, MAX_VERTICES, MAX_TRIANGLES
            )))
        }
        Some(kind) => Ok(kind),
        None if clusters_supported => Ok(DrawPathKind::Clusters),
        None => Ok(DrawPathKind::Indexed),
    }
}

/// Pipeline handles a draw path binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPipelineHandles {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

/// Records the draw for one frame inside an active dynamic rendering scope.
pub trait DrawPath {
    fn kind(&self) -> DrawPathKind;

    fn record(&self, recorder: &mut dyn CommandRecorder);
}

/// `draw(vertex_count)` over an unindexed triangle soup.
#[derive(Debug, Clone)]
pub struct VertexDraw {
    handles: DrawPipelineHandles,
    vertices: vk::Buffer,
    vertex_count: u32,
}

impl DrawPath for VertexDraw {
    fn kind(&self) -> DrawPathKind {
        DrawPathKind::Vertex
    }

    fn record(&self, recorder: &mut dyn CommandRecorder) {
        recorder.bind_pipeline(self.handles.pipeline);
        recorder.push_storage_buffers(self.handles.layout, &[self.vertices]);
        recorder.draw(self.vertex_count);
    }
}

/// `draw_indexed(index_count)` over unique vertices.
#[derive(Debug, Clone)]
pub struct IndexedDraw {
    handles: DrawPipelineHandles,
    vertices: vk::Buffer,
    indices: vk::Buffer,
    index_count: u32,
}

impl DrawPath for IndexedDraw {
    fn kind(&self) -> DrawPathKind {
        DrawPathKind::Indexed
    }

    fn record(&self, recorder: &mut dyn CommandRecorder) {
        recorder.bind_pipeline(self.handles.pipeline);
        recorder.push_storage_buffers(self.handles.layout, &[self.vertices]);
        recorder.bind_index_buffer(self.indices);
        recorder.draw_indexed(self.index_count);
    }
}

/// One task workgroup per 32 meshlets.
#[derive(Debug, Clone)]
pub struct ClusterDraw {
    handles: DrawPipelineHandles,
    vertices: vk::Buffer,
    meshlets: vk::Buffer,
    meshlet_count: u32,
}

impl ClusterDraw {
    pub fn group_count(&self) -> u32 {
        self.meshlet_count / TASK_GROUP_SIZE as u32
    }
}

impl DrawPath for ClusterDraw {
    fn kind(&self) -> DrawPathKind {
        DrawPathKind::Clusters
    }

    fn record(&self, recorder: &mut dyn CommandRecorder) {
        recorder.bind_pipeline(self.handles.pipeline);
        recorder.push_storage_buffers(self.handles.layout, &[self.vertices, self.meshlets]);
        recorder.draw_mesh_tasks(self.group_count());
    }
}

/// Build the draw path for `kind` over buffers uploaded for the same kind.
pub fn create_draw_path(
    kind: DrawPathKind,
    handles: DrawPipelineHandles,
    mesh: &GpuMesh,
) -> GraphicsResult<Box<dyn DrawPath>> {
    let vertices = mesh.vertices.handle();
    let missing = |what: &str| {
        GraphicsError::InvalidParameter(format!("{kind:?} draw path needs a {what} buffer"))
    };

    let path: Box<dyn DrawPath> = match kind {
        DrawPathKind::Vertex => Box::new(VertexDraw {
            handles,
            vertices,
            vertex_count: mesh.vertex_count,
        }),
        DrawPathKind::Indexed => Box::new(IndexedDraw {
            handles,
            vertices,
            indices: mesh.indices.as_ref().ok_or_else(|| missing("index"))?.handle(),
            index_count: mesh.index_count,
        }),
        DrawPathKind::Clusters => {
            if mesh.meshlet_count as usize % TASK_GROUP_SIZE != 0 {
                return Err(GraphicsError::InvalidParameter(format!(
                    "meshlet count {} is not a multiple of {}",
                    mesh.meshlet_count, TASK_GROUP_SIZE
                )));
            }
            Box::new(ClusterDraw {
                handles,
                vertices,
                meshlets: mesh.meshlets.as_ref().ok_or_else(|| missing("meshlet"))?.handle(),
                meshlet_count: mesh.meshlet_count,
            })
        }
    };

    log::debug!("Using {:?} draw path", path.kind());
    Ok(path)
}
