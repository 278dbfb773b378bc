//! GPU resources.
//!
//! - [`ResourceAllocator`] - creates memory-backed buffers and uploads data
//! - [`Buffer`] - a buffer plus its dedicated memory allocation
//! - [`GpuMesh`] - the device-local buffers a draw path reads
//!
//! Every buffer owns exactly one `VkDeviceMemory` allocation. Buffers are
//! destroyed explicitly through the allocator that created them, after the
//! GPU has finished with them.

mod allocator;
mod buffer;
mod mesh;

pub use allocator::{ResourceAllocator, UploadContext, select_memory_type};
pub use buffer::Buffer;
pub use mesh::{GpuMesh, MeshPayload, PayloadRole, mesh_payloads};
