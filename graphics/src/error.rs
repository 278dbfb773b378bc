//! Graphics error types.

use ash::vk;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphicsError {
    /// A Vulkan call returned an error code.
    #[error("{operation} failed: {result:?}")]
    Driver {
        operation: &'static str,
        result: vk::Result,
    },
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// No memory type satisfies a resource's requirements.
    #[error("no memory type matches type bits {type_bits:#x} with flags {flags:?}")]
    NoCompatibleMemoryType {
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    },
    /// A fixed-capacity collection would overflow.
    #[error("{what}: {requested} exceeds capacity {capacity}")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        capacity: usize,
    },
    /// A shader binary could not be read or is not valid SPIR-V.
    #[error("failed to load shader {path}: {reason}")]
    ShaderLoad { path: String, reason: String },
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result alias for graphics operations.
pub type GraphicsResult<T> = Result<T, GraphicsError>;

/// Attach the failing operation's name to a raw Vulkan result.
pub trait DriverError<T> {
    fn driver(self, operation: &'static str) -> GraphicsResult<T>;
}

impl<T> DriverError<T> for Result<T, vk::Result> {
    fn driver(self, operation: &'static str) -> GraphicsResult<T> {
        self.map_err(|result| GraphicsError::Driver { operation, result })
    }
}
