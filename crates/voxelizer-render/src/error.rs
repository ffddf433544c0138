//! Rendering error types.

use thiserror::Error;

/// Errors that can occur during GPU voxelization.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// A grid allocation would exceed the device's limits. Fatal to the
    /// owning instance.
    #[error("grid allocation exceeds device limits: {0}")]
    AllocationTooLarge(String),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// Mismatched mesh attribute lengths.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The supplied mesh has no vertices to derive bounds from.
    #[error("mesh is empty")]
    EmptyMesh,
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
