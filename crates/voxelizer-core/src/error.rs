//! Error types for voxelizer-rs.

use thiserror::Error;

/// The main error type for core voxelizer operations.
#[derive(Error, Debug)]
pub enum VoxelizerError {
    /// A bounding box with a non-finite or inverted extent was supplied.
    #[error("invalid bounding box: min {min:?} max {max:?}")]
    InvalidBounds {
        min: [f32; 3],
        max: [f32; 3],
    },
}

/// A specialized Result type for core voxelizer operations.
pub type Result<T> = std::result::Result<T, VoxelizerError>;
