//! Core abstractions for voxelizer-rs.
//!
//! This crate holds everything about the voxelization pipeline that does not
//! touch the GPU:
//! - [`Aabb`] and [`GridLayout`]: sizing an occupancy grid from a mesh
//!   bounding box and a target resolution
//! - [`projection`]: per-axis orthographic matrices for the three-axis
//!   rasterization fill
//! - [`dispatch_groups`]: compute dispatch sizing
//! - [`Lifecycle`]: the pipeline state machine (enable / parameter change /
//!   allocation failure / disable)
//! - [`VoxelizationSettings`]: clamped, observable configuration

pub mod aabb;
pub mod dispatch;
pub mod error;
pub mod grid;
pub mod lifecycle;
pub mod projection;
pub mod settings;

pub use aabb::Aabb;
pub use dispatch::dispatch_groups;
pub use error::{Result, VoxelizerError};
pub use grid::GridLayout;
pub use lifecycle::{CyclePlan, Lifecycle, PipelineState};
pub use projection::{fill_view_proj, fill_viewport, Axis};
pub use settings::{VoxelizationSettings, MAX_RESOLUTION, MIN_VOLUME_SCALE};

// Re-export the math types used throughout the public API.
pub use glam::{Mat4, UVec3, Vec3, Vec4};
