//! GPU backend for the voxelizer.
//!
//! This crate provides the wgpu-based voxelization pipeline, including:
//! - Device/queue bootstrap ([`GpuContext`])
//! - Shared shader pipelines ([`VoxelizerResources`])
//! - Per-grid allocations ([`GridResources`]) and the fill/compact passes
//! - Indirect draw argument management with deferred counter sync
//! - The per-mesh orchestrator ([`Voxelization`])

pub mod compact_pass;
pub mod context;
pub mod draw_args;
pub mod error;
pub mod fill_pass;
pub mod grid_resources;
pub mod mesh;
pub mod resources;
pub mod voxelization;

pub use compact_pass::CompactPass;
pub use context::GpuContext;
pub use draw_args::{DrawArgs, DrawIndirectArgs, INSTANCE_COUNT_OFFSET};
pub use error::{RenderError, RenderResult};
pub use fill_pass::FillPass;
pub use grid_resources::{
    check_limits, GridResources, VoxelInstance, INSTANCE_STRIDE, OCCUPANCY_FORMAT,
    RASTER_TARGET_FORMAT,
};
pub use mesh::{generate_unit_cube, CubeMesh, CubeVertex, MeshVertex, VoxelMesh};
pub use resources::{
    CompactKernel, CompactUniforms, DrawUniforms, FillResources, FillUniforms,
    InstanceDrawResources, VoxelizerResources, COMPACT_GROUP_SIZE,
};
pub use voxelization::Voxelization;
