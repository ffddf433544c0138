//! voxelizer-rs: GPU surface voxelization for triangle meshes.
//!
//! The voxelizer rasterizes a triangle mesh from three orthogonal axes
//! into a 3D occupancy image, compacts the occupied cells into a dense
//! instance buffer with a compute kernel, and keeps an indirect draw
//! argument buffer in sync so the result renders without any CPU
//! readback.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxelizer_rs::*;
//!
//! fn main() -> RenderResult<()> {
//!     init();
//!     let ctx = create_context()?;
//!     let resources =
//!         VoxelizerResources::new(&ctx.device, wgpu::TextureFormat::Rgba8UnormSrgb, None);
//!
//!     let positions = vec![
//!         Vec3::new(0.0, 0.0, 0.0),
//!         Vec3::new(1.0, 0.0, 0.0),
//!         Vec3::new(0.0, 1.0, 0.0),
//!     ];
//!     let colors = vec![Vec3::ONE; positions.len()];
//!     let mesh = VoxelMesh::new(&ctx.device, "triangle", &positions, &colors, &[0, 1, 2])?;
//!
//!     let mut vox = Voxelization::new("triangle", VoxelizationSettings::new(64));
//!     vox.set_enabled(true);
//!
//!     // Per frame: tick while recording, end_frame after all other work.
//!     let mut encoder = ctx
//!         .device
//!         .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
//!     vox.tick(&ctx, &resources, Some(&mesh), &mut encoder)?;
//!     vox.end_frame(&mut encoder);
//!     ctx.queue.submit([encoder.finish()]);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! Each enabled [`Voxelization`] steps through a small lifecycle:
//!
//! - **Allocate** — size a [`GridLayout`] from the mesh bounds and the
//!   requested resolution, then create the grid's GPU resources
//! - **Fill** — rasterize the mesh once per axis, scattering into the
//!   occupancy image
//! - **Compact** — append every occupied cell to the instance buffer
//!   behind an atomic counter
//! - **Sync** — copy the counter into the indirect argument buffer at
//!   the frame boundary; draws pick it up the following frame

// Re-export core types
pub use voxelizer_core::{
    Aabb, Axis, CyclePlan, GridLayout, Lifecycle, Mat4, PipelineState, UVec3, Vec3, Vec4,
    VoxelizationSettings, VoxelizerError, MAX_RESOLUTION, MIN_VOLUME_SCALE,
};

// Re-export render types
pub use voxelizer_render::{
    CubeMesh, DrawIndirectArgs, GpuContext, GridResources, RenderError, RenderResult,
    VoxelInstance, VoxelMesh, Voxelization, VoxelizerResources, OCCUPANCY_FORMAT,
};

/// Initializes logging. Safe to call more than once.
pub fn init() {
    let _ = env_logger::try_init();
    log::info!("voxelizer-rs initialized");
}

/// Creates a headless GPU context on the first available adapter.
///
/// # Errors
/// Returns [`RenderError::AdapterCreationFailed`] when no compatible
/// adapter exists, or a device error if creation fails.
pub fn create_context() -> RenderResult<GpuContext> {
    pollster::block_on(GpuContext::new_headless())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_usable() {
        let settings = VoxelizationSettings::default();
        assert!(settings.resolution() >= 1);
        assert!(settings.volume_scale() >= MIN_VOLUME_SCALE);
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
