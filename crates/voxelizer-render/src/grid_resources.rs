//! Per-instance GPU allocations for one voxel grid.
//!
//! A grid is never resized in place: a new [`GridResources`] always
//! replaces the old one, and the old one's resources are released first.

use voxelizer_core::{fill_viewport, GridLayout};

use crate::error::{RenderError, RenderResult};

/// One compacted occupied-voxel record: cell-center position and color.
///
/// Layout must match the WGSL `VoxelInstance` struct exactly (two vec4s).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VoxelInstance {
    /// Physical cell-center position (w unused).
    pub center: [f32; 4],
    /// Linear RGBA color sampled from the occupancy image.
    pub color: [f32; 4],
}

/// Byte stride of one [`VoxelInstance`] record.
pub const INSTANCE_STRIDE: u64 = std::mem::size_of::<VoxelInstance>() as u64;

/// Texture format of the occupancy image: RGB = accumulated color,
/// A = occupancy flag. Matches the original RGBA-float image.
pub const OCCUPANCY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Format of the throwaway color attachment the fill pass renders into.
pub const RASTER_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Validates a grid layout against device limits before any allocation.
///
/// wgpu buffer and texture creation cannot report out-of-memory
/// synchronously, so allocation failure is made observable here: a layout
/// that exceeds the limits is rejected up front and nothing is created.
///
/// # Errors
/// Returns [`RenderError::AllocationTooLarge`] naming the violated limit.
pub fn check_limits(layout: &GridLayout, limits: &wgpu::Limits) -> RenderResult<()> {
    let dims = layout.dims();
    let max_dim = dims.max_element();
    if max_dim > limits.max_texture_dimension_3d {
        return Err(RenderError::AllocationTooLarge(format!(
            "occupancy image dimension {max_dim} exceeds max_texture_dimension_3d {}",
            limits.max_texture_dimension_3d
        )));
    }
    if fill_viewport(layout) > limits.max_texture_dimension_2d {
        return Err(RenderError::AllocationTooLarge(format!(
            "fill viewport {} exceeds max_texture_dimension_2d {}",
            fill_viewport(layout),
            limits.max_texture_dimension_2d
        )));
    }
    let instance_bytes = layout.cell_count() * INSTANCE_STRIDE;
    let max_binding = u64::min(
        limits.max_buffer_size,
        u64::from(limits.max_storage_buffer_binding_size),
    );
    if instance_bytes > max_binding {
        return Err(RenderError::AllocationTooLarge(format!(
            "instance buffer of {instance_bytes} bytes exceeds storage limit {max_binding}"
        )));
    }
    Ok(())
}

/// GPU resources backing one voxel grid.
pub struct GridResources {
    /// The sizing this grid was allocated for.
    pub layout: GridLayout,
    /// 3D occupancy image.
    pub occupancy: wgpu::Texture,
    /// View of the occupancy image.
    pub occupancy_view: wgpu::TextureView,
    /// Compacted occupied-voxel records, worst-case `cell_count` entries.
    pub instances: wgpu::Buffer,
    /// Atomic append counter (one u32).
    pub counter: wgpu::Buffer,
    /// Throwaway color attachment for the fill pass, `viewport` squared.
    pub raster_target_view: wgpu::TextureView,
    raster_target: wgpu::Texture,
    released: bool,
}

impl GridResources {
    /// Allocates all resources for a grid layout.
    ///
    /// # Errors
    /// Returns [`RenderError::AllocationTooLarge`] without allocating
    /// anything when the layout exceeds device limits; the orchestrator
    /// treats this as fatal to the instance.
    pub fn new(device: &wgpu::Device, layout: GridLayout, label: &str) -> RenderResult<Self> {
        check_limits(&layout, &device.limits())?;

        let dims = layout.dims();
        log::debug!(
            "allocating voxel grid '{label}': {}x{}x{} cells, voxel size {}",
            dims.x,
            dims.y,
            dims.z,
            layout.voxel_size()
        );

        let occupancy = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: dims.x,
                height: dims.y,
                depth_or_array_layers: dims.z,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: OCCUPANCY_FORMAT,
            // COPY_DST is required by the clear at the start of each fill
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let occupancy_view = occupancy.create_view(&wgpu::TextureViewDescriptor::default());

        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} instances")),
            size: layout.cell_count() * INSTANCE_STRIDE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let counter = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} counter")),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let viewport = fill_viewport(&layout);
        let raster_target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label} raster target")),
            size: wgpu::Extent3d {
                width: viewport,
                height: viewport,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RASTER_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let raster_target_view = raster_target.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            layout,
            occupancy,
            occupancy_view,
            instances,
            counter,
            raster_target_view,
            raster_target,
            released: false,
        })
    }

    /// Eagerly frees the GPU allocations. Idempotent; also runs on drop.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.occupancy.destroy();
        self.instances.destroy();
        self.counter.destroy();
        self.raster_target.destroy();
        self.released = true;
    }
}

impl Drop for GridResources {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use voxelizer_core::Aabb;

    fn layout(extent: f32, resolution: u32) -> GridLayout {
        GridLayout::new(
            &Aabb::from_center_size(Vec3::ZERO, Vec3::splat(extent)),
            resolution,
        )
    }

    #[test]
    fn test_voxel_instance_layout() {
        assert_eq!(std::mem::size_of::<VoxelInstance>(), 32);
        assert_eq!(INSTANCE_STRIDE, 32);
        // color follows center directly, no implicit padding
        assert_eq!(std::mem::offset_of!(VoxelInstance, center), 0);
        assert_eq!(std::mem::offset_of!(VoxelInstance, color), 16);
    }

    #[test]
    fn test_limits_accept_modest_grid() {
        let limits = wgpu::Limits::default();
        assert!(check_limits(&layout(8.0, 64), &limits).is_ok());
    }

    #[test]
    fn test_limits_reject_oversized_texture() {
        let mut limits = wgpu::Limits::default();
        limits.max_texture_dimension_3d = 64;
        let err = check_limits(&layout(8.0, 128), &limits).unwrap_err();
        assert!(matches!(err, RenderError::AllocationTooLarge(_)));
    }

    #[test]
    fn test_limits_reject_oversized_instance_buffer() {
        let mut limits = wgpu::Limits::default();
        limits.max_storage_buffer_binding_size = 1024;
        let err = check_limits(&layout(8.0, 32), &limits).unwrap_err();
        assert!(matches!(err, RenderError::AllocationTooLarge(_)));
    }
}
