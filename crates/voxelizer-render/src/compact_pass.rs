//! The compaction pass.
//!
//! Scans the occupancy image and atomically appends one record per filled
//! voxel to the instance buffer. The counter is reset on the GPU timeline,
//! so fill → reset → dispatch ordering is enforced by command order, not
//! CPU waits.

use wgpu::util::DeviceExt;

use voxelizer_core::dispatch_groups;

use crate::grid_resources::GridResources;
use crate::resources::{CompactKernel, CompactUniforms};

/// Per-grid recording state of the compaction pass.
pub struct CompactPass {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    groups: glam::UVec3,
}

impl CompactPass {
    /// Creates the uniforms and bind group for one grid. The
    /// index-to-position transform is derived once here and uploaded as a
    /// single matrix.
    #[must_use]
    pub fn new(device: &wgpu::Device, kernel: &CompactKernel, grid: &GridResources) -> Self {
        let layout = &grid.layout;
        let dims = layout.dims();
        let uniforms = CompactUniforms {
            index_to_position: layout.index_to_position().to_cols_array_2d(),
            dims: [dims.x, dims.y, dims.z, 0],
        };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("compact uniforms"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("compact bind group"),
            layout: &kernel.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&grid.occupancy_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: grid.counter.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: grid.instances.as_entire_binding(),
                },
            ],
        });

        Self {
            uniform_buffer,
            bind_group,
            groups: dispatch_groups(dims, kernel.group_size),
        }
    }

    /// Records counter reset + dispatch into `encoder`.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        kernel: &CompactKernel,
        grid: &GridResources,
    ) {
        encoder.clear_buffer(&grid.counter, 0, None);

        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("find filled voxels"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&kernel.pipeline);
        cpass.set_bind_group(0, &self.bind_group, &[]);
        cpass.dispatch_workgroups(self.groups.x, self.groups.y, self.groups.z);
    }

    /// The workgroup counts this pass dispatches.
    #[must_use]
    pub fn groups(&self) -> glam::UVec3 {
        self.groups
    }

    /// The uniform buffer holding the index-to-position transform.
    #[must_use]
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniform_buffer
    }
}
