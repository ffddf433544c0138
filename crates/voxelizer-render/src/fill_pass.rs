//! The rasterization fill pass.
//!
//! Marks every voxel the mesh surface intersects by rasterizing the mesh
//! three times, once per dominant axis, with scatter writes into the 3D
//! occupancy image. Everything is recorded into the caller's command
//! encoder so the pass composes with the rest of the frame; nothing is
//! submitted here.

use glam::Vec3;
use wgpu::util::DeviceExt;

use voxelizer_core::{fill_view_proj, Axis};

use crate::grid_resources::GridResources;
use crate::mesh::VoxelMesh;
use crate::resources::{FillResources, FillUniforms};

/// Per-grid recording state of the fill pass: one uniform buffer and bind
/// group per projection axis. The matrices depend only on the grid layout,
/// so they are computed once at allocation.
pub struct FillPass {
    uniform_buffers: [wgpu::Buffer; 3],
    bind_groups: [wgpu::BindGroup; 3],
}

impl FillPass {
    /// Creates the per-axis uniforms and bind groups for one grid.
    #[must_use]
    pub fn new(device: &wgpu::Device, fill: &FillResources, grid: &GridResources) -> Self {
        let layout = &grid.layout;
        let bounds = layout.bounds();
        let inv_size = layout
            .volume_size()
            .max(Vec3::splat(f32::EPSILON))
            .recip();
        let dims = layout.dims().as_vec3();

        let mut uniform_buffers = Vec::with_capacity(3);
        let mut bind_groups = Vec::with_capacity(3);
        for axis in Axis::ALL {
            let uniforms = FillUniforms {
                view_proj: fill_view_proj(axis, layout).to_cols_array_2d(),
                bounds_min: bounds.min.extend(0.0).to_array(),
                inv_size: inv_size.extend(0.0).to_array(),
                dims: dims.extend(0.0).to_array(),
            };
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("fill uniforms {axis:?}")),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("fill bind group {axis:?}")),
                layout: &fill.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&grid.occupancy_view),
                    },
                ],
            }));
            uniform_buffers.push(buffer);
        }

        let uniform_buffers: [wgpu::Buffer; 3] = uniform_buffers
            .try_into()
            .unwrap_or_else(|_| unreachable!("three axes"));
        let bind_groups: [wgpu::BindGroup; 3] = bind_groups
            .try_into()
            .unwrap_or_else(|_| unreachable!("three axes"));

        Self {
            uniform_buffers,
            bind_groups,
        }
    }

    /// Records the fill into `encoder`: reset the occupancy image, then one
    /// raster pass per axis. The union of the three passes conservatively
    /// covers every surface voxel regardless of local face orientation.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        fill: &FillResources,
        grid: &GridResources,
        mesh: &VoxelMesh,
    ) {
        encoder.clear_texture(&grid.occupancy, &wgpu::ImageSubresourceRange::default());

        for bind_group in &self.bind_groups {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("voxelize fill pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &grid.raster_target_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Discard,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&fill.pipeline);
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    /// The per-axis uniform buffers, in [`Axis::ALL`] order.
    #[must_use]
    pub fn uniform_buffers(&self) -> &[wgpu::Buffer; 3] {
        &self.uniform_buffers
    }
}
