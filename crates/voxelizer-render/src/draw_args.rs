//! Indirect draw arguments and the deferred counter sync.
//!
//! The occupied-voxel count only exists on the GPU. Instead of reading it
//! back (a stall), the counter is copied GPU-to-GPU into the instance-count
//! field of the indirect draw arguments at the end-of-frame boundary. The
//! draw issued during the triggering frame still uses the previous count —
//! one frame of latency, traded deliberately for never blocking the CPU.

use wgpu::util::DeviceExt;

use crate::grid_resources::GridResources;
use crate::mesh::CubeMesh;
use crate::resources::{DrawUniforms, InstanceDrawResources};

/// The five-field indirect draw argument record.
/// Layout must match `wgpu`'s indexed indirect draw contract exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndirectArgs {
    /// Number of indices of the visualization mesh.
    pub index_count: u32,
    /// Number of instances; overwritten post-hoc from the compaction
    /// counter.
    pub instance_count: u32,
    /// First index within the index buffer.
    pub start_index: u32,
    /// Value added to each index before vertex lookup.
    pub base_vertex: u32,
    /// First instance to draw.
    pub start_instance: u32,
}

/// Byte offset of `instance_count` within [`DrawIndirectArgs`], the copy
/// destination of the deferred counter sync.
pub const INSTANCE_COUNT_OFFSET: u64 = 4;

impl DrawIndirectArgs {
    /// Seeds arguments from the visualization mesh's index metadata with
    /// an instance count of zero.
    #[must_use]
    pub fn for_mesh(cube: &CubeMesh) -> Self {
        Self {
            index_count: cube.index_count,
            instance_count: 0,
            start_index: 0,
            base_vertex: 0,
            start_instance: 0,
        }
    }
}

/// Tracks whether a deferred counter copy is outstanding.
///
/// Re-triggering voxelization while a copy is pending discards the stale
/// pending copy rather than letting two in-flight copies race; disabling
/// the instance cancels it outright.
#[derive(Debug, Default)]
pub(crate) struct PendingSync {
    armed: bool,
}

impl PendingSync {
    /// Schedules a copy for the next end-of-frame boundary.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Cancels any outstanding copy.
    pub fn discard(&mut self) {
        self.armed = false;
    }

    /// Consumes the pending copy, if one is armed.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Per-grid indirect draw state: the argument buffer, the draw uniforms,
/// and the bind group referencing the grid's instance records.
pub struct DrawArgs {
    /// The indirect argument buffer (5 u32 fields).
    pub buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    released: bool,
}

impl DrawArgs {
    /// Creates the argument buffer and draw bind group for one grid.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        instance: &InstanceDrawResources,
        grid: &GridResources,
        label: &str,
    ) -> Self {
        let args = DrawIndirectArgs::for_mesh(&instance.cube);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indirect args")),
            contents: bytemuck::bytes_of(&args),
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        });

        let uniforms = DrawUniforms {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            local_to_world: glam::Mat4::IDENTITY.to_cols_array_2d(),
            voxel_size: [grid.layout.voxel_size(), 0.0, 0.0, 0.0],
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} draw uniforms")),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} draw bind group")),
            layout: &instance.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: grid.instances.as_entire_binding(),
                },
            ],
        });

        Self {
            buffer,
            uniform_buffer,
            bind_group,
            released: false,
        }
    }

    /// Records the GPU-to-GPU copy of the compaction counter into the
    /// instance-count field.
    pub fn record_sync(&self, encoder: &mut wgpu::CommandEncoder, grid: &GridResources) {
        encoder.copy_buffer_to_buffer(
            &grid.counter,
            0,
            &self.buffer,
            INSTANCE_COUNT_OFFSET,
            std::mem::size_of::<u32>() as u64,
        );
    }

    /// Zeroes the instance-count field on the GPU timeline. Used when the
    /// compaction kernel is unavailable so the draw does not reuse a stale
    /// count.
    pub fn record_clear_instance_count(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(
            &self.buffer,
            INSTANCE_COUNT_OFFSET,
            Some(std::mem::size_of::<u32>() as u64),
        );
    }

    /// Updates the camera and world transform uniforms for this frame.
    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &DrawUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    /// Issues the instanced-indirect draw; the argument buffer is the sole
    /// instance-count source.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>, instance: &InstanceDrawResources) {
        rpass.set_pipeline(&instance.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, instance.cube.vertex_buffer.slice(..));
        rpass.set_index_buffer(instance.cube.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed_indirect(&self.buffer, 0);
    }

    /// Eagerly frees the argument and uniform buffers. Idempotent; also
    /// runs on drop.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.buffer.destroy();
        self.uniform_buffer.destroy();
        self.released = true;
    }
}

impl Drop for DrawArgs {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_layout_matches_indirect_contract() {
        // 5 unsigned 32-bit fields, tightly packed.
        assert_eq!(std::mem::size_of::<DrawIndirectArgs>(), 20);
        assert_eq!(std::mem::offset_of!(DrawIndirectArgs, index_count), 0);
        assert_eq!(
            std::mem::offset_of!(DrawIndirectArgs, instance_count) as u64,
            INSTANCE_COUNT_OFFSET
        );
        assert_eq!(std::mem::offset_of!(DrawIndirectArgs, start_index), 8);
        assert_eq!(std::mem::offset_of!(DrawIndirectArgs, base_vertex), 12);
        assert_eq!(std::mem::offset_of!(DrawIndirectArgs, start_instance), 16);
    }

    #[test]
    fn test_pending_sync_consumed_once() {
        let mut pending = PendingSync::default();
        assert!(!pending.take());

        pending.arm();
        assert!(pending.is_armed());
        // The boundary consumes the copy exactly once: the next frame must
        // not re-run it.
        assert!(pending.take());
        assert!(!pending.take());
    }

    #[test]
    fn test_pending_sync_discard_cancels() {
        let mut pending = PendingSync::default();
        pending.arm();
        // Disable (or a re-trigger) before the end-of-frame boundary.
        pending.discard();
        assert!(!pending.take());
    }
}
