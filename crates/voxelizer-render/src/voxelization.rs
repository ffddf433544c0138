//! Per-mesh voxelization instances.
//!
//! A [`Voxelization`] owns everything tied to one source mesh: its
//! settings, the lifecycle state machine, and the per-grid GPU resources.
//! Each frame the host calls [`Voxelization::tick`] while recording
//! commands, then [`Voxelization::end_frame`] after all other work so the
//! draw-argument sync lands at the tail of the frame's command stream.

use voxelizer_core::{
    Aabb, CyclePlan, GridLayout, Lifecycle, Mat4, PipelineState, VoxelizationSettings,
};

use crate::compact_pass::CompactPass;
use crate::context::GpuContext;
use crate::draw_args::{DrawArgs, PendingSync};
use crate::error::RenderResult;
use crate::fill_pass::FillPass;
use crate::grid_resources::GridResources;
use crate::mesh::VoxelMesh;
use crate::resources::{DrawUniforms, VoxelizerResources};

/// One voxelization instance: settings, lifecycle, and grid-scoped GPU
/// state for a single source mesh.
pub struct Voxelization {
    label: String,
    settings: VoxelizationSettings,
    lifecycle: Lifecycle,
    grid: Option<GridResources>,
    fill_pass: Option<FillPass>,
    compact_pass: Option<CompactPass>,
    draw_args: Option<DrawArgs>,
    pending_sync: PendingSync,
    /// Unscaled bounds of the mesh the current grid was sized from.
    source_bounds: Option<Aabb>,
}

impl Voxelization {
    /// Creates a disabled instance. Call [`Self::set_enabled`] to start
    /// voxelizing.
    #[must_use]
    pub fn new(label: impl Into<String>, settings: VoxelizationSettings) -> Self {
        Self {
            label: label.into(),
            settings,
            lifecycle: Lifecycle::new(),
            grid: None,
            fill_pass: None,
            compact_pass: None,
            draw_args: None,
            pending_sync: PendingSync::default(),
            source_bounds: None,
        }
    }

    /// The label this instance was created with.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.lifecycle.state()
    }

    /// Read access to the settings.
    #[must_use]
    pub fn settings(&self) -> &VoxelizationSettings {
        &self.settings
    }

    /// The layout of the currently allocated grid, if any.
    #[must_use]
    pub fn grid_layout(&self) -> Option<&GridLayout> {
        self.grid.as_ref().map(|g| &g.layout)
    }

    /// The occupancy image view of the current grid, for downstream
    /// consumers that sample the volume directly.
    #[must_use]
    pub fn occupancy_view(&self) -> Option<&wgpu::TextureView> {
        self.grid.as_ref().map(|g| &g.occupancy_view)
    }

    /// The compacted instance buffer of the current grid.
    #[must_use]
    pub fn instance_buffer(&self) -> Option<&wgpu::Buffer> {
        self.grid.as_ref().map(|g| &g.instances)
    }

    /// Enables or disables this instance. Disabling releases every
    /// grid-scoped resource and cancels any pending argument sync;
    /// re-enabling starts from a fresh allocation.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.lifecycle.enable();
        } else if self.lifecycle.disable() {
            self.pending_sync.discard();
            self.release_grid();
        }
    }

    /// Changes the grid resolution. A change releases the current grid;
    /// the next tick reallocates at the new sizing.
    pub fn set_resolution(&mut self, resolution: u32) {
        if self.settings.set_resolution(resolution) && self.lifecycle.params_changed() {
            self.pending_sync.discard();
            self.release_grid();
        }
    }

    /// Switches between continuous (every-frame) and one-shot refill.
    /// Like every parameter change, a toggle releases the current grid and
    /// reallocates next tick.
    pub fn set_continuous(&mut self, continuous: bool) {
        if self.settings.set_continuous(continuous) && self.lifecycle.params_changed() {
            self.pending_sync.discard();
            self.release_grid();
        }
    }

    /// Notifies the instance that its source mesh was replaced. The
    /// current grid was sized from the old mesh's bounds, so it is
    /// released and rebuilt on the next tick. Ticks also detect a swapped
    /// mesh by its bounds, so this is only needed when the replacement
    /// happens to have identical bounds.
    pub fn set_mesh(&mut self) {
        self.source_bounds = None;
        if self.lifecycle.params_changed() {
            self.pending_sync.discard();
            self.release_grid();
        }
    }

    /// Changes the bounds inflation factor applied to the source mesh.
    pub fn set_volume_scale(&mut self, scale: f32) {
        if self.settings.set_volume_scale(scale) && self.lifecycle.params_changed() {
            self.pending_sync.discard();
            self.release_grid();
        }
    }

    /// Runs one cycle of the pipeline, recording any fill/compact work
    /// into `encoder`.
    ///
    /// Passing `None` for `mesh` (input not ready yet) skips the cycle
    /// without changing state; the instance allocates as soon as a mesh
    /// appears.
    ///
    /// # Errors
    /// Returns [`crate::RenderError::AllocationTooLarge`] when the
    /// requested grid exceeds device limits. The instance latches into
    /// [`PipelineState::Failed`] and records no further work until its
    /// parameters change.
    pub fn tick(
        &mut self,
        ctx: &GpuContext,
        resources: &VoxelizerResources,
        mesh: Option<&VoxelMesh>,
        encoder: &mut wgpu::CommandEncoder,
    ) -> RenderResult<()> {
        if let Some(mesh) = mesh {
            self.refresh_source_bounds(mesh.bounds);
        }
        match self
            .lifecycle
            .plan_cycle(mesh.is_some(), self.settings.continuous())
        {
            CyclePlan::Skip => {
                if self.lifecycle.state() == PipelineState::AwaitingResources && mesh.is_none() {
                    log::debug!("voxelization '{}' waiting for a source mesh", self.label);
                }
                Ok(())
            }
            CyclePlan::Allocate => {
                let Some(mesh) = mesh else {
                    return Ok(());
                };
                self.allocate(ctx, resources, mesh)?;
                self.record_cycle(resources, mesh, encoder);
                Ok(())
            }
            CyclePlan::Fill { .. } => {
                let Some(mesh) = mesh else {
                    return Ok(());
                };
                self.record_cycle(resources, mesh, encoder);
                Ok(())
            }
        }
    }

    /// Records the deferred draw-argument sync, if one is armed. Call
    /// once per frame after every [`Self::tick`], so the counter copy
    /// observes the finished compaction; the synced count becomes
    /// visible to draws on the following frame.
    pub fn end_frame(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if !self.pending_sync.take() {
            return;
        }
        if let (Some(grid), Some(args)) = (&self.grid, &self.draw_args) {
            args.record_sync(encoder, grid);
        }
    }

    /// Issues the instanced-indirect draw of the compacted voxels into an
    /// open render pass. A no-op until the first cycle has been recorded.
    pub fn draw(
        &self,
        queue: &wgpu::Queue,
        rpass: &mut wgpu::RenderPass<'_>,
        resources: &VoxelizerResources,
        view_proj: Mat4,
        local_to_world: Mat4,
    ) {
        if !self.lifecycle.is_draw_ready() {
            return;
        }
        let (Some(grid), Some(args)) = (&self.grid, &self.draw_args) else {
            return;
        };
        let uniforms = DrawUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            local_to_world: local_to_world.to_cols_array_2d(),
            voxel_size: [grid.layout.voxel_size(), 0.0, 0.0, 0.0],
        };
        args.update_uniforms(queue, &uniforms);
        args.draw(rpass, &resources.instance);
    }

    /// World-space bounds of the current grid under `local_to_world`.
    #[must_use]
    pub fn world_bounds(&self, local_to_world: Mat4) -> Option<Aabb> {
        self.grid
            .as_ref()
            .map(|g| g.layout.bounds().transformed(local_to_world))
    }

    /// Releases all grid-scoped GPU resources. Idempotent.
    pub fn release(&mut self) {
        self.pending_sync.discard();
        self.release_grid();
    }

    /// Tears down the grid when the ticked mesh no longer matches the one
    /// the grid was sized from.
    fn refresh_source_bounds(&mut self, bounds: Aabb) {
        if self.source_bounds.is_some_and(|b| b != bounds) {
            log::debug!(
                "voxelization '{}' source mesh changed; rebuilding grid",
                self.label
            );
            self.set_mesh();
        }
    }

    fn allocate(
        &mut self,
        ctx: &GpuContext,
        resources: &VoxelizerResources,
        mesh: &VoxelMesh,
    ) -> RenderResult<()> {
        self.release_grid();

        let bounds = Aabb::from_center_size(
            mesh.bounds.center(),
            mesh.bounds.size() * self.settings.volume_scale(),
        );
        let layout = GridLayout::new(&bounds, self.settings.resolution());

        let grid = match GridResources::new(&ctx.device, layout, &self.label) {
            Ok(grid) => grid,
            Err(err) => {
                self.lifecycle.allocation_failed();
                return Err(err);
            }
        };

        self.fill_pass = Some(FillPass::new(&ctx.device, &resources.fill, &grid));
        self.compact_pass = resources
            .compact_kernel()
            .map(|kernel| CompactPass::new(&ctx.device, kernel, &grid));
        self.draw_args = Some(DrawArgs::new(
            &ctx.device,
            &resources.instance,
            &grid,
            &self.label,
        ));
        self.grid = Some(grid);
        self.source_bounds = Some(mesh.bounds);
        self.lifecycle.allocated();
        Ok(())
    }

    fn record_cycle(
        &mut self,
        resources: &VoxelizerResources,
        mesh: &VoxelMesh,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let (Some(grid), Some(fill), Some(args)) =
            (&self.grid, &self.fill_pass, &self.draw_args)
        else {
            return;
        };

        // A refill supersedes any sync still pending from an earlier
        // cycle; the stale counter copy must not race the new fill.
        self.pending_sync.discard();

        fill.record(encoder, &resources.fill, grid, mesh);

        match (resources.compact_kernel(), &self.compact_pass) {
            (Some(kernel), Some(compact)) => {
                compact.record(encoder, kernel, grid);
                self.pending_sync.arm();
            }
            _ => {
                // No kernel: zero the count so the draw stays valid
                // instead of replaying stale instances.
                args.record_clear_instance_count(encoder);
                log::debug!(
                    "voxelization '{}' has no compaction kernel; drawing zero instances",
                    self.label
                );
            }
        }

        self.lifecycle.cycle_recorded();
    }

    fn release_grid(&mut self) {
        if let Some(mut args) = self.draw_args.take() {
            args.release();
        }
        self.fill_pass = None;
        self.compact_pass = None;
        if let Some(mut grid) = self.grid.take() {
            grid.release();
        }
        self.source_bounds = None;
    }
}
