//! Pipeline lifecycle state machine.
//!
//! The GPU-free half of the orchestrator: which state a voxelization
//! instance is in and what the next tick should do. Keeping this pure makes
//! the enable / parameter-change / allocation-failure / disable ordering
//! testable without a graphics device.
//!
//! States: `Disabled -> AwaitingResources -> Allocated (pending first fill)
//! -> Steady (draw-ready)`, with any parameter change tearing back down to
//! `AwaitingResources` (grids are immutable once created) and a failed
//! allocation latching `Failed` until the next parameter change.

/// Lifecycle state of one voxelization instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Instance is disabled; no resources exist.
    Disabled,
    /// Enabled but no grid allocated yet (fresh enable or parameter change).
    AwaitingResources,
    /// Grid allocated, first fill cycle not yet recorded.
    Allocated,
    /// Steady state: filled at least once, draw-ready.
    Steady,
    /// A grid allocation failed; nothing runs until parameters change.
    Failed,
}

/// What the current tick should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePlan {
    /// Perform no work this cycle.
    Skip,
    /// Allocate a new grid (after which the first fill runs in the same
    /// tick).
    Allocate,
    /// Record a fill + compact cycle into the frame's command stream.
    Fill {
        /// True for the first cycle after allocation.
        first_cycle: bool,
    },
}

/// Drives [`PipelineState`] transitions.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: PipelineState,
}

impl Lifecycle {
    /// Creates a new, disabled lifecycle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PipelineState::Disabled,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns whether the per-frame draw may be issued.
    #[must_use]
    pub fn is_draw_ready(&self) -> bool {
        self.state == PipelineState::Steady
    }

    /// Enables the instance. No-op when already enabled.
    pub fn enable(&mut self) {
        if self.state == PipelineState::Disabled {
            self.state = PipelineState::AwaitingResources;
        }
    }

    /// Disables the instance.
    ///
    /// Returns true if GPU resources existed and must be released (and any
    /// pending deferred copy cancelled).
    pub fn disable(&mut self) -> bool {
        let had_resources = matches!(
            self.state,
            PipelineState::Allocated | PipelineState::Steady
        );
        self.state = PipelineState::Disabled;
        had_resources
    }

    /// Records a parameter change (resolution, mesh, continuous toggle).
    ///
    /// Any existing grid is torn down and reallocated next tick; a `Failed`
    /// latch is cleared. Returns true if resources must be released.
    pub fn params_changed(&mut self) -> bool {
        match self.state {
            PipelineState::Disabled => false,
            PipelineState::AwaitingResources | PipelineState::Failed => {
                self.state = PipelineState::AwaitingResources;
                false
            }
            PipelineState::Allocated | PipelineState::Steady => {
                self.state = PipelineState::AwaitingResources;
                true
            }
        }
    }

    /// Decides what this tick should do.
    ///
    /// `has_inputs` is false when the mesh or resource bundle is absent, in
    /// which case the cycle is skipped without any allocation attempt.
    #[must_use]
    pub fn plan_cycle(&self, has_inputs: bool, continuous: bool) -> CyclePlan {
        match self.state {
            PipelineState::Disabled | PipelineState::Failed => CyclePlan::Skip,
            _ if !has_inputs => CyclePlan::Skip,
            PipelineState::AwaitingResources => CyclePlan::Allocate,
            PipelineState::Allocated => CyclePlan::Fill { first_cycle: true },
            PipelineState::Steady => {
                if continuous {
                    CyclePlan::Fill { first_cycle: false }
                } else {
                    CyclePlan::Skip
                }
            }
        }
    }

    /// Marks a successful grid allocation.
    pub fn allocated(&mut self) {
        debug_assert_eq!(self.state, PipelineState::AwaitingResources);
        self.state = PipelineState::Allocated;
    }

    /// Marks a failed grid allocation. Fatal to the instance: no
    /// fill/compact/draw runs and nothing is retried until parameters
    /// change.
    pub fn allocation_failed(&mut self) {
        log::warn!("voxel grid allocation failed; pipeline halted until parameters change");
        self.state = PipelineState::Failed;
    }

    /// Marks a fill + compact cycle as recorded.
    pub fn cycle_recorded(&mut self) {
        if self.state == PipelineState::Allocated {
            self.state = PipelineState::Steady;
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_then_first_cycle() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.plan_cycle(true, false), CyclePlan::Skip);

        lc.enable();
        assert_eq!(lc.plan_cycle(true, false), CyclePlan::Allocate);

        lc.allocated();
        assert_eq!(lc.plan_cycle(true, false), CyclePlan::Fill { first_cycle: true });

        lc.cycle_recorded();
        assert!(lc.is_draw_ready());
        // One-shot mode does nothing further.
        assert_eq!(lc.plan_cycle(true, false), CyclePlan::Skip);
    }

    #[test]
    fn test_continuous_mode_refills_every_tick() {
        let mut lc = Lifecycle::new();
        lc.enable();
        lc.allocated();
        lc.cycle_recorded();
        for _ in 0..3 {
            assert_eq!(lc.plan_cycle(true, true), CyclePlan::Fill { first_cycle: false });
            lc.cycle_recorded();
        }
    }

    #[test]
    fn test_missing_inputs_skips_without_allocating() {
        let mut lc = Lifecycle::new();
        lc.enable();
        assert_eq!(lc.plan_cycle(false, true), CyclePlan::Skip);
        assert_eq!(lc.state(), PipelineState::AwaitingResources);
        // Inputs appearing later resume allocation.
        assert_eq!(lc.plan_cycle(true, true), CyclePlan::Allocate);
    }

    #[test]
    fn test_params_change_releases_before_reallocation() {
        let mut lc = Lifecycle::new();
        lc.enable();
        lc.allocated();
        lc.cycle_recorded();

        // Repeated re-parametrizations: each one must demand a release
        // before the next Allocate plan is handed out.
        for _ in 0..3 {
            assert!(lc.params_changed());
            assert_eq!(lc.plan_cycle(true, false), CyclePlan::Allocate);
            lc.allocated();
            lc.cycle_recorded();
        }
    }

    #[test]
    fn test_params_change_without_grid_releases_nothing() {
        let mut lc = Lifecycle::new();
        lc.enable();
        assert!(!lc.params_changed());
        let mut disabled = Lifecycle::new();
        assert!(!disabled.params_changed());
        assert_eq!(disabled.state(), PipelineState::Disabled);
    }

    #[test]
    fn test_allocation_failure_latches_until_params_change() {
        let mut lc = Lifecycle::new();
        lc.enable();
        lc.allocation_failed();
        assert_eq!(lc.state(), PipelineState::Failed);
        // No retry, even with valid inputs.
        assert_eq!(lc.plan_cycle(true, true), CyclePlan::Skip);
        assert!(!lc.is_draw_ready());

        assert!(!lc.params_changed());
        assert_eq!(lc.plan_cycle(true, true), CyclePlan::Allocate);
    }

    #[test]
    fn test_disable_reports_resource_release() {
        let mut lc = Lifecycle::new();
        lc.enable();
        assert!(!lc.disable());

        lc.enable();
        lc.allocated();
        // Disabled between allocation and the deferred copy: resources must
        // be released exactly once.
        assert!(lc.disable());
        assert!(!lc.disable());
        assert_eq!(lc.plan_cycle(true, true), CyclePlan::Skip);
    }
}
