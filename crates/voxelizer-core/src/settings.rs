//! Voxelization configuration.
//!
//! Out-of-range values are clamped rather than rejected. Every mutating
//! setter reports whether the stored value actually changed, and an
//! optional change listener lets external tooling (inspectors, gizmos)
//! observe mutations without the core depending on any UI.

use serde::{Deserialize, Serialize};

/// Upper clamp for the target resolution.
pub const MAX_RESOLUTION: u32 = 4096;

/// Lower clamp for the physical volume scale.
pub const MIN_VOLUME_SCALE: f32 = 0.1;

/// Callback invoked after any settings mutation.
pub type ChangeListener = Box<dyn FnMut(&VoxelizationSettings) + Send>;

/// Configuration of one voxelization instance.
#[derive(Serialize, Deserialize)]
pub struct VoxelizationSettings {
    /// Number of voxels along the largest mesh bounding dimension.
    resolution: u32,
    /// Re-run fill + compaction every tick instead of once at enable.
    continuous: bool,
    /// Physical scale applied to the voxel volume.
    volume_scale: f32,
    #[serde(skip)]
    listener: Option<ChangeListener>,
}

impl VoxelizationSettings {
    /// Creates settings with a clamped resolution and one-shot mode.
    #[must_use]
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution: resolution.clamp(1, MAX_RESOLUTION),
            continuous: false,
            volume_scale: 1.0,
            listener: None,
        }
    }

    /// Returns the target resolution.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Returns whether continuous mode is active.
    #[must_use]
    pub fn continuous(&self) -> bool {
        self.continuous
    }

    /// Returns the physical volume scale.
    #[must_use]
    pub fn volume_scale(&self) -> f32 {
        self.volume_scale
    }

    /// Sets the target resolution, clamped to `1..=MAX_RESOLUTION`.
    ///
    /// Returns true if the stored value changed.
    pub fn set_resolution(&mut self, resolution: u32) -> bool {
        let clamped = resolution.clamp(1, MAX_RESOLUTION);
        let changed = clamped != self.resolution;
        if changed {
            self.resolution = clamped;
            self.notify();
        }
        changed
    }

    /// Toggles continuous mode. Returns true if the value changed.
    pub fn set_continuous(&mut self, continuous: bool) -> bool {
        let changed = continuous != self.continuous;
        if changed {
            self.continuous = continuous;
            self.notify();
        }
        changed
    }

    /// Sets the volume scale, clamped to at least [`MIN_VOLUME_SCALE`].
    ///
    /// Returns true if the stored value changed.
    pub fn set_volume_scale(&mut self, scale: f32) -> bool {
        let clamped = scale.max(MIN_VOLUME_SCALE);
        let changed = (clamped - self.volume_scale).abs() > f32::EPSILON;
        if changed {
            self.volume_scale = clamped;
            self.notify();
        }
        changed
    }

    /// Installs a listener invoked after every effective mutation.
    pub fn set_change_listener(&mut self, listener: ChangeListener) {
        self.listener = Some(listener);
    }

    /// Removes the change listener.
    pub fn clear_change_listener(&mut self) {
        self.listener = None;
    }

    fn notify(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener(self);
            self.listener = Some(listener);
        }
    }
}

impl Default for VoxelizationSettings {
    fn default() -> Self {
        Self::new(32)
    }
}

impl std::fmt::Debug for VoxelizationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelizationSettings")
            .field("resolution", &self.resolution)
            .field("continuous", &self.continuous)
            .field("volume_scale", &self.volume_scale)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_resolution_clamped() {
        let mut settings = VoxelizationSettings::new(0);
        assert_eq!(settings.resolution(), 1);
        settings.set_resolution(1_000_000);
        assert_eq!(settings.resolution(), MAX_RESOLUTION);
    }

    #[test]
    fn test_volume_scale_clamped() {
        let mut settings = VoxelizationSettings::default();
        settings.set_volume_scale(-5.0);
        assert!((settings.volume_scale() - MIN_VOLUME_SCALE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_setters_report_change() {
        let mut settings = VoxelizationSettings::new(32);
        assert!(!settings.set_resolution(32));
        assert!(settings.set_resolution(64));
        assert!(settings.set_continuous(true));
        assert!(!settings.set_continuous(true));
    }

    #[test]
    fn test_change_listener_fires_on_effective_changes_only() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut settings = VoxelizationSettings::new(32);
        settings.set_change_listener(Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        settings.set_resolution(64);
        settings.set_resolution(64); // no-op
        settings.set_continuous(true);
        settings.set_volume_scale(2.0);
        assert_eq!(count.load(Ordering::SeqCst), 3);

        settings.clear_change_listener();
        settings.set_resolution(128);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut settings = VoxelizationSettings::new(128);
        settings.set_continuous(true);
        let json = serde_json::to_string(&settings).unwrap();
        let restored: VoxelizationSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.resolution(), 128);
        assert!(restored.continuous());
    }
}
