//! Occupancy grid sizing.
//!
//! A [`GridLayout`] is the CPU-side description of one voxelization volume:
//! integer dimensions, physical voxel size and volume placement. It is
//! derived once from a mesh bounding box and a target resolution, and is
//! immutable afterwards — any parameter change produces a new layout (and a
//! new set of GPU resources to go with it).

use glam::{Mat4, UVec3, Vec3};

use crate::aabb::Aabb;

/// Sizing and placement of a voxel occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    dims: UVec3,
    voxel_size: f32,
    center: Vec3,
}

impl GridLayout {
    /// Derives a grid layout from a mesh bounding box and a target
    /// resolution (number of voxels along the largest bounding dimension).
    ///
    /// The resolution is clamped to at least 1. The voxel size is padded by
    /// `voxel_size / resolution` so the grid covers the source bounds with
    /// half a voxel of margin on each side.
    #[must_use]
    pub fn new(bounds: &Aabb, resolution: u32) -> Self {
        let resolution = resolution.max(1);
        let extent = bounds.size();
        let voxel_size = bounds.largest_extent() / resolution as f32;

        let dims = if voxel_size > 0.0 {
            let cells = (extent / voxel_size).ceil();
            UVec3::new(cells.x as u32, cells.y as u32, cells.z as u32).max(UVec3::ONE)
        } else {
            // Degenerate (point) bounds still get a single voxel.
            UVec3::ONE
        };

        let voxel_size = voxel_size + voxel_size / resolution as f32;

        Self {
            dims,
            voxel_size,
            center: bounds.center(),
        }
    }

    /// Returns the grid dimensions in voxels.
    #[must_use]
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Returns the physical size of one voxel (after padding).
    #[must_use]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Returns the center of the volume.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Returns the full physical size of the volume.
    #[must_use]
    pub fn volume_size(&self) -> Vec3 {
        self.dims.as_vec3() * self.voxel_size
    }

    /// Returns the physical bounds of the volume.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.volume_size())
    }

    /// Returns the total number of cells, the worst-case size of the
    /// compacted instance buffer.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        u64::from(self.dims.x) * u64::from(self.dims.y) * u64::from(self.dims.z)
    }

    /// Flattens a 3D cell index to a linear index.
    #[must_use]
    pub fn flatten_index(&self, i: u32, j: u32, k: u32) -> u64 {
        u64::from(i)
            + (u64::from(j) * u64::from(self.dims.x))
            + (u64::from(k) * u64::from(self.dims.x) * u64::from(self.dims.y))
    }

    /// Returns the affine transform taking an integer cell index to the
    /// physical cell-center position.
    ///
    /// The composition is: offset to the cell center (+0.5), normalize into
    /// [0,1], shift to [-0.5,0.5], scale by the volume size, translate to
    /// the volume center. Uploaded once per compaction dispatch.
    #[must_use]
    pub fn index_to_position(&self) -> Mat4 {
        let half_volume = self.volume_size() * 0.5;
        let translation = self.center - half_volume + Vec3::splat(self.voxel_size * 0.5);
        Mat4::from_translation(translation) * Mat4::from_scale(Vec3::splat(self.voxel_size))
    }

    /// Returns the physical position of a cell center.
    #[must_use]
    pub fn position_of_cell(&self, i: u32, j: u32, k: u32) -> Vec3 {
        self.index_to_position()
            .transform_point3(Vec3::new(i as f32, j as f32, k as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_near(a: Vec3, b: Vec3, eps: f32) {
        assert!((a - b).abs().max_element() < eps, "{a:?} != {b:?}");
    }

    #[test]
    fn test_cubic_bounds_sizing() {
        let bounds = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(8.0));
        let grid = GridLayout::new(&bounds, 16);
        assert_eq!(grid.dims(), UVec3::splat(16));
        // 8/16 = 0.5, padded by 0.5/16
        assert!((grid.voxel_size() - (0.5 + 0.5 / 16.0)).abs() < 1e-6);
        assert_eq!(grid.cell_count(), 16 * 16 * 16);
    }

    #[test]
    fn test_anisotropic_bounds_sizing() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 5.0, 1.0)).unwrap();
        let grid = GridLayout::new(&bounds, 10);
        // voxel = 1.0 before padding: ceil(10/1)=10, ceil(5/1)=5, ceil(1/1)=1
        assert_eq!(grid.dims(), UVec3::new(10, 5, 1));
    }

    #[test]
    fn test_resolution_clamped_to_one() {
        let bounds = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(4.0));
        let grid = GridLayout::new(&bounds, 0);
        assert_eq!(grid.dims(), UVec3::ONE);
        assert!(grid.voxel_size() > 4.0);
    }

    #[test]
    fn test_degenerate_bounds() {
        let bounds = Aabb::from_center_size(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);
        let grid = GridLayout::new(&bounds, 64);
        assert_eq!(grid.dims(), UVec3::ONE);
        assert_eq!(grid.center(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_padded_grid_contains_source_bounds() {
        let cases = [
            (Vec3::new(-3.0, 0.0, 1.0), Vec3::new(2.0, 7.5, 1.25), 2),
            (Vec3::splat(-1.0), Vec3::splat(1.0), 1),
            (Vec3::ZERO, Vec3::new(0.1, 100.0, 3.0), 33),
            (Vec3::new(5.0, 5.0, 5.0), Vec3::new(5.5, 6.0, 9.0), 128),
        ];
        for (min, max, resolution) in cases {
            let bounds = Aabb::new(min, max).unwrap();
            let grid = GridLayout::new(&bounds, resolution);
            assert!(grid.dims().cmpge(UVec3::ONE).all());
            assert!(
                grid.bounds().contains(&bounds),
                "grid {:?} does not contain {bounds:?}",
                grid.bounds()
            );
        }
    }

    #[test]
    fn test_index_to_position_corners() {
        let bounds = Aabb::new(Vec3::new(-2.0, -1.0, 0.0), Vec3::new(2.0, 1.0, 1.0)).unwrap();
        let grid = GridLayout::new(&bounds, 8);
        let dims = grid.dims();
        let grid_bounds = grid.bounds();
        let half_voxel = Vec3::splat(grid.voxel_size() * 0.5);

        // Cell (0,0,0) sits exactly half a voxel inward from the minimum
        // corner; the opposite corner cell mirrors it.
        assert_vec3_near(grid.position_of_cell(0, 0, 0), grid_bounds.min + half_voxel, 1e-5);
        assert_vec3_near(
            grid.position_of_cell(dims.x - 1, dims.y - 1, dims.z - 1),
            grid_bounds.max - half_voxel,
            1e-5,
        );
    }

    #[test]
    fn test_index_to_position_spacing() {
        let bounds = Aabb::from_center_size(Vec3::splat(3.0), Vec3::splat(6.0));
        let grid = GridLayout::new(&bounds, 12);
        let step = grid.position_of_cell(1, 0, 0) - grid.position_of_cell(0, 0, 0);
        assert_vec3_near(step, Vec3::new(grid.voxel_size(), 0.0, 0.0), 1e-5);
    }

    #[test]
    fn test_flatten_index() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(4.0, 2.0, 1.0)).unwrap();
        let grid = GridLayout::new(&bounds, 4);
        let dims = grid.dims();
        assert_eq!(grid.flatten_index(0, 0, 0), 0);
        assert_eq!(grid.flatten_index(1, 0, 0), 1);
        assert_eq!(grid.flatten_index(0, 1, 0), u64::from(dims.x));
        assert_eq!(
            grid.flatten_index(dims.x - 1, dims.y - 1, dims.z - 1),
            grid.cell_count() - 1
        );
    }
}
