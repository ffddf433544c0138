//! Per-axis projection matrices for the rasterization fill pass.
//!
//! The mesh surface is rasterized three times, once along each dominant
//! axis, so the union of the passes conservatively covers every surface
//! voxel regardless of local face orientation. Each pass renders into a
//! square viewport sized to the grid's largest dimension; the matrix built
//! here maps grid-local space onto exactly the face's `nu x nv` texels of
//! that viewport, with the vertically-flipped screen convention (NDC +Y is
//! texel row zero) and depth normalized to [0,1].

use glam::{Mat4, UVec3, Vec2, Vec3, Vec4};

use crate::grid::GridLayout;

/// A dominant projection axis for one fill pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes, in fill-pass order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Returns the grid dimensions of the two screen axes (u, v) for this
    /// projection axis.
    #[must_use]
    pub fn screen_dims(self, dims: UVec3) -> (u32, u32) {
        match self {
            Axis::X => (dims.z, dims.y),
            Axis::Y => (dims.x, dims.z),
            Axis::Z => (dims.x, dims.y),
        }
    }

    /// Returns the permutation swapping the two screen axes with the
    /// projection axis: grid (x,y,z) onto (u,v,depth).
    fn permutation(self) -> Mat4 {
        match self {
            // u <- z, v <- y, depth <- x
            Axis::X => Mat4::from_cols(Vec4::Z, Vec4::Y, Vec4::X, Vec4::W),
            // u <- x, v <- z, depth <- y
            Axis::Y => Mat4::from_cols(Vec4::X, Vec4::Z, Vec4::Y, Vec4::W),
            // u <- x, v <- y, depth <- z
            Axis::Z => Mat4::IDENTITY,
        }
    }
}

/// Returns the square viewport edge (in texels) shared by all three fill
/// passes: the grid's largest dimension.
#[must_use]
pub fn fill_viewport(grid: &GridLayout) -> u32 {
    grid.dims().max_element()
}

/// Builds the view-projection matrix for one fill pass.
///
/// Composes, right to left: normalization of the grid volume into local
/// [0,1] space, the axis permutation, the scale matching the face's texel
/// resolution against the shared square viewport (this is where non-cubic
/// volumes get their aspect compensation), and the final translation
/// aligning the viewport's texel origin with the image corner under the
/// flipped-Y convention.
#[must_use]
pub fn fill_view_proj(axis: Axis, grid: &GridLayout) -> Mat4 {
    let bounds = grid.bounds();
    // Guard degenerate volumes so a flat grid still produces finite NDC.
    let inv_size = grid.volume_size().max(Vec3::splat(f32::EPSILON)).recip();
    let normalize = Mat4::from_scale(inv_size) * Mat4::from_translation(-bounds.min);

    let viewport = fill_viewport(grid) as f32;
    let (nu, nv) = axis.screen_dims(grid.dims());
    let face_scale = Vec2::new(nu as f32, nv as f32) / viewport;
    let scale = Mat4::from_scale(Vec3::new(2.0 * face_scale.x, -2.0 * face_scale.y, 1.0));
    let corner = Mat4::from_translation(Vec3::new(-1.0, 1.0, 0.0));

    corner * scale * axis.permutation() * normalize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aabb::Aabb;

    fn assert_vec3_near(a: Vec3, b: Vec3, eps: f32) {
        assert!((a - b).abs().max_element() < eps, "{a:?} != {b:?}");
    }

    fn cubic_grid() -> GridLayout {
        GridLayout::new(&Aabb::from_center_size(Vec3::ZERO, Vec3::splat(4.0)), 8)
    }

    #[test]
    fn test_cubic_grid_fills_viewport() {
        let grid = cubic_grid();
        assert_eq!(fill_viewport(&grid), 8);
        for axis in Axis::ALL {
            let m = fill_view_proj(axis, &grid);
            let bounds = grid.bounds();
            // Min corner lands at the top-left near corner of NDC.
            assert_vec3_near(m.project_point3(bounds.min), Vec3::new(-1.0, 1.0, 0.0), 1e-5);
            // Max corner fills the whole cubic face.
            assert_vec3_near(m.project_point3(bounds.max), Vec3::new(1.0, -1.0, 1.0), 1e-5);
        }
    }

    #[test]
    fn test_anisotropic_face_scale() {
        // 10x5x1 extent at resolution 10: dims (10,5,1), viewport 10.
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 5.0, 1.0)).unwrap();
        let grid = GridLayout::new(&bounds, 10);
        assert_eq!(fill_viewport(&grid), 10);

        let m = fill_view_proj(Axis::Z, &grid);
        let gb = grid.bounds();
        let max_ndc = m.project_point3(gb.max);
        // u spans all 10 of 10 columns, v only 5 of 10 rows (flipped).
        assert!((max_ndc.x - 1.0).abs() < 1e-5);
        assert!((max_ndc.y - 0.0).abs() < 1e-5);
        assert!((max_ndc.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_permutation_moves_projection_axis_to_depth() {
        let grid = cubic_grid();
        let bounds = grid.bounds();
        for axis in Axis::ALL {
            let m = fill_view_proj(axis, &grid);
            let delta = match axis {
                Axis::X => Vec3::new(bounds.size().x, 0.0, 0.0),
                Axis::Y => Vec3::new(0.0, bounds.size().y, 0.0),
                Axis::Z => Vec3::new(0.0, 0.0, bounds.size().z),
            };
            let a = m.project_point3(bounds.min);
            let b = m.project_point3(bounds.min + delta);
            // Moving along the projection axis only advances depth.
            assert!((a.x - b.x).abs() < 1e-5);
            assert!((a.y - b.y).abs() < 1e-5);
            assert!((b.z - a.z - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_screen_dims_per_axis() {
        let dims = UVec3::new(4, 8, 16);
        assert_eq!(Axis::X.screen_dims(dims), (16, 8));
        assert_eq!(Axis::Y.screen_dims(dims), (4, 16));
        assert_eq!(Axis::Z.screen_dims(dims), (4, 8));
    }

    #[test]
    fn test_depth_stays_in_unit_range() {
        let bounds = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(4.0, 0.0, 3.0)).unwrap();
        let grid = GridLayout::new(&bounds, 6);
        for axis in Axis::ALL {
            let m = fill_view_proj(axis, &grid);
            for corner in grid.bounds().corners() {
                let ndc = m.project_point3(corner);
                assert!(ndc.z >= -1e-5 && ndc.z <= 1.0 + 1e-5, "{axis:?}: {ndc:?}");
            }
        }
    }
}
