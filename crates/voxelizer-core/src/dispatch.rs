//! Compute dispatch sizing.

use glam::UVec3;

/// Returns the number of workgroups per axis needed to cover `dims` with
/// the kernel's declared workgroup size: `ceil(dim / group)`, floored at 1
/// so a grid dimension smaller than one group still issues exactly one.
#[must_use]
pub fn dispatch_groups(dims: UVec3, group_size: UVec3) -> UVec3 {
    UVec3::new(
        dims.x.div_ceil(group_size.x.max(1)),
        dims.y.div_ceil(group_size.y.max(1)),
        dims.z.div_ceil(group_size.z.max(1)),
    )
    .max(UVec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple() {
        assert_eq!(
            dispatch_groups(UVec3::new(16, 8, 4), UVec3::splat(4)),
            UVec3::new(4, 2, 1)
        );
    }

    #[test]
    fn test_rounds_up() {
        assert_eq!(
            dispatch_groups(UVec3::new(17, 9, 5), UVec3::splat(4)),
            UVec3::new(5, 3, 2)
        );
    }

    #[test]
    fn test_floors_at_one_group() {
        // dim=3, group=8 still issues one group
        assert_eq!(
            dispatch_groups(UVec3::new(3, 3, 3), UVec3::splat(8)),
            UVec3::ONE
        );
        assert_eq!(dispatch_groups(UVec3::ONE, UVec3::splat(64)), UVec3::ONE);
    }

    #[test]
    fn test_degenerate_group_size() {
        assert_eq!(
            dispatch_groups(UVec3::new(8, 8, 8), UVec3::ZERO),
            UVec3::splat(8)
        );
    }
}
