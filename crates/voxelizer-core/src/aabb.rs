//! Axis-aligned bounding boxes.

use glam::{Mat4, Vec3};

use crate::error::{Result, VoxelizerError};

/// An axis-aligned bounding box in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a bounding box from its two corners.
    ///
    /// # Errors
    /// Returns [`VoxelizerError::InvalidBounds`] if any component is
    /// non-finite or `min` exceeds `max`.
    pub fn new(min: Vec3, max: Vec3) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min.cmpgt(max).any() {
            return Err(VoxelizerError::InvalidBounds {
                min: min.to_array(),
                max: max.to_array(),
            });
        }
        Ok(Self { min, max })
    }

    /// Creates a bounding box from a center point and full size.
    #[must_use]
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Computes the bounding box of a set of points.
    ///
    /// Returns `None` for an empty set.
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        Some(Self { min, max })
    }

    /// Returns the center of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the full size of the box.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the largest extent over the three axes.
    #[must_use]
    pub fn largest_extent(&self) -> f32 {
        self.size().max_element()
    }

    /// Returns whether `other` lies entirely inside this box.
    #[must_use]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Returns whether a point lies inside this box.
    #[must_use]
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && self.max.cmpge(p).all()
    }

    /// Returns the eight corners of the box.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Returns the axis-aligned bounds of this box after applying an affine
    /// transform, e.g. local grid bounds through an object's world matrix so
    /// frustum culling stays correct.
    #[must_use]
    pub fn transformed(&self, transform: Mat4) -> Self {
        let corners = self.corners();
        let mut min = transform.transform_point3(corners[0]);
        let mut max = min;
        for corner in &corners[1..] {
            let p = transform.transform_point3(*corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }
}
