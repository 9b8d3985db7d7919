use crate::aabb::AxisAlignedBoundingBox;
use nalgebra::Vector2;

/// A circle in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Circle {
    pub center: Vector2<f32>,
    pub radius: f32,
}

impl Default for Circle {
    #[inline]
    fn default() -> Self {
        Self {
            center: Vector2::new(0.0, 0.0),
            radius: 0.0,
        }
    }
}

impl Circle {
    #[inline]
    pub fn new(center: Vector2<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    #[inline]
    pub fn bounding_box(&self) -> AxisAlignedBoundingBox {
        let r = Vector2::new(self.radius, self.radius);
        AxisAlignedBoundingBox::from_min_max(self.center - r, self.center + r)
    }

    #[inline]
    pub fn is_contains_point(&self, point: Vector2<f32>) -> bool {
        (point - self.center).norm_squared() <= self.radius.powi(2)
    }

    /// Inclusive at the boundary: circles that merely touch are reported
    /// as intersecting.
    #[inline]
    pub fn is_intersects_circle(&self, other: &Self) -> bool {
        (other.center - self.center).norm_squared() <= (self.radius + other.radius).powi(2)
    }

    #[inline]
    pub fn is_intersects_aabb(&self, aabb: &AxisAlignedBoundingBox) -> bool {
        aabb.is_intersects_circle(self.center, self.radius)
    }
}
