use nalgebra::Vector2;

/// An axis-aligned rectangle given by its minimum and maximum corners.
/// The engine uses a Y-down frame, so `min` is the top-left corner.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AxisAlignedBoundingBox {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl Default for AxisAlignedBoundingBox {
    #[inline]
    fn default() -> Self {
        Self {
            min: Vector2::new(f32::MAX, f32::MAX),
            max: Vector2::new(-f32::MAX, -f32::MAX),
        }
    }
}

impl AxisAlignedBoundingBox {
    #[inline]
    pub const fn collapsed() -> Self {
        Self {
            min: Vector2::new(0.0, 0.0),
            max: Vector2::new(0.0, 0.0),
        }
    }

    #[inline]
    pub const fn from_min_max(min: Vector2<f32>, max: Vector2<f32>) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_point(point: Vector2<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    #[inline]
    pub fn from_position_size(position: Vector2<f32>, size: Vector2<f32>) -> Self {
        Self {
            min: position,
            max: position + size,
        }
    }

    #[inline]
    pub fn add_point(&mut self, a: Vector2<f32>) {
        if a.x < self.min.x {
            self.min.x = a.x;
        }
        if a.y < self.min.y {
            self.min.y = a.y;
        }

        if a.x > self.max.x {
            self.max.x = a.x;
        }
        if a.y > self.max.y {
            self.max.y = a.y;
        }
    }

    #[inline]
    pub fn add_box(&mut self, other: Self) {
        self.add_point(other.min);
        self.add_point(other.max);
    }

    #[inline]
    pub fn offset(&mut self, v: Vector2<f32>) {
        self.min += v;
        self.max += v;
    }

    #[inline]
    pub fn center(&self) -> Vector2<f32> {
        (self.max + self.min).scale(0.5)
    }

    #[inline]
    pub fn half_extents(&self) -> Vector2<f32> {
        (self.max - self.min).scale(0.5)
    }

    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.max - self.min
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        #[inline(always)]
        fn is_finite(v: &Vector2<f32>) -> bool {
            v.iter().all(|e| e.is_finite())
        }

        self.max.x >= self.min.x
            && self.max.y >= self.min.y
            && is_finite(&self.min)
            && is_finite(&self.max)
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    #[inline]
    pub fn is_contains_point(&self, point: Vector2<f32>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    #[inline]
    pub fn is_contains_aabb(&self, other: &Self) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    /// Inclusive at the boundary: boxes that merely touch are reported
    /// as intersecting.
    #[inline]
    pub fn is_intersects_aabb(&self, other: &Self) -> bool {
        let self_center = self.center();
        let self_half_extents = self.half_extents();

        let other_center = other.center();
        let other_half_extents = other.half_extents();

        if (self_center.x - other_center.x).abs() > (self_half_extents.x + other_half_extents.x) {
            return false;
        }

        if (self_center.y - other_center.y).abs() > (self_half_extents.y + other_half_extents.y) {
            return false;
        }

        true
    }

    /// Inclusive at the boundary, like [`Self::is_intersects_aabb`].
    #[inline]
    pub fn is_intersects_circle(&self, position: Vector2<f32>, radius: f32) -> bool {
        let r2 = radius.powi(2);
        let mut dmin = 0.0;

        if position.x < self.min.x {
            dmin += (position.x - self.min.x).powi(2);
        } else if position.x > self.max.x {
            dmin += (position.x - self.max.x).powi(2);
        }

        if position.y < self.min.y {
            dmin += (position.y - self.min.y).powi(2);
        } else if position.y > self.max.y {
            dmin += (position.y - self.max.y).powi(2);
        }

        dmin <= r2
    }

    /// The point of this box closest to `point`; `point` itself when it is
    /// inside.
    #[inline]
    pub fn closest_point(&self, point: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Splits the box into its four quadrants: NW, NE, SW, SE (Y down).
    #[inline]
    pub fn split(&self) -> [AxisAlignedBoundingBox; 4] {
        let center = self.center();
        let min = &self.min;
        let max = &self.max;
        [
            AxisAlignedBoundingBox::from_min_max(
                Vector2::new(min.x, min.y),
                Vector2::new(center.x, center.y),
            ),
            AxisAlignedBoundingBox::from_min_max(
                Vector2::new(center.x, min.y),
                Vector2::new(max.x, center.y),
            ),
            AxisAlignedBoundingBox::from_min_max(
                Vector2::new(min.x, center.y),
                Vector2::new(center.x, max.y),
            ),
            AxisAlignedBoundingBox::from_min_max(
                Vector2::new(center.x, center.y),
                Vector2::new(max.x, max.y),
            ),
        ]
    }
}

#[cfg(test)]
mod test {
    use super::AxisAlignedBoundingBox;
    use nalgebra::Vector2;

    #[test]
    fn aabb_contains_point() {
        let aabb = AxisAlignedBoundingBox::from_min_max(
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 10.0),
        );

        assert!(aabb.is_contains_point(Vector2::new(5.0, 5.0)));
        assert!(aabb.is_contains_point(Vector2::new(0.0, 0.0)));
        assert!(aabb.is_contains_point(Vector2::new(10.0, 10.0)));
        assert!(!aabb.is_contains_point(Vector2::new(10.1, 5.0)));
    }

    #[test]
    fn aabb_contains_aabb() {
        let outer = AxisAlignedBoundingBox::from_min_max(
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 10.0),
        );
        let inner =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(1.0, 1.0), Vector2::new(4.0, 4.0));
        let straddling =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(8.0, 8.0), Vector2::new(12.0, 12.0));

        assert!(outer.is_contains_aabb(&inner));
        assert!(outer.is_contains_aabb(&outer));
        assert!(!outer.is_contains_aabb(&straddling));
        assert!(!inner.is_contains_aabb(&outer));
    }

    #[test]
    fn aabb_intersection_is_inclusive() {
        let a =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(0.0, 0.0), Vector2::new(2.0, 2.0));
        let touching =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(2.0, 0.0), Vector2::new(4.0, 2.0));
        let separated =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(2.5, 0.0), Vector2::new(4.0, 2.0));

        assert!(a.is_intersects_aabb(&touching));
        assert!(touching.is_intersects_aabb(&a));
        assert!(!a.is_intersects_aabb(&separated));
    }

    #[test]
    fn aabb_circle_intersection() {
        let aabb =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(0.0, 0.0), Vector2::new(4.0, 4.0));

        // Touching from the outside.
        assert!(aabb.is_intersects_circle(Vector2::new(6.0, 2.0), 2.0));
        // Center inside.
        assert!(aabb.is_intersects_circle(Vector2::new(2.0, 2.0), 0.5));
        // Clearly outside.
        assert!(!aabb.is_intersects_circle(Vector2::new(7.0, 2.0), 2.0));
        // Near the corner the clamped distance matters, not per-axis gaps.
        assert!(!aabb.is_intersects_circle(Vector2::new(5.5, 5.5), 2.0));
    }

    #[test]
    fn aabb_split_covers_parent() {
        let aabb =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(0.0, 0.0), Vector2::new(8.0, 8.0));

        let quadrants = aabb.split();

        let mut merged = AxisAlignedBoundingBox::default();
        for quadrant in &quadrants {
            assert!(aabb.is_contains_aabb(quadrant));
            merged.add_box(*quadrant);
        }
        assert_eq!(merged, aabb);
    }

    #[test]
    fn aabb_closest_point() {
        let aabb =
            AxisAlignedBoundingBox::from_min_max(Vector2::new(0.0, 0.0), Vector2::new(4.0, 4.0));

        assert_eq!(
            aabb.closest_point(Vector2::new(-1.0, 2.0)),
            Vector2::new(0.0, 2.0)
        );
        assert_eq!(
            aabb.closest_point(Vector2::new(1.0, 2.0)),
            Vector2::new(1.0, 2.0)
        );
        assert_eq!(
            aabb.closest_point(Vector2::new(5.0, 6.0)),
            Vector2::new(4.0, 4.0)
        );
    }
}
