//! Contact bookkeeping: canonical overlap keys, contact manifolds and the
//! listener capability set.

use crate::{
    collider::{Collider, ColliderShape},
    core::{algebra::Vector2, pool::Handle},
    math::{aabb::AxisAlignedBoundingBox, circle::Circle},
};

/// An unordered pair of colliders, canonicalized so that the handle with the
/// smaller slot comes first. Building the key from `(a, b)` or `(b, a)`
/// yields the same value, which makes it usable as a set key for overlap
/// tracking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContactKey {
    a: Handle<Collider>,
    b: Handle<Collider>,
}

impl ContactKey {
    #[inline]
    pub fn new(a: Handle<Collider>, b: Handle<Collider>) -> Self {
        if b < a {
            Self { a: b, b: a }
        } else {
            Self { a, b }
        }
    }

    #[inline]
    pub fn a(&self) -> Handle<Collider> {
        self.a
    }

    #[inline]
    pub fn b(&self) -> Handle<Collider> {
        self.b
    }

    #[inline]
    pub fn involves(&self, handle: Handle<Collider>) -> bool {
        self.a == handle || self.b == handle
    }
}

/// Contact geometry of an overlapping pair: a unit normal pointing from the
/// first shape towards the second one and the penetration depth along it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactManifold {
    pub normal: Vector2<f32>,
    pub penetration: f32,
}

impl ContactManifold {
    #[inline]
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            penetration: self.penetration,
        }
    }
}

/// Computes the contact manifold of two world-space shapes, `None` when they
/// do not overlap. The overlap test is inclusive, touching shapes produce a
/// zero-penetration manifold.
pub fn contact_manifold(a: &ColliderShape, b: &ColliderShape) -> Option<ContactManifold> {
    match (a, b) {
        (ColliderShape::Circle(a), ColliderShape::Circle(b)) => circle_circle(a, b),
        (ColliderShape::Rectangle(a), ColliderShape::Rectangle(b)) => rectangle_rectangle(a, b),
        (ColliderShape::Circle(circle), ColliderShape::Rectangle(rectangle)) => {
            circle_rectangle(circle, rectangle)
        }
        (ColliderShape::Rectangle(rectangle), ColliderShape::Circle(circle)) => {
            circle_rectangle(circle, rectangle).map(ContactManifold::flipped)
        }
    }
}

fn circle_circle(a: &Circle, b: &Circle) -> Option<ContactManifold> {
    let delta = b.center - a.center;
    let radii = a.radius + b.radius;
    let distance_squared = delta.norm_squared();
    if distance_squared > radii.powi(2) {
        return None;
    }

    let distance = distance_squared.sqrt();
    let normal = if distance > f32::EPSILON {
        delta.unscale(distance)
    } else {
        // Coincident centers leave the normal undefined, any axis works.
        Vector2::x()
    };

    Some(ContactManifold {
        normal,
        penetration: radii - distance,
    })
}

fn rectangle_rectangle(
    a: &AxisAlignedBoundingBox,
    b: &AxisAlignedBoundingBox,
) -> Option<ContactManifold> {
    let overlap_x = a.max.x.min(b.max.x) - a.min.x.max(b.min.x);
    if overlap_x < 0.0 {
        return None;
    }
    let overlap_y = a.max.y.min(b.max.y) - a.min.y.max(b.min.y);
    if overlap_y < 0.0 {
        return None;
    }

    // Separate along the axis of least penetration, away from the other center.
    let delta = b.center() - a.center();
    if overlap_x < overlap_y {
        Some(ContactManifold {
            normal: if delta.x >= 0.0 {
                Vector2::x()
            } else {
                -Vector2::x()
            },
            penetration: overlap_x,
        })
    } else {
        Some(ContactManifold {
            normal: if delta.y >= 0.0 {
                Vector2::y()
            } else {
                -Vector2::y()
            },
            penetration: overlap_y,
        })
    }
}

// Normal points from the circle towards the rectangle.
fn circle_rectangle(
    circle: &Circle,
    rectangle: &AxisAlignedBoundingBox,
) -> Option<ContactManifold> {
    let closest = rectangle.closest_point(circle.center);
    let delta = closest - circle.center;
    let distance_squared = delta.norm_squared();
    if distance_squared > circle.radius.powi(2) {
        return None;
    }

    if distance_squared > f32::EPSILON.powi(2) {
        let distance = distance_squared.sqrt();
        return Some(ContactManifold {
            normal: delta.unscale(distance),
            penetration: circle.radius - distance,
        });
    }

    // The center is inside the rectangle; push the circle out through the
    // nearest face. The normal still points circle -> rectangle, so it is the
    // inward face direction.
    let to_left = circle.center.x - rectangle.min.x;
    let to_right = rectangle.max.x - circle.center.x;
    let to_top = circle.center.y - rectangle.min.y;
    let to_bottom = rectangle.max.y - circle.center.y;

    let mut penetration = to_left;
    let mut normal = Vector2::x();
    if to_right < penetration {
        penetration = to_right;
        normal = -Vector2::x();
    }
    if to_top < penetration {
        penetration = to_top;
        normal = Vector2::y();
    }
    if to_bottom < penetration {
        penetration = to_bottom;
        normal = -Vector2::y();
    }

    Some(ContactManifold {
        normal,
        penetration: penetration + circle.radius,
    })
}

/// The set of callbacks the world invokes when pairs of colliders start or
/// stop overlapping. Every callback defaults to a no-op, implementors
/// override only what they need.
///
/// Enter and exit notifications for a given pair alternate strictly: at any
/// point a pair has either seen balanced enters and exits, or exactly one
/// unmatched enter (it is currently overlapping). Listeners can therefore
/// keep per-object overlap counters, incrementing on enter and decrementing
/// on exit.
///
/// Dispatch happens before impulse resolution, so velocities read through
/// stored handles still show the pre-collision state.
pub trait ContactListener {
    /// A pair involving at least one trigger collider started overlapping.
    fn on_trigger_enter(&mut self, a: Handle<Collider>, b: Handle<Collider>) {
        let _ = (a, b);
    }

    /// A previously overlapping trigger pair separated.
    fn on_trigger_exit(&mut self, a: Handle<Collider>, b: Handle<Collider>) {
        let _ = (a, b);
    }

    /// A pair of non-trigger colliders started overlapping. Resolution for
    /// the pair runs right after dispatch.
    fn on_collision_enter(&mut self, a: Handle<Collider>, b: Handle<Collider>) {
        let _ = (a, b);
    }

    /// A previously overlapping non-trigger pair separated.
    fn on_collision_exit(&mut self, a: Handle<Collider>, b: Handle<Collider>) {
        let _ = (a, b);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ContactEventKind {
    TriggerEnter,
    TriggerExit,
    CollisionEnter,
    CollisionExit,
}

#[cfg(test)]
mod test {
    use super::{contact_manifold, ContactKey};
    use crate::{
        collider::{Collider, ColliderShape},
        core::{algebra::Vector2, pool::Handle},
        math::{aabb::AxisAlignedBoundingBox, circle::Circle},
    };

    fn handle(n: u32) -> Handle<Collider> {
        Handle::new(n, 1)
    }

    #[test]
    fn contact_key_is_canonical() {
        let a = handle(3);
        let b = handle(7);

        assert_eq!(ContactKey::new(a, b), ContactKey::new(b, a));
        assert_eq!(ContactKey::new(a, b).a(), a);
        assert_eq!(ContactKey::new(a, b).b(), b);
        assert!(ContactKey::new(a, b).involves(a));
        assert!(!ContactKey::new(a, b).involves(handle(5)));
    }

    #[test]
    fn circle_circle_manifold() {
        let a = ColliderShape::Circle(Circle::new(Vector2::new(0.0, 0.0), 1.0));
        let b = ColliderShape::Circle(Circle::new(Vector2::new(1.5, 0.0), 1.0));

        let manifold = contact_manifold(&a, &b).unwrap();
        assert_eq!(manifold.normal, Vector2::new(1.0, 0.0));
        assert!((manifold.penetration - 0.5).abs() < 1e-6);

        // Swapping operands flips the normal, keeps the depth.
        let flipped = contact_manifold(&b, &a).unwrap();
        assert_eq!(flipped.normal, Vector2::new(-1.0, 0.0));
        assert!((flipped.penetration - 0.5).abs() < 1e-6);

        let far = ColliderShape::Circle(Circle::new(Vector2::new(3.0, 0.0), 1.0));
        assert!(contact_manifold(&a, &far).is_none());
    }

    #[test]
    fn rectangle_rectangle_manifold_picks_least_penetration_axis() {
        let a = ColliderShape::Rectangle(AxisAlignedBoundingBox::from_min_max(
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 10.0),
        ));
        // Deep overlap in y, shallow in x.
        let b = ColliderShape::Rectangle(AxisAlignedBoundingBox::from_min_max(
            Vector2::new(9.0, 2.0),
            Vector2::new(19.0, 8.0),
        ));

        let manifold = contact_manifold(&a, &b).unwrap();
        assert_eq!(manifold.normal, Vector2::new(1.0, 0.0));
        assert!((manifold.penetration - 1.0).abs() < 1e-6);
    }

    #[test]
    fn circle_rectangle_manifold() {
        let rectangle = ColliderShape::Rectangle(AxisAlignedBoundingBox::from_min_max(
            Vector2::new(0.0, 10.0),
            Vector2::new(100.0, 20.0),
        ));
        let circle = ColliderShape::Circle(Circle::new(Vector2::new(50.0, 9.0), 2.0));

        let manifold = contact_manifold(&circle, &rectangle).unwrap();
        // The circle hangs above the slab, it is pushed further up.
        assert_eq!(manifold.normal, Vector2::new(0.0, 1.0));
        assert!((manifold.penetration - 1.0).abs() < 1e-6);

        let flipped = contact_manifold(&rectangle, &circle).unwrap();
        assert_eq!(flipped.normal, Vector2::new(0.0, -1.0));
    }

    #[test]
    fn circle_center_inside_rectangle_uses_nearest_face() {
        let rectangle = ColliderShape::Rectangle(AxisAlignedBoundingBox::from_min_max(
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 10.0),
        ));
        // Closest to the right face.
        let circle = ColliderShape::Circle(Circle::new(Vector2::new(9.0, 5.0), 1.0));

        let manifold = contact_manifold(&circle, &rectangle).unwrap();
        assert_eq!(manifold.normal, Vector2::new(-1.0, 0.0));
        assert!((manifold.penetration - 2.0).abs() < 1e-6);
    }

    #[test]
    fn manifold_is_symmetric_in_overlap() {
        let shapes = [
            ColliderShape::Circle(Circle::new(Vector2::new(1.0, 1.0), 2.0)),
            ColliderShape::Rectangle(AxisAlignedBoundingBox::from_min_max(
                Vector2::new(0.0, 0.0),
                Vector2::new(3.0, 3.0),
            )),
            ColliderShape::Circle(Circle::new(Vector2::new(10.0, 10.0), 1.0)),
        ];

        for a in shapes.iter() {
            for b in shapes.iter() {
                assert_eq!(
                    contact_manifold(a, b).is_some(),
                    contact_manifold(b, a).is_some()
                );
            }
        }
    }
}
