//! Collider: a shape bound to a body, the unit of collision detection.

use crate::{
    body::Body,
    core::{algebra::Vector2, pool::Handle},
    math::{aabb::AxisAlignedBoundingBox, circle::Circle},
};

/// Possible collider shapes. The shape is kept in world coordinates and is
/// refreshed from the owning body at the beginning of every step, so any
/// manual placement survives only until the next `World::step`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ColliderShape {
    Circle(Circle),
    Rectangle(AxisAlignedBoundingBox),
}

impl ColliderShape {
    /// World-space bounding box of the shape. Constant time for both variants.
    #[inline]
    pub fn bounding_box(&self) -> AxisAlignedBoundingBox {
        match self {
            ColliderShape::Circle(circle) => circle.bounding_box(),
            ColliderShape::Rectangle(rectangle) => *rectangle,
        }
    }

    /// Inclusive overlap test between two world-space shapes.
    pub fn is_intersects(&self, other: &ColliderShape) -> bool {
        match (self, other) {
            (ColliderShape::Circle(a), ColliderShape::Circle(b)) => a.is_intersects_circle(b),
            (ColliderShape::Rectangle(a), ColliderShape::Rectangle(b)) => a.is_intersects_aabb(b),
            (ColliderShape::Circle(circle), ColliderShape::Rectangle(rectangle))
            | (ColliderShape::Rectangle(rectangle), ColliderShape::Circle(circle)) => {
                circle.is_intersects_aabb(rectangle)
            }
        }
    }
}

/// A shape attached to a body. Colliders drive overlap detection and, unless
/// flagged as triggers, impulse resolution.
///
/// Two colliders compare equal when their user-assigned [`Collider::id`]
/// matches; ids are expected to be unique among live colliders.
#[derive(Clone, Debug)]
pub struct Collider {
    body: Handle<Body>,
    shape: ColliderShape,
    is_trigger: bool,
    restitution: f32,
    id: u64,
    enabled: bool,
}

impl PartialEq for Collider {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Collider {
    /// Creates a collider attached to the given body: a degenerate circle of
    /// radius zero at the body position, not a trigger, restitution zero.
    pub fn new(body: Handle<Body>, position: Vector2<f32>) -> Self {
        Self {
            body,
            shape: ColliderShape::Circle(Circle::new(position, 0.0)),
            is_trigger: false,
            restitution: 0.0,
            id: 0,
            enabled: true,
        }
    }

    /// Handle of the body this collider is attached to.
    #[inline]
    pub fn body(&self) -> Handle<Body> {
        self.body
    }

    #[inline]
    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    #[inline]
    pub fn set_shape(&mut self, shape: ColliderShape) {
        self.shape = shape;
    }

    #[inline]
    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    /// Triggers take part in overlap detection and event dispatch, but never
    /// in impulse resolution.
    #[inline]
    pub fn set_trigger(&mut self, is_trigger: bool) {
        self.is_trigger = is_trigger;
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Sets the bounce factor; the value is clamped into `[0.0, 1.0]`.
    #[inline]
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution.clamp(0.0, 1.0);
    }

    /// User-assigned identifier, must be unique among live colliders.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled colliders are left out of the spatial index: no events, no
    /// resolution.
    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Re-derives the world-space shape from the owning body position: the
    /// circle is re-centered, the rectangle is translated so that its minimum
    /// corner lands on the body position. Extents are preserved.
    pub(crate) fn refresh(&mut self, body_position: Vector2<f32>) {
        match &mut self.shape {
            ColliderShape::Circle(circle) => {
                circle.center = body_position;
            }
            ColliderShape::Rectangle(rectangle) => {
                let size = rectangle.size();
                rectangle.min = body_position;
                rectangle.max = body_position + size;
            }
        }
    }
}
