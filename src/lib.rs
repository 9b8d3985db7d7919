//! Tabby - a compact 2D rigid-body physics engine.
//!
//! The engine integrates point-mass bodies with semi-implicit Euler, indexes
//! collider shapes in a pooled quadtree, detects overlapping pairs, reports
//! enter/exit transitions to a contact listener and resolves non-trigger
//! contacts impulsively with restitution.
//!
//! Everything goes through a [`world::World`] value:
//!
//! ```
//! use tabby::prelude::*;
//! use tabby::core::algebra::Vector2;
//!
//! let bounds = AxisAlignedBoundingBox::from_min_max(
//!     Vector2::new(0.0, 0.0),
//!     Vector2::new(800.0, 600.0),
//! );
//! let mut world = World::new(bounds).unwrap();
//!
//! let body = world.create_body();
//! world.body_mut(body).unwrap().set_position(Vector2::new(100.0, 100.0));
//!
//! let collider = world.create_collider(body).unwrap();
//! world
//!     .collider_mut(collider)
//!     .unwrap()
//!     .set_shape(ColliderShape::Circle(Circle::new(
//!         Vector2::new(100.0, 100.0),
//!         10.0,
//!     )));
//!
//! world.step(1.0 / 60.0).unwrap();
//! ```

pub use tabby_core as core;
pub use tabby_math as math;

pub mod body;
pub mod collider;
pub mod contact;
pub mod error;
pub mod quadtree;
pub mod world;

pub mod prelude {
    //! The most frequently used engine types, re-exported in one place.

    pub use crate::{
        body::{Body, BodyType},
        collider::{Collider, ColliderShape},
        contact::{ContactKey, ContactListener, ContactManifold},
        core::pool::Handle,
        error::PhysicsError,
        math::{aabb::AxisAlignedBoundingBox, circle::Circle},
        quadtree::{QuadTree, QuadTreeSettings},
        world::World,
    };
}
