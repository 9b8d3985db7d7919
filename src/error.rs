//! Error kinds surfaced by the world API.

use crate::{
    body::Body,
    collider::Collider,
    core::{algebra::Vector2, pool::Handle},
};
use std::fmt::{Display, Formatter};

/// An error that may occur when driving a [`crate::world::World`].
///
/// None of these is fatal at the engine level; the caller decides how to
/// recover. Stale handle errors in particular are expected after `destroy_*`
/// calls and are usually ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// The generation of the body handle no longer matches its slot, the body
    /// was destroyed (and the slot possibly reused).
    StaleBodyHandle(Handle<Body>),
    /// The generation of the collider handle no longer matches its slot.
    StaleColliderHandle(Handle<Collider>),
    /// World bounds whose minimum is not strictly below the maximum on both
    /// axes, or that contain non-finite coordinates.
    InvalidBounds {
        /// Minimum corner of the rejected bounds.
        min: Vector2<f32>,
        /// Maximum corner of the rejected bounds.
        max: Vector2<f32>,
    },
    /// A negative (or NaN) time step was passed to `step`.
    InvalidDelta(f32),
}

impl Display for PhysicsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicsError::StaleBodyHandle(handle) => {
                write!(f, "Body handle {} is stale!", handle)
            }
            PhysicsError::StaleColliderHandle(handle) => {
                write!(f, "Collider handle {} is stale!", handle)
            }
            PhysicsError::InvalidBounds { min, max } => {
                write!(
                    f,
                    "World bounds ({}, {})..({}, {}) are malformed!",
                    min.x, min.y, max.x, max.y
                )
            }
            PhysicsError::InvalidDelta(dt) => {
                write!(f, "Time step {} is not a non-negative number!", dt)
            }
        }
    }
}

impl std::error::Error for PhysicsError {}
