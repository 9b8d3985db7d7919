//! Rigid body: a point mass with position, velocity and accumulated force.

use crate::core::algebra::Vector2;

/// A variant of rigid body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// Dynamic rigid bodies can be affected by external forces and move under
    /// the integrator.
    Dynamic,
    /// Static rigid bodies cannot be moved, they just react on collisions of
    /// dynamic bodies against them.
    Static,
    /// Kinematic rigid bodies are not affected by forces; they move only with
    /// the velocity set by the user.
    Kinematic,
}

impl Default for BodyType {
    fn default() -> Self {
        Self::Dynamic
    }
}

/// A point-mass rigid body. Rotation is out of the picture: bodies carry
/// position and linear velocity only.
///
/// Forces accumulate between steps via [`Body::add_force`] and are consumed
/// (and zeroed) by the next `World::step`.
#[derive(Clone, Debug)]
pub struct Body {
    position: Vector2<f32>,
    velocity: Vector2<f32>,
    force: Vector2<f32>,
    // Inverse mass of the *dynamic* state; the effective inverse mass of
    // static and kinematic bodies is always zero, see `inv_mass()`.
    inv_mass: f32,
    body_type: BodyType,
    enabled: bool,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vector2::new(0.0, 0.0),
            velocity: Vector2::new(0.0, 0.0),
            force: Vector2::new(0.0, 0.0),
            inv_mass: 1.0,
            body_type: BodyType::Dynamic,
            enabled: true,
        }
    }
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self) -> Vector2<f32> {
        self.position
    }

    #[inline]
    pub fn set_position(&mut self, position: Vector2<f32>) {
        self.position = position;
    }

    #[inline]
    pub fn velocity(&self) -> Vector2<f32> {
        self.velocity
    }

    #[inline]
    pub fn set_velocity(&mut self, velocity: Vector2<f32>) {
        self.velocity = velocity;
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    #[inline]
    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
    }

    /// Mass of the body in kilograms. Zero for bodies that are not dynamic.
    #[inline]
    pub fn mass(&self) -> f32 {
        if self.inv_mass > 0.0 && self.body_type == BodyType::Dynamic {
            1.0 / self.inv_mass
        } else {
            0.0
        }
    }

    /// Sets the mass of the body. A non-positive mass cannot be integrated,
    /// so instead of erroring it turns the body into a static one.
    #[inline]
    pub fn set_mass(&mut self, mass: f32) {
        if mass > 0.0 {
            self.inv_mass = 1.0 / mass;
        } else {
            self.body_type = BodyType::Static;
        }
    }

    /// Effective inverse mass: zero unless the body is dynamic, which lets
    /// resolution formulas treat static partners uniformly.
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        if self.body_type == BodyType::Dynamic {
            self.inv_mass
        } else {
            0.0
        }
    }

    /// Accumulates a force to be applied at the next step.
    #[inline]
    pub fn add_force(&mut self, force: Vector2<f32>) {
        self.force += force;
    }

    #[inline]
    pub fn force(&self) -> Vector2<f32> {
        self.force
    }

    #[inline]
    pub fn reset_forces(&mut self) {
        self.force = Vector2::new(0.0, 0.0);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Semi-implicit Euler step: velocity first from the accumulated force,
    /// then position from the *new* velocity. Kinematic bodies keep their
    /// externally set velocity, static bodies do not move at all.
    pub fn integrate(&mut self, dt: f32) {
        match self.body_type {
            BodyType::Dynamic => {
                self.velocity += self.force.scale(self.inv_mass() * dt);
                self.position += self.velocity.scale(dt);
            }
            BodyType::Kinematic => {
                self.position += self.velocity.scale(dt);
            }
            BodyType::Static => (),
        }
    }
}
