//! The world owns every physics entity and drives the simulation step.

use crate::{
    body::Body,
    collider::Collider,
    contact::{contact_manifold, ContactEventKind, ContactKey, ContactListener},
    core::{
        log::Log,
        pool::{Handle, Pool},
    },
    error::PhysicsError,
    math::aabb::AxisAlignedBoundingBox,
    quadtree::{QuadTree, QuadTreeSettings},
};
use fxhash::FxHashSet;
use std::{
    any::Any,
    fmt::{Debug, Formatter},
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
};

// Penetration below the slop is tolerated instead of corrected, which keeps
// resting contacts from jittering.
const PENETRATION_SLOP: f32 = 0.005;
const CORRECTION_FACTOR: f32 = 0.8;

/// The simulation world: bodies, colliders, the spatial index and the overlap
/// bookkeeping, driven by [`World::step`].
///
/// Worlds are self-contained values; any number of them can coexist. A world
/// is single-threaded: `step` runs to completion on the calling thread and
/// the world is not meant to be mutated concurrently.
pub struct World {
    bodies: Pool<Body>,
    colliders: Pool<Collider>,
    quadtree: QuadTree,
    contact_listener: Option<Box<dyn ContactListener>>,
    // Overlapping pairs as of the previous step.
    overlaps: FxHashSet<ContactKey>,
    // Overlapping pairs of the running step; swapped with `overlaps` so both
    // sets keep their allocations.
    scratch_overlaps: FxHashSet<ContactKey>,
    candidates: Vec<(Handle<Collider>, Handle<Collider>)>,
    events: Vec<(ContactKey, ContactEventKind)>,
}

impl Debug for World {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "World[{} bodies, {} colliders]",
            self.bodies.alive_count(),
            self.colliders.alive_count()
        )
    }
}

impl World {
    /// Creates a world over the given bounds with the default quadtree
    /// settings. The bounds become the root of the spatial index.
    pub fn new(bounds: AxisAlignedBoundingBox) -> Result<Self, PhysicsError> {
        Self::with_settings(bounds, QuadTreeSettings::default())
    }

    /// Creates a world with an explicit quadtree split policy.
    pub fn with_settings(
        bounds: AxisAlignedBoundingBox,
        settings: QuadTreeSettings,
    ) -> Result<Self, PhysicsError> {
        if !bounds.is_valid() || bounds.max.x <= bounds.min.x || bounds.max.y <= bounds.min.y {
            return Err(PhysicsError::InvalidBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }

        Ok(Self {
            bodies: Pool::new(),
            colliders: Pool::new(),
            quadtree: QuadTree::new(bounds, settings),
            contact_listener: None,
            overlaps: FxHashSet::default(),
            scratch_overlaps: FxHashSet::default(),
            candidates: Vec::new(),
            events: Vec::new(),
        })
    }

    #[inline]
    pub fn bounds(&self) -> AxisAlignedBoundingBox {
        self.quadtree.bounds()
    }

    /// Read-only view of the spatial index, rebuilt by every step. Useful for
    /// debug drawing of the node bounds.
    #[inline]
    pub fn quadtree(&self) -> &QuadTree {
        &self.quadtree
    }

    /// Spawns a body: at the origin, zero velocity, unit mass, dynamic.
    #[inline]
    pub fn create_body(&mut self) -> Handle<Body> {
        self.bodies.spawn(Body::new())
    }

    /// Destroys a body together with every collider attached to it. Overlap
    /// records of those colliders are dropped silently: no exit events will
    /// be dispatched for them on the next step.
    pub fn destroy_body(&mut self, handle: Handle<Body>) -> Result<(), PhysicsError> {
        self.bodies
            .try_free(handle)
            .ok_or(PhysicsError::StaleBodyHandle(handle))?;

        let orphans: Vec<Handle<Collider>> = self
            .colliders
            .pair_iter()
            .filter(|(_, collider)| collider.body() == handle)
            .map(|(collider_handle, _)| collider_handle)
            .collect();
        for collider_handle in orphans {
            self.colliders.free(collider_handle);
            self.overlaps.retain(|key| !key.involves(collider_handle));
        }

        Ok(())
    }

    #[inline]
    pub fn body(&self, handle: Handle<Body>) -> Result<&Body, PhysicsError> {
        self.bodies
            .try_borrow(handle)
            .ok_or(PhysicsError::StaleBodyHandle(handle))
    }

    #[inline]
    pub fn body_mut(&mut self, handle: Handle<Body>) -> Result<&mut Body, PhysicsError> {
        self.bodies
            .try_borrow_mut(handle)
            .ok_or(PhysicsError::StaleBodyHandle(handle))
    }

    /// Attaches a fresh collider to the body: a degenerate circle of radius
    /// zero at the body position, not a trigger, restitution zero.
    pub fn create_collider(
        &mut self,
        body: Handle<Body>,
    ) -> Result<Handle<Collider>, PhysicsError> {
        let position = self
            .bodies
            .try_borrow(body)
            .ok_or(PhysicsError::StaleBodyHandle(body))?
            .position();
        Ok(self.colliders.spawn(Collider::new(body, position)))
    }

    /// Destroys a collider. Its overlap records are dropped silently: no exit
    /// events will be dispatched for them on the next step.
    pub fn destroy_collider(&mut self, handle: Handle<Collider>) -> Result<(), PhysicsError> {
        self.colliders
            .try_free(handle)
            .ok_or(PhysicsError::StaleColliderHandle(handle))?;
        self.overlaps.retain(|key| !key.involves(handle));
        Ok(())
    }

    #[inline]
    pub fn collider(&self, handle: Handle<Collider>) -> Result<&Collider, PhysicsError> {
        self.colliders
            .try_borrow(handle)
            .ok_or(PhysicsError::StaleColliderHandle(handle))
    }

    #[inline]
    pub fn collider_mut(
        &mut self,
        handle: Handle<Collider>,
    ) -> Result<&mut Collider, PhysicsError> {
        self.colliders
            .try_borrow_mut(handle)
            .ok_or(PhysicsError::StaleColliderHandle(handle))
    }

    /// Installs the contact listener, replacing the previous one; `None`
    /// clears it. The world owns the listener and borrows it only for the
    /// dispatch phase of `step`.
    #[inline]
    pub fn set_contact_listener(&mut self, listener: Option<Box<dyn ContactListener>>) {
        self.contact_listener = listener;
    }

    #[inline]
    pub fn body_count(&self) -> u32 {
        self.bodies.alive_count()
    }

    #[inline]
    pub fn collider_count(&self) -> u32 {
        self.colliders.alive_count()
    }

    /// Iterates over the live bodies with their handles.
    pub fn bodies(&self) -> impl Iterator<Item = (Handle<Body>, &Body)> {
        self.bodies.pair_iter()
    }

    /// Iterates over the live colliders with their handles.
    pub fn colliders(&self) -> impl Iterator<Item = (Handle<Collider>, &Collider)> {
        self.colliders.pair_iter()
    }

    /// Frees every body, collider, index node and overlap record. The world
    /// keeps its bounds, settings and listener and stays usable.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.colliders.clear();
        self.quadtree.reset();
        self.overlaps.clear();
        self.scratch_overlaps.clear();
        self.candidates.clear();
        self.events.clear();
    }

    /// Advances the simulation by `dt` seconds:
    ///
    /// 1. integrate dynamic and kinematic bodies, then zero all accumulated
    ///    forces;
    /// 2. re-derive every collider's world-space shape from its body;
    /// 3. rebuild the quadtree over the live, enabled colliders;
    /// 4. run broad and narrow phase to find the overlapping pairs;
    /// 5. dispatch enter/exit events against the previous step's pairs;
    /// 6. resolve every overlapping non-trigger pair impulsively.
    ///
    /// Events always fire before resolution, so a listener observes the
    /// pre-collision velocities. Colliders attached to the same body never
    /// report contacts against each other.
    ///
    /// `dt == 0` is legal: nothing moves, but the index is rebuilt and
    /// transition events caused by manual mutations still fire. A panic from
    /// a listener callback is re-raised only after the step has fully
    /// completed, so no partial per-step state is observable.
    pub fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        if dt.is_nan() || dt < 0.0 {
            return Err(PhysicsError::InvalidDelta(dt));
        }

        self.integrate(dt);
        self.refresh_colliders();
        self.rebuild_index();
        self.update_overlaps();
        self.collect_events();
        std::mem::swap(&mut self.overlaps, &mut self.scratch_overlaps);
        let listener_panic = self.dispatch_events();
        self.resolve_contacts();

        if let Some(payload) = listener_panic {
            resume_unwind(payload);
        }

        Ok(())
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.bodies.iter_mut() {
            if body.is_enabled() {
                body.integrate(dt);
            }
            body.reset_forces();
        }
    }

    fn refresh_colliders(&mut self) {
        let Self {
            bodies, colliders, ..
        } = self;
        for (handle, collider) in colliders.pair_iter_mut() {
            match bodies.try_borrow(collider.body()) {
                Some(body) => collider.refresh(body.position()),
                None => Log::warn(format!(
                    "Collider {} is attached to a dead body and will be skipped.",
                    handle
                )),
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.quadtree.reset();
        let Self {
            bodies,
            colliders,
            quadtree,
            ..
        } = self;
        for (handle, collider) in colliders.pair_iter() {
            if !collider.is_enabled() {
                continue;
            }
            // Colliders of dead or disabled bodies stay out of the index, so
            // they produce no contacts and nothing ever moves them.
            let Some(body) = bodies.try_borrow(collider.body()) else {
                continue;
            };
            if !body.is_enabled() {
                continue;
            }
            quadtree.insert(handle, collider.shape().bounding_box());
        }
    }

    fn update_overlaps(&mut self) {
        self.quadtree.collect_pairs(&mut self.candidates);

        self.scratch_overlaps.clear();
        let Self {
            colliders,
            candidates,
            scratch_overlaps,
            ..
        } = self;
        for (a, b) in candidates.iter() {
            let (Some(collider_a), Some(collider_b)) =
                (colliders.try_borrow(*a), colliders.try_borrow(*b))
            else {
                continue;
            };
            // Sibling colliders share a body and never collide.
            if collider_a.body() == collider_b.body() {
                continue;
            }
            if collider_a.shape().is_intersects(collider_b.shape()) {
                scratch_overlaps.insert(ContactKey::new(*a, *b));
            }
        }
    }

    fn collect_events(&mut self) {
        self.events.clear();
        let Self {
            overlaps,
            scratch_overlaps,
            colliders,
            events,
            ..
        } = self;

        for key in scratch_overlaps.difference(overlaps) {
            let (Some(collider_a), Some(collider_b)) =
                (colliders.try_borrow(key.a()), colliders.try_borrow(key.b()))
            else {
                continue;
            };
            let kind = if collider_a.is_trigger() || collider_b.is_trigger() {
                ContactEventKind::TriggerEnter
            } else {
                ContactEventKind::CollisionEnter
            };
            events.push((*key, kind));
        }

        for key in overlaps.difference(scratch_overlaps) {
            // A destroyed participant takes its overlap records with it, so
            // both colliders are normally still alive here; skip otherwise.
            let (Some(collider_a), Some(collider_b)) =
                (colliders.try_borrow(key.a()), colliders.try_borrow(key.b()))
            else {
                continue;
            };
            let kind = if collider_a.is_trigger() || collider_b.is_trigger() {
                ContactEventKind::TriggerExit
            } else {
                ContactEventKind::CollisionExit
            };
            events.push((*key, kind));
        }
    }

    fn dispatch_events(&mut self) -> Option<Box<dyn Any + Send>> {
        let Self {
            contact_listener,
            events,
            ..
        } = self;
        let listener = match contact_listener.as_mut() {
            Some(listener) if !events.is_empty() => listener,
            _ => return None,
        };

        catch_unwind(AssertUnwindSafe(|| {
            for (key, kind) in events.iter() {
                match kind {
                    ContactEventKind::TriggerEnter => listener.on_trigger_enter(key.a(), key.b()),
                    ContactEventKind::TriggerExit => listener.on_trigger_exit(key.a(), key.b()),
                    ContactEventKind::CollisionEnter => {
                        listener.on_collision_enter(key.a(), key.b())
                    }
                    ContactEventKind::CollisionExit => listener.on_collision_exit(key.a(), key.b()),
                }
            }
        }))
        .err()
    }

    fn resolve_contacts(&mut self) {
        let Self {
            overlaps,
            colliders,
            bodies,
            ..
        } = self;

        for key in overlaps.iter() {
            let (Some(collider_a), Some(collider_b)) =
                (colliders.try_borrow(key.a()), colliders.try_borrow(key.b()))
            else {
                continue;
            };
            if collider_a.is_trigger() || collider_b.is_trigger() {
                continue;
            }

            let Some(manifold) = contact_manifold(collider_a.shape(), collider_b.shape()) else {
                continue;
            };

            let body_a = collider_a.body();
            let body_b = collider_b.body();
            let restitution = collider_a.restitution().min(collider_b.restitution());

            let (velocity_a, inv_mass_a) = match bodies.try_borrow(body_a) {
                Some(body) => (body.velocity(), body.inv_mass()),
                None => continue,
            };
            let (velocity_b, inv_mass_b) = match bodies.try_borrow(body_b) {
                Some(body) => (body.velocity(), body.inv_mass()),
                None => continue,
            };

            let inv_mass_sum = inv_mass_a + inv_mass_b;
            if inv_mass_sum == 0.0 {
                continue;
            }

            // Along the normal; non-negative means the pair already separates.
            let relative_velocity = (velocity_b - velocity_a).dot(&manifold.normal);
            if relative_velocity >= 0.0 {
                continue;
            }

            let impulse = -(1.0 + restitution) * relative_velocity / inv_mass_sum;
            let impulse_vec = manifold.normal.scale(impulse);

            let correction = (manifold.penetration - PENETRATION_SLOP).max(0.0)
                / inv_mass_sum
                * CORRECTION_FACTOR;
            let correction_vec = manifold.normal.scale(correction);

            if let Some(body) = bodies.try_borrow_mut(body_a) {
                body.set_velocity(velocity_a - impulse_vec.scale(inv_mass_a));
                body.set_position(body.position() - correction_vec.scale(inv_mass_a));
            }
            if let Some(body) = bodies.try_borrow_mut(body_b) {
                body.set_velocity(velocity_b + impulse_vec.scale(inv_mass_b));
                body.set_position(body.position() + correction_vec.scale(inv_mass_b));
            }
        }
    }
}
