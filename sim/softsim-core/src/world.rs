//! The simulation world.
//!
//! Bodies live in one contiguous `Vec` so the integrator can fan out over
//! them and the collision pass can split-borrow any two. A [`BodyId`] stays
//! valid for the body's lifetime regardless of where it sits in that `Vec`.

use hashbrown::HashMap;
use nalgebra::Vector3;
use softsim_types::{BodyId, SimError, SimulationConfig};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::Body;

/// Fraction of a frame by which the time may fall short of `max_time` and
/// still be complete.
const TIME_SLACK: f64 = 1e-6;

/// The simulation world containing all bodies.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct World {
    /// Simulation configuration.
    config: SimulationConfig,
    /// Current simulation time.
    time: f64,
    /// Frame counter.
    step_count: u64,
    /// Bodies in insertion order.
    bodies: Vec<Body>,
    /// Id of the body in the same slot of `bodies`.
    ids: Vec<BodyId>,
    /// Id to slot.
    slots: HashMap<BodyId, usize>,
    /// Next available body ID.
    next_body_id: u64,
    /// Body name to ID mapping.
    body_names: HashMap<String, BodyId>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            time: 0.0,
            step_count: 0,
            bodies: Vec::new(),
            ids: Vec::new(),
            slots: HashMap::new(),
            next_body_id: 1,
            body_names: HashMap::new(),
        }
    }

    /// Simulation configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Mutable simulation configuration.
    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of frames stepped.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Frame timestep from the configuration.
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.config.timestep
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // =========================================================================
    // Body Management
    // =========================================================================

    /// Add a body and return its ID.
    pub fn add_body(&mut self, body: impl Into<Body>) -> BodyId {
        let body = body.into();
        let id = BodyId::new(self.next_body_id);
        self.next_body_id += 1;

        debug!(%id, kind = %body.kind(), vertices = body.mesh().vertex_count(), "body added");

        self.slots.insert(id, self.bodies.len());
        self.ids.push(id);
        self.bodies.push(body);
        id
    }

    /// Add a body under a unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if another body already has this name.
    pub fn add_named_body(
        &mut self,
        name: impl Into<String>,
        body: impl Into<Body>,
    ) -> crate::Result<BodyId> {
        let name = name.into();
        if self.body_names.contains_key(&name) {
            return Err(SimError::invalid_config(format!(
                "body name {name:?} already exists"
            )));
        }

        let id = self.add_body(body);
        self.body_names.insert(name, id);
        Ok(id)
    }

    /// Get a body by ID.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.slots.get(&id).map(|&slot| &self.bodies[slot])
    }

    /// Get a mutable reference to a body by ID.
    #[must_use]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let slot = *self.slots.get(&id)?;
        self.bodies.get_mut(slot)
    }

    /// Get a body by ID, or an error naming the missing ID.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBodyId`] if no such body exists.
    pub fn try_body(&self, id: BodyId) -> crate::Result<&Body> {
        self.body(id).ok_or(SimError::InvalidBodyId(id.raw()))
    }

    /// Get a body by name.
    #[must_use]
    pub fn body_by_name(&self, name: &str) -> Option<&Body> {
        self.body_names.get(name).and_then(|&id| self.body(id))
    }

    /// Get a mutable reference to a body by name.
    #[must_use]
    pub fn body_by_name_mut(&mut self, name: &str) -> Option<&mut Body> {
        let id = *self.body_names.get(name)?;
        self.body_mut(id)
    }

    /// Look up a body ID by name.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::BodyNotFound`] if no body has this name.
    pub fn id_of(&self, name: &str) -> crate::Result<BodyId> {
        self.body_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::BodyNotFound {
                name: name.to_owned(),
            })
    }

    /// Remove a body.
    ///
    /// The remaining bodies keep their relative order.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let slot = self.slots.remove(&id)?;
        self.ids.remove(slot);
        let body = self.bodies.remove(slot);

        for (offset, moved) in self.ids[slot..].iter().enumerate() {
            self.slots.insert(*moved, slot + offset);
        }
        self.body_names.retain(|_, named| *named != id);

        debug!(%id, "body removed");
        Some(body)
    }

    /// All bodies, in insertion order.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// All bodies, mutably, in insertion order.
    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// IDs in the same order as [`World::bodies`].
    #[must_use]
    pub fn body_ids(&self) -> &[BodyId] {
        &self.ids
    }

    /// Iterate over `(id, body)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.ids.iter().copied().zip(&self.bodies)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Total linear momentum of all movable bodies.
    #[must_use]
    pub fn total_momentum(&self) -> Vector3<f64> {
        self.bodies.iter().map(Body::momentum).sum()
    }

    // =========================================================================
    // Simulation Control
    // =========================================================================

    /// Advance the simulation time (called by the stepper).
    pub(crate) fn advance_time(&mut self, dt: f64) {
        self.time += dt;
        self.step_count += 1;
    }

    /// Reset simulation time to zero.
    pub fn reset_time(&mut self) {
        self.time = 0.0;
        self.step_count = 0;
    }

    /// Whether the simulation has reached `max_time`, if one is configured.
    ///
    /// Time is a running sum of frame timesteps, so it may fall a rounding
    /// error short of a `max_time` that is a whole number of frames; anything
    /// within a millionth of a frame counts as reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let slack = TIME_SLACK * self.config.timestep;
        self.config.max_time.is_some_and(|max| self.time >= max - slack)
    }

    /// Validate the world state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or any body has a
    /// non-finite position or velocity.
    pub fn validate(&self) -> crate::Result<()> {
        self.config.validate()?;

        for (id, body) in self.iter() {
            if !body.is_finite() {
                return Err(SimError::diverged(format!(
                    "{} body {id} has non-finite state",
                    body.kind()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::{Particle, StaticBody};
    use nalgebra::Point3;
    use softsim_types::{shapes, BodyKind};

    fn ball(x: f64) -> Particle {
        Particle::sphere(Point3::new(x, 0.0, 0.0), 0.5, 1.0).unwrap()
    }

    #[test]
    fn test_add_and_lookup() {
        let mut world = World::default();
        let a = world.add_body(ball(0.0));
        let b = world
            .add_named_body("floor", StaticBody::new(&shapes::cube(Point3::origin(), 1.0).unwrap()))
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(world.body_count(), 2);
        assert_eq!(world.body(a).unwrap().kind(), BodyKind::Particle);
        assert_eq!(world.body_by_name("floor").unwrap().kind(), BodyKind::Static);
        assert_eq!(world.id_of("floor").unwrap(), b);
        assert_eq!(world.body_ids(), &[a, b]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut world = World::default();
        world.add_named_body("ball", ball(0.0)).unwrap();
        let err = world.add_named_body("ball", ball(1.0)).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_missing_lookups() {
        let world = World::default();
        assert!(world.body(BodyId::new(7)).is_none());
        assert_eq!(world.try_body(BodyId::new(7)).unwrap_err(), SimError::InvalidBodyId(7));
        assert!(matches!(world.id_of("nope"), Err(SimError::BodyNotFound { .. })));
    }

    #[test]
    fn test_remove_keeps_order_and_ids() {
        let mut world = World::default();
        let a = world.add_body(ball(0.0));
        let b = world.add_named_body("b", ball(1.0)).unwrap();
        let c = world.add_body(ball(2.0));

        let removed = world.remove_body(b).unwrap();
        assert_eq!(removed.kind(), BodyKind::Particle);
        assert!(world.body(b).is_none());
        assert!(world.body_by_name("b").is_none());

        assert_eq!(world.body_ids(), &[a, c]);
        assert_eq!(world.body(c).unwrap().center().x.round(), 2.0);
        assert!(world.remove_body(b).is_none());

        // IDs are never reused.
        let d = world.add_body(ball(3.0));
        assert_ne!(d, b);
    }

    #[test]
    fn test_momentum_and_validation() {
        let mut world = World::default();
        world.add_body(ball(0.0).with_velocity(Vector3::new(1.0, 0.0, 0.0)));
        world.add_body(ball(5.0).with_velocity(Vector3::new(0.0, 2.0, 0.0)));

        assert_eq!(world.total_momentum(), Vector3::new(1.0, 2.0, 0.0));
        assert!(world.validate().is_ok());

        world.bodies_mut()[0]
            .as_particle_mut()
            .unwrap()
            .set_velocity(Vector3::new(f64::NAN, 0.0, 0.0));
        assert!(world.validate().unwrap_err().is_diverged());
    }

    #[test]
    fn test_time_and_completion() {
        let mut world = World::new(SimulationConfig::default().max_time(0.1));
        assert!(!world.is_complete());
        for _ in 0..6 {
            world.advance_time(1.0 / 60.0);
        }
        assert_eq!(world.step_count(), 6);
        // Six sixtieths sum to a hair under 0.1.
        assert!(world.time() <= 0.1);
        assert!(world.is_complete());

        world.reset_time();
        assert_eq!(world.time(), 0.0);
    }

    #[test]
    fn test_not_complete_a_frame_early() {
        let mut world = World::new(SimulationConfig::default().max_time(0.1));
        for _ in 0..5 {
            world.advance_time(1.0 / 60.0);
        }
        assert!(!world.is_complete());
    }
}
