//! The frame driver.
//!
//! One call to [`Stepper::step`] advances a [`World`] by one frame:
//!
//! ```text
//! for each sub-step:
//!     update every body          (parallel with the `parallel` feature)
//!     resolve all contacts       (sequential, one pair at a time)
//! refresh vertex buffers
//! check every body is finite
//! ```
//!
//! # Example
//!
//! ```
//! use softsim_core::{Particle, Stepper, World};
//! use softsim_types::SimulationConfig;
//! use nalgebra::Point3;
//!
//! let mut world = World::new(SimulationConfig::default());
//! world.add_body(Particle::sphere(Point3::new(0.0, 10.0, 0.0), 0.5, 1.0).unwrap());
//!
//! let mut stepper = Stepper::new();
//! for _ in 0..30 {
//!     stepper.step(&mut world).unwrap();
//! }
//!
//! // The particle has fallen.
//! assert!(world.bodies()[0].center().y < 10.0);
//! ```

use softsim_types::SimError;
use tracing::{debug, error};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::broad_phase::BroadPhaseConfig;
use crate::collision::{CollisionPipeline, CollisionStats};
use crate::integrators::integrate_all;
use crate::world::World;

/// Result of a simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Simulation time after the step.
    pub time: f64,
    /// Frame number after the step.
    pub frame: u64,
    /// Collision work summed over the frame's sub-steps.
    pub contacts: CollisionStats,
    /// Whether simulation has completed (reached `max_time`).
    pub completed: bool,
}

/// Configuration for the stepper.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepperConfig {
    /// Whether to detect and resolve contacts each sub-step.
    pub enable_contacts: bool,
    /// Whether to copy positions into the vertex buffers after each frame.
    pub refresh_buffers: bool,
    /// Broad-phase settings.
    pub broad_phase: BroadPhaseConfig,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            enable_contacts: true,
            refresh_buffers: true,
            broad_phase: BroadPhaseConfig::default(),
        }
    }
}

impl StepperConfig {
    /// Create config without contacts (free-fall simulation).
    #[must_use]
    pub fn no_contacts() -> Self {
        Self {
            enable_contacts: false,
            ..Default::default()
        }
    }

    /// Create config that skips vertex buffer upkeep, for runs nobody draws.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            refresh_buffers: false,
            ..Default::default()
        }
    }

    /// Enable or disable contact resolution.
    #[must_use]
    pub fn with_contacts(mut self, enable: bool) -> Self {
        self.enable_contacts = enable;
        self
    }

    /// Use the given broad-phase settings.
    #[must_use]
    pub fn with_broad_phase(mut self, broad_phase: BroadPhaseConfig) -> Self {
        self.broad_phase = broad_phase;
        self
    }
}

/// The simulation stepper orchestrates the frame loop.
#[derive(Debug, Clone)]
pub struct Stepper {
    /// Stepper configuration.
    config: StepperConfig,
    /// Broad and narrow phase, reused across frames.
    pipeline: CollisionPipeline,
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new()
    }
}

impl Stepper {
    /// Create a new stepper with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StepperConfig::default())
    }

    /// Create a stepper with custom configuration.
    #[must_use]
    pub fn with_config(config: StepperConfig) -> Self {
        debug!(
            contacts = config.enable_contacts,
            broad_phase = ?config.broad_phase.algorithm,
            "stepper configured"
        );
        let pipeline = CollisionPipeline::default().broad_phase_config(config.broad_phase.clone());
        Self { config, pipeline }
    }

    /// Get the stepper configuration.
    #[must_use]
    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Execute one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The world configuration or broad-phase settings are invalid
    /// - Any body has a non-finite position or velocity before or after the
    ///   frame
    pub fn step(&mut self, world: &mut World) -> crate::Result<StepResult> {
        world.validate()?;
        self.config.broad_phase.validate()?;

        let config = world.config().clone();
        let dt = config.substep_dt();
        self.pipeline.set_contact(config.contact);

        let mut contacts = CollisionStats::default();
        for _ in 0..config.substeps.max(1) {
            integrate_all(world.bodies_mut(), dt, &config.gravity);

            if self.config.enable_contacts {
                contacts.accumulate(&self.pipeline.resolve_all(world.bodies_mut()));
            }
        }

        if self.config.refresh_buffers {
            for body in world.bodies_mut() {
                body.refresh_vertex_buffer();
            }
        }

        world.advance_time(config.timestep);

        if let Err(err) = world.validate() {
            error!(time = world.time(), frame = world.step_count(), %err, "simulation diverged");
            return Err(err);
        }

        Ok(StepResult {
            time: world.time(),
            frame: world.step_count(),
            contacts,
            completed: world.is_complete(),
        })
    }

    /// Run the simulation until completion or max frames.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Neither `max_frames` nor the world's `max_time` bounds the run
    /// - Any step fails
    pub fn run(
        &mut self,
        world: &mut World,
        max_frames: Option<u64>,
    ) -> crate::Result<Vec<StepResult>> {
        if max_frames.is_none() && world.config().max_time.is_none() {
            return Err(SimError::invalid_config(
                "run needs max_frames or a configured max_time",
            ));
        }

        let mut results = Vec::new();

        loop {
            let result = self.step(world)?;
            results.push(result);

            if result.completed || max_frames.is_some_and(|max| results.len() as u64 >= max) {
                break;
            }
        }

        Ok(results)
    }

    /// Run for a specific duration.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails.
    pub fn run_for(&mut self, world: &mut World, duration: f64) -> crate::Result<Vec<StepResult>> {
        let target_time = world.time() + duration;
        let dt = world.timestep();
        // Safe cast: duration and dt are positive, result is bounded
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let estimated_frames = (duration / dt).ceil().max(1.0) as usize;
        let mut results = Vec::with_capacity(estimated_frames);

        for _ in 0..estimated_frames {
            if world.time() >= target_time {
                break;
            }
            let result = self.step(world)?;
            results.push(result);

            if result.completed {
                break;
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::{Particle, StaticBody};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, UnitQuaternion, Vector3};
    use softsim_types::{shapes, SimulationConfig};

    fn floor() -> StaticBody {
        StaticBody::new(
            &shapes::rect_prism(
                Point3::new(0.0, -1.0, 0.0),
                Vector3::new(5.0, 1.0, 5.0),
                UnitQuaternion::identity(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_free_fall() {
        let mut world = World::default();
        world.add_body(Particle::sphere(Point3::new(0.0, 100.0, 0.0), 0.5, 1.0).unwrap());

        let mut stepper = Stepper::with_config(StepperConfig::no_contacts());
        let results = stepper.run_for(&mut world, 0.5).unwrap();

        assert!(!results.is_empty());
        let particle = world.bodies()[0].as_particle().unwrap();
        // Semi-implicit Euler gains exactly g·dt per sub-step.
        assert_relative_eq!(particle.velocity().y, -9.81 * world.time(), epsilon = 1e-9);
        assert!(particle.position().y < 100.0);
    }

    #[test]
    fn test_frame_counting_and_completion() {
        let mut world = World::new(SimulationConfig::default().max_time(0.04));
        world.add_body(Particle::sphere(Point3::origin(), 0.5, 1.0).unwrap());

        let mut stepper = Stepper::new();
        let results = stepper.run(&mut world, Some(100)).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.last().unwrap().completed);
        assert_eq!(results.last().unwrap().frame, 3);
        assert_eq!(world.step_count(), 3);
    }

    #[test]
    fn test_run_stops_on_whole_frame_max_time() {
        let mut world = World::new(SimulationConfig::default().max_time(0.1));
        world.add_body(Particle::sphere(Point3::origin(), 0.5, 1.0).unwrap());

        let results = Stepper::new().run(&mut world, None).unwrap();

        assert_eq!(results.len(), 6);
        assert!(results[5].completed);
    }

    #[test]
    fn test_unbounded_run_rejected() {
        let mut world = World::default();
        world.add_body(Particle::sphere(Point3::origin(), 0.5, 1.0).unwrap());

        let err = Stepper::new().run(&mut world, None).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(world.step_count(), 0);
    }

    #[test]
    fn test_run_respects_max_frames() {
        let mut world = World::default();
        world.add_body(Particle::sphere(Point3::origin(), 0.5, 1.0).unwrap());

        let results = Stepper::new().run(&mut world, Some(4)).unwrap();
        assert_eq!(results.len(), 4);
        assert!(!results[3].completed);
    }

    #[test]
    fn test_particle_stays_above_floor() {
        let mut world = World::default();
        let floor_id = world.add_body(floor());
        world.add_body(Particle::sphere(Point3::new(0.0, 1.0, 0.0), 0.5, 1.0).unwrap());
        let floor_before = world.body(floor_id).unwrap().clone();

        let mut stepper = Stepper::new();
        let mut touched = false;
        for _ in 0..120 {
            let result = stepper.step(&mut world).unwrap();
            touched |= result.contacts.contact_pairs > 0;
            assert!(world.bodies()[1].center().y > 0.0);
        }

        assert!(touched);
        assert_eq!(world.body(floor_id).unwrap(), &floor_before);
    }

    #[test]
    fn test_contacts_disabled() {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        world.add_body(Particle::sphere(Point3::new(-0.3, 0.0, 0.0), 0.5, 1.0).unwrap());
        world.add_body(Particle::sphere(Point3::new(0.3, 0.0, 0.0), 0.5, 1.0).unwrap());

        let mut stepper = Stepper::with_config(StepperConfig::no_contacts());
        let result = stepper.step(&mut world).unwrap();

        assert_eq!(result.contacts, CollisionStats::default());
        assert_relative_eq!(world.bodies()[0].center().x, -0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_vertex_buffers_refreshed() {
        let mut world = World::default();
        world.add_body(Particle::sphere(Point3::new(0.0, 5.0, 0.0), 0.5, 1.0).unwrap());
        let before = world.bodies()[0].vertex_snapshot().to_vec();

        Stepper::with_config(StepperConfig::headless())
            .step(&mut world)
            .unwrap();
        assert_eq!(world.bodies()[0].vertex_snapshot(), before.as_slice());

        Stepper::new().step(&mut world).unwrap();
        let body = &world.bodies()[0];
        assert_ne!(body.vertex_snapshot(), before.as_slice());
        assert_eq!(body.vertex_snapshot()[1], body.mesh().positions()[0].y);
    }

    #[test]
    fn test_divergence_reported() {
        let mut world = World::default();
        let id = world.add_body(Particle::sphere(Point3::origin(), 0.5, 1.0).unwrap());
        world
            .body_mut(id)
            .unwrap()
            .as_particle_mut()
            .unwrap()
            .set_velocity(Vector3::new(f64::NAN, 0.0, 0.0));

        let err = Stepper::new().step(&mut world).unwrap_err();
        assert!(err.is_diverged());
    }

    #[test]
    fn test_invalid_broad_phase_rejected() {
        let mut world = World::default();
        let config = StepperConfig::default().with_broad_phase(BroadPhaseConfig::default().margin(-1.0));

        let err = Stepper::with_config(config).step(&mut world).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(world.step_count(), 0);
    }
}
