//! Integration, collision detection and response for soft, rigid and
//! particle bodies.
//!
//! This crate advances meshes built from [`softsim_types::Shape`] frame by
//! frame. Soft bodies are spring-mass networks inflated by internal
//! pressure, rigid bodies carry linear and angular momentum, particles are
//! translating spheres, and static bodies are fixed scenery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Stepper                               │
//! │  Per frame: N × (integrate → collide), then refresh buffers │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         World                                │
//! │  Contains: bodies (contiguous), ids, names, configuration   │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!                ▼                              ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │       Integrators         │   │      CollisionPipeline        │
//! │  one body at a time,      │   │  broad phase: sphere overlap  │
//! │  parallel with `parallel` │   │  narrow phase: per kind pair  │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use softsim_core::{Particle, StaticBody, Stepper, World};
//! use softsim_types::{shapes, SimulationConfig};
//! use nalgebra::{Point3, UnitQuaternion, Vector3};
//!
//! let mut world = World::new(SimulationConfig::default());
//!
//! // A floor whose top face is at y = 0
//! let floor = shapes::rect_prism(
//!     Point3::new(0.0, -1.0, 0.0),
//!     Vector3::new(5.0, 1.0, 5.0),
//!     UnitQuaternion::identity(),
//! )
//! .unwrap();
//! world.add_body(StaticBody::new(&floor));
//!
//! // A ball dropped onto it
//! let ball = world.add_body(Particle::sphere(Point3::new(0.0, 2.0, 0.0), 0.5, 1.0).unwrap());
//!
//! let mut stepper = Stepper::new();
//! stepper.run_for(&mut world, 1.0).unwrap();
//!
//! // Resting on or bouncing above the floor, never through it
//! assert!(world.body(ball).unwrap().center().y > 0.0);
//! ```
//!
//! # Body Models
//!
//! | Body | State | Collides as |
//! |------|-------|-------------|
//! | [`StaticBody`] | fixed vertices | immovable hull |
//! | [`Particle`] | position, velocity | sphere, or mesh against a hull |
//! | [`SoftBody`] | per-vertex position and velocity | vertices against hulls |
//! | [`RigidBody`] | position, velocity, orientation, spin | support-plane contact |
//!
//! # Rendering
//!
//! Every body keeps an interleaved `[x, y, z, nx, ny, nz, u, v]` buffer that
//! the stepper refreshes once per frame; read it with
//! [`Body::vertex_snapshot`].

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::cast_possible_truncation,  // mesh indices fit in u32
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod body;
pub mod broad_phase;
pub mod collision;
pub mod geometry;
pub mod integrators;
mod mesh;
pub mod narrow_phase;
pub mod replay;
mod stepper;
mod world;

pub use body::{Body, Particle, RigidBody, SoftBody, StaticBody};
pub use broad_phase::{
    Axis, BoundingSphere, BroadPhase, BroadPhaseAlgorithm, BroadPhaseConfig, BroadPhaseDetector,
    BruteForce, SweepAndPrune,
};
pub use collision::{resolve_all, CollisionPipeline, CollisionStats};
pub use mesh::{BodyMesh, HullPenetration, HullView};
pub use narrow_phase::{ContactKind, ContactReport, DefaultNarrowPhase, NarrowPhase};
pub use replay::{Playback, Recorder, Recording};
pub use stepper::{StepResult, Stepper, StepperConfig};
pub use world::World;

// Re-export key types from softsim-types for convenience
pub use softsim_types::{
    BodyId, BodyKind, ContactConfig, Gravity, Result, SimError, SimulationConfig, SoftBodyParams,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use softsim_types::shapes;

    #[test]
    fn test_momentum_conservation_in_zero_gravity() {
        let mut world = World::new(SimulationConfig::default().zero_gravity());
        world.add_body(
            Particle::sphere(Point3::new(-2.0, 0.0, 0.0), 0.5, 1.0)
                .unwrap()
                .with_velocity(Vector3::new(3.0, 0.0, 0.0)),
        );
        world.add_body(
            Particle::sphere(Point3::new(2.0, 0.1, 0.0), 0.5, 2.0)
                .unwrap()
                .with_velocity(Vector3::new(-1.0, 0.0, 0.0)),
        );
        let initial = world.total_momentum();

        let results = Stepper::new().run_for(&mut world, 2.0).unwrap();

        assert!(results.iter().any(|r| r.contacts.contact_pairs > 0));
        assert_relative_eq!(world.total_momentum(), initial, epsilon = 1e-9);
    }

    #[test]
    fn test_soft_body_settles_on_floor() {
        let mut world = World::default();
        world.add_body(StaticBody::new(
            &shapes::rect_prism(
                Point3::new(0.0, -1.0, 0.0),
                Vector3::new(5.0, 1.0, 5.0),
                nalgebra::UnitQuaternion::identity(),
            )
            .unwrap(),
        ));
        let ball = world.add_body(
            SoftBody::new(
                &shapes::icosphere(1, Point3::new(0.0, 1.5, 0.0), 1.0).unwrap(),
                1.0,
                SoftBodyParams::default(),
            )
            .unwrap(),
        );

        Stepper::new().run_for(&mut world, 1.0).unwrap();

        let soft = world.body(ball).unwrap().as_soft().unwrap();
        assert!(soft.volume() > 0.0);
        assert!(soft.mesh().center().y > 0.0);
    }
}
