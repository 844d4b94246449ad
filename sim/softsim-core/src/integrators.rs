//! Per-body time integration.
//!
//! Each body model advances itself with a semi-implicit (symplectic) Euler
//! step: velocities first, then positions from the new velocities.
//!
//! ```text
//! v(t+dt) = v(t) + a(t) * dt
//! x(t+dt) = x(t) + v(t+dt) * dt
//! ```
//!
//! # Example
//!
//! ```
//! use softsim_core::integrators::Integrator;
//! use softsim_core::Particle;
//! use softsim_types::Gravity;
//! use nalgebra::Point3;
//!
//! let mut particle = Particle::sphere(Point3::new(0.0, 10.0, 0.0), 0.5, 1.0).unwrap();
//!
//! Integrator::step(&mut particle, 0.01, &Gravity::earth());
//!
//! assert!(particle.position().y < 10.0);
//! assert!(particle.velocity().y < 0.0);
//! ```

use softsim_types::Gravity;

use crate::body::{Body, Particle, RigidBody, SoftBody, StaticBody};

/// Something that can advance itself in time without touching other bodies.
///
/// Implementors must only read and write their own state, which is what
/// lets [`integrate_all`] fan out across threads.
pub trait Integrator {
    /// Advance by `dt` seconds under `gravity`.
    fn step(&mut self, dt: f64, gravity: &Gravity);
}

impl Integrator for StaticBody {
    fn step(&mut self, _dt: f64, _gravity: &Gravity) {}
}

impl Integrator for Particle {
    fn step(&mut self, dt: f64, gravity: &Gravity) {
        self.integrate(dt, gravity);
    }
}

impl Integrator for SoftBody {
    fn step(&mut self, dt: f64, gravity: &Gravity) {
        self.integrate(dt, gravity);
    }
}

impl Integrator for RigidBody {
    fn step(&mut self, dt: f64, gravity: &Gravity) {
        self.integrate(dt, gravity);
    }
}

impl Integrator for Body {
    fn step(&mut self, dt: f64, gravity: &Gravity) {
        self.update(dt, gravity);
    }
}

/// Advance every body by `dt`.
///
/// With the `parallel` feature the bodies are integrated concurrently via
/// rayon `par_iter_mut`; otherwise sequentially. Results are identical
/// either way since no body reads another's state.
pub fn integrate_all(bodies: &mut [Body], dt: f64, gravity: &Gravity) {
    #[cfg(feature = "parallel")]
    {
        use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
        bodies
            .par_iter_mut()
            .for_each(|body| body.update(dt, gravity));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for body in bodies.iter_mut() {
            body.update(dt, gravity);
        }
    }
}
