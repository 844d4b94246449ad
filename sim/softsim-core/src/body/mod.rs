//! Simulated bodies.
//!
//! [`Body`] is a closed set of variants. Everything the integrator, the
//! collision pipeline and the renderer need from a body goes through it, so
//! adding a variant is a compile error everywhere it must be handled.

mod particle;
mod rigid_body;
mod soft_body;
mod static_body;

pub use particle::Particle;
pub use rigid_body::RigidBody;
pub use soft_body::SoftBody;
pub use static_body::StaticBody;

use nalgebra::{Point3, Vector3};
use softsim_types::{BodyKind, Face, Gravity, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mesh::BodyMesh;

/// Any simulated body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Body {
    /// Immovable scenery.
    Static(StaticBody),
    /// Point mass.
    Particle(Particle),
    /// Deformable surface.
    Soft(SoftBody),
    /// Rigid mesh.
    Rigid(RigidBody),
}

impl Body {
    /// Which model this body follows.
    #[must_use]
    pub fn kind(&self) -> BodyKind {
        match self {
            Self::Static(_) => BodyKind::Static,
            Self::Particle(_) => BodyKind::Particle,
            Self::Soft(_) => BodyKind::Soft,
            Self::Rigid(_) => BodyKind::Rigid,
        }
    }

    /// Whether this body is immovable.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    /// Surface geometry.
    #[must_use]
    pub fn mesh(&self) -> &BodyMesh {
        match self {
            Self::Static(b) => b.mesh(),
            Self::Particle(b) => b.mesh(),
            Self::Soft(b) => b.mesh(),
            Self::Rigid(b) => b.mesh(),
        }
    }

    /// Mean vertex position.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.mesh().center()
    }

    /// Bounding sphere radius used by the broad phase.
    ///
    /// For particles this also covers the collision radius, so a particle
    /// whose collision sphere is larger than its mesh is never culled.
    #[must_use]
    pub fn radius(&self) -> f64 {
        match self {
            Self::Particle(p) => p.mesh().radius().max(p.collision_radius()),
            _ => self.mesh().radius(),
        }
    }

    /// Mass; infinite for static bodies.
    #[must_use]
    pub fn mass(&self) -> f64 {
        match self {
            Self::Static(_) => f64::INFINITY,
            Self::Particle(b) => b.mass(),
            Self::Soft(b) => b.mass(),
            Self::Rigid(b) => b.mass(),
        }
    }

    /// Linear momentum; zero for static bodies.
    #[must_use]
    pub fn momentum(&self) -> Vector3<f64> {
        match self {
            Self::Static(_) => Vector3::zeros(),
            Self::Particle(b) => b.momentum(),
            Self::Soft(b) => b.momentum(),
            Self::Rigid(b) => b.momentum(),
        }
    }

    /// Triangle faces.
    #[must_use]
    pub fn faces(&self) -> &[Face] {
        self.mesh().faces()
    }

    /// Advance this body alone by `dt`.
    ///
    /// Reads and writes nothing outside the body, so distinct bodies can be
    /// updated concurrently.
    pub fn update(&mut self, dt: f64, gravity: &Gravity) {
        match self {
            Self::Static(_) => {}
            Self::Particle(b) => b.integrate(dt, gravity),
            Self::Soft(b) => b.integrate(dt, gravity),
            Self::Rigid(b) => b.integrate(dt, gravity),
        }
    }

    /// Flattened interleaved vertex buffer (`[x, y, z, nx, ny, nz, u, v]`
    /// per vertex) as of the last [`Body::refresh_vertex_buffer`].
    #[must_use]
    pub fn vertex_snapshot(&self) -> &[f64] {
        self.mesh().buffer()
    }

    /// Copy current vertex positions into the render buffer.
    ///
    /// Static bodies keep the buffer their shape supplied.
    pub fn refresh_vertex_buffer(&mut self) {
        match self {
            Self::Static(_) => {}
            Self::Particle(b) => b.refresh_buffer(),
            Self::Soft(b) => b.refresh_buffer(),
            Self::Rigid(b) => b.refresh_buffer(),
        }
    }

    /// Overwrite vertex positions from a recorded snapshot and refresh the
    /// render buffer, whose normals become the center-to-vertex directions.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ImmovableBody`] for static bodies and
    /// [`SimError::SnapshotMismatch`] if the vertex count differs.
    pub fn assign(&mut self, positions: &[Point3<f64>]) -> crate::Result<()> {
        match self {
            Self::Static(_) => return Err(SimError::ImmovableBody),
            Self::Particle(b) => b.assign(positions)?,
            Self::Soft(b) => b.assign(positions)?,
            Self::Rigid(b) => b.assign(positions)?,
        }
        self.refresh_vertex_buffer();
        Ok(())
    }

    /// Whether every position and velocity is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        let positions_finite = self
            .mesh()
            .positions()
            .iter()
            .all(|p| p.iter().all(|c| c.is_finite()));
        let finite = |v: &Vector3<f64>| v.iter().all(|c| c.is_finite());

        positions_finite
            && match self {
                Self::Static(_) => true,
                Self::Particle(b) => finite(&b.velocity()),
                Self::Soft(b) => b.velocities().iter().all(finite),
                Self::Rigid(b) => {
                    finite(&b.velocity()) && b.angular_speed().is_finite()
                }
            }
    }

    /// Borrow as a particle.
    #[must_use]
    pub fn as_particle(&self) -> Option<&Particle> {
        match self {
            Self::Particle(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow as a soft body.
    #[must_use]
    pub fn as_soft(&self) -> Option<&SoftBody> {
        match self {
            Self::Soft(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow as a rigid body.
    #[must_use]
    pub fn as_rigid(&self) -> Option<&RigidBody> {
        match self {
            Self::Rigid(b) => Some(b),
            _ => None,
        }
    }

    /// Mutably borrow as a particle.
    #[must_use]
    pub fn as_particle_mut(&mut self) -> Option<&mut Particle> {
        match self {
            Self::Particle(b) => Some(b),
            _ => None,
        }
    }

    /// Mutably borrow as a rigid body.
    #[must_use]
    pub fn as_rigid_mut(&mut self) -> Option<&mut RigidBody> {
        match self {
            Self::Rigid(b) => Some(b),
            _ => None,
        }
    }
}

impl From<StaticBody> for Body {
    fn from(body: StaticBody) -> Self {
        Self::Static(body)
    }
}

impl From<Particle> for Body {
    fn from(body: Particle) -> Self {
        Self::Particle(body)
    }
}

impl From<SoftBody> for Body {
    fn from(body: SoftBody) -> Self {
        Self::Soft(body)
    }
}

impl From<RigidBody> for Body {
    fn from(body: RigidBody) -> Self {
        Self::Rigid(body)
    }
}
