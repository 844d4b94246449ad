//! Spring-mass-pressure deformable bodies.
//!
//! A soft body is a closed triangle surface whose vertices carry their own
//! velocity. Every face edge is a damped spring, and a uniform internal
//! pressure pushes each face outward in proportion to its area, which keeps
//! the body inflated:
//!
//! ```text
//!          pressure
//!        ↖    ↑    ↗
//!         ●───────●
//!        ╱ ╲  k  ╱ ╲
//!       ╱   ╲   ╱   ╲
//!      ●─────●─────●
//!   springs + damping on every face edge
//! ```
//!
//! Forces are applied directly as velocity changes, so the parameters in
//! [`SoftBodyParams`] are per unit vertex mass.

use nalgebra::{Point3, Vector3};
use softsim_types::{Gravity, RestLength, Shape, SimError, SoftBodyParams};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{face_normal, heron_area, safe_normalize};
use crate::mesh::BodyMesh;

/// A deformable surface mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SoftBody {
    mesh: BodyMesh,
    velocities: Vec<Vector3<f64>>,
    /// Rest length of edge `k` of each face, where edge `k` runs from
    /// vertex `k` to vertex `(k + 1) % 3`.
    rest_lengths: Vec<[f64; 3]>,
    params: SoftBodyParams,
    mass: f64,
    /// Whether the last integration step had to clamp the volume.
    volume_clamped: bool,
}

impl SoftBody {
    /// Create a soft body at rest.
    ///
    /// `mass` is spread evenly over the vertices.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape has no faces, `mass` is not positive
    /// and finite, or `params` fail validation.
    pub fn new(shape: &Shape, mass: f64, params: SoftBodyParams) -> crate::Result<Self> {
        if shape.face_count() == 0 {
            return Err(SimError::invalid_shape("soft body needs at least one face"));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::invalid_mass(format!(
                "soft body mass must be positive, got {mass}"
            )));
        }
        params.validate()?;

        let mesh = BodyMesh::from_shape(shape);
        let rest_lengths = rest_lengths(&mesh, params.rest_length);

        Ok(Self {
            velocities: vec![Vector3::zeros(); mesh.vertex_count()],
            mesh,
            rest_lengths,
            params,
            mass,
            volume_clamped: false,
        })
    }

    /// Give every vertex the same initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocities.fill(velocity);
        self
    }

    /// Surface geometry.
    #[must_use]
    pub fn mesh(&self) -> &BodyMesh {
        &self.mesh
    }

    /// Per-vertex velocities in slot order.
    #[must_use]
    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    /// Model parameters.
    #[must_use]
    pub fn params(&self) -> &SoftBodyParams {
        &self.params
    }

    /// Total mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Mass carried by each vertex.
    #[must_use]
    pub fn vertex_mass(&self) -> f64 {
        self.mass / self.mesh.vertex_count() as f64
    }

    /// Rest lengths per face edge.
    #[must_use]
    pub fn rest_lengths(&self) -> &[[f64; 3]] {
        &self.rest_lengths
    }

    /// Enclosed volume measured from the current center.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.mesh.volume()
    }

    /// Mean vertex velocity.
    #[must_use]
    pub fn mean_velocity(&self) -> Vector3<f64> {
        self.velocities.iter().sum::<Vector3<f64>>() / self.velocities.len() as f64
    }

    /// Linear momentum summed over vertices.
    #[must_use]
    pub fn momentum(&self) -> Vector3<f64> {
        self.velocities.iter().sum::<Vector3<f64>>() * self.vertex_mass()
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut BodyMesh, &mut [Vector3<f64>]) {
        (&mut self.mesh, &mut self.velocities)
    }

    /// Advance by `dt`.
    ///
    /// Pressure, spring and damping contributions are accumulated face by
    /// face from the positions at the start of the step, then gravity, then
    /// every vertex moves with its new velocity.
    pub fn integrate(&mut self, dt: f64, gravity: &Gravity) {
        let volume = self.clamped_volume();
        let winding = self.mesh.winding();
        let SoftBodyParams {
            spring_constant,
            damping,
            pressure,
            ..
        } = self.params;

        let positions = self.mesh.positions();
        for (face, rest) in self.mesh.faces().iter().zip(&self.rest_lengths) {
            let [a, b, c] = *face;
            let (pa, pb, pc) = (&positions[a], &positions[b], &positions[c]);

            let normal = face_normal(pa, pb, pc, winding);
            let push = normal * (heron_area(pa, pb, pc) / volume * pressure * dt);
            for &i in face {
                self.velocities[i] += push;
            }

            for k in 0..3 {
                let (i, j) = (face[k], face[(k + 1) % 3]);
                let edge = positions[j] - positions[i];
                let dir = safe_normalize(&edge);

                let spring = dir * ((edge.norm() - rest[k]) * spring_constant * dt);
                let relative = self.velocities[i] - self.velocities[j];
                let drag = dir * (relative.dot(&dir) * damping * dt);

                self.velocities[i] += spring - drag;
                self.velocities[j] -= spring - drag;
            }
        }

        if self.params.gravity {
            let dv = gravity.velocity_change(dt);
            for v in &mut self.velocities {
                *v += dv;
            }
        }

        for (p, v) in self.mesh.positions_mut().iter_mut().zip(&self.velocities) {
            *p += v * dt;
        }
        self.mesh.recompute_bounds();
    }

    fn clamped_volume(&mut self) -> f64 {
        let volume = self.mesh.volume();
        let min_volume = self.params.min_volume;
        let clamped = volume < min_volume;

        if clamped && !self.volume_clamped {
            warn!(volume, min_volume, "soft body volume collapsed, clamping");
        }
        self.volume_clamped = clamped;

        volume.max(min_volume)
    }

    /// Overwrite vertex positions from a recorded snapshot.
    pub(crate) fn assign(&mut self, positions: &[Point3<f64>]) -> crate::Result<()> {
        self.mesh.set_positions(positions)
    }

    pub(crate) fn refresh_buffer(&mut self) {
        self.mesh.refresh_buffer();
    }
}

fn rest_lengths(mesh: &BodyMesh, policy: RestLength) -> Vec<[f64; 3]> {
    let positions = mesh.positions();
    let initial: Vec<[f64; 3]> = mesh
        .faces()
        .iter()
        .map(|face| {
            std::array::from_fn(|k| {
                nalgebra::distance(&positions[face[k]], &positions[face[(k + 1) % 3]])
            })
        })
        .collect();

    match policy {
        RestLength::Initial => initial,
        RestLength::Absolute(len) => vec![[len; 3]; initial.len()],
        RestLength::MeanEdgeFraction(fraction) => {
            let count = initial.len() * 3;
            let mean = initial.iter().flatten().sum::<f64>() / count as f64;
            vec![[mean * fraction; 3]; initial.len()]
        }
    }
}
