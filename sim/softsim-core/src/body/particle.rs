//! Point-mass bodies carrying a rigid, unrotating mesh.

use nalgebra::{Point3, Vector3};
use softsim_types::{shapes, ContainmentBox, Gravity, Shape, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mesh::BodyMesh;

/// A point mass with a collision radius.
///
/// The mesh never deforms or rotates: each vertex sits at a fixed offset
/// from [`Particle::position`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particle {
    mesh: BodyMesh,
    position: Point3<f64>,
    velocity: Vector3<f64>,
    collision_radius: f64,
    mass: f64,
    rest_offsets: Vec<Vector3<f64>>,
    gravity: bool,
    containment: Option<ContainmentBox>,
}

impl Particle {
    /// Create a particle from a shape.
    ///
    /// The particle sits at the shape center, and its collision radius is
    /// the shape's bounding radius.
    ///
    /// # Errors
    ///
    /// Returns an error if `mass` is not positive and finite.
    pub fn new(shape: &Shape, mass: f64) -> crate::Result<Self> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::invalid_mass(format!(
                "particle mass must be positive, got {mass}"
            )));
        }

        let position = shape.center();
        let rest_offsets = shape.positions().iter().map(|p| p - position).collect();

        Ok(Self {
            mesh: BodyMesh::from_shape(shape),
            position,
            velocity: Vector3::zeros(),
            collision_radius: shape.radius(),
            mass,
            rest_offsets,
            gravity: true,
            containment: None,
        })
    }

    /// A small icosphere particle.
    ///
    /// # Errors
    ///
    /// Returns an error if `radius` or `mass` is not positive and finite.
    pub fn sphere(position: Point3<f64>, radius: f64, mass: f64) -> crate::Result<Self> {
        Self::new(&shapes::icosphere(1, position, radius)?, mass)
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Override the collision radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.collision_radius = radius.max(0.0);
        self
    }

    /// Keep the particle inside an axis-aligned box.
    #[must_use]
    pub fn with_containment(mut self, bounds: ContainmentBox) -> Self {
        self.containment = Some(bounds);
        self
    }

    /// Enable or disable gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: bool) -> Self {
        self.gravity = gravity;
        self
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Current velocity.
    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Overwrite the velocity.
    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
    }

    /// Collision radius used against other particles.
    #[must_use]
    pub fn collision_radius(&self) -> f64 {
        self.collision_radius
    }

    /// Mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Linear momentum.
    #[must_use]
    pub fn momentum(&self) -> Vector3<f64> {
        self.velocity * self.mass
    }

    /// Containment box, if any.
    #[must_use]
    pub fn containment(&self) -> Option<&ContainmentBox> {
        self.containment.as_ref()
    }

    /// Surface geometry.
    #[must_use]
    pub fn mesh(&self) -> &BodyMesh {
        &self.mesh
    }

    /// Advance by `dt`: gravity, containment, then position.
    pub fn integrate(&mut self, dt: f64, gravity: &Gravity) {
        if self.gravity {
            self.velocity += gravity.velocity_change(dt);
        }
        if let Some(bounds) = &self.containment {
            self.velocity = bounds.reflect(&self.position, self.velocity);
        }
        self.position += self.velocity * dt;
        self.sync_mesh();
    }

    /// Translate the particle and its mesh.
    pub fn move_by(&mut self, offset: &Vector3<f64>) {
        self.position += offset;
        self.mesh.translate(offset);
    }

    /// Place the mesh from recorded vertex positions.
    ///
    /// The particle position follows the mean of the recorded vertices.
    pub(crate) fn assign(&mut self, positions: &[Point3<f64>]) -> crate::Result<()> {
        self.mesh.set_positions(positions)?;
        self.position = self.mesh.center();
        Ok(())
    }

    pub(crate) fn refresh_buffer(&mut self) {
        self.mesh.refresh_buffer();
    }

    /// Rebuild vertex positions from the rest offsets.
    fn sync_mesh(&mut self) {
        let position = self.position;
        for (p, offset) in self.mesh.positions_mut().iter_mut().zip(&self.rest_offsets) {
            *p = position + offset;
        }
        self.mesh.recompute_bounds();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_bad_mass() {
        let shape = shapes::icosphere(0, Point3::origin(), 1.0).unwrap();
        assert!(Particle::new(&shape, 0.0).is_err());
        assert!(Particle::new(&shape, f64::INFINITY).is_err());
    }

    #[test]
    fn test_free_fall() {
        let mut p = Particle::sphere(Point3::new(0.0, 10.0, 0.0), 0.5, 1.0).unwrap();
        let g = Gravity::earth();

        p.integrate(0.1, &g);
        assert_relative_eq!(p.velocity().y, -0.981, epsilon = 1e-12);
        assert_relative_eq!(p.position().y, 10.0 - 0.0981, epsilon = 1e-12);
        assert_relative_eq!(p.mesh().center().y, p.position().y, epsilon = 1e-12);
    }

    #[test]
    fn test_mesh_follows_position() {
        let mut p = Particle::sphere(Point3::origin(), 0.5, 1.0)
            .unwrap()
            .with_gravity(false)
            .with_velocity(Vector3::new(2.0, 0.0, 0.0));
        let before = p.mesh().positions().to_vec();

        p.integrate(0.5, &Gravity::earth());

        for (old, new) in before.iter().zip(p.mesh().positions()) {
            assert_relative_eq!(new - old, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        }
        assert_relative_eq!(p.mesh().radius(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_containment_bounces() {
        let mut p = Particle::sphere(Point3::new(0.99, 0.0, 0.0), 0.1, 1.0)
            .unwrap()
            .with_gravity(false)
            .with_velocity(Vector3::new(1.0, 0.0, 0.0))
            .with_containment(ContainmentBox::cube(1.0));

        // Crosses the wall this step, reflects on the next.
        p.integrate(0.1, &Gravity::zero());
        assert!(p.position().x > 1.0);
        p.integrate(0.1, &Gravity::zero());
        assert_relative_eq!(p.velocity().x, -1.0);
        assert!(p.position().x < 1.09);
    }

    #[test]
    fn test_gravity_opt_out() {
        let mut p = Particle::sphere(Point3::origin(), 0.5, 1.0)
            .unwrap()
            .with_gravity(false);
        p.integrate(1.0, &Gravity::earth());
        assert_eq!(p.velocity(), Vector3::zeros());
    }
}
