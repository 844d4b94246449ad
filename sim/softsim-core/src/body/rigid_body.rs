//! Undeformable bodies with linear and angular momentum.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};
use softsim_types::{Gravity, Shape, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mesh::BodyMesh;

/// Angular speeds below this are treated as no rotation.
const MIN_ANGULAR_SPEED: f64 = 1e-12;

/// A rigid mesh.
///
/// Rotation is stored as a unit axis plus a scalar speed and integrated into
/// an accumulated orientation; vertices are recomputed every step from the
/// rest offsets so numerical drift never deforms the mesh. Inertia is a
/// single scalar.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBody {
    mesh: BodyMesh,
    position: Point3<f64>,
    velocity: Vector3<f64>,
    rotation_axis: Unit<Vector3<f64>>,
    angular_speed: f64,
    orientation: UnitQuaternion<f64>,
    moment_of_inertia: f64,
    mass: f64,
    rest_offsets: Vec<Vector3<f64>>,
    gravity: bool,
}

impl RigidBody {
    /// Create a rigid body at rest.
    ///
    /// The body's reference point is the shape center. Its moment of
    /// inertia defaults to that of the mass lumped evenly onto the vertices,
    /// `2/3 · m · mean(|r|²)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `mass` is not positive and finite.
    pub fn new(shape: &Shape, mass: f64) -> crate::Result<Self> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::invalid_mass(format!(
                "rigid body mass must be positive, got {mass}"
            )));
        }

        let position = shape.center();
        let rest_offsets: Vec<Vector3<f64>> =
            shape.positions().iter().map(|p| p - position).collect();

        let mean_sq = rest_offsets.iter().map(Vector3::norm_squared).sum::<f64>()
            / rest_offsets.len() as f64;
        // A single-vertex shape has no extent; give it a unit lever arm.
        let moment_of_inertia = if mean_sq > 0.0 {
            2.0 / 3.0 * mass * mean_sq
        } else {
            mass
        };

        Ok(Self {
            mesh: BodyMesh::from_shape(shape),
            position,
            velocity: Vector3::zeros(),
            rotation_axis: Vector3::y_axis(),
            angular_speed: 0.0,
            orientation: UnitQuaternion::identity(),
            moment_of_inertia,
            mass,
            rest_offsets,
            gravity: true,
        })
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the initial angular velocity (axis scaled by speed in rad/s).
    #[must_use]
    pub fn with_angular_velocity(mut self, omega: Vector3<f64>) -> Self {
        self.set_angular_velocity(omega);
        self
    }

    /// Override the moment of inertia.
    ///
    /// # Errors
    ///
    /// Returns an error if `inertia` is not positive and finite.
    pub fn with_inertia(mut self, inertia: f64) -> crate::Result<Self> {
        if !inertia.is_finite() || inertia <= 0.0 {
            return Err(SimError::invalid_mass(format!(
                "moment of inertia must be positive, got {inertia}"
            )));
        }
        self.moment_of_inertia = inertia;
        Ok(self)
    }

    /// Enable or disable gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: bool) -> Self {
        self.gravity = gravity;
        self
    }

    /// Reference point (shape center at rest).
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Linear velocity.
    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Overwrite the linear velocity.
    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
    }

    /// Unit rotation axis.
    #[must_use]
    pub fn rotation_axis(&self) -> Unit<Vector3<f64>> {
        self.rotation_axis
    }

    /// Angular speed about [`RigidBody::rotation_axis`] (rad/s, non-negative).
    #[must_use]
    pub fn angular_speed(&self) -> f64 {
        self.angular_speed
    }

    /// Angular velocity vector.
    #[must_use]
    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.rotation_axis.into_inner() * self.angular_speed
    }

    /// Overwrite the angular velocity.
    ///
    /// A near-zero vector stops the rotation and keeps the previous axis.
    pub fn set_angular_velocity(&mut self, omega: Vector3<f64>) {
        match Unit::try_new_and_get(omega, MIN_ANGULAR_SPEED) {
            Some((axis, speed)) => {
                self.rotation_axis = axis;
                self.angular_speed = speed;
            }
            None => self.angular_speed = 0.0,
        }
    }

    /// Accumulated orientation.
    #[must_use]
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    /// Scalar moment of inertia.
    #[must_use]
    pub fn moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia
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

    /// Surface geometry.
    #[must_use]
    pub fn mesh(&self) -> &BodyMesh {
        &self.mesh
    }

    /// Velocity of the material point at `lever` from the reference point.
    #[must_use]
    pub fn point_velocity(&self, lever: &Vector3<f64>) -> Vector3<f64> {
        self.velocity + self.angular_velocity().cross(lever)
    }

    /// Apply an impulse at `lever` from the reference point.
    pub fn apply_impulse(&mut self, impulse: &Vector3<f64>, lever: &Vector3<f64>) {
        self.velocity += impulse / self.mass;
        let omega = self.angular_velocity() + lever.cross(impulse) / self.moment_of_inertia;
        self.set_angular_velocity(omega);
    }

    /// Advance by `dt`: gravity, translation, then rotation about the
    /// current axis composed onto the accumulated orientation.
    pub fn integrate(&mut self, dt: f64, gravity: &Gravity) {
        if self.gravity {
            self.velocity += gravity.velocity_change(dt);
        }
        self.position += self.velocity * dt;

        if self.angular_speed > 0.0 {
            let step = UnitQuaternion::from_axis_angle(&self.rotation_axis, self.angular_speed * dt);
            self.orientation = step * self.orientation;
        }

        self.sync_mesh();
    }

    /// Translate the body and its mesh.
    pub fn move_by(&mut self, offset: &Vector3<f64>) {
        self.position += offset;
        self.mesh.translate(offset);
    }

    /// Place the mesh from recorded vertex positions.
    ///
    /// The reference point follows the mean of the recorded vertices; the
    /// orientation is left as is.
    pub(crate) fn assign(&mut self, positions: &[Point3<f64>]) -> crate::Result<()> {
        self.mesh.set_positions(positions)?;
        self.position = self.mesh.center();
        Ok(())
    }

    pub(crate) fn refresh_buffer(&mut self) {
        self.mesh.refresh_buffer();
    }

    fn sync_mesh(&mut self) {
        let (position, orientation) = (self.position, self.orientation);
        for (p, offset) in self.mesh.positions_mut().iter_mut().zip(&self.rest_offsets) {
            *p = position + orientation * offset;
        }
        self.mesh.recompute_bounds();
    }
}
