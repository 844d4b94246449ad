//! Environment forces and bounds.
//!
//! Bodies use a Y-up frame: gravity pulls along `-Y`.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Gravity configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gravity {
    /// Acceleration due to gravity (m/s²).
    pub acceleration: Vector3<f64>,
}

impl Default for Gravity {
    fn default() -> Self {
        Self::earth()
    }
}

impl Gravity {
    /// Standard Earth gravity (9.81 m/s² in -Y direction).
    #[must_use]
    pub fn earth() -> Self {
        Self::downward(9.81)
    }

    /// Gravity of the given magnitude pulling along -Y.
    #[must_use]
    pub fn downward(magnitude: f64) -> Self {
        Self {
            acceleration: Vector3::new(0.0, -magnitude, 0.0),
        }
    }

    /// Zero gravity.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            acceleration: Vector3::zeros(),
        }
    }

    /// Custom gravity vector.
    #[must_use]
    pub fn custom(acceleration: Vector3<f64>) -> Self {
        Self { acceleration }
    }

    /// Velocity change accumulated over `dt`.
    #[must_use]
    pub fn velocity_change(&self, dt: f64) -> Vector3<f64> {
        self.acceleration * dt
    }

    /// Whether this gravity has no effect.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.acceleration == Vector3::zeros()
    }
}

/// Axis-aligned box that keeps a particle inside it by reflecting velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContainmentBox {
    /// Center of the box.
    pub center: Point3<f64>,
    /// Half the box size along each axis.
    pub half_extents: Vector3<f64>,
}

impl ContainmentBox {
    /// Create a containment box.
    #[must_use]
    pub fn new(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    /// A cube centered at the origin.
    #[must_use]
    pub fn cube(half_extent: f64) -> Self {
        Self::new(Point3::origin(), Vector3::repeat(half_extent))
    }

    /// Lower corner.
    #[must_use]
    pub fn min(&self) -> Point3<f64> {
        self.center - self.half_extents
    }

    /// Upper corner.
    #[must_use]
    pub fn max(&self) -> Point3<f64> {
        self.center + self.half_extents
    }

    /// Whether `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        let d = point - self.center;
        (0..3).all(|axis| d[axis].abs() <= self.half_extents[axis])
    }

    /// Reflect the velocity components that carry `position` further outside.
    ///
    /// Components moving back toward the box are left alone, so a particle
    /// that overshot a wall cannot get trapped flipping back and forth.
    #[must_use]
    pub fn reflect(&self, position: &Point3<f64>, velocity: Vector3<f64>) -> Vector3<f64> {
        let mut velocity = velocity;
        let d = position - self.center;
        for axis in 0..3 {
            let outside = d[axis].abs() > self.half_extents[axis];
            if outside && d[axis] * velocity[axis] > 0.0 {
                velocity[axis] = -velocity[axis];
            }
        }
        velocity
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gravity() {
        let g = Gravity::earth();
        assert_relative_eq!(g.acceleration.y, -9.81);
        assert_relative_eq!(g.velocity_change(0.5).y, -4.905);
        assert!(!g.is_zero());
        assert!(Gravity::zero().is_zero());
        assert_relative_eq!(Gravity::downward(2.0).acceleration.y, -2.0);
    }

    #[test]
    fn test_containment_reflects_outward_motion() {
        let bounds = ContainmentBox::cube(1.0);
        let pos = Point3::new(1.5, 0.0, -1.2);
        let vel = Vector3::new(2.0, 3.0, -1.0);

        let reflected = bounds.reflect(&pos, vel);
        assert_eq!(reflected, Vector3::new(-2.0, 3.0, 1.0));
    }

    #[test]
    fn test_containment_keeps_inward_motion() {
        let bounds = ContainmentBox::cube(1.0);
        let pos = Point3::new(1.5, 0.0, 0.0);
        let vel = Vector3::new(-2.0, 0.0, 0.0);

        assert_eq!(bounds.reflect(&pos, vel), vel);
        assert!(!bounds.contains(&pos));
        assert!(bounds.contains(&Point3::new(0.5, -1.0, 0.9)));
    }
}
