//! Configuration types for simulation.
//!
//! [`SimulationConfig`] controls the frame timestep and sub-stepping,
//! [`SoftBodyParams`] the spring-mass-pressure model, and [`ContactConfig`]
//! the collision response shared by every narrow phase.

use crate::dynamics::Gravity;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Main configuration for a simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Duration of one frame (seconds).
    pub timestep: f64,
    /// Number of integrate/collide sub-steps per frame.
    pub substeps: u32,
    /// Gravity applied to bodies that opt into it.
    pub gravity: Gravity,
    /// Collision response parameters.
    pub contact: ContactConfig,
    /// Maximum simulation time (None for unlimited).
    pub max_time: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            substeps: 8,
            gravity: Gravity::earth(),
            contact: ContactConfig::default(),
            max_time: None,
        }
    }
}

impl SimulationConfig {
    /// Create a new simulation config with the given frame timestep.
    #[must_use]
    pub fn with_timestep(timestep: f64) -> Self {
        Self {
            timestep,
            ..Default::default()
        }
    }

    /// Real-time preset: 60 Hz frames, 8 sub-steps.
    #[must_use]
    pub fn realtime() -> Self {
        Self::default()
    }

    /// High-fidelity preset: 60 Hz frames, 32 sub-steps.
    #[must_use]
    pub fn high_fidelity() -> Self {
        Self {
            substeps: 32,
            contact: ContactConfig::precise(),
            ..Default::default()
        }
    }

    /// Fast preset: 30 Hz frames, 2 sub-steps.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            timestep: 1.0 / 30.0,
            substeps: 2,
            ..Default::default()
        }
    }

    /// Set the gravity.
    #[must_use]
    pub fn gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Gravity::zero();
        self
    }

    /// Set the number of sub-steps per frame.
    #[must_use]
    pub fn substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps;
        self
    }

    /// Set the contact configuration.
    #[must_use]
    pub fn contact(mut self, contact: ContactConfig) -> Self {
        self.contact = contact;
        self
    }

    /// Set the maximum simulation time.
    #[must_use]
    pub fn max_time(mut self, max_time: f64) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Duration of one sub-step.
    #[must_use]
    pub fn substep_dt(&self) -> f64 {
        self.timestep / f64::from(self.substeps.max(1))
    }

    /// Get the frame frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        1.0 / self.timestep
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(crate::SimError::InvalidTimestep(self.timestep));
        }

        if self.timestep > 1.0 {
            return Err(crate::SimError::invalid_config(
                "timestep > 1 second is likely an error",
            ));
        }

        if self.substeps == 0 {
            return Err(crate::SimError::invalid_config("substeps must be at least 1"));
        }

        if !self.gravity.acceleration.iter().all(|g| g.is_finite()) {
            return Err(crate::SimError::invalid_config("gravity must be finite"));
        }

        if let Some(max_time) = self.max_time {
            if !max_time.is_finite() || max_time <= 0.0 {
                return Err(crate::SimError::invalid_config(
                    "max_time must be positive and finite",
                ));
            }
        }

        self.contact.validate()?;

        Ok(())
    }
}

/// How the rest length of each soft-body edge is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RestLength {
    /// Every edge shares this rest length.
    Absolute(f64),
    /// Every edge rests at this fraction of the mean initial edge length.
    MeanEdgeFraction(f64),
    /// Each edge rests at its own initial length.
    #[default]
    Initial,
}

/// Parameters of the spring-mass-pressure soft body model.
///
/// Forces are applied as velocity changes per unit vertex mass, so the
/// same parameters behave alike regardless of body mass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SoftBodyParams {
    /// Edge spring stiffness.
    pub spring_constant: f64,
    /// Rest length policy for edge springs.
    pub rest_length: RestLength,
    /// Edge damping coefficient.
    pub damping: f64,
    /// Internal pressure pushing faces outward.
    pub pressure: f64,
    /// Volumes below this are clamped before dividing by them.
    pub min_volume: f64,
    /// Whether gravity acts on the body.
    pub gravity: bool,
}

impl Default for SoftBodyParams {
    fn default() -> Self {
        Self {
            spring_constant: 2000.0,
            rest_length: RestLength::Initial,
            damping: 10.0,
            pressure: 200.0,
            min_volume: 1e-6,
            gravity: true,
        }
    }
}

impl SoftBodyParams {
    /// A stiff, lightly damped body that barely deforms.
    #[must_use]
    pub fn stiff() -> Self {
        Self {
            spring_constant: 4000.0,
            damping: 20.0,
            ..Default::default()
        }
    }

    /// A loose, balloon-like body dominated by pressure.
    #[must_use]
    pub fn balloon() -> Self {
        Self {
            spring_constant: 500.0,
            rest_length: RestLength::MeanEdgeFraction(0.9),
            damping: 2.0,
            pressure: 400.0,
            ..Default::default()
        }
    }

    /// Set the spring stiffness.
    #[must_use]
    pub fn spring_constant(mut self, k: f64) -> Self {
        self.spring_constant = k;
        self
    }

    /// Set the rest length policy.
    #[must_use]
    pub fn rest_length(mut self, rest_length: RestLength) -> Self {
        self.rest_length = rest_length;
        self
    }

    /// Set the damping coefficient.
    #[must_use]
    pub fn damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the internal pressure.
    #[must_use]
    pub fn pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }

    /// Enable or disable gravity for this body.
    #[must_use]
    pub fn with_gravity(mut self, gravity: bool) -> Self {
        self.gravity = gravity;
        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> crate::Result<()> {
        let non_negative = [
            ("spring_constant", self.spring_constant),
            ("damping", self.damping),
            ("pressure", self.pressure),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(crate::SimError::invalid_config(format!(
                    "{name} must be non-negative and finite, got {value}"
                )));
            }
        }

        if !self.min_volume.is_finite() || self.min_volume <= 0.0 {
            return Err(crate::SimError::invalid_config(
                "min_volume must be positive and finite",
            ));
        }

        match self.rest_length {
            RestLength::Absolute(len) | RestLength::MeanEdgeFraction(len)
                if !len.is_finite() || len < 0.0 =>
            {
                Err(crate::SimError::invalid_config(format!(
                    "rest length must be non-negative and finite, got {len}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Collision response parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactConfig {
    /// Coefficient of restitution; 1 reflects the normal velocity fully.
    pub restitution: f64,
    /// Multiplier applied to velocities after a vertex contact (≤ 1).
    pub friction: f64,
    /// Distance under which a Minkowski point counts as lying on the
    /// contact plane.
    pub plane_tolerance: f64,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            restitution: 1.0,
            friction: 0.98,
            plane_tolerance: 1e-6,
        }
    }
}

impl ContactConfig {
    /// Tighter tolerance for high-fidelity runs.
    #[must_use]
    pub fn precise() -> Self {
        Self {
            plane_tolerance: 1e-9,
            ..Default::default()
        }
    }

    /// Perfectly elastic contacts with no friction loss.
    #[must_use]
    pub fn elastic() -> Self {
        Self {
            restitution: 1.0,
            friction: 1.0,
            ..Default::default()
        }
    }

    /// Set the restitution.
    #[must_use]
    pub fn restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the friction multiplier.
    #[must_use]
    pub fn friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(crate::SimError::invalid_config(
                "restitution must be in [0, 1]",
            ));
        }

        if !(0.0..=1.0).contains(&self.friction) {
            return Err(crate::SimError::invalid_config(
                "friction multiplier must be in [0, 1]",
            ));
        }

        if !self.plane_tolerance.is_finite() || self.plane_tolerance < 0.0 {
            return Err(crate::SimError::invalid_config(
                "plane_tolerance must be non-negative",
            ));
        }

        Ok(())
    }
}
