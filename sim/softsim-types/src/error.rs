//! Error types for simulation operations.

use thiserror::Error;

/// Errors that can occur while building or stepping a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A shape was built without any vertices.
    #[error("shape has no vertices")]
    EmptyShape,

    /// The index buffer cannot be grouped into triangles.
    #[error("index count {len} is not a multiple of 3")]
    MisalignedIndices {
        /// Length of the offending index buffer.
        len: usize,
    },

    /// A triangle references a vertex that does not exist.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of vertices in the shape.
        vertex_count: usize,
    },

    /// A shape cannot be used for the requested body.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of what's wrong.
        reason: String,
    },

    /// Invalid body ID referenced.
    #[error("invalid body ID: {0}")]
    InvalidBodyId(u64),

    /// Body not found in world.
    #[error("body not found: {name}")]
    BodyNotFound {
        /// Name of the missing body.
        name: String,
    },

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Simulation diverged (`NaN` or `Inf` detected).
    #[error("simulation diverged: {reason}")]
    Diverged {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Invalid mass properties.
    #[error("invalid mass properties: {reason}")]
    InvalidMassProperties {
        /// Description of what's wrong.
        reason: String,
    },

    /// A vertex snapshot does not match the body it is assigned to.
    #[error("snapshot has {actual} vertices, body has {expected}")]
    SnapshotMismatch {
        /// Vertex count of the body.
        expected: usize,
        /// Vertex count of the snapshot.
        actual: usize,
    },

    /// The body is immovable and rejects state writes.
    #[error("body is immovable")]
    ImmovableBody,
}

impl SimError {
    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid mass properties error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMassProperties {
            reason: reason.into(),
        }
    }

    /// Create an invalid shape error.
    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Check if this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::InvalidTimestep(_) | Self::InvalidMassProperties { .. }
        )
    }

    /// Check if this error was raised while validating a shape.
    #[must_use]
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyShape
                | Self::MisalignedIndices { .. }
                | Self::IndexOutOfRange { .. }
                | Self::InvalidShape { .. }
        )
    }
}
