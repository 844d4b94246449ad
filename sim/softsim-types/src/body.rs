//! Body identity types.
//!
//! Bodies themselves live in `softsim-core`; this module holds the pieces
//! that other layers (replay files, renderers, tooling) need to talk about
//! them without depending on the integrator.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a body in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// The simulation model a body follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodyKind {
    /// Frozen geometry with infinite mass.
    Static,
    /// A point mass carrying an undeformable, unrotating mesh.
    Particle,
    /// A spring-mass-pressure deformable mesh.
    Soft,
    /// An undeformable mesh with linear and angular momentum.
    Rigid,
}

impl BodyKind {
    /// Whether collision response may move a body of this kind.
    #[must_use]
    pub const fn is_movable(self) -> bool {
        !matches!(self, Self::Static)
    }

    /// Whether this kind deforms under contact.
    #[must_use]
    pub const fn is_deformable(self) -> bool {
        matches!(self, Self::Soft)
    }
}

impl std::fmt::Display for BodyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Static => "static",
            Self::Particle => "particle",
            Self::Soft => "soft",
            Self::Rigid => "rigid",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_id() {
        let id = BodyId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "Body(42)");

        let id2: BodyId = 42.into();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_body_kind() {
        assert!(!BodyKind::Static.is_movable());
        assert!(BodyKind::Rigid.is_movable());
        assert!(BodyKind::Soft.is_deformable());
        assert!(!BodyKind::Particle.is_deformable());
        assert_eq!(BodyKind::Soft.to_string(), "soft");
    }
}
