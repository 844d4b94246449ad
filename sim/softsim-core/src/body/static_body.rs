//! Immovable scenery.

use softsim_types::Shape;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mesh::BodyMesh;

/// Frozen geometry with infinite mass.
///
/// Static bodies are never integrated and never written to by collision
/// response; their bounding sphere is computed once on construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StaticBody {
    mesh: BodyMesh,
}

impl StaticBody {
    /// Freeze a shape in place.
    #[must_use]
    pub fn new(shape: &Shape) -> Self {
        Self {
            mesh: BodyMesh::from_shape(shape),
        }
    }

    /// Surface geometry.
    #[must_use]
    pub fn mesh(&self) -> &BodyMesh {
        &self.mesh
    }
}
