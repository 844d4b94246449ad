//! Core types for soft, rigid and particle body simulation.
//!
//! This crate provides the foundational data the simulator works on:
//!
//! - [`Shape`] - Interleaved vertex buffer, triangle faces, bounding sphere
//! - [`shapes`] - Icosphere and rectangular prism generators
//! - [`BodyId`] / [`BodyKind`] - Body identity and simulation model
//! - [`SimulationConfig`] - Frame timestep, sub-steps, contact response
//! - [`SoftBodyParams`] - Spring, damping and pressure parameters
//! - [`Gravity`] / [`ContainmentBox`] - Environment forces and bounds
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no integration and no collision
//! handling; `softsim-core` supplies both. Keeping them separate lets
//! renderers, replay tooling and scene loaders share the same vocabulary
//! without pulling in the solver.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: up
//! - Z: toward the viewer
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use softsim_types::{shapes, Point3};
//!
//! let ball = shapes::icosphere(2, Point3::new(0.0, 5.0, 0.0), 1.0).unwrap();
//!
//! assert_eq!(ball.face_count(), 320);
//! assert!((ball.radius() - 1.0).abs() < 1e-12);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::cast_possible_truncation,  // mesh indices fit in u32
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod body;
mod config;
mod dynamics;
mod error;
mod shape;
pub mod shapes;

pub use body::{BodyId, BodyKind};
pub use config::{ContactConfig, RestLength, SimulationConfig, SoftBodyParams};
pub use dynamics::{ContainmentBox, Gravity};
pub use error::SimError;
pub use shape::{bounding_sphere, position_of, Face, Shape, VertexAttributes, VERTEX_STRIDE};

// Re-export math types for convenience
pub use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_shapes_validate() {
        let ball = shapes::icosphere(1, Point3::origin(), 1.0).unwrap();
        let rebuilt = Shape::new(ball.vertices().to_vec(), ball.indices().to_vec()).unwrap();
        assert_eq!(ball, rebuilt);

        let slab = shapes::cube(Point3::new(0.0, -1.0, 0.0), 0.5).unwrap();
        assert_eq!(slab.flattened().len(), 8 * VERTEX_STRIDE);
    }

    #[test]
    fn test_config_round_trip_through_builders() {
        let config = SimulationConfig::default()
            .gravity(Gravity::downward(2.0))
            .contact(ContactConfig::elastic());
        assert!(config.validate().is_ok());
        assert_eq!(config.contact.friction, 1.0);
    }
}
