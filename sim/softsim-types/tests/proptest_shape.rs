//! Property-based tests for shape construction.
//!
//! Run with: cargo test -p softsim-types -- proptest

use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use softsim_types::{shapes, Shape, SimError};

// =============================================================================
// Strategies
// =============================================================================

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

fn arb_positions(max: usize) -> impl Strategy<Value = Vec<Point3<f64>>> {
    prop::collection::vec(arb_point(), 1..=max)
}

// =============================================================================
// Property Tests: Validation
// =============================================================================

proptest! {
    /// Any index buffer either builds a shape with one face per index triple
    /// or is rejected with the matching error.
    #[test]
    fn construction_matches_validation(
        positions in arb_positions(20),
        indices in prop::collection::vec(0u32..30, 0..60),
    ) {
        let result = Shape::from_positions(&positions, indices.clone());
        let max_index = indices.iter().copied().max();

        if indices.len() % 3 != 0 {
            prop_assert_eq!(result, Err(SimError::MisalignedIndices { len: indices.len() }));
        } else if max_index.is_some_and(|i| i as usize >= positions.len()) {
            let out_of_range = matches!(result, Err(SimError::IndexOutOfRange { .. }));
            prop_assert!(out_of_range);
        } else {
            let shape = result.unwrap();
            prop_assert_eq!(shape.face_count(), indices.len() / 3);
        }
    }

    /// Every vertex lies within the bounding sphere.
    #[test]
    fn bounding_sphere_contains_vertices(positions in arb_positions(40)) {
        let shape = Shape::from_positions(&positions, Vec::new()).unwrap();
        for p in &positions {
            prop_assert!(nalgebra::distance(p, &shape.center()) <= shape.radius() + 1e-9);
        }
    }

    /// Translation moves the center and leaves the radius alone.
    #[test]
    fn translation_preserves_radius(
        positions in arb_positions(20),
        offset in prop::array::uniform3(-50.0..50.0f64),
    ) {
        let shape = Shape::from_positions(&positions, Vec::new()).unwrap();
        let offset = Vector3::from(offset);
        let moved = shape.translated(&offset);

        prop_assert!((moved.radius() - shape.radius()).abs() < 1e-9);
        prop_assert!((moved.center() - (shape.center() + offset)).norm() < 1e-9);
    }
}

// =============================================================================
// Property Tests: Generators
// =============================================================================

proptest! {
    #[test]
    fn icosphere_vertices_on_surface(
        level in 0u32..3,
        center in arb_point(),
        radius in 0.1..10.0f64,
    ) {
        let shape = shapes::icosphere(level, center, radius).unwrap();
        for p in shape.positions() {
            prop_assert!((nalgebra::distance(&p, &center) - radius).abs() < 1e-9);
        }
    }
}
