//! Triangle geometry helpers shared by the integrator and the narrow phase.
//!
//! Every helper here is guarded against degenerate input: collapsed triangles
//! produce a zero normal and zero area instead of `NaN`, so a single crushed
//! face cannot poison a whole body.

use nalgebra::{Point3, Vector3};
use softsim_types::Face;

/// Vectors shorter than this normalize to zero.
pub const NORMALIZE_EPSILON: f64 = 1e-12;

/// Normalize `v`, or return the zero vector if it is too short to have a
/// direction.
#[must_use]
pub fn safe_normalize(v: &Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(NORMALIZE_EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

/// Unit normal of triangle `(p0, p1, p2)`.
///
/// `winding` is `1.0` for counter-clockwise-outward meshes and `-1.0` for
/// clockwise-outward ones. Degenerate triangles return zero.
#[must_use]
pub fn face_normal(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    winding: f64,
) -> Vector3<f64> {
    safe_normalize(&(p1 - p0).cross(&(p2 - p0))) * winding
}

/// Triangle area from its side lengths (Heron's formula).
///
/// Rounding can push the radicand slightly negative for slivers; it is
/// clamped to zero.
#[must_use]
pub fn heron_area(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    let a = nalgebra::distance(p0, p1);
    let b = nalgebra::distance(p1, p2);
    let c = nalgebra::distance(p2, p0);
    let s = (a + b + c) * 0.5;
    (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt()
}

/// Centroid of a triangle.
#[must_use]
pub fn face_center(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Point3<f64> {
    Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
}

/// Signed volume of the tetrahedron spanned by a triangle and `apex`.
///
/// Positive when the triangle winds counter-clockwise seen from outside,
/// with `apex` on the inside.
#[must_use]
pub fn tetra_volume(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    apex: &Point3<f64>,
) -> f64 {
    (p0 - apex).dot(&(p1 - apex).cross(&(p2 - apex))) / 6.0
}

/// Enclosed volume of a triangle mesh measured from `apex`.
#[must_use]
pub fn mesh_volume(
    positions: &[Point3<f64>],
    faces: &[Face],
    apex: &Point3<f64>,
    winding: f64,
) -> f64 {
    faces
        .iter()
        .map(|&[a, b, c]| tetra_volume(&positions[a], &positions[b], &positions[c], apex))
        .sum::<f64>()
        * winding
}

/// Winding sign that makes the mesh's signed volume non-negative.
#[must_use]
pub fn winding_sign(positions: &[Point3<f64>], faces: &[Face], apex: &Point3<f64>) -> f64 {
    if mesh_volume(positions, faces, apex, 1.0) < 0.0 {
        -1.0
    } else {
        1.0
    }
}
