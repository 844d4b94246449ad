//! Procedural shape generators.
//!
//! Generated shapes are wound counter-clockwise when viewed from outside,
//! carry outward unit normals, and use spherical texture coordinates.

use hashbrown::HashMap;
use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::shape::{Shape, VertexAttributes};
use crate::{Result, SimError};

/// Deepest icosphere subdivision accepted (327 680 triangles).
pub const MAX_SUBDIVISIONS: u32 = 7;

// Icosahedron inscribed in the unit sphere.
const ICO_X: f64 = 0.525_731_112_119_133_6;
const ICO_Z: f64 = 0.850_650_808_352_039_9;

const ICOSAHEDRON_VERTICES: [[f64; 3]; 12] = [
    [-ICO_X, 0.0, ICO_Z],
    [ICO_X, 0.0, ICO_Z],
    [-ICO_X, 0.0, -ICO_Z],
    [ICO_X, 0.0, -ICO_Z],
    [0.0, ICO_Z, ICO_X],
    [0.0, ICO_Z, -ICO_X],
    [0.0, -ICO_Z, ICO_X],
    [0.0, -ICO_Z, -ICO_X],
    [ICO_Z, ICO_X, 0.0],
    [-ICO_Z, ICO_X, 0.0],
    [ICO_Z, -ICO_X, 0.0],
    [-ICO_Z, -ICO_X, 0.0],
];

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 1, 4],
    [0, 4, 9],
    [9, 4, 5],
    [4, 8, 5],
    [4, 1, 8],
    [8, 1, 10],
    [8, 10, 3],
    [5, 8, 3],
    [5, 3, 2],
    [2, 3, 7],
    [7, 3, 10],
    [7, 10, 6],
    [7, 6, 11],
    [11, 6, 0],
    [0, 6, 1],
    [6, 10, 1],
    [9, 11, 0],
    [9, 2, 11],
    [9, 5, 2],
    [7, 11, 2],
];

const CUBE_CORNERS: [[f64; 3]; 8] = [
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

const CUBE_FACES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // back
    5, 1, 0, 0, 4, 5, // right
    3, 2, 6, 6, 7, 3, // left
    6, 5, 4, 4, 7, 6, // front
    4, 0, 3, 3, 7, 4, // top
    2, 1, 5, 5, 6, 2, // bottom
];

/// Spherical texture coordinate for a direction from the shape center.
#[must_use]
pub fn sphere_uv(direction: &Vector3<f64>) -> [f64; 2] {
    let len = direction.norm();
    if len <= f64::EPSILON {
        return [0.0, 0.0];
    }
    let v = (direction.y / len).clamp(-1.0, 1.0).acos() / std::f64::consts::PI;
    let u = -(direction.z.atan2(direction.x) / std::f64::consts::PI + 1.0) * 0.5;
    [u, v]
}

fn vertex(position: Point3<f64>, normal: Vector3<f64>, uv: [f64; 2]) -> VertexAttributes {
    [
        position.x, position.y, position.z, normal.x, normal.y, normal.z, uv[0], uv[1],
    ]
}

/// Unit-sphere directions and triangles of a subdivided icosahedron.
fn icosphere_directions(subdivisions: u32) -> (Vec<Vector3<f64>>, Vec<[usize; 3]>) {
    let mut directions: Vec<Vector3<f64>> = ICOSAHEDRON_VERTICES
        .iter()
        .map(|v| Vector3::new(v[0], v[1], v[2]))
        .collect();
    let mut faces = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, directions: &mut Vec<Vector3<f64>>| {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let mid = (directions[a] + directions[b]).normalize();
                directions.push(mid);
                directions.len() - 1
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut directions);
            let bc = midpoint(b, c, &mut directions);
            let ca = midpoint(c, a, &mut directions);
            next.extend([[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]);
        }
        faces = next;
    }

    (directions, faces)
}

/// Build an icosphere by recursively splitting each icosahedron face into
/// four.
///
/// Subdivision level `n` yields `20 * 4^n` faces. Midpoints shared by two
/// faces are created once, so the mesh is closed and watertight.
///
/// # Errors
///
/// Returns an error if `radius` is not positive and finite, or if
/// `subdivisions` exceeds [`MAX_SUBDIVISIONS`].
pub fn icosphere(subdivisions: u32, center: Point3<f64>, radius: f64) -> Result<Shape> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(SimError::invalid_config(format!(
            "icosphere radius must be positive, got {radius}"
        )));
    }
    if subdivisions > MAX_SUBDIVISIONS {
        return Err(SimError::invalid_config(format!(
            "icosphere subdivisions {subdivisions} exceeds {MAX_SUBDIVISIONS}"
        )));
    }

    let (directions, faces) = icosphere_directions(subdivisions);
    sphere_from_directions(&directions, &faces, center, radius)
}

fn sphere_from_directions(
    directions: &[Vector3<f64>],
    faces: &[[usize; 3]],
    center: Point3<f64>,
    radius: f64,
) -> Result<Shape> {
    let vertices = directions
        .iter()
        .map(|dir| vertex(center + dir * radius, *dir, sphere_uv(dir)))
        .collect();
    let indices = faces
        .iter()
        .flatten()
        .map(|&i| i as u32)
        .collect();

    Shape::new(vertices, indices)
}

/// Build a rectangular prism.
///
/// `half_extents` are the distances from the center to each face before
/// rotation.
///
/// # Errors
///
/// Returns an error if any half extent is not positive and finite.
pub fn rect_prism(
    center: Point3<f64>,
    half_extents: Vector3<f64>,
    rotation: UnitQuaternion<f64>,
) -> Result<Shape> {
    if !half_extents.iter().all(|e| e.is_finite() && *e > 0.0) {
        return Err(SimError::invalid_config(format!(
            "prism half extents must be positive, got {half_extents:?}"
        )));
    }

    let vertices = CUBE_CORNERS
        .iter()
        .map(|c| {
            let local = rotation * Vector3::new(c[0], c[1], c[2]).component_mul(&half_extents);
            let normal = local.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
            vertex(center + local, normal, sphere_uv(&local))
        })
        .collect();

    Shape::new(vertices, CUBE_FACES.to_vec())
}

/// Axis-aligned cube with the given half extent.
///
/// # Errors
///
/// Returns an error if `half_extent` is not positive and finite.
pub fn cube(center: Point3<f64>, half_extent: f64) -> Result<Shape> {
    rect_prism(
        center,
        Vector3::repeat(half_extent),
        UnitQuaternion::identity(),
    )
}

/// Memoizes unit icosphere topology per subdivision level.
///
/// Building deep icospheres repeatedly is wasteful when scenes spawn many
/// balls of the same resolution; the cache keeps the unit-sphere directions
/// and faces and only scales and offsets them per request.
#[derive(Debug, Default, Clone)]
pub struct SphereCache {
    levels: HashMap<u32, (Vec<Vector3<f64>>, Vec<[usize; 3]>)>,
}

impl SphereCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subdivision levels generated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether nothing has been generated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Icosphere at `center` with `radius`, reusing cached topology.
    ///
    /// # Errors
    ///
    /// Same conditions as [`icosphere`].
    pub fn sphere(&mut self, subdivisions: u32, center: Point3<f64>, radius: f64) -> Result<Shape> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SimError::invalid_config(format!(
                "icosphere radius must be positive, got {radius}"
            )));
        }
        if subdivisions > MAX_SUBDIVISIONS {
            return Err(SimError::invalid_config(format!(
                "icosphere subdivisions {subdivisions} exceeds {MAX_SUBDIVISIONS}"
            )));
        }

        let (directions, faces) = self
            .levels
            .entry(subdivisions)
            .or_insert_with(|| icosphere_directions(subdivisions));
        sphere_from_directions(directions, faces, center, radius)
    }
}
