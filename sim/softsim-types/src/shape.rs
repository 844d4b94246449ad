//! Triangle mesh geometry consumed by the simulation.
//!
//! A [`Shape`] is a vertex buffer in the renderer's interleaved layout
//! (`[x, y, z, nx, ny, nz, u, v]`) plus a triangle index buffer. It is
//! validated once on construction and never mutated afterwards; bodies copy
//! what they need out of it.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// Number of `f64` attributes per vertex: position, normal, texture coordinate.
pub const VERTEX_STRIDE: usize = 8;

/// Interleaved vertex attributes.
pub type VertexAttributes = [f64; VERTEX_STRIDE];

/// Three vertex slots forming a triangle.
pub type Face = [usize; 3];

/// An indexed triangle mesh with a bounding sphere.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    vertices: Vec<VertexAttributes>,
    indices: Vec<u32>,
    faces: Vec<Face>,
    center: Point3<f64>,
    radius: f64,
}

impl Shape {
    /// Build a shape from interleaved vertices and triangle indices.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no vertices, the index count is not a
    /// multiple of 3, or an index refers past the last vertex.
    pub fn new(vertices: Vec<VertexAttributes>, indices: Vec<u32>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(SimError::EmptyShape);
        }

        if indices.len() % 3 != 0 {
            return Err(SimError::MisalignedIndices { len: indices.len() });
        }

        let vertex_count = vertices.len();
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(SimError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        let faces = indices
            .chunks_exact(3)
            .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
            .collect();

        let (center, radius) = bounding_sphere(vertices.iter().map(position_of));

        Ok(Self {
            vertices,
            indices,
            faces,
            center,
            radius,
        })
    }

    /// Build a shape from bare positions, leaving normals and texture
    /// coordinates zeroed.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Shape::new`].
    pub fn from_positions(positions: &[Point3<f64>], indices: Vec<u32>) -> Result<Self> {
        let vertices = positions
            .iter()
            .map(|p| [p.x, p.y, p.z, 0.0, 0.0, 0.0, 0.0, 0.0])
            .collect();
        Self::new(vertices, indices)
    }

    /// Interleaved vertex attributes.
    #[must_use]
    pub fn vertices(&self) -> &[VertexAttributes] {
        &self.vertices
    }

    /// Triangle index buffer.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Triangles as vertex-slot triples.
    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Mean vertex position.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    /// Largest vertex distance from [`Shape::center`].
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Position of vertex `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    #[must_use]
    pub fn position(&self, slot: usize) -> Point3<f64> {
        position_of(&self.vertices[slot])
    }

    /// All vertex positions in slot order.
    #[must_use]
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.vertices.iter().map(position_of).collect()
    }

    /// A copy of this shape moved by `offset`.
    ///
    /// Normals and texture coordinates are carried over untouched.
    #[must_use]
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        let vertices = self
            .vertices
            .iter()
            .map(|v| {
                let mut v = *v;
                v[0] += offset.x;
                v[1] += offset.y;
                v[2] += offset.z;
                v
            })
            .collect();

        Self {
            vertices,
            indices: self.indices.clone(),
            faces: self.faces.clone(),
            center: self.center + offset,
            radius: self.radius,
        }
    }

    /// The vertex buffer flattened for upload.
    #[must_use]
    pub fn flattened(&self) -> Vec<f64> {
        self.vertices.iter().flatten().copied().collect()
    }
}

/// Position part of an interleaved vertex.
#[must_use]
pub fn position_of(v: &VertexAttributes) -> Point3<f64> {
    Point3::new(v[0], v[1], v[2])
}

/// Mean position and the largest distance from it.
///
/// Returns the origin and zero radius for an empty iterator.
#[must_use]
pub fn bounding_sphere<I>(points: I) -> (Point3<f64>, f64)
where
    I: IntoIterator<Item = Point3<f64>>,
    I::IntoIter: Clone,
{
    let points = points.into_iter();
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for p in points.clone() {
        sum += p.coords;
        count += 1;
    }
    if count == 0 {
        return (Point3::origin(), 0.0);
    }

    let center = Point3::from(sum / count as f64);
    let radius = points
        .map(|p| nalgebra::distance(&p, &center))
        .fold(0.0_f64, f64::max);
    (center, radius)
}
