//! Per-body surface mesh state.
//!
//! Every body variant owns a [`BodyMesh`]: current world-space vertex
//! positions in the shape's slot order, the triangle faces, the winding sign
//! that makes face normals point outward, the bounding sphere, and the
//! interleaved buffer handed to the renderer.

use nalgebra::{Point3, Vector3};
use softsim_types::{bounding_sphere, Face, Shape, SimError, VERTEX_STRIDE};

use crate::geometry::{face_center, face_normal, mesh_volume, safe_normalize, winding_sign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Surface geometry of one body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyMesh {
    positions: Vec<Point3<f64>>,
    faces: Vec<Face>,
    winding: f64,
    center: Point3<f64>,
    radius: f64,
    buffer: Vec<f64>,
}

impl BodyMesh {
    /// Copy a shape's geometry.
    ///
    /// The winding sign is chosen so the rest geometry encloses a
    /// non-negative volume.
    #[must_use]
    pub fn from_shape(shape: &Shape) -> Self {
        let positions = shape.positions();
        let faces = shape.faces().to_vec();
        let winding = winding_sign(&positions, &faces, &shape.center());

        Self {
            positions,
            faces,
            winding,
            center: shape.center(),
            radius: shape.radius(),
            buffer: shape.flattened(),
        }
    }

    /// Current vertex positions in slot order.
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub(crate) fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    /// Triangle faces.
    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// `1.0` if faces wind counter-clockwise seen from outside, else `-1.0`.
    #[must_use]
    pub fn winding(&self) -> f64 {
        self.winding
    }

    /// Mean vertex position as of the last [`BodyMesh::recompute_bounds`].
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    /// Largest vertex distance from [`BodyMesh::center`].
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Outward unit normal of face `index`.
    #[must_use]
    pub fn face_normal(&self, index: usize) -> Vector3<f64> {
        let [a, b, c] = self.faces[index];
        face_normal(
            &self.positions[a],
            &self.positions[b],
            &self.positions[c],
            self.winding,
        )
    }

    /// Enclosed volume measured from the current center.
    #[must_use]
    pub fn volume(&self) -> f64 {
        mesh_volume(&self.positions, &self.faces, &self.center, self.winding)
    }

    /// Recompute center and radius from the current positions.
    pub fn recompute_bounds(&mut self) {
        let (center, radius) = bounding_sphere(self.positions.iter().copied());
        self.center = center;
        self.radius = radius;
    }

    /// Move every vertex (and the bounding sphere) by `offset`.
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for p in &mut self.positions {
            *p += offset;
        }
        self.center += offset;
    }

    /// Overwrite positions wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SnapshotMismatch`] if the vertex count differs.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> crate::Result<()> {
        if positions.len() != self.positions.len() {
            return Err(SimError::SnapshotMismatch {
                expected: self.positions.len(),
                actual: positions.len(),
            });
        }
        self.positions.copy_from_slice(positions);
        self.recompute_bounds();
        Ok(())
    }

    /// Interleaved render buffer as of the last refresh.
    #[must_use]
    pub fn buffer(&self) -> &[f64] {
        &self.buffer
    }

    /// Write current positions into the render buffer.
    ///
    /// The normal slot gets the direction from the body center to the
    /// vertex, which is what sphere-like deformables shade with. Texture
    /// coordinates are left as the shape supplied them.
    pub fn refresh_buffer(&mut self) {
        let center = self.center;
        for (p, slot) in self
            .positions
            .iter()
            .zip(self.buffer.chunks_exact_mut(VERTEX_STRIDE))
        {
            let normal = safe_normalize(&(p - center));
            slot[0] = p.x;
            slot[1] = p.y;
            slot[2] = p.z;
            slot[3] = normal.x;
            slot[4] = normal.y;
            slot[5] = normal.z;
        }
    }

    /// Read-only view used for point-in-hull tests.
    #[must_use]
    pub fn hull(&self) -> HullView<'_> {
        HullView {
            positions: &self.positions,
            faces: &self.faces,
            winding: self.winding,
            center: self.center,
            radius: self.radius,
        }
    }
}

/// A point found inside a hull, with the face it is closest to escaping
/// through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HullPenetration {
    /// Index of the face with the smallest penetration.
    pub face: usize,
    /// Distance from the point to that face's plane.
    pub depth: f64,
    /// Outward unit normal of that face.
    pub normal: Vector3<f64>,
}

/// Borrowed hull geometry.
#[derive(Debug, Clone, Copy)]
pub struct HullView<'a> {
    /// Vertex positions.
    pub positions: &'a [Point3<f64>],
    /// Triangle faces.
    pub faces: &'a [Face],
    /// Winding sign of the faces.
    pub winding: f64,
    /// Bounding sphere center.
    pub center: Point3<f64>,
    /// Bounding sphere radius.
    pub radius: f64,
}

impl HullView<'_> {
    /// Whether `point` lies inside the bounding sphere.
    #[must_use]
    pub fn sphere_contains(&self, point: &Point3<f64>) -> bool {
        nalgebra::distance(point, &self.center) < self.radius
    }

    /// Test `point` against every face plane.
    ///
    /// The point is inside if it is on or behind every non-degenerate face,
    /// so a point lying on the surface counts with zero depth. Returns the
    /// face of minimum penetration, or `None` if the point is outside or the
    /// hull has no usable face.
    #[must_use]
    pub fn penetration(&self, point: &Point3<f64>) -> Option<HullPenetration> {
        let mut best: Option<HullPenetration> = None;

        for (index, &[a, b, c]) in self.faces.iter().enumerate() {
            let (pa, pb, pc) = (&self.positions[a], &self.positions[b], &self.positions[c]);
            let normal = face_normal(pa, pb, pc, self.winding);
            if normal == Vector3::zeros() {
                continue;
            }

            let depth = (face_center(pa, pb, pc) - point).dot(&normal);
            if depth < 0.0 {
                return None;
            }

            if best.is_none_or(|b| depth < b.depth) {
                best = Some(HullPenetration {
                    face: index,
                    depth,
                    normal,
                });
            }
        }

        best
    }
}
