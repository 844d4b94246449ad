//! Approximate support-plane contact between rigid hulls.
//!
//! The solver works on the Minkowski difference `A - B` of the two vertex
//! sets. If the hulls overlap, the origin lies inside the difference. A
//! search direction picks the support points that bound the difference on
//! the origin's side:
//!
//! ```text
//!              n ↑
//!   ──p0────p1───┼────p2──   support plane
//!                ●            origin (behind the plane ⇒ overlap)
//!
//!                ○            centroid of A - B
//! ```
//!
//! The direction is whichever of the centroid-to-origin ray and the face
//! normals of either hull the difference reaches least far along. Three
//! non-collinear support points along it span a plane. If both the origin
//! and the centroid are behind it, the hulls overlap by the origin's
//! distance to the plane. This is one plane, not a full GJK/EPA, so it is
//! exact for face-on contact and approximate otherwise.

use nalgebra::{Point3, Vector3};
use softsim_types::ContactConfig;

use super::{ContactKind, ContactReport};
use crate::body::RigidBody;
use crate::mesh::BodyMesh;

/// Distances below this are treated as degenerate.
const EPSILON: f64 = 1e-9;

/// The second participant in a rigid contact.
#[derive(Debug)]
pub enum RigidTarget<'a> {
    /// Another rigid body; it receives the opposite impulse.
    Body(&'a mut RigidBody),
    /// Immovable geometry with infinite mass and inertia.
    Fixed(&'a BodyMesh),
}

impl RigidTarget<'_> {
    fn mesh(&self) -> &BodyMesh {
        match self {
            Self::Body(b) => b.mesh(),
            Self::Fixed(mesh) => mesh,
        }
    }

    fn inverse_mass(&self) -> f64 {
        match self {
            Self::Body(b) => b.mass().recip(),
            Self::Fixed(_) => 0.0,
        }
    }

    fn inverse_inertia(&self) -> f64 {
        match self {
            Self::Body(b) => b.moment_of_inertia().recip(),
            Self::Fixed(_) => 0.0,
        }
    }

    fn lever(&self, point: &Point3<f64>) -> Vector3<f64> {
        match self {
            Self::Body(b) => point - b.position(),
            Self::Fixed(_) => Vector3::zeros(),
        }
    }

    fn point_velocity(&self, lever: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Self::Body(b) => b.point_velocity(lever),
            Self::Fixed(_) => Vector3::zeros(),
        }
    }
}

/// A contact plane between two vertex sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportContact {
    /// Unit normal pointing from `A` toward `B`.
    pub normal: Vector3<f64>,
    /// Overlap along the normal.
    pub depth: f64,
    /// Mean midpoint of the vertex pairs that touch the plane.
    pub point: Point3<f64>,
}

/// One Minkowski-difference point with the vertices it came from.
#[derive(Debug, Clone, Copy)]
struct Difference {
    point: Vector3<f64>,
    a: usize,
    b: usize,
}

/// Find the support-plane contact between hulls `a` and `b`.
///
/// `tolerance` is how far from the plane a difference point may be and
/// still count toward the contact point. Returns `None` if the hulls do not
/// overlap or no plane can be formed.
#[must_use]
pub fn support_contact(a: &BodyMesh, b: &BodyMesh, tolerance: f64) -> Option<SupportContact> {
    let (pa, pb) = (a.positions(), b.positions());
    let mut differences: Vec<Difference> = pa
        .iter()
        .enumerate()
        .flat_map(|(i, va)| {
            pb.iter().enumerate().map(move |(j, vb)| Difference {
                point: va - vb,
                a: i,
                b: j,
            })
        })
        .collect();
    if differences.is_empty() {
        return None;
    }

    let centroid =
        differences.iter().map(|d| d.point).sum::<Vector3<f64>>() / differences.len() as f64;
    let direction = search_direction(a, b, &centroid)?;

    differences.sort_by(|x, y| y.point.dot(&direction).total_cmp(&x.point.dot(&direction)));

    let normal = support_plane_normal(&differences, &direction)?;
    let p0 = differences[0].point;
    let depth = p0.dot(&normal);
    if depth <= 0.0 || (centroid - p0).dot(&normal) >= 0.0 {
        return None;
    }

    let touching = differences
        .iter()
        .filter(|d| (d.point.dot(&normal) - depth).abs() <= tolerance)
        .map(|d| (pa[d.a], pb[d.b]));
    let point = contact_point(touching, &normal)?;

    Some(SupportContact {
        normal,
        depth,
        point,
    })
}

/// The candidate direction along which `A - B` reaches least far past the
/// origin.
///
/// Candidates are the ray from the difference's centroid toward the origin,
/// the outward face normals of `a`, and the inward face normals of `b`.
/// Returns `None` if the difference stays behind the origin along any of
/// them, which means the hulls are apart.
fn search_direction(
    a: &BodyMesh,
    b: &BodyMesh,
    centroid: &Vector3<f64>,
) -> Option<Vector3<f64>> {
    let ray = (centroid.norm() >= EPSILON).then(|| -centroid.normalize());
    let candidates = ray
        .into_iter()
        .chain((0..a.faces().len()).map(|i| a.face_normal(i)))
        .chain((0..b.faces().len()).map(|i| -b.face_normal(i)))
        .filter(|n| *n != Vector3::zeros());

    let mut best: Option<(f64, Vector3<f64>)> = None;
    for n in candidates {
        let reach = extent(a.positions(), &n).1 - extent(b.positions(), &n).0;
        if reach <= 0.0 {
            return None;
        }
        if best.is_none_or(|(r, _)| reach < r) {
            best = Some((reach, n));
        }
    }
    best.map(|(_, n)| n)
}

/// Smallest and largest projection of `points` onto `direction`.
fn extent(points: &[Point3<f64>], direction: &Vector3<f64>) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.coords.dot(direction);
        (lo.min(d), hi.max(d))
    })
}

/// Middle of the region where the touching features of both hulls overlap.
///
/// Each feature is bounded along two tangent axes of the contact plane. On
/// each axis the point sits in the middle of the two intervals' overlap, or
/// half way between their middles if they do not overlap. Along the normal
/// it sits half way between the two features.
fn contact_point(
    touching: impl Iterator<Item = (Point3<f64>, Point3<f64>)>,
    normal: &Vector3<f64>,
) -> Option<Point3<f64>> {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let t1 = (helper - normal * normal.dot(&helper)).normalize();
    let t2 = normal.cross(&t1);
    let project = |p: &Point3<f64>| {
        Vector3::new(
            p.coords.dot(&t1),
            p.coords.dot(&t2),
            p.coords.dot(normal),
        )
    };

    let empty = (
        Vector3::repeat(f64::INFINITY),
        Vector3::repeat(f64::NEG_INFINITY),
    );
    let mut bounds_a = empty;
    let mut bounds_b = empty;
    let mut count = 0_usize;
    for (va, vb) in touching {
        let (qa, qb) = (project(&va), project(&vb));
        bounds_a = (bounds_a.0.inf(&qa), bounds_a.1.sup(&qa));
        bounds_b = (bounds_b.0.inf(&qb), bounds_b.1.sup(&qb));
        count += 1;
    }
    if count == 0 {
        return None;
    }

    let mid_a = (bounds_a.0 + bounds_a.1) * 0.5;
    let mid_b = (bounds_b.0 + bounds_b.1) * 0.5;
    let mut local = (mid_a + mid_b) * 0.5;
    for k in 0..2 {
        let lo = bounds_a.0[k].max(bounds_b.0[k]);
        let hi = bounds_a.1[k].min(bounds_b.1[k]);
        if lo <= hi {
            local[k] = (lo + hi) * 0.5;
        }
    }

    Some(Point3::from(t1 * local.x + t2 * local.y + normal * local.z))
}

/// Normal of the plane through the first three non-collinear support
/// points, oriented along `direction`.
fn support_plane_normal(
    sorted: &[Difference],
    direction: &Vector3<f64>,
) -> Option<Vector3<f64>> {
    let p0 = sorted.first()?.point;
    let p1 = sorted
        .iter()
        .map(|d| d.point)
        .find(|p| (p - p0).norm() > EPSILON)?;
    let edge = p1 - p0;

    let normal = sorted
        .iter()
        .map(|d| edge.cross(&(d.point - p0)))
        .find(|n| n.norm() > EPSILON)?
        .normalize();

    Some(if normal.dot(direction) < 0.0 {
        -normal
    } else {
        normal
    })
}

/// Detect and resolve contact between a rigid body and a target.
///
/// Penetration is removed along the contact normal, split by inverse mass.
/// If the contact points are approaching, a scalar impulse
///
/// ```text
/// j = (1 + e) v_n / (1/m_a + 1/m_b + |r_a × n|²/I_a + |r_b × n|²/I_b)
/// ```
///
/// is applied at the contact point, `-j n` to `body` and `+j n` to the
/// target. A fixed target is never modified.
pub fn resolve(
    body: &mut RigidBody,
    target: RigidTarget<'_>,
    config: &ContactConfig,
) -> Option<ContactReport> {
    let tolerance =
        config.plane_tolerance * (body.mesh().radius() + target.mesh().radius()).max(1.0);
    let contact = support_contact(body.mesh(), target.mesh(), tolerance)?;
    let SupportContact {
        normal,
        depth,
        point,
    } = contact;

    let inv_mass_a = body.mass().recip();
    let inv_mass_b = target.inverse_mass();
    let inv_inertia_a = body.moment_of_inertia().recip();
    let inv_inertia_b = target.inverse_inertia();

    let lever_a = point - body.position();
    let lever_b = target.lever(&point);

    let closing = (body.point_velocity(&lever_a) - target.point_velocity(&lever_b)).dot(&normal);

    let total_inv_mass = inv_mass_a + inv_mass_b;
    body.move_by(&(-normal * (depth * inv_mass_a / total_inv_mass)));

    let impulse = if closing > 0.0 {
        let effective = total_inv_mass
            + lever_a.cross(&normal).norm_squared() * inv_inertia_a
            + lever_b.cross(&normal).norm_squared() * inv_inertia_b;
        (1.0 + config.restitution) * closing / effective
    } else {
        0.0
    };
    if impulse > 0.0 {
        body.apply_impulse(&(-normal * impulse), &lever_a);
    }

    if let RigidTarget::Body(other) = target {
        other.move_by(&(normal * (depth * inv_mass_b / total_inv_mass)));
        if impulse > 0.0 {
            other.apply_impulse(&(normal * impulse), &lever_b);
        }
    }

    Some(ContactReport {
        kind: ContactKind::SupportPlane,
        point,
        normal: -normal,
        depth,
        contacts: 1,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::StaticBody;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use softsim_types::shapes;

    fn cube_at(y: f64, half: f64) -> BodyMesh {
        BodyMesh::from_shape(&shapes::cube(Point3::new(0.0, y, 0.0), half).unwrap())
    }

    fn slab() -> StaticBody {
        StaticBody::new(
            &shapes::rect_prism(
                Point3::new(0.0, -0.5, 0.0),
                Vector3::new(3.0, 0.5, 3.0),
                UnitQuaternion::identity(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_face_contact_depth_and_normal() {
        let top = cube_at(1.8, 1.0);
        let bottom = cube_at(0.0, 1.0);

        let contact = support_contact(&top, &bottom, 1e-9).unwrap();

        assert_relative_eq!(contact.normal, -Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(contact.depth, 0.2, epsilon = 1e-12);
        assert_relative_eq!(contact.point, Point3::new(0.0, 0.9, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_separated_hulls() {
        assert!(support_contact(&cube_at(3.0, 1.0), &cube_at(0.0, 1.0), 1e-9).is_none());
    }

    #[test]
    fn test_concentric_hulls_pushed_through_a_face() {
        let contact = support_contact(&cube_at(0.0, 1.0), &cube_at(0.0, 0.5), 1e-9).unwrap();

        assert_relative_eq!(contact.depth, 1.5, epsilon = 1e-12);
        assert_relative_eq!(contact.normal.amax(), 1.0, epsilon = 1e-12);
        // Half way between the outer face and the inner one behind it.
        assert_relative_eq!(contact.point, Point3::from(contact.normal * 0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_cube_bounces_off_static_slab() {
        let slab = slab();
        let mut cube = RigidBody::new(&shapes::cube(Point3::new(0.0, 0.45, 0.0), 0.5).unwrap(), 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -3.0, 0.0));
        let slab_before = slab.clone();

        let report = resolve(&mut cube, RigidTarget::Fixed(slab.mesh()), &ContactConfig::default())
            .unwrap();

        assert_eq!(report.kind, ContactKind::SupportPlane);
        assert_relative_eq!(report.normal, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(report.depth, 0.05, epsilon = 1e-12);
        assert_relative_eq!(cube.position().y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(cube.velocity(), Vector3::new(0.0, 3.0, 0.0), epsilon = 1e-12);
        assert_eq!(cube.angular_speed(), 0.0);
        assert_eq!(slab, slab_before);
    }

    #[test]
    fn test_off_center_cube_is_stopped_vertically() {
        let slab = slab();
        let mut cube = RigidBody::new(&shapes::cube(Point3::new(1.0, 0.45, 0.0), 0.5).unwrap(), 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -3.0, 0.0));

        let report = resolve(&mut cube, RigidTarget::Fixed(slab.mesh()), &ContactConfig::default())
            .unwrap();

        assert_relative_eq!(report.normal, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(report.depth, 0.05, epsilon = 1e-12);
        assert_relative_eq!(report.point, Point3::new(1.0, -0.025, 0.0), epsilon = 1e-12);
        assert_relative_eq!(cube.position(), Point3::new(1.0, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(cube.velocity(), Vector3::new(0.0, 3.0, 0.0), epsilon = 1e-12);
        assert!(cube.angular_speed() < 1e-12);
    }

    #[test]
    fn test_separating_cube_is_only_pushed_out() {
        let slab = slab();
        let mut cube = RigidBody::new(&shapes::cube(Point3::new(0.0, 0.45, 0.0), 0.5).unwrap(), 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, 1.0, 0.0));

        resolve(&mut cube, RigidTarget::Fixed(slab.mesh()), &ContactConfig::default()).unwrap();

        assert_relative_eq!(cube.velocity(), Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(cube.position().y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_equal_cubes_exchange_velocity() {
        let mut upper = RigidBody::new(&shapes::cube(Point3::new(0.0, 0.9, 0.0), 0.5).unwrap(), 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -1.0, 0.0));
        let mut lower = RigidBody::new(&shapes::cube(Point3::origin(), 0.5).unwrap(), 1.0).unwrap();

        resolve(&mut upper, RigidTarget::Body(&mut lower), &ContactConfig::default()).unwrap();

        assert_relative_eq!(upper.velocity(), Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(lower.velocity(), Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(upper.position().y - lower.position().y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_off_center_contact_spins() {
        // A tall, narrow post; the cube hangs over its right edge.
        let post = StaticBody::new(
            &shapes::rect_prism(
                Point3::new(0.0, -5.0, 0.0),
                Vector3::new(0.5, 5.0, 1.0),
                UnitQuaternion::identity(),
            )
            .unwrap(),
        );
        let mut cube = RigidBody::new(&shapes::cube(Point3::new(0.3, 0.45, 0.0), 0.5).unwrap(), 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -1.0, 0.0));

        let report =
            resolve(&mut cube, RigidTarget::Fixed(post.mesh()), &ContactConfig::default()).unwrap();

        assert_relative_eq!(report.normal, Vector3::y(), epsilon = 1e-12);
        assert!(report.point.x > 0.0);
        assert!(cube.velocity().y > 0.0);
        assert!(cube.angular_speed() > 0.0);
        // The impulse acts left of the center of mass, tipping the cube clockwise.
        assert!(cube.angular_velocity().z < 0.0);
    }
}
