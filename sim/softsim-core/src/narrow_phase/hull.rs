//! Vertex-in-hull contact for soft bodies and particles.
//!
//! Each vertex of the moving body that lies inside the other body's bounding
//! sphere is tested against every face plane of its hull. A vertex behind
//! all of them is inside, and the face it is least deep behind is the one
//! it gets pushed back out through.
//!
//! Only a static hull stays put. A particle or rigid hull takes its share of
//! the correction and the opposite impulse, so momentum is exchanged rather
//! than created.
//!
//! Contacts are gathered against a snapshot of both meshes first and only
//! then applied, so the order of vertices does not change which of them are
//! found to penetrate.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;
use softsim_types::{ContactConfig, Face};

use super::{ContactKind, ContactReport};
use crate::body::{Particle, RigidBody, SoftBody};
use crate::geometry::safe_normalize;
use crate::mesh::{BodyMesh, HullPenetration, HullView};

/// One vertex found inside a hull.
#[derive(Debug, Clone, Copy)]
struct VertexContact {
    vertex: usize,
    face: Face,
    depth: f64,
    direction: Vector3<f64>,
}

type Contacts = SmallVec<[VertexContact; 16]>;

/// The body whose hull the moving vertices are tested against.
#[derive(Debug)]
pub enum HullTarget<'a> {
    /// Immovable geometry.
    Fixed(&'a BodyMesh),
    /// A particle; it recoils as one translating mass.
    Particle(&'a mut Particle),
    /// A rigid body; it recoils through its linear and angular velocity.
    Rigid(&'a mut RigidBody),
}

impl HullTarget<'_> {
    fn mesh(&self) -> &BodyMesh {
        match self {
            Self::Fixed(mesh) => mesh,
            Self::Particle(p) => p.mesh(),
            Self::Rigid(r) => r.mesh(),
        }
    }

    fn inverse_mass(&self) -> f64 {
        match self {
            Self::Fixed(_) => 0.0,
            Self::Particle(p) => p.mass().recip(),
            Self::Rigid(r) => r.mass().recip(),
        }
    }

    fn lever(&self, point: &Point3<f64>) -> Vector3<f64> {
        match self {
            Self::Rigid(r) => point - r.position(),
            Self::Fixed(_) | Self::Particle(_) => Vector3::zeros(),
        }
    }

    fn point_velocity(&self, lever: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Self::Fixed(_) => Vector3::zeros(),
            Self::Particle(p) => p.velocity(),
            Self::Rigid(r) => r.point_velocity(lever),
        }
    }

    /// `|r × n|² / I`, the rotational part of the effective mass.
    fn angular_term(&self, lever: &Vector3<f64>, direction: &Vector3<f64>) -> f64 {
        match self {
            Self::Rigid(r) => lever.cross(direction).norm_squared() / r.moment_of_inertia(),
            Self::Fixed(_) | Self::Particle(_) => 0.0,
        }
    }

    fn move_by(&mut self, offset: &Vector3<f64>) {
        match self {
            Self::Fixed(_) => {}
            Self::Particle(p) => p.move_by(offset),
            Self::Rigid(r) => r.move_by(offset),
        }
    }

    fn apply_impulse(&mut self, impulse: &Vector3<f64>, lever: &Vector3<f64>) {
        match self {
            Self::Fixed(_) => {}
            Self::Particle(p) => {
                let v = p.velocity() + impulse / p.mass();
                p.set_velocity(v);
            }
            Self::Rigid(r) => r.apply_impulse(impulse, lever),
        }
    }

    fn damp(&mut self, friction: f64) {
        if let Self::Particle(p) = self {
            let v = p.velocity() * friction;
            p.set_velocity(v);
        }
    }
}

/// Exchange a normal impulse between a point of the moving body and the
/// target, returning the point's new velocity.
///
/// Nothing happens unless the point approaches the target along
/// `direction`. Otherwise
///
/// ```text
/// j = (1 + e) v_n / (1/m + 1/M + |r × n|²/I)
/// ```
///
/// takes `j n / m` off the point and gives `j n` to the target.
fn exchange(
    velocity: Vector3<f64>,
    inverse_mass: f64,
    point: &Point3<f64>,
    direction: &Vector3<f64>,
    target: &mut HullTarget<'_>,
    restitution: f64,
) -> Vector3<f64> {
    let lever = target.lever(point);
    let inward = (velocity - target.point_velocity(&lever)).dot(direction);
    if inward >= 0.0 {
        return velocity;
    }

    let effective =
        inverse_mass + target.inverse_mass() + target.angular_term(&lever, direction);
    let impulse = (1.0 + restitution) * inward / effective;
    target.apply_impulse(&(direction * impulse), &lever);

    velocity - direction * (impulse * inverse_mass)
}

/// Direction to push a point found inside `hull`.
///
/// When the two bodies' centers are closer than the smaller radius the
/// face normal is unreliable (the point may be deep inside), so the bodies
/// are pushed apart along the line between their centers instead.
fn push_direction(
    mover_center: &Point3<f64>,
    mover_radius: f64,
    hull: &HullView<'_>,
    hit: &HullPenetration,
) -> Vector3<f64> {
    let apart = mover_center - hull.center;
    if apart.norm() < mover_radius.min(hull.radius) {
        let direction = safe_normalize(&apart);
        if direction != Vector3::zeros() {
            return direction;
        }
    }
    hit.normal
}

fn find_contacts(mover: &BodyMesh, hull: &HullView<'_>) -> Contacts {
    let (center, radius) = (mover.center(), mover.radius());
    mover
        .positions()
        .iter()
        .enumerate()
        .filter(|(_, p)| hull.sphere_contains(p))
        .filter_map(|(vertex, p)| {
            let hit = hull.penetration(p)?;
            Some(VertexContact {
                vertex,
                face: hull.faces[hit.face],
                depth: hit.depth,
                direction: push_direction(&center, radius, hull, &hit),
            })
        })
        .collect()
}

fn report(kind: ContactKind, mover: &BodyMesh, contacts: &Contacts) -> Option<ContactReport> {
    let deepest = contacts
        .iter()
        .max_by(|a, b| a.depth.total_cmp(&b.depth))?;
    Some(ContactReport {
        kind,
        point: mover.positions()[deepest.vertex],
        normal: deepest.direction,
        depth: deepest.depth,
        contacts: contacts.len(),
    })
}

/// Push vertices of `soft` out of `target`'s hull.
///
/// Each penetrating vertex moves out along its push direction by its share
/// of the depth, split by inverse mass with the target, and exchanges an
/// impulse with the target if it was moving inward. Every contacting
/// vertex's velocity is then scaled by the friction multiplier. A movable
/// target is pushed back once, by its share of the deepest contact, and a
/// particle target is damped once.
pub fn resolve_soft_against(
    soft: &mut SoftBody,
    mut target: HullTarget<'_>,
    config: &ContactConfig,
) -> Option<ContactReport> {
    let contacts = find_contacts(soft.mesh(), &target.mesh().hull());
    let result = report(ContactKind::VertexHull, soft.mesh(), &contacts)?;

    let inverse_vertex = soft.vertex_mass().recip();
    let inverse_target = target.inverse_mass();
    let total = inverse_vertex + inverse_target;

    let (mesh, velocities) = soft.parts_mut();
    for c in &contacts {
        let point = mesh.positions()[c.vertex];
        mesh.positions_mut()[c.vertex] += c.direction * (c.depth * inverse_vertex / total);

        let v = exchange(
            velocities[c.vertex],
            inverse_vertex,
            &point,
            &c.direction,
            &mut target,
            config.restitution,
        );
        velocities[c.vertex] = v * config.friction;
    }
    mesh.recompute_bounds();

    target.move_by(&(-result.normal * (result.depth * inverse_target / total)));
    target.damp(config.friction);

    Some(result)
}

/// Resolve two soft bodies against each other, `a`'s vertices into `b`
/// and then `b`'s into `a`.
pub fn resolve_soft_pair(
    a: &mut SoftBody,
    b: &mut SoftBody,
    config: &ContactConfig,
) -> Option<ContactReport> {
    let forward = resolve_soft_into(a, b, config);
    let backward = resolve_soft_into(b, a, config).map(ContactReport::flipped);

    match (forward, backward) {
        (Some(f), Some(b)) => Some(f.merge(b)),
        (f, b) => f.or(b),
    }
}

/// Push `mover`'s vertices out of `target`, both bodies responding.
///
/// The one vertex and the three face vertices share the correction and the
/// impulse in inverse proportion to their masses, which conserves linear
/// momentum before friction is applied:
///
/// ```text
/// vertex:       Δx = +d · depth · M_f / (m_v + M_f)
/// face vertex:  Δx = -d · depth · m_v / (m_v + M_f)
/// ```
fn resolve_soft_into(
    mover: &mut SoftBody,
    target: &mut SoftBody,
    config: &ContactConfig,
) -> Option<ContactReport> {
    let contacts = find_contacts(mover.mesh(), &target.mesh().hull());
    let result = report(ContactKind::VertexHull, mover.mesh(), &contacts)?;

    let vertex_mass = mover.vertex_mass();
    let face_mass = 3.0 * target.vertex_mass();
    let total = vertex_mass + face_mass;
    let restitution = 1.0 + config.restitution;

    let (mover_mesh, mover_velocities) = mover.parts_mut();
    let (target_mesh, target_velocities) = target.parts_mut();

    for c in &contacts {
        let shift = c.direction * c.depth;
        mover_mesh.positions_mut()[c.vertex] += shift * (face_mass / total);
        for &i in &c.face {
            target_mesh.positions_mut()[i] -= shift * (vertex_mass / total);
        }

        let face_velocity = c
            .face
            .iter()
            .map(|&i| target_velocities[i])
            .sum::<Vector3<f64>>()
            / 3.0;
        let inward = (mover_velocities[c.vertex] - face_velocity).dot(&c.direction);
        if inward < 0.0 {
            let exchange = c.direction * (restitution * inward);
            mover_velocities[c.vertex] -= exchange * (face_mass / total);
            for &i in &c.face {
                target_velocities[i] += exchange * (vertex_mass / total);
            }
        }

        mover_velocities[c.vertex] *= config.friction;
        for &i in &c.face {
            target_velocities[i] *= config.friction;
        }
    }

    mover_mesh.recompute_bounds();
    target_mesh.recompute_bounds();

    Some(result)
}

/// Push a particle out of `target`'s hull.
///
/// The deepest penetrating mesh vertex defines a single contact. The
/// correction is split by inverse mass between the particle and the target,
/// an impulse is exchanged if the particle was moving inward, and the
/// particle's velocity is then scaled by the friction multiplier.
pub fn resolve_particle_against(
    particle: &mut Particle,
    mut target: HullTarget<'_>,
    config: &ContactConfig,
) -> Option<ContactReport> {
    let contacts = find_contacts(particle.mesh(), &target.mesh().hull());
    let result = report(ContactKind::ParticleHull, particle.mesh(), &contacts)?;
    let ContactReport {
        point,
        normal: direction,
        depth,
        ..
    } = result;

    let inverse_particle = particle.mass().recip();
    let inverse_target = target.inverse_mass();
    let total = inverse_particle + inverse_target;

    let v = exchange(
        particle.velocity(),
        inverse_particle,
        &point,
        &direction,
        &mut target,
        config.restitution,
    );
    particle.set_velocity(v * config.friction);

    particle.move_by(&(direction * (depth * inverse_particle / total)));
    target.move_by(&(-direction * (depth * inverse_target / total)));

    Some(ContactReport {
        contacts: 1,
        ..result
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::StaticBody;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use softsim_types::{shapes, SoftBodyParams};

    fn floor() -> StaticBody {
        // Top face at y = 0.
        StaticBody::new(&shapes::rect_prism(
            Point3::new(0.0, -1.0, 0.0),
            Vector3::new(5.0, 1.0, 5.0),
            UnitQuaternion::identity(),
        )
        .unwrap())
    }

    fn ball(y: f64, vy: f64) -> SoftBody {
        SoftBody::new(
            &shapes::icosphere(1, Point3::new(0.0, y, 0.0), 1.0).unwrap(),
            1.0,
            SoftBodyParams::default(),
        )
        .unwrap()
        .with_velocity(Vector3::new(0.0, vy, 0.0))
    }

    #[test]
    fn test_soft_vertices_pushed_out_of_floor() {
        let floor = floor();
        let mut soft = ball(0.9, -1.0);
        let elastic = ContactConfig::default().friction(1.0);

        let report =
            resolve_soft_against(&mut soft, HullTarget::Fixed(floor.mesh()), &elastic).unwrap();

        assert_eq!(report.kind, ContactKind::VertexHull);
        assert_relative_eq!(report.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(report.normal, Vector3::y(), epsilon = 1e-12);

        for (p, v) in soft.mesh().positions().iter().zip(soft.velocities()) {
            assert!(p.y >= -1e-12);
            if p.y.abs() < 1e-12 {
                // Reflected with unit restitution.
                assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
            }
        }
        assert!(floor.mesh().hull().penetration(&soft.mesh().positions()[0]).is_none());
    }

    #[test]
    fn test_friction_damps_contacting_vertices() {
        let floor = floor();
        let mut soft = ball(0.9, 0.0).with_velocity(Vector3::new(1.0, 0.0, 0.0));
        let config = ContactConfig::default().friction(0.5);

        let report =
            resolve_soft_against(&mut soft, HullTarget::Fixed(floor.mesh()), &config).unwrap();

        let damped = soft
            .velocities()
            .iter()
            .filter(|v| (v.x - 0.5).abs() < 1e-12)
            .count();
        assert_eq!(damped, report.contacts);
    }

    #[test]
    fn test_no_contact_when_clear() {
        let floor = floor();
        let mut soft = ball(1.5, -1.0);
        let before = soft.clone();

        let config = ContactConfig::default();
        assert!(resolve_soft_against(&mut soft, HullTarget::Fixed(floor.mesh()), &config).is_none());
        assert_eq!(soft, before);
    }

    #[test]
    fn test_soft_pair_conserves_momentum_without_friction() {
        let mut a = ball(0.0, 1.0);
        let mut b = ball(1.8, -1.0);
        let config = ContactConfig::default().friction(1.0);
        let momentum = a.momentum() + b.momentum();

        let report = resolve_soft_pair(&mut a, &mut b, &config).unwrap();

        assert!(report.contacts > 0);
        assert_relative_eq!(a.momentum() + b.momentum(), momentum, epsilon = 1e-9);
        // The bodies were approaching; now they are not.
        assert!(a.mean_velocity().y < 1.0);
        assert!(b.mean_velocity().y > -1.0);
    }

    #[test]
    fn test_particle_pushed_out_and_reflected() {
        let floor = floor();
        let mut particle = Particle::sphere(Point3::new(0.0, 0.4, 0.0), 0.5, 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -2.0, 0.0));
        let config = ContactConfig::default().friction(1.0);

        let report = resolve_particle_against(&mut particle, HullTarget::Fixed(floor.mesh()), &config)
            .unwrap();

        assert_eq!(report.kind, ContactKind::ParticleHull);
        assert_eq!(report.contacts, 1);
        assert_relative_eq!(report.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(particle.position().y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(particle.velocity(), Vector3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_particle_restitution_and_friction() {
        let floor = floor();
        let mut particle = Particle::sphere(Point3::new(0.0, 0.4, 0.0), 0.5, 1.0)
            .unwrap()
            .with_velocity(Vector3::new(1.0, -2.0, 0.0));
        let config = ContactConfig::default().restitution(0.5).friction(0.5);

        resolve_particle_against(&mut particle, HullTarget::Fixed(floor.mesh()), &config).unwrap();

        assert_relative_eq!(particle.velocity(), Vector3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_particle_recoils_off_rigid_cube() {
        let mut cube = RigidBody::new(&shapes::cube(Point3::origin(), 0.5).unwrap(), 2.0).unwrap();
        let mut particle = Particle::sphere(Point3::new(0.0, 0.9, 0.0), 0.5, 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -2.0, 0.0));

        let report = resolve_particle_against(
            &mut particle,
            HullTarget::Rigid(&mut cube),
            &ContactConfig::elastic(),
        )
        .unwrap();

        assert_relative_eq!(report.normal, Vector3::y(), epsilon = 1e-12);
        // j = 2 · (-2) / (1 + 1/2)
        assert_relative_eq!(particle.velocity(), Vector3::new(0.0, 2.0 / 3.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(cube.velocity(), Vector3::new(0.0, -4.0 / 3.0, 0.0), epsilon = 1e-9);
        assert!(cube.angular_speed() < 1e-9);
        // The lighter particle takes two thirds of the correction.
        assert!(cube.position().y < 0.0);
        assert_relative_eq!(
            particle.position().y - 0.9,
            2.0 * -cube.position().y,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_soft_vertices_push_particle_back() {
        let mut soft = ball(0.0, 0.0);
        let mut particle = Particle::sphere(Point3::new(0.0, 1.5, 0.0), 0.8, 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -2.0, 0.0));
        let momentum = soft.momentum() + particle.momentum();

        let report = resolve_soft_against(
            &mut soft,
            HullTarget::Particle(&mut particle),
            &ContactConfig::elastic(),
        )
        .unwrap();

        assert!(report.contacts > 0);
        assert!(particle.velocity().y > -2.0);
        assert!(soft.mean_velocity().y < 0.0);
        assert_relative_eq!(soft.momentum() + particle.momentum(), momentum, epsilon = 1e-9);
    }

    #[test]
    fn test_soft_vertex_spins_rigid_body_off_center() {
        // The ball's lowest vertex lands left of the cube's center.
        let mut soft = ball(1.5, -1.0);
        let mut cube = RigidBody::new(&shapes::cube(Point3::new(0.4, 0.0, 0.0), 0.6).unwrap(), 1.0)
            .unwrap();
        let momentum = soft.momentum() + cube.momentum();

        resolve_soft_against(&mut soft, HullTarget::Rigid(&mut cube), &ContactConfig::elastic())
            .unwrap();

        assert!(cube.velocity().y < 0.0);
        assert!(cube.angular_speed() > 0.0);
        assert_relative_eq!(soft.momentum() + cube.momentum(), momentum, epsilon = 1e-9);
    }
}
