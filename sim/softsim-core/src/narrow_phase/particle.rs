//! Sphere-sphere contact between two particles.

use nalgebra::Vector3;

use super::{ContactKind, ContactReport};
use crate::body::Particle;
use crate::geometry::safe_normalize;

/// Separate two overlapping particles and exchange momentum elastically.
///
/// With `n` pointing from `b` to `a` and `sep` the (negative) gap between the
/// collision spheres, each particle is moved along `n` in proportion to the
/// other's mass, so the lighter one moves further and the pair ends up
/// exactly touching. If the particles are closing along `n`:
///
/// ```text
/// v_a' = v_a - 2 m_b / (m_a + m_b) ((v_a - v_b)·n) n
/// v_b' = v_b + 2 m_a / (m_a + m_b) ((v_a - v_b)·n) n
/// ```
///
/// Particles with coincident centers are separated along +Y.
pub fn resolve(a: &mut Particle, b: &mut Particle) -> Option<ContactReport> {
    let offset = a.position() - b.position();
    let gap = offset.norm() - (a.collision_radius() + b.collision_radius());
    if gap >= 0.0 {
        return None;
    }

    let mut normal = safe_normalize(&offset);
    if normal == Vector3::zeros() {
        normal = Vector3::y();
    }
    let point = b.position() + normal * b.collision_radius();

    let (ma, mb) = (a.mass(), b.mass());
    let total = ma + mb;

    a.move_by(&(-normal * (gap * mb / total)));
    b.move_by(&(normal * (gap * ma / total)));

    let (va, vb) = (a.velocity(), b.velocity());
    let closing = (va - vb).dot(&normal);
    if closing < 0.0 {
        a.set_velocity(va - normal * (2.0 * mb / total * closing));
        b.set_velocity(vb + normal * (2.0 * ma / total * closing));
    }

    Some(ContactReport {
        kind: ContactKind::ParticleParticle,
        point,
        normal,
        depth: -gap,
        contacts: 1,
    })
}
