//! Narrow-phase contact detection and response.
//!
//! A pair that survives the broad phase is dispatched on its body kinds:
//!
//! | pair                              | handler                                  |
//! |-----------------------------------|------------------------------------------|
//! | particle / particle               | [`particle::resolve`]                    |
//! | soft / soft                       | [`hull::resolve_soft_pair`], both ways   |
//! | soft / static, rigid or particle  | [`hull::resolve_soft_against`]           |
//! | particle / static or rigid        | [`hull::resolve_particle_against`]       |
//! | rigid / rigid, rigid / static     | [`rigid::resolve`]                       |
//! | static / static                   | nothing                                  |
//!
//! Each handler detects and responds in one go: positions are pushed apart
//! and velocities updated before it returns. Static bodies are the only
//! side that never moves.

pub mod hull;
pub mod particle;
pub mod rigid;

use nalgebra::{Point3, Vector3};
use softsim_types::ContactConfig;

use crate::body::Body;
use hull::HullTarget;
use rigid::RigidTarget;

/// Which handler produced a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// Two particle collision spheres.
    ParticleParticle,
    /// Soft body vertices inside another hull.
    VertexHull,
    /// A particle mesh inside a static or rigid hull.
    ParticleHull,
    /// Support-plane contact between rigid hulls.
    SupportPlane,
}

/// Summary of a resolved contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactReport {
    /// Handler that resolved the contact.
    pub kind: ContactKind,
    /// Contact point before correction, in world space.
    pub point: Point3<f64>,
    /// Unit normal pointing from the second body toward the first.
    pub normal: Vector3<f64>,
    /// Deepest penetration found.
    pub depth: f64,
    /// Number of individual vertex contacts that were corrected.
    pub contacts: usize,
}

impl ContactReport {
    /// The same contact seen from the other body.
    #[must_use]
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }

    /// Combine two reports for the same pair, keeping the deeper one's
    /// geometry and summing the contact counts.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let contacts = self.contacts + other.contacts;
        let deeper = if other.depth > self.depth { other } else { self };
        Self { contacts, ..deeper }
    }
}

/// Resolves contact between two bodies.
pub trait NarrowPhase {
    /// Detect contact between `a` and `b` and respond to it.
    ///
    /// Returns `None` if the bodies do not touch.
    fn resolve(&mut self, a: &mut Body, b: &mut Body, config: &ContactConfig)
        -> Option<ContactReport>;
}

/// Dispatches each pair to the handler for its body kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNarrowPhase;

impl NarrowPhase for DefaultNarrowPhase {
    fn resolve(
        &mut self,
        a: &mut Body,
        b: &mut Body,
        config: &ContactConfig,
    ) -> Option<ContactReport> {
        match (a, b) {
            (Body::Static(_), Body::Static(_)) => None,

            (Body::Particle(p), Body::Particle(q)) => particle::resolve(p, q),

            (Body::Soft(s), Body::Soft(t)) => hull::resolve_soft_pair(s, t, config),
            (Body::Soft(s), Body::Static(t)) => {
                hull::resolve_soft_against(s, HullTarget::Fixed(t.mesh()), config)
            }
            (Body::Soft(s), Body::Particle(p)) => {
                hull::resolve_soft_against(s, HullTarget::Particle(p), config)
            }
            (Body::Soft(s), Body::Rigid(r)) => {
                hull::resolve_soft_against(s, HullTarget::Rigid(r), config)
            }
            (Body::Static(t), Body::Soft(s)) => {
                hull::resolve_soft_against(s, HullTarget::Fixed(t.mesh()), config)
                    .map(ContactReport::flipped)
            }
            (Body::Particle(p), Body::Soft(s)) => {
                hull::resolve_soft_against(s, HullTarget::Particle(p), config)
                    .map(ContactReport::flipped)
            }
            (Body::Rigid(r), Body::Soft(s)) => {
                hull::resolve_soft_against(s, HullTarget::Rigid(r), config)
                    .map(ContactReport::flipped)
            }

            (Body::Particle(p), Body::Static(t)) => {
                hull::resolve_particle_against(p, HullTarget::Fixed(t.mesh()), config)
            }
            (Body::Particle(p), Body::Rigid(r)) => {
                hull::resolve_particle_against(p, HullTarget::Rigid(r), config)
            }
            (Body::Static(t), Body::Particle(p)) => {
                hull::resolve_particle_against(p, HullTarget::Fixed(t.mesh()), config)
                    .map(ContactReport::flipped)
            }
            (Body::Rigid(r), Body::Particle(p)) => {
                hull::resolve_particle_against(p, HullTarget::Rigid(r), config)
                    .map(ContactReport::flipped)
            }

            (Body::Rigid(r), Body::Rigid(q)) => rigid::resolve(r, RigidTarget::Body(q), config),
            (Body::Rigid(r), Body::Static(s)) => {
                rigid::resolve(r, RigidTarget::Fixed(s.mesh()), config)
            }
            (Body::Static(s), Body::Rigid(r)) => {
                rigid::resolve(r, RigidTarget::Fixed(s.mesh()), config).map(ContactReport::flipped)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::{Particle, RigidBody, SoftBody, StaticBody};
    use softsim_types::{shapes, SoftBodyParams};

    fn slab() -> Body {
        StaticBody::new(&shapes::cube(Point3::new(0.0, -1.0, 0.0), 1.0).unwrap()).into()
    }

    #[test]
    fn test_static_pair_is_ignored() {
        let mut a = slab();
        let mut b = slab();
        let config = ContactConfig::default();
        assert!(DefaultNarrowPhase.resolve(&mut a, &mut b, &config).is_none());
    }

    #[test]
    fn test_dispatch_is_symmetric_for_static() {
        let config = ContactConfig::default();
        let cube = || -> Body {
            RigidBody::new(&shapes::cube(Point3::new(0.0, 0.4, 0.0), 0.5).unwrap(), 1.0)
                .unwrap()
                .with_velocity(Vector3::new(0.0, -1.0, 0.0))
                .into()
        };

        let (mut r1, mut s1) = (cube(), slab());
        let forward = DefaultNarrowPhase.resolve(&mut r1, &mut s1, &config).unwrap();

        let (mut s2, mut r2) = (slab(), cube());
        let backward = DefaultNarrowPhase.resolve(&mut s2, &mut r2, &config).unwrap();

        assert_eq!(forward.kind, ContactKind::SupportPlane);
        assert_eq!(forward.normal, -backward.normal);
        assert_eq!(r1, r2);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_soft_and_particle_push_each_other() {
        let config = ContactConfig::elastic();
        let mut soft: Body = SoftBody::new(
            &shapes::icosphere(1, Point3::new(0.0, 0.0, 0.0), 1.0).unwrap(),
            1.0,
            SoftBodyParams::default(),
        )
        .unwrap()
        .into();
        let mut particle: Body = Particle::sphere(Point3::new(0.0, 1.5, 0.0), 0.8, 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -1.0, 0.0))
            .into();
        let momentum = soft.momentum() + particle.momentum();

        let report = DefaultNarrowPhase
            .resolve(&mut particle, &mut soft, &config)
            .unwrap();

        assert_eq!(report.kind, ContactKind::VertexHull);
        // Seen from the particle, the soft body pushes it upward.
        assert!(report.normal.y > 0.0);

        let p = particle.as_particle().unwrap();
        assert!(p.position().y > 1.5);
        assert!(p.velocity().y > -1.0);
        assert!((soft.momentum() + particle.momentum() - momentum).norm() < 1e-9);
    }

    #[test]
    fn test_particle_moves_rigid_body() {
        let config = ContactConfig::elastic();
        let mut cube: Body = RigidBody::new(&shapes::cube(Point3::origin(), 0.5).unwrap(), 2.0)
            .unwrap()
            .into();
        let mut particle: Body = Particle::sphere(Point3::new(0.0, 0.9, 0.0), 0.5, 1.0)
            .unwrap()
            .with_velocity(Vector3::new(0.0, -2.0, 0.0))
            .into();

        let report = DefaultNarrowPhase
            .resolve(&mut cube, &mut particle, &config)
            .unwrap();

        assert_eq!(report.kind, ContactKind::ParticleHull);
        // Seen from the cube, the particle pushes it downward.
        assert!(report.normal.y < 0.0);
        assert!(cube.as_rigid().unwrap().velocity().y < 0.0);
        let momentum = cube.momentum() + particle.momentum();
        assert!((momentum - Vector3::new(0.0, -2.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_merge_keeps_deeper() {
        let shallow = ContactReport {
            kind: ContactKind::VertexHull,
            point: Point3::origin(),
            normal: Vector3::y(),
            depth: 0.1,
            contacts: 2,
        };
        let deep = ContactReport {
            depth: 0.3,
            normal: -Vector3::y(),
            contacts: 1,
            ..shallow
        };

        let merged = shallow.merge(deep);
        assert_eq!(merged.depth, 0.3);
        assert_eq!(merged.normal, -Vector3::y());
        assert_eq!(merged.contacts, 3);
    }
}
