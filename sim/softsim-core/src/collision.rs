//! One collision pass over every body.
//!
//! ```text
//! bodies ──▶ broad phase ──▶ (i, j) pairs ──▶ narrow phase ──▶ corrected bodies
//!            sphere overlap   sorted, i < j     per-kind dispatch
//! ```
//!
//! Pairs are resolved one after another. Each resolution sees the positions
//! left by the previous one, and borrows exactly the two bodies it touches.

use softsim_types::ContactConfig;
use tracing::trace;

use crate::body::Body;
use crate::broad_phase::{BroadPhase, BroadPhaseConfig, BroadPhaseDetector};
use crate::narrow_phase::{ContactReport, DefaultNarrowPhase, NarrowPhase};

/// Outcome of one collision pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionStats {
    /// Pairs whose bounding spheres overlapped.
    pub candidate_pairs: usize,
    /// Pairs that were actually in contact.
    pub contact_pairs: usize,
    /// Individual vertex contacts corrected across all pairs.
    pub vertex_contacts: usize,
    /// Deepest penetration seen, or zero.
    pub max_depth: f64,
}

impl CollisionStats {
    fn record(&mut self, report: &ContactReport) {
        self.contact_pairs += 1;
        self.vertex_contacts += report.contacts;
        self.max_depth = self.max_depth.max(report.depth);
    }

    /// Fold another pass into this one.
    pub fn accumulate(&mut self, other: &Self) {
        self.candidate_pairs += other.candidate_pairs;
        self.contact_pairs += other.contact_pairs;
        self.vertex_contacts += other.vertex_contacts;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

/// Borrow two distinct bodies mutably at once.
///
/// # Panics
///
/// Panics if `i >= j` or `j` is out of bounds; broad phases only produce
/// ordered in-range pairs.
pub fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> (&mut Body, &mut Body) {
    assert!(i < j, "pair must be ordered, got ({i}, {j})");
    let (head, tail) = bodies.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Broad phase plus narrow phase, with the contact response settings.
#[derive(Debug, Clone)]
pub struct CollisionPipeline<N = DefaultNarrowPhase> {
    broad_phase: BroadPhaseDetector,
    narrow_phase: N,
    contact: ContactConfig,
}

impl Default for CollisionPipeline {
    fn default() -> Self {
        Self::new(ContactConfig::default())
    }
}

impl CollisionPipeline {
    /// Create a pipeline with the default broad and narrow phases.
    #[must_use]
    pub fn new(contact: ContactConfig) -> Self {
        Self::with_narrow_phase(contact, DefaultNarrowPhase)
    }
}

impl<N: NarrowPhase> CollisionPipeline<N> {
    /// Create a pipeline with a custom narrow phase.
    #[must_use]
    pub fn with_narrow_phase(contact: ContactConfig, narrow_phase: N) -> Self {
        Self {
            broad_phase: BroadPhaseDetector::default(),
            narrow_phase,
            contact,
        }
    }

    /// Use the given broad-phase configuration.
    #[must_use]
    pub fn broad_phase_config(mut self, config: BroadPhaseConfig) -> Self {
        self.broad_phase.set_config(config);
        self
    }

    /// Contact response settings.
    #[must_use]
    pub fn contact(&self) -> &ContactConfig {
        &self.contact
    }

    /// Replace the contact response settings.
    pub fn set_contact(&mut self, contact: ContactConfig) {
        self.contact = contact;
    }

    /// The narrow phase.
    #[must_use]
    pub fn narrow_phase(&self) -> &N {
        &self.narrow_phase
    }

    /// Resolve every contact among `bodies`.
    pub fn resolve_all(&mut self, bodies: &mut [Body]) -> CollisionStats {
        let pairs = self.broad_phase.find_potential_pairs(bodies);
        let mut stats = CollisionStats {
            candidate_pairs: pairs.len(),
            ..CollisionStats::default()
        };

        for (i, j) in pairs {
            let (a, b) = pair_mut(bodies, i, j);
            if let Some(report) = self.narrow_phase.resolve(a, b, &self.contact) {
                trace!(
                    a = i,
                    b = j,
                    kind = ?report.kind,
                    depth = report.depth,
                    contacts = report.contacts,
                    "contact resolved"
                );
                stats.record(&report);
            }
        }

        stats
    }
}

/// Resolve every contact among `bodies` with the default pipeline.
pub fn resolve_all(bodies: &mut [Body], contact: &ContactConfig) -> CollisionStats {
    CollisionPipeline::new(*contact).resolve_all(bodies)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::body::{Particle, StaticBody};
    use crate::broad_phase::BoundingSphere;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use softsim_types::shapes;

    /// Records every pair it is handed without touching the bodies.
    #[derive(Default)]
    struct Spy {
        seen: Vec<(BoundingSphere, BoundingSphere)>,
    }

    impl NarrowPhase for Spy {
        fn resolve(
            &mut self,
            a: &mut Body,
            b: &mut Body,
            _config: &ContactConfig,
        ) -> Option<ContactReport> {
            self.seen.push((BoundingSphere::of(a), BoundingSphere::of(b)));
            None
        }
    }

    fn particle(x: f64, vx: f64) -> Body {
        Particle::sphere(Point3::new(x, 0.0, 0.0), 0.6, 1.0)
            .unwrap()
            .with_gravity(false)
            .with_velocity(Vector3::new(vx, 0.0, 0.0))
            .into()
    }

    #[test]
    fn test_pair_mut() {
        let mut bodies = vec![particle(0.0, 0.0), particle(1.0, 0.0), particle(2.0, 0.0)];
        let (a, c) = pair_mut(&mut bodies, 0, 2);
        assert_eq!(a.center().x.round(), 0.0);
        assert_eq!(c.center().x.round(), 2.0);
    }

    #[test]
    #[should_panic(expected = "pair must be ordered")]
    fn test_pair_mut_rejects_unordered() {
        let mut bodies = vec![particle(0.0, 0.0), particle(1.0, 0.0)];
        let _ = pair_mut(&mut bodies, 1, 1);
    }

    #[test]
    fn test_narrow_phase_only_sees_overlapping_spheres() {
        let mut bodies = vec![
            particle(0.0, 0.0),
            particle(1.0, 0.0),
            particle(10.0, 0.0),
            StaticBody::new(&shapes::cube(Point3::new(0.0, -2.0, 0.0), 1.0).unwrap()).into(),
            StaticBody::new(&shapes::cube(Point3::new(0.5, -2.0, 0.0), 1.0).unwrap()).into(),
        ];

        let mut pipeline = CollisionPipeline::with_narrow_phase(ContactConfig::default(), Spy::default());
        let stats = pipeline.resolve_all(&mut bodies);

        let seen = &pipeline.narrow_phase().seen;
        assert_eq!(seen.len(), stats.candidate_pairs);
        assert_eq!(stats.contact_pairs, 0);
        assert!(!seen.is_empty());
        for (a, b) in seen {
            assert!(a.overlaps(b));
        }
    }

    #[test]
    fn test_resolve_all_particles() {
        let mut bodies = vec![particle(-0.5, 1.0), particle(0.5, -1.0), particle(20.0, 0.0)];

        let stats = resolve_all(&mut bodies, &ContactConfig::default());

        assert_eq!(stats.candidate_pairs, 1);
        assert_eq!(stats.contact_pairs, 1);
        assert_relative_eq!(stats.max_depth, 0.2, epsilon = 1e-12);

        let (a, b) = (bodies[0].as_particle().unwrap(), bodies[1].as_particle().unwrap());
        assert_relative_eq!(nalgebra::distance(&a.position(), &b.position()), 1.2, epsilon = 1e-12);
        assert_relative_eq!(a.velocity().x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(b.velocity().x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = CollisionStats::default();
        total.accumulate(&CollisionStats {
            candidate_pairs: 2,
            contact_pairs: 1,
            vertex_contacts: 4,
            max_depth: 0.3,
        });
        total.accumulate(&CollisionStats {
            candidate_pairs: 1,
            contact_pairs: 1,
            vertex_contacts: 1,
            max_depth: 0.1,
        });
        assert_eq!(total.candidate_pairs, 3);
        assert_eq!(total.vertex_contacts, 5);
        assert_eq!(total.max_depth, 0.3);
    }
}
