//! Broad-phase collision culling with bounding spheres.
//!
//! Every body carries a bounding sphere (mean vertex position, max vertex
//! distance) that is refreshed after each integration sub-step. Two bodies
//! can only touch if their spheres overlap, so only those pairs are handed
//! to the narrow phase.
//!
//! # Algorithms
//!
//! - [`BruteForce`] tests all `n(n-1)/2` pairs. It is the reference.
//! - [`SweepAndPrune`] projects the spheres onto the axis of largest spread,
//!   sorts the resulting intervals and only sphere-tests intervals that
//!   overlap on that axis.
//!
//! Both return `(i, j)` index pairs with `i < j`, sorted, so the order in
//! which contacts get resolved does not depend on the algorithm.
//!
//! # Example
//!
//! ```
//! use softsim_core::broad_phase::{BroadPhase, SweepAndPrune};
//! use softsim_core::{Body, Particle};
//! use nalgebra::Point3;
//!
//! let bodies: Vec<Body> = vec![
//!     Particle::sphere(Point3::new(0.0, 0.0, 0.0), 1.0, 1.0).unwrap().into(),
//!     Particle::sphere(Point3::new(1.5, 0.0, 0.0), 1.0, 1.0).unwrap().into(),
//! ];
//!
//! let mut sap = SweepAndPrune::new();
//! let pairs = sap.find_potential_pairs(&bodies);
//!
//! assert_eq!(pairs, vec![(0, 1)]);
//! ```

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::Body;

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center.
    pub center: Point3<f64>,
    /// Sphere radius.
    pub radius: f64,
}

impl BoundingSphere {
    /// Create a sphere.
    #[must_use]
    pub const fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Bounding sphere of a body.
    #[must_use]
    pub fn of(body: &Body) -> Self {
        Self::new(body.center(), body.radius())
    }

    /// Whether two spheres overlap.
    ///
    /// Spheres that merely touch do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        nalgebra::distance(&self.center, &other.center) < self.radius + other.radius
    }

    /// Grow the radius by `margin`.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self::new(self.center, self.radius + margin)
    }

    /// Lower end of the sphere's projection onto `axis`.
    #[must_use]
    pub fn min_on_axis(&self, axis: Axis) -> f64 {
        self.center[axis.index()] - self.radius
    }

    /// Upper end of the sphere's projection onto `axis`.
    #[must_use]
    pub fn max_on_axis(&self, axis: Axis) -> f64 {
        self.center[axis.index()] + self.radius
    }
}

/// Coordinate axis for the sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// X-axis.
    X,
    /// Y-axis (up).
    Y,
    /// Z-axis.
    Z,
}

impl Axis {
    /// All three axes.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }

    /// Component index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// A broad-phase culling algorithm.
pub trait BroadPhase {
    /// Find all pairs of bodies whose bounding spheres overlap.
    ///
    /// Returns sorted `(i, j)` indices into `bodies` with `i < j`. Pairs of
    /// two static bodies are never returned.
    fn find_potential_pairs(&mut self, bodies: &[Body]) -> Vec<(usize, usize)>;
}

/// Sweep-and-prune broad phase.
///
/// Spheres are projected onto the axis where body centers are most spread
/// out, then sorted by lower endpoint. The sweep stops looking for partners
/// of an interval as soon as the next interval starts past its end.
#[derive(Debug, Clone, Default)]
pub struct SweepAndPrune {
    intervals: Vec<Interval>,
    sweep_axis: Option<Axis>,
    margin: f64,
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    body_index: usize,
    sphere: BoundingSphere,
    min: f64,
    max: f64,
    is_static: bool,
}

impl SweepAndPrune {
    /// Create a sweep-and-prune broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow every sphere by `margin` to report pairs slightly early.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Axis used by the most recent sweep.
    #[must_use]
    pub fn sweep_axis(&self) -> Option<Axis> {
        self.sweep_axis
    }

    fn choose_sweep_axis(bodies: &[Body]) -> Axis {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);

        for body in bodies {
            let center = body.center();
            min = min.inf(&center);
            max = max.sup(&center);
        }

        let extent = max - min;
        if extent.x >= extent.y && extent.x >= extent.z {
            Axis::X
        } else if extent.y >= extent.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }
}

impl BroadPhase for SweepAndPrune {
    fn find_potential_pairs(&mut self, bodies: &[Body]) -> Vec<(usize, usize)> {
        let axis = Self::choose_sweep_axis(bodies);
        self.sweep_axis = Some(axis);

        let margin = self.margin;
        self.intervals.clear();
        self.intervals
            .extend(bodies.iter().enumerate().map(|(index, body)| {
                let sphere = BoundingSphere::of(body).expanded(margin);
                Interval {
                    body_index: index,
                    sphere,
                    min: sphere.min_on_axis(axis),
                    max: sphere.max_on_axis(axis),
                    is_static: body.is_static(),
                }
            }));

        // Rust's sort is adaptive, so nearly sorted frames are cheap.
        self.intervals.sort_by(|a, b| a.min.total_cmp(&b.min));

        let mut pairs = Vec::new();
        for (i, a) in self.intervals.iter().enumerate() {
            for b in &self.intervals[i + 1..] {
                if b.min > a.max {
                    break;
                }
                if a.is_static && b.is_static {
                    continue;
                }
                if a.sphere.overlaps(&b.sphere) {
                    let (lo, hi) = if a.body_index < b.body_index {
                        (a.body_index, b.body_index)
                    } else {
                        (b.body_index, a.body_index)
                    };
                    pairs.push((lo, hi));
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }
}

/// Brute-force `O(n²)` broad phase.
///
/// Cheapest for small scenes, and the reference the faster algorithms are
/// checked against.
#[derive(Debug, Clone, Default)]
pub struct BruteForce {
    margin: f64,
}

impl BruteForce {
    /// Create a brute-force broad phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow every sphere by `margin`.
    #[must_use]
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }
}

impl BroadPhase for BruteForce {
    fn find_potential_pairs(&mut self, bodies: &[Body]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();

        for (i, a) in bodies.iter().enumerate() {
            let sphere_a = BoundingSphere::of(a).expanded(self.margin);
            for (j, b) in bodies.iter().enumerate().skip(i + 1) {
                if a.is_static() && b.is_static() {
                    continue;
                }
                if sphere_a.overlaps(&BoundingSphere::of(b).expanded(self.margin)) {
                    pairs.push((i, j));
                }
            }
        }

        pairs
    }
}

/// Broad-phase configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BroadPhaseConfig {
    /// Algorithm to use.
    pub algorithm: BroadPhaseAlgorithm,
    /// Amount added to every bounding radius.
    pub margin: f64,
    /// Body count below which [`BroadPhaseAlgorithm::Auto`] uses brute force.
    pub brute_force_threshold: usize,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            algorithm: BroadPhaseAlgorithm::Auto,
            margin: 0.0,
            brute_force_threshold: 32,
        }
    }
}

impl BroadPhaseConfig {
    /// Use the given algorithm.
    #[must_use]
    pub fn algorithm(mut self, algorithm: BroadPhaseAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the sphere margin.
    #[must_use]
    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the margin is negative or not finite.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(softsim_types::SimError::invalid_config(format!(
                "broad-phase margin must be non-negative, got {}",
                self.margin
            )));
        }
        Ok(())
    }
}

/// Broad-phase algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BroadPhaseAlgorithm {
    /// Choose by body count.
    #[default]
    Auto,
    /// Always test every pair.
    BruteForce,
    /// Always sweep and prune.
    SweepAndPrune,
}

/// Algorithm selection wrapped behind one interface.
#[derive(Debug, Clone)]
pub struct BroadPhaseDetector {
    config: BroadPhaseConfig,
    sap: SweepAndPrune,
    brute: BruteForce,
}

impl Default for BroadPhaseDetector {
    fn default() -> Self {
        Self::new(BroadPhaseConfig::default())
    }
}

impl BroadPhaseDetector {
    /// Create a detector.
    #[must_use]
    pub fn new(config: BroadPhaseConfig) -> Self {
        Self {
            sap: SweepAndPrune::new().with_margin(config.margin),
            brute: BruteForce::new().with_margin(config.margin),
            config,
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &BroadPhaseConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: BroadPhaseConfig) {
        self.sap = SweepAndPrune::new().with_margin(config.margin);
        self.brute = BruteForce::new().with_margin(config.margin);
        self.config = config;
    }
}

impl BroadPhase for BroadPhaseDetector {
    fn find_potential_pairs(&mut self, bodies: &[Body]) -> Vec<(usize, usize)> {
        match self.config.algorithm {
            BroadPhaseAlgorithm::Auto => {
                if bodies.len() < self.config.brute_force_threshold {
                    self.brute.find_potential_pairs(bodies)
                } else {
                    self.sap.find_potential_pairs(bodies)
                }
            }
            BroadPhaseAlgorithm::BruteForce => self.brute.find_potential_pairs(bodies),
            BroadPhaseAlgorithm::SweepAndPrune => self.sap.find_potential_pairs(bodies),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;
    use crate::body::{Particle, StaticBody};
    use softsim_types::shapes;

    fn ball(x: f64, y: f64, radius: f64) -> Body {
        Particle::sphere(Point3::new(x, y, 0.0), radius, 1.0)
            .unwrap()
            .into()
    }

    fn slab(x: f64) -> Body {
        StaticBody::new(&shapes::cube(Point3::new(x, 0.0, 0.0), 1.0).unwrap()).into()
    }

    #[test]
    fn test_sphere_overlap_is_strict() {
        let a = BoundingSphere::new(Point3::origin(), 1.0);
        let touching = BoundingSphere::new(Point3::new(2.0, 0.0, 0.0), 1.0);
        let close = BoundingSphere::new(Point3::new(1.9, 0.0, 0.0), 1.0);

        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&close));
        assert!(close.overlaps(&a));
        assert!(a.expanded(0.1).overlaps(&touching));
    }

    #[test]
    fn test_sweep_and_prune_finds_overlapping_spheres() {
        let bodies = vec![ball(0.0, 0.0, 1.0), ball(1.5, 0.0, 1.0)];
        let pairs = SweepAndPrune::new().find_potential_pairs(&bodies);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_no_overlap() {
        let bodies = vec![ball(0.0, 0.0, 1.0), ball(5.0, 0.0, 1.0)];
        assert!(SweepAndPrune::new().find_potential_pairs(&bodies).is_empty());
        assert!(BruteForce::new().find_potential_pairs(&bodies).is_empty());
    }

    #[test]
    fn test_skips_static_static() {
        let bodies = vec![slab(0.0), slab(0.5)];
        assert!(SweepAndPrune::new().find_potential_pairs(&bodies).is_empty());
        assert!(BruteForce::new().find_potential_pairs(&bodies).is_empty());
    }

    #[test]
    fn test_includes_static_dynamic() {
        let bodies = vec![slab(0.0), ball(0.0, 1.5, 1.0)];
        assert_eq!(SweepAndPrune::new().find_potential_pairs(&bodies), vec![(0, 1)]);
    }

    #[test]
    fn test_pairs_are_index_ordered() {
        // Sorted along X, body 2 comes first.
        let bodies = vec![ball(1.0, 0.0, 1.0), ball(5.0, 0.0, 1.0), ball(0.0, 0.0, 1.0)];
        assert_eq!(SweepAndPrune::new().find_potential_pairs(&bodies), vec![(0, 2)]);
    }

    #[test]
    fn test_brute_force_matches_sap() {
        let bodies = vec![
            ball(0.0, 0.0, 1.0),
            ball(1.5, 0.0, 1.0),
            ball(0.0, 1.5, 1.0),
            ball(5.0, 0.0, 1.0),
            slab(6.0),
            slab(6.5),
        ];

        let sap_pairs = SweepAndPrune::new().find_potential_pairs(&bodies);
        let brute_pairs = BruteForce::new().find_potential_pairs(&bodies);

        assert_eq!(sap_pairs, brute_pairs);
        assert_eq!(sap_pairs, vec![(0, 1), (0, 2), (3, 4), (3, 5)]);
    }

    #[test]
    fn test_sweep_axis_follows_spread() {
        let bodies = vec![ball(0.0, 0.0, 0.1), ball(0.0, 10.0, 0.1), ball(1.0, 5.0, 0.1)];
        let mut sap = SweepAndPrune::new();
        sap.find_potential_pairs(&bodies);
        assert_eq!(sap.sweep_axis(), Some(Axis::Y));
    }

    #[test]
    fn test_detector_auto_agrees_with_both() {
        let bodies: Vec<_> = (0..100)
            .map(|i| ball(i as f64 * 0.9, (i % 3) as f64, 0.5))
            .collect();

        let expected = BruteForce::new().find_potential_pairs(&bodies);
        let mut detector = BroadPhaseDetector::default();
        assert_eq!(detector.find_potential_pairs(&bodies), expected);
        assert_eq!(
            detector.find_potential_pairs(&bodies[..10]),
            BruteForce::new().find_potential_pairs(&bodies[..10])
        );
    }

    #[test]
    fn test_margin_expands_detection() {
        let bodies = vec![ball(0.0, 0.0, 1.0), ball(2.1, 0.0, 1.0)];

        assert!(SweepAndPrune::new().find_potential_pairs(&bodies).is_empty());

        let mut detector = BroadPhaseDetector::default();
        detector.set_config(BroadPhaseConfig::default().margin(0.1));
        assert_eq!(detector.find_potential_pairs(&bodies), vec![(0, 1)]);
    }

    #[test]
    fn test_config_validation() {
        assert!(BroadPhaseConfig::default().validate().is_ok());
        assert!(BroadPhaseConfig::default().margin(-1.0).validate().is_err());
    }
}
