//! Seams between the planner core and its collaborators.
//!
//! Coordinates are `(lat, lng)` tuples throughout.

use crate::error::SolveError;

/// Provides a distance matrix for a set of locations.
///
/// The matrix is indexed by the provided location order.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<i32>>;
}

/// A real road leg between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadLeg {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

/// Resolves road distance/duration between two coordinates.
///
/// Returning `None` means "unknown"; callers fall back to great-circle
/// distance and the travel speed model.
pub trait RoadLookup: Sync {
    fn leg(&self, from: (f64, f64), to: (f64, f64)) -> Option<RoadLeg>;
}

impl<F> RoadLookup for F
where
    F: Fn((f64, f64), (f64, f64)) -> Option<RoadLeg> + Sync,
{
    fn leg(&self, from: (f64, f64), to: (f64, f64)) -> Option<RoadLeg> {
        self(from, to)
    }
}

/// Lookup that never knows a road figure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoadLookup;

impl RoadLookup for NoRoadLookup {
    fn leg(&self, _from: (f64, f64), _to: (f64, f64)) -> Option<RoadLeg> {
        None
    }
}

/// Orders the stops of one cluster.
///
/// `matrix` is a square integer-meter matrix over the cluster's stops in
/// input order. Implementations return a visiting order: a permutation of
/// `0..matrix.len()` that starts at index 0. The route is open (no return
/// to the first stop).
pub trait RouteSolver: Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, matrix: &[Vec<i32>], capacity: usize) -> Result<Vec<usize>, SolveError>;
}
