//! Sequencer: visiting order for the stops of one van.
//!
//! A capacity-aware guided local search is tried first. If it fails (time
//! budget, capacity, invalid output, panic), a nearest-neighbor + 2-opt
//! heuristic runs. If that fails too, the cluster keeps its input order and
//! is flagged for manual review. Routes are open paths starting at the
//! cluster's first stop.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SolveError;
use crate::haversine::HaversineMatrix;
use crate::traits::{DistanceMatrixProvider, RouteSolver};

/// Which stage produced a route's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimizer {
    Solver,
    Fallback,
    Unoptimized,
    /// Not sequenced at all (two-point shuttle leg).
    Fixed,
}

/// Visiting order tagged with the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sequenced {
    Solved(Vec<usize>),
    Fallback(Vec<usize>),
    /// Input order; both solvers failed.
    Unoptimized(Vec<usize>),
}

impl Sequenced {
    pub fn order(&self) -> &[usize] {
        match self {
            Sequenced::Solved(order) | Sequenced::Fallback(order) | Sequenced::Unoptimized(order) => order,
        }
    }

    pub fn needs_manual_review(&self) -> bool {
        matches!(self, Sequenced::Unoptimized(_))
    }

    pub fn optimizer(&self) -> Optimizer {
        match self {
            Sequenced::Solved(_) => Optimizer::Solver,
            Sequenced::Fallback(_) => Optimizer::Fallback,
            Sequenced::Unoptimized(_) => Optimizer::Unoptimized,
        }
    }
}

/// Preferred solver followed by a fallback.
#[derive(Debug, Clone)]
pub struct Sequencer<P = GuidedLocalSearch, F = NearestNeighborTwoOpt> {
    pub preferred: P,
    pub fallback: F,
    /// Stops per van.
    pub capacity: usize,
}

impl Sequencer {
    pub fn standard(capacity: usize, time_limit: Duration, max_iterations: usize, two_opt_passes: usize) -> Self {
        Self {
            preferred: GuidedLocalSearch {
                time_limit,
                max_iterations,
            },
            fallback: NearestNeighborTwoOpt {
                max_passes: two_opt_passes,
            },
            capacity,
        }
    }
}

impl<P: RouteSolver, F: RouteSolver> Sequencer<P, F> {
    pub fn new(preferred: P, fallback: F, capacity: usize) -> Self {
        Self {
            preferred,
            fallback,
            capacity,
        }
    }

    /// Order `locations`; indices refer to the input slice.
    pub fn sequence(&self, locations: &[(f64, f64)]) -> Sequenced {
        let n = locations.len();
        if n <= 1 {
            return Sequenced::Solved((0..n).collect());
        }

        let matrix = HaversineMatrix.matrix_for(locations);

        match attempt(&self.preferred, &matrix, self.capacity) {
            Ok(order) => {
                debug!("{} sequenced {} stops, {} m", self.preferred.name(), n, path_cost(&order, &matrix));
                return Sequenced::Solved(order);
            }
            Err(err) => warn!(
                "{} failed on {} stops ({}), falling back to {}",
                self.preferred.name(),
                n,
                err,
                self.fallback.name()
            ),
        }

        match attempt(&self.fallback, &matrix, self.capacity) {
            Ok(order) => Sequenced::Fallback(order),
            Err(err) => {
                warn!(
                    "{} failed on {} stops ({}), keeping input order - REQUIRES MANUAL REVIEW",
                    self.fallback.name(),
                    n,
                    err
                );
                Sequenced::Unoptimized((0..n).collect())
            }
        }
    }
}

fn attempt<S: RouteSolver>(solver: &S, matrix: &[Vec<i32>], capacity: usize) -> Result<Vec<usize>, SolveError> {
    let order = panic::catch_unwind(AssertUnwindSafe(|| solver.solve(matrix, capacity)))
        .map_err(|_| SolveError::Panicked)??;
    validate_order(&order, matrix.len())?;
    Ok(order)
}

/// A valid order visits every index exactly once and starts at 0.
pub fn validate_order(order: &[usize], n: usize) -> Result<(), SolveError> {
    if order.len() != n || order.first() != Some(&0) {
        return Err(SolveError::InvalidPermutation);
    }
    let mut seen = vec![false; n];
    for &index in order {
        if index >= n || seen[index] {
            return Err(SolveError::InvalidPermutation);
        }
        seen[index] = true;
    }
    Ok(())
}

/// Total matrix cost of the open path `order`.
pub fn path_cost(order: &[usize], matrix: &[Vec<i32>]) -> i64 {
    order
        .windows(2)
        .map(|pair| i64::from(matrix[pair[0]][pair[1]]))
        .sum()
}

fn check_square(matrix: &[Vec<i32>]) -> Result<(), SolveError> {
    if matrix.iter().all(|row| row.len() == matrix.len()) {
        Ok(())
    } else {
        Err(SolveError::Unavailable("distance matrix is not square".to_string()))
    }
}

// ============================================================================
// Fallback: nearest neighbor + 2-opt
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct NearestNeighborTwoOpt {
    pub max_passes: usize,
}

impl Default for NearestNeighborTwoOpt {
    fn default() -> Self {
        Self { max_passes: 50 }
    }
}

impl RouteSolver for NearestNeighborTwoOpt {
    fn name(&self) -> &'static str {
        "nearest-neighbor/2-opt"
    }

    fn solve(&self, matrix: &[Vec<i32>], _capacity: usize) -> Result<Vec<usize>, SolveError> {
        check_square(matrix)?;
        let mut order = nearest_neighbor(matrix);
        two_opt(&mut order, matrix, self.max_passes);
        Ok(order)
    }
}

/// Greedy path from index 0, always stepping to the closest unvisited
/// index (ties go to the lower index).
pub fn nearest_neighbor(matrix: &[Vec<i32>]) -> Vec<usize> {
    let n = matrix.len();
    if n == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut last = 0;
    visited[0] = true;
    order.push(0);

    while order.len() < n {
        let next = (0..n)
            .filter(|&j| !visited[j])
            .min_by_key(|&j| (matrix[last][j], j))
            .unwrap_or(last);
        visited[next] = true;
        order.push(next);
        last = next;
    }
    order
}

/// Open-path 2-opt with a fixed first stop.
///
/// Each pass reverses `order[i..=j]` whenever that strictly shortens the
/// path; stops after a pass without improvement or `max_passes` passes.
/// Returns the number of passes run. Assumes a symmetric matrix.
pub fn two_opt(order: &mut [usize], matrix: &[Vec<i32>], max_passes: usize) -> usize {
    let n = order.len();
    if n < 3 {
        return 0;
    }

    let cost = |a: usize, b: usize| i64::from(matrix[a][b]);
    let mut passes = 0;

    while passes < max_passes {
        passes += 1;
        let mut improved = false;

        for i in 1..n - 1 {
            for j in i + 1..n {
                let delta = two_opt_delta(order, i, j, cost);
                if delta < 0 {
                    order[i..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }
    passes
}

/// Change in path cost from reversing `order[i..=j]` (`1 <= i < j`).
fn two_opt_delta<C, T>(order: &[usize], i: usize, j: usize, cost: C) -> T
where
    C: Fn(usize, usize) -> T,
    T: std::ops::Add<Output = T> + std::ops::Sub<Output = T>,
{
    let a = order[i - 1];
    let b = order[i];
    let c = order[j];
    let mut removed = cost(a, b);
    let mut added = cost(a, c);
    if let Some(&e) = order.get(j + 1) {
        removed = removed + cost(c, e);
        added = added + cost(b, e);
    }
    added - removed
}

// ============================================================================
// Preferred: guided local search
// ============================================================================

/// Cheapest-arc path construction improved by guided local search.
///
/// Rejects clusters larger than the vehicle capacity. The construction and
/// first descent must finish within `time_limit`; later rounds stop at the
/// deadline and keep the best complete path seen.
#[derive(Debug, Clone, Copy)]
pub struct GuidedLocalSearch {
    pub time_limit: Duration,
    pub max_iterations: usize,
}

impl Default for GuidedLocalSearch {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
            max_iterations: 100,
        }
    }
}

/// Penalty weight relative to the mean edge length of the first local optimum.
const GLS_LAMBDA_COEFFICIENT: f64 = 0.1;

impl RouteSolver for GuidedLocalSearch {
    fn name(&self) -> &'static str {
        "guided-local-search"
    }

    fn solve(&self, matrix: &[Vec<i32>], capacity: usize) -> Result<Vec<usize>, SolveError> {
        let started = Instant::now();
        check_square(matrix)?;

        let n = matrix.len();
        if n > capacity {
            return Err(SolveError::CapacityExceeded { stops: n, capacity });
        }

        let distance = |a: usize, b: usize| f64::from(matrix[a][b]);
        let mut current = nearest_neighbor(matrix);
        descend(&mut current, distance);
        if started.elapsed() >= self.time_limit {
            return Err(SolveError::Timeout);
        }
        if n < 4 {
            return Ok(current);
        }

        let mut best = current.clone();
        let mut best_cost = path_cost(&best, matrix);
        let lambda = GLS_LAMBDA_COEFFICIENT * best_cost as f64 / (n - 1) as f64;
        let mut penalties = vec![vec![0u32; n]; n];

        for _ in 0..self.max_iterations {
            if started.elapsed() >= self.time_limit {
                debug!("guided local search hit its time budget");
                break;
            }

            penalize_max_utility(&current, matrix, &mut penalties);
            let augmented = |a: usize, b: usize| f64::from(matrix[a][b]) + lambda * f64::from(penalties[a][b]);
            descend(&mut current, augmented);

            let cost = path_cost(&current, matrix);
            if cost < best_cost {
                best_cost = cost;
                best = current.clone();
            }
        }

        Ok(best)
    }
}

fn path_cost_by<C: Fn(usize, usize) -> f64>(order: &[usize], cost: &C) -> f64 {
    order.windows(2).map(|pair| cost(pair[0], pair[1])).sum()
}

/// Apply improving 2-opt and relocate moves until none is left.
fn descend<C: Fn(usize, usize) -> f64>(order: &mut Vec<usize>, cost: C) {
    const EPSILON: f64 = 1e-9;
    let n = order.len();
    if n < 3 {
        return;
    }

    loop {
        let mut improved = false;

        for i in 1..n - 1 {
            for j in i + 1..n {
                if two_opt_delta(order, i, j, &cost) < -EPSILON {
                    order[i..=j].reverse();
                    improved = true;
                }
            }
        }

        for from in 1..n {
            let current = path_cost_by(order, &cost);
            for to in 1..n {
                if to == from {
                    continue;
                }
                let mut candidate = order.clone();
                let node = candidate.remove(from);
                candidate.insert(to, node);
                if path_cost_by(&candidate, &cost) < current - EPSILON {
                    *order = candidate;
                    improved = true;
                    break;
                }
            }
        }

        if !improved {
            return;
        }
    }
}

/// Penalize the path edges with the highest `distance / (1 + penalty)`.
fn penalize_max_utility(order: &[usize], matrix: &[Vec<i32>], penalties: &mut [Vec<u32>]) {
    let utility = |a: usize, b: usize| f64::from(matrix[a][b]) / (1.0 + f64::from(penalties[a][b]));
    let max = order
        .windows(2)
        .map(|pair| utility(pair[0], pair[1]))
        .fold(0.0, f64::max);

    let edges: Vec<(usize, usize)> = order
        .windows(2)
        .filter(|pair| utility(pair[0], pair[1]) >= max)
        .map(|pair| (pair[0], pair[1]))
        .collect();
    for (a, b) in edges {
        penalties[a][b] += 1;
        penalties[b][a] += 1;
    }
}
