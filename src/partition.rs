//! Partitioner: terminal grouping, fleet sizing and balanced clustering.
//!
//! Clustering works over an arena of stop coordinates with one cluster id
//! per stop; the balance pass reassigns ids instead of moving stops.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::{FleetConfig, FleetSize};
use crate::model::Stop;
use crate::terminals::normalize_name;

/// Stops sharing one destination terminal.
#[derive(Debug, Clone)]
pub struct TerminalGroup {
    /// Terminal name as first spelled by the input.
    pub terminal: String,
    pub stops: Vec<Stop>,
}

/// Group stops by normalized terminal name, ordered by that name.
///
/// Stops keep their relative input order inside each group.
pub fn group_by_terminal(stops: Vec<Stop>) -> Vec<TerminalGroup> {
    let mut groups: BTreeMap<String, TerminalGroup> = BTreeMap::new();
    for stop in stops {
        groups
            .entry(normalize_name(&stop.terminal))
            .or_insert_with(|| TerminalGroup {
                terminal: stop.terminal.trim().to_string(),
                stops: Vec::new(),
            })
            .stops
            .push(stop);
    }
    groups.into_values().collect()
}

/// Number of vans for a group of `stop_count` stops.
///
/// Never fewer than needed to keep every van within capacity.
pub fn vehicle_count(stop_count: usize, config: &FleetConfig) -> usize {
    let needed = stop_count.div_ceil(config.vehicle_capacity.max(1)).max(1);
    let requested = match config.fleet_size {
        FleetSize::Default => config.default_vehicle_count,
        FleetSize::Exact(count) => count,
        FleetSize::Auto => needed.clamp(config.min_vehicles, config.max_vehicles),
    };

    if requested < needed {
        warn!(
            "{} vans cannot carry {} stops at capacity {}, using {}",
            requested, stop_count, config.vehicle_capacity, needed
        );
        needed
    } else {
        requested
    }
}

/// Split `stops` into `vehicles` balanced clusters, dropping empty ones.
pub fn partition(stops: Vec<Stop>, vehicles: usize, max_iterations: usize) -> Vec<Vec<Stop>> {
    if stops.is_empty() {
        return Vec::new();
    }

    let points: Vec<(f64, f64)> = stops.iter().map(|stop| stop.location).collect();
    let clusters = cluster_indices(&points, vehicles, max_iterations);

    let mut arena: Vec<Option<Stop>> = stops.into_iter().map(Some).collect();
    clusters
        .into_iter()
        .filter(|members| !members.is_empty())
        .map(|members| {
            members
                .into_iter()
                .filter_map(|index| arena[index].take())
                .collect()
        })
        .collect()
}

/// Balanced k-means over `points`. Returns `k` member lists (some possibly
/// empty when there are fewer points than clusters), each in ascending
/// index order.
pub fn cluster_indices(points: &[(f64, f64)], k: usize, max_iterations: usize) -> Vec<Vec<usize>> {
    let k = k.max(1);
    if points.is_empty() {
        return vec![Vec::new(); k];
    }
    let (mut assignment, mut centroids) = kmeans(points, k, max_iterations);
    balance(points, &mut assignment, &mut centroids);

    let mut clusters = vec![Vec::new(); k];
    for (index, &cluster) in assignment.iter().enumerate() {
        clusters[cluster].push(index);
    }
    clusters
}

fn squared(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dlat = a.0 - b.0;
    let dlng = a.1 - b.1;
    dlat * dlat + dlng * dlng
}

/// Index of the centroid nearest `point`; ties go to the lower index.
fn nearest(point: (f64, f64), centroids: &[(f64, f64)]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (index, &centroid) in centroids.iter().enumerate() {
        let dist = squared(point, centroid);
        if dist < best_dist {
            best = index;
            best_dist = dist;
        }
    }
    best
}

/// Deterministic farthest-point seeding: the first point, then repeatedly
/// the point farthest from every chosen seed.
fn seed_centroids(points: &[(f64, f64)], k: usize) -> Vec<(f64, f64)> {
    let mut centroids = vec![points[0]];
    let mut nearest_dist: Vec<f64> = points.iter().map(|&p| squared(p, points[0])).collect();

    while centroids.len() < k {
        let mut far = 0;
        for (index, &dist) in nearest_dist.iter().enumerate() {
            if dist > nearest_dist[far] {
                far = index;
            }
        }
        let seed = points[far];
        centroids.push(seed);
        for (dist, &point) in nearest_dist.iter_mut().zip(points) {
            *dist = dist.min(squared(point, seed));
        }
    }
    centroids
}

fn centroid_of(points: &[(f64, f64)], assignment: &[usize], cluster: usize) -> Option<(f64, f64)> {
    let mut count = 0usize;
    let mut sum = (0.0, 0.0);
    for (point, _) in points.iter().zip(assignment).filter(|(_, c)| **c == cluster) {
        sum.0 += point.0;
        sum.1 += point.1;
        count += 1;
    }
    (count > 0).then(|| (sum.0 / count as f64, sum.1 / count as f64))
}

fn kmeans(points: &[(f64, f64)], k: usize, max_iterations: usize) -> (Vec<usize>, Vec<(f64, f64)>) {
    if points.len() <= k {
        // One point per cluster; the rest stay empty.
        let assignment = (0..points.len()).collect();
        let mut centroids = points.to_vec();
        centroids.resize(k, points[0]);
        return (assignment, centroids);
    }

    let mut centroids = seed_centroids(points, k);
    let mut assignment: Vec<usize> = points.iter().map(|&p| nearest(p, &centroids)).collect();

    for iteration in 0..max_iterations {
        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            if let Some(mean) = centroid_of(points, &assignment, cluster) {
                *centroid = mean;
            }
        }

        let next: Vec<usize> = points.iter().map(|&p| nearest(p, &centroids)).collect();
        if next == assignment {
            debug!("k-means converged after {} iterations (k={})", iteration + 1, k);
            break;
        }
        assignment = next;
    }

    (assignment, centroids)
}

/// Move stops from the largest to the smallest cluster until sizes differ
/// by at most one. Each move picks the member of the largest cluster
/// nearest the smallest cluster's centroid.
fn balance(points: &[(f64, f64)], assignment: &mut [usize], centroids: &mut [(f64, f64)]) {
    let k = centroids.len();
    loop {
        let mut sizes = vec![0usize; k];
        for &cluster in assignment.iter() {
            sizes[cluster] += 1;
        }

        let mut largest = 0;
        let mut smallest = 0;
        for cluster in 1..k {
            if sizes[cluster] > sizes[largest] {
                largest = cluster;
            }
            if sizes[cluster] < sizes[smallest] {
                smallest = cluster;
            }
        }
        if sizes[largest] - sizes[smallest] <= 1 {
            return;
        }

        let target = centroids[smallest];
        let Some(moved) = (0..points.len())
            .filter(|&index| assignment[index] == largest)
            .min_by(|&a, &b| squared(points[a], target).total_cmp(&squared(points[b], target)))
        else {
            return;
        };

        debug!("balance: stop {} moves from cluster {} to {}", moved, largest, smallest);
        assignment[moved] = smallest;
        for cluster in [largest, smallest] {
            if let Some(mean) = centroid_of(points, assignment, cluster) {
                centroids[cluster] = mean;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| (-33.4 - (i % 5) as f64 * 0.01, -70.6 - (i / 5) as f64 * 0.01))
            .collect()
    }

    fn sizes(clusters: &[Vec<usize>]) -> Vec<usize> {
        clusters.iter().map(Vec::len).collect()
    }

    #[test]
    fn test_every_point_assigned_once() {
        let points = grid(23);
        let clusters = cluster_indices(&points, 4, 100);
        let mut all: Vec<usize> = clusters.concat();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn test_twenty_one_into_three_is_seven_each() {
        let points = grid(21);
        let clusters = cluster_indices(&points, 3, 100);
        assert_eq!(sizes(&clusters), vec![7, 7, 7]);
    }

    #[test]
    fn test_skewed_input_is_balanced() {
        // Ten stops piled in one spot, two far away
        let mut points = vec![(-33.40, -70.60); 10];
        points.push((-33.90, -70.10));
        points.push((-33.91, -70.11));
        let clusters = cluster_indices(&points, 3, 100);
        let s = sizes(&clusters);
        assert!(s.iter().max().unwrap() - s.iter().min().unwrap() <= 1, "sizes {:?}", s);
    }

    #[test]
    fn test_fewer_points_than_clusters() {
        let points = grid(2);
        let clusters = cluster_indices(&points, 5, 100);
        assert_eq!(clusters.len(), 5);
        assert_eq!(clusters.iter().filter(|c| !c.is_empty()).count(), 2);
    }

    #[test]
    fn test_deterministic() {
        let points = grid(37);
        assert_eq!(cluster_indices(&points, 4, 100), cluster_indices(&points, 4, 100));
    }

    #[test]
    fn test_separated_groups_stay_together() {
        let mut points: Vec<(f64, f64)> = (0..4).map(|i| (-33.40 + i as f64 * 0.001, -70.60)).collect();
        points.extend((0..4).map(|i| (-33.80 + i as f64 * 0.001, -70.90)));
        let clusters = cluster_indices(&points, 2, 100);
        for cluster in clusters {
            let north = cluster.iter().all(|&i| i < 4);
            let south = cluster.iter().all(|&i| i >= 4);
            assert!(north || south, "mixed cluster {:?}", cluster);
        }
    }

    #[test]
    fn test_vehicle_count_policies() {
        let config = FleetConfig::default();
        assert_eq!(vehicle_count(21, &config), 10);

        let exact = FleetConfig {
            fleet_size: FleetSize::Exact(3),
            ..FleetConfig::default()
        };
        assert_eq!(vehicle_count(21, &exact), 3);
        // 45 stops need at least 5 vans of 10
        assert_eq!(vehicle_count(45, &exact), 5);

        let auto = FleetConfig {
            fleet_size: FleetSize::Auto,
            min_vehicles: 2,
            max_vehicles: 4,
            ..FleetConfig::default()
        };
        assert_eq!(vehicle_count(5, &auto), 2);
        assert_eq!(vehicle_count(31, &auto), 4);
    }

    #[test]
    fn test_group_by_terminal_normalizes_names() {
        let stops = vec![
            Stop::new("a", (-33.4, -70.6), "Terminal Maipú", "08:00"),
            Stop::new("b", (-33.4, -70.6), "terminal maipu ", "08:00"),
            Stop::new("c", (-33.4, -70.6), "Terminal Aeropuerto T1", "08:00"),
        ];
        let groups = group_by_terminal(stops);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].terminal, "Terminal Aeropuerto T1");
        assert_eq!(groups[1].terminal, "Terminal Maipú");
        assert_eq!(groups[1].stops.len(), 2);
    }

    #[test]
    fn test_partition_drops_empty_clusters() {
        let stops: Vec<Stop> = grid(3)
            .into_iter()
            .enumerate()
            .map(|(i, p)| Stop::new(format!("s{}", i), p, "T", "08:00"))
            .collect();
        let clusters = partition(stops, 10, 100);
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(|c| c.len() == 1));
    }
}
