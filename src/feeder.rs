//! Bi-modal (feeder) terminals.
//!
//! Each van cluster is split in two trips: Group 1 rides to the shuttle
//! stop, Group 2 goes straight to the terminal. One shared shuttle then
//! carries every Group 1 passenger of the terminal to the terminal.

use tracing::info;

use crate::assemble::{RouteHeader, TripType, VehicleRoute};
use crate::config::FleetConfig;
use crate::haversine::haversine_km;
use crate::model::Stop;
use crate::sequencer::Sequencer;
use crate::terminals::{ShuttleStop, Terminal};
use crate::traits::{RoadLookup, RouteSolver};

/// Split a cluster into `ceil(n/2)` stops for the shuttle and `floor(n/2)`
/// for the direct trip.
///
/// The stops nearest the shuttle stop form Group 1. Both halves keep the
/// cluster's relative order.
pub fn split_cluster(cluster: Vec<Stop>, shuttle_stop: (f64, f64)) -> (Vec<Stop>, Vec<Stop>) {
    let group_1_len = cluster.len().div_ceil(2);

    let mut by_distance: Vec<usize> = (0..cluster.len()).collect();
    by_distance.sort_by(|&a, &b| {
        haversine_km(cluster[a].location, shuttle_stop)
            .total_cmp(&haversine_km(cluster[b].location, shuttle_stop))
    });
    let mut to_shuttle = vec![false; cluster.len()];
    for &index in &by_distance[..group_1_len] {
        to_shuttle[index] = true;
    }

    let mut group_1 = Vec::with_capacity(group_1_len);
    let mut group_2 = Vec::with_capacity(cluster.len() - group_1_len);
    for (stop, shuttle) in cluster.into_iter().zip(to_shuttle) {
        if shuttle {
            group_1.push(stop);
        } else {
            group_2.push(stop);
        }
    }
    (group_1, group_2)
}

fn locations(stops: &[Stop]) -> Vec<(f64, f64)> {
    stops.iter().map(|stop| stop.location).collect()
}

/// Routes for every cluster of a feeder terminal, plus its one shuttle leg.
pub fn plan_feeder_terminal<P, F, L>(
    terminal: &Terminal,
    shuttle_stop: &ShuttleStop,
    clusters: Vec<Vec<Stop>>,
    config: &FleetConfig,
    sequencer: &Sequencer<P, F>,
    lookup: &L,
) -> Vec<VehicleRoute>
where
    P: RouteSolver,
    F: RouteSolver,
    L: RoadLookup,
{
    let header = |van: usize, group: usize, destination: &str, trip_type: TripType| RouteHeader {
        name: format!("Van {} - Group {}", van, group),
        van: Some(van),
        terminal: terminal.name.clone(),
        destination: destination.to_string(),
        trip_type,
        capacity: config.vehicle_capacity,
    };

    let mut routes = Vec::new();
    let mut manifest: Vec<Stop> = Vec::new();

    for (index, cluster) in clusters.into_iter().enumerate() {
        let van = index + 1;
        let (group_1, group_2) = split_cluster(cluster, shuttle_stop.location);

        if !group_1.is_empty() {
            let sequenced = sequencer.sequence(&locations(&group_1));
            manifest.extend(group_1.iter().cloned());
            routes.push(VehicleRoute::sequenced(
                header(van, 1, &shuttle_stop.label, TripType::ToShuttle),
                group_1,
                &sequenced,
                shuttle_stop.location,
                lookup,
            ));
        }

        if !group_2.is_empty() {
            let sequenced = sequencer.sequence(&locations(&group_2));
            routes.push(VehicleRoute::sequenced(
                header(van, 2, &terminal.name, TripType::ToTerminal),
                group_2,
                &sequenced,
                terminal.location,
                lookup,
            ));
        }
    }

    if !manifest.is_empty() {
        info!(
            "Shuttle for {} carries {} passengers from {}",
            terminal.name,
            manifest.len(),
            shuttle_stop.label
        );
        routes.push(VehicleRoute::shuttle(
            RouteHeader {
                name: "Shuttle".to_string(),
                van: None,
                terminal: terminal.name.clone(),
                destination: terminal.name.clone(),
                trip_type: TripType::Shuttle,
                capacity: config.shuttle_capacity,
            },
            manifest,
            shuttle_stop.location,
            terminal.location,
            lookup,
        ));
    }

    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminals::default_shuttle_stop;
    use crate::traits::NoRoadLookup;

    fn stop(name: &str, location: (f64, f64)) -> Stop {
        Stop::new(name, location, "Terminal Maipú", "07:00")
    }

    #[test]
    fn test_split_sizes_favor_first_group() {
        let shuttle = default_shuttle_stop().location;
        for n in 0..8usize {
            let cluster: Vec<Stop> = (0..n)
                .map(|i| stop(&format!("s{}", i), (-33.40 - i as f64 * 0.01, -70.60)))
                .collect();
            let (g1, g2) = split_cluster(cluster, shuttle);
            assert_eq!(g1.len(), n.div_ceil(2));
            assert_eq!(g2.len(), n / 2);
        }
    }

    #[test]
    fn test_nearest_half_rides_shuttle_in_cluster_order() {
        let shuttle = (-33.48, -70.70);
        let cluster = vec![
            stop("near-b", (-33.481, -70.701)),
            stop("far-a", (-33.30, -70.50)),
            stop("near-a", (-33.482, -70.702)),
            stop("far-b", (-33.31, -70.51)),
        ];
        let (g1, g2) = split_cluster(cluster, shuttle);
        let g1: Vec<&str> = g1.iter().map(|s| s.name.as_str()).collect();
        let g2: Vec<&str> = g2.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(g1, vec!["near-b", "near-a"]);
        assert_eq!(g2, vec!["far-a", "far-b"]);
    }

    #[test]
    fn test_one_shuttle_per_terminal() {
        let terminal = Terminal::new("Terminal Maipú", (-33.51505, -70.8044), true);
        let shuttle = default_shuttle_stop();
        let clusters: Vec<Vec<Stop>> = (0..3)
            .map(|c| {
                (0..4)
                    .map(|i| stop(&format!("c{}s{}", c, i), (-33.40 - c as f64 * 0.05, -70.60 - i as f64 * 0.01)))
                    .collect()
            })
            .collect();
        let config = FleetConfig::default();
        let sequencer = Sequencer::standard(10, config.solver_time_limit, 20, 50);

        let routes = plan_feeder_terminal(&terminal, &shuttle, clusters, &config, &sequencer, &NoRoadLookup);

        let shuttles: Vec<&VehicleRoute> = routes.iter().filter(|r| r.trip_type == TripType::Shuttle).collect();
        assert_eq!(shuttles.len(), 1);
        assert!(shuttles[0].stops.is_empty());
        assert_eq!(shuttles[0].passengers.len(), 6);
        assert_eq!(shuttles[0].path, vec![shuttle.location, terminal.location]);
        assert!((shuttles[0].utilization_percent - 15.0).abs() < 1e-9);
        assert_eq!(routes.len(), 7);
    }
}
