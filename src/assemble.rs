//! Vehicle routes and the final optimization summary.

use std::collections::HashSet;

use serde::Serialize;

use crate::haversine::{haversine_km, path_km};
use crate::model::Stop;
use crate::sequencer::{Optimizer, Sequenced};
use crate::timing::round_to;
use crate::traits::RoadLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    /// Van straight to the terminal.
    Direct,
    /// Feeder Group 1: van to the shuttle stop.
    ToShuttle,
    /// Feeder Group 2: van to the terminal.
    ToTerminal,
    /// Shared shuttle from the shuttle stop to the terminal.
    Shuttle,
}

/// Identity of a route before its stops are attached.
#[derive(Debug, Clone)]
pub struct RouteHeader {
    pub name: String,
    /// Van number within its terminal; `None` for the shuttle.
    pub van: Option<usize>,
    pub terminal: String,
    pub destination: String,
    pub trip_type: TripType,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleRoute {
    pub name: String,
    pub van: Option<usize>,
    pub terminal: String,
    pub destination: String,
    pub trip_type: TripType,
    /// Stops this vehicle picks up, in visiting order. Empty for the shuttle.
    pub stops: Vec<Stop>,
    /// Shuttle manifest: riders dropped at the shuttle stop by feeder vans.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub passengers: Vec<Stop>,
    /// Waypoints: stop coordinates then the final destination.
    pub path: Vec<(f64, f64)>,
    pub total_distance_km: f64,
    pub capacity: usize,
    pub utilization_percent: f64,
    pub optimizer: Optimizer,
    pub needs_manual_review: bool,
}

fn utilization(stops: usize, capacity: usize) -> f64 {
    stops as f64 / capacity.max(1) as f64 * 100.0
}

/// Road distance when the lookup knows it, great-circle otherwise.
pub fn leg_km<L: RoadLookup>(lookup: &L, from: (f64, f64), to: (f64, f64)) -> f64 {
    lookup
        .leg(from, to)
        .map(|leg| leg.distance_km)
        .filter(|km| km.is_finite() && *km >= 0.0)
        .unwrap_or_else(|| haversine_km(from, to))
}

impl VehicleRoute {
    /// Van route over `stops` (input order) visited as `sequenced` says,
    /// ending at `end`.
    ///
    /// Stop-to-stop legs are great-circle; the final leg prefers the road
    /// figure.
    pub fn sequenced<L: RoadLookup>(
        header: RouteHeader,
        stops: Vec<Stop>,
        sequenced: &Sequenced,
        end: (f64, f64),
        lookup: &L,
    ) -> Self {
        let mut slots: Vec<Option<Stop>> = stops.into_iter().map(Some).collect();
        let ordered: Vec<Stop> = sequenced
            .order()
            .iter()
            .filter_map(|&index| slots.get_mut(index).and_then(Option::take))
            .collect();

        let mut path: Vec<(f64, f64)> = ordered.iter().map(|stop| stop.location).collect();
        let mut distance = path_km(&path);
        if let Some(&last) = path.last() {
            distance += leg_km(lookup, last, end);
        }
        path.push(end);

        Self {
            name: header.name,
            van: header.van,
            terminal: header.terminal,
            destination: header.destination,
            trip_type: header.trip_type,
            utilization_percent: utilization(ordered.len(), header.capacity),
            capacity: header.capacity,
            stops: ordered,
            passengers: Vec::new(),
            path,
            total_distance_km: distance,
            optimizer: sequenced.optimizer(),
            needs_manual_review: sequenced.needs_manual_review(),
        }
    }

    /// Fixed two-point shuttle leg carrying `manifest`.
    pub fn shuttle<L: RoadLookup>(
        header: RouteHeader,
        manifest: Vec<Stop>,
        from: (f64, f64),
        to: (f64, f64),
        lookup: &L,
    ) -> Self {
        Self {
            name: header.name,
            van: header.van,
            terminal: header.terminal,
            destination: header.destination,
            trip_type: header.trip_type,
            utilization_percent: utilization(manifest.len(), header.capacity),
            capacity: header.capacity,
            stops: Vec::new(),
            passengers: manifest,
            path: vec![from, to],
            total_distance_km: leg_km(lookup, from, to),
            optimizer: Optimizer::Fixed,
            needs_manual_review: false,
        }
    }

}

pub const MANUAL_REVIEW_MESSAGE: &str =
    "Some routes require manual review because automatic optimization failed.";

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub routes: Vec<VehicleRoute>,
    /// Stops picked up across all routes.
    pub total_stops: usize,
    pub van_count: usize,
    pub total_distance_km: f64,
    pub baseline_distance_km: f64,
    pub distance_saved_percent: f64,
    pub uses_feeder_mode: bool,
    pub optimization_method: String,
    pub requires_manual_review: bool,
    pub manual_review_message: Option<String>,
}

/// Merge per-terminal routes in order and summarize them.
///
/// Routes are moved through untouched. The baseline assumes manual routing
/// is `baseline_multiplier` times the optimized distance.
pub fn assemble(terminal_routes: Vec<Vec<VehicleRoute>>, baseline_multiplier: f64) -> OptimizationResult {
    let routes: Vec<VehicleRoute> = terminal_routes.into_iter().flatten().collect();

    let total_distance_km: f64 = routes.iter().map(|route| route.total_distance_km).sum();
    let baseline_distance_km = total_distance_km * baseline_multiplier;
    let distance_saved_percent = if baseline_distance_km > 0.0 {
        round_to((baseline_distance_km - total_distance_km) / baseline_distance_km * 100.0, 1)
    } else {
        0.0
    };

    let total_stops = routes.iter().map(|route| route.stops.len()).sum();
    let van_count = routes
        .iter()
        .filter_map(|route| route.van.map(|van| (route.terminal.as_str(), van)))
        .collect::<HashSet<_>>()
        .len();

    let requires_manual_review = routes.iter().any(|route| route.needs_manual_review);
    let optimization_method = if requires_manual_review {
        "Manual review required - automatic optimization failed for some routes"
    } else {
        "Guided local search with nearest-neighbor/2-opt fallback"
    };

    OptimizationResult {
        uses_feeder_mode: routes.iter().any(|route| route.trip_type == TripType::Shuttle),
        total_stops,
        van_count,
        total_distance_km,
        baseline_distance_km,
        distance_saved_percent,
        optimization_method: optimization_method.to_string(),
        requires_manual_review,
        manual_review_message: requires_manual_review.then(|| MANUAL_REVIEW_MESSAGE.to_string()),
        routes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{NoRoadLookup, RoadLeg};

    fn header(name: &str, van: Option<usize>, trip_type: TripType) -> RouteHeader {
        RouteHeader {
            name: name.to_string(),
            van,
            terminal: "T".to_string(),
            destination: "T".to_string(),
            trip_type,
            capacity: 10,
        }
    }

    fn stops(n: usize) -> Vec<Stop> {
        (0..n)
            .map(|i| Stop::new(format!("s{}", i), (-33.40 - i as f64 * 0.01, -70.60), "T", "08:00"))
            .collect()
    }

    #[test]
    fn test_sequenced_route_reorders_and_appends_end() {
        let end = (-33.50, -70.80);
        let route = VehicleRoute::sequenced(
            header("Van 1", Some(1), TripType::Direct),
            stops(3),
            &Sequenced::Fallback(vec![0, 2, 1]),
            end,
            &NoRoadLookup,
        );
        let names: Vec<&str> = route.stops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["s0", "s2", "s1"]);
        assert_eq!(route.path.len(), 4);
        assert_eq!(route.path[3], end);
        assert!((route.utilization_percent - 30.0).abs() < 1e-9);
        assert_eq!(route.optimizer, Optimizer::Fallback);
        assert!(!route.needs_manual_review);
    }

    #[test]
    fn test_final_leg_prefers_road_distance() {
        let road = |_from: (f64, f64), _to: (f64, f64)| {
            Some(RoadLeg {
                distance_km: 42.0,
                duration_minutes: 50.0,
            })
        };
        let route = VehicleRoute::sequenced(
            header("Van 1", Some(1), TripType::Direct),
            stops(1),
            &Sequenced::Solved(vec![0]),
            (-33.50, -70.80),
            &road,
        );
        assert!((route.total_distance_km - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_savings_against_baseline() {
        let a = VehicleRoute::shuttle(
            header("Shuttle", None, TripType::Shuttle),
            stops(2),
            (-33.40, -70.60),
            (-33.50, -70.80),
            &NoRoadLookup,
        );
        let b = VehicleRoute::sequenced(
            header("Van 1", Some(1), TripType::Direct),
            stops(2),
            &Sequenced::Unoptimized(vec![0, 1]),
            (-33.50, -70.80),
            &NoRoadLookup,
        );
        let expected_total = a.total_distance_km + b.total_distance_km;

        let result = assemble(vec![vec![b], vec![a]], 1.12);

        assert!((result.total_distance_km - expected_total).abs() < 1e-9);
        assert!((result.distance_saved_percent - 10.7).abs() < 1e-9);
        assert!(result.requires_manual_review);
        assert!(result.manual_review_message.is_some());
        assert!(result.uses_feeder_mode);
        assert_eq!(result.total_stops, 2);
        assert_eq!(result.van_count, 1);
        assert_eq!(result.routes[0].name, "Van 1");
    }

    #[test]
    fn test_shuttle_manifest_kept_apart_from_stops() {
        let shuttle = VehicleRoute::shuttle(
            header("Shuttle", None, TripType::Shuttle),
            stops(4),
            (-33.40, -70.60),
            (-33.50, -70.80),
            &NoRoadLookup,
        );
        assert!(shuttle.stops.is_empty());
        assert_eq!(shuttle.passengers.len(), 4);
        assert!((shuttle.utilization_percent - 40.0).abs() < 1e-9);

        let json = serde_json::to_value(&shuttle).unwrap();
        assert_eq!(json["passengers"].as_array().unwrap().len(), 4);

        let van = VehicleRoute::sequenced(
            header("Van 1", Some(1), TripType::Direct),
            stops(2),
            &Sequenced::Solved(vec![0, 1]),
            (-33.50, -70.80),
            &NoRoadLookup,
        );
        let json = serde_json::to_value(&van).unwrap();
        assert!(json.get("passengers").is_none());
    }

    #[test]
    fn test_empty_summary_has_no_savings() {
        let result = assemble(vec![], 1.12);
        assert_eq!(result.total_distance_km, 0.0);
        assert_eq!(result.distance_saved_percent, 0.0);
        assert!(!result.requires_manual_review);
        assert!(result.manual_review_message.is_none());
    }
}
