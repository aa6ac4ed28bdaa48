//! Planner entry point.
//!
//! Validates the request, annotates every stop with its pickup deadline,
//! partitions stops per terminal, sequences each van (through the feeder
//! splitter for feeder terminals) and assembles the summary. Terminal
//! groups are planned concurrently on a bounded worker pool.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::assemble::{assemble, OptimizationResult, RouteHeader, TripType, VehicleRoute};
use crate::config::FleetConfig;
use crate::error::PlannerError;
use crate::feeder::plan_feeder_terminal;
use crate::haversine::haversine_km;
use crate::model::{Stop, StopTiming, TravelSource};
use crate::partition::{group_by_terminal, partition, vehicle_count, TerminalGroup};
use crate::sequencer::Sequencer;
use crate::terminals::{normalize_name, ShuttleStop, Terminal, TerminalRegistry};
use crate::timing::{pickup_window, round_to};
use crate::traits::{RoadLookup, RouteSolver};

/// Plan `stops` with the standard guided-local-search / 2-opt sequencer.
pub fn solve<L: RoadLookup>(
    stops: Vec<Stop>,
    registry: &TerminalRegistry,
    config: &FleetConfig,
    lookup: &L,
) -> Result<OptimizationResult, PlannerError> {
    let sequencer = Sequencer::standard(
        config.vehicle_capacity,
        config.solver_time_limit,
        config.solver_max_iterations,
        config.two_opt_max_passes,
    );
    solve_with(stops, registry, config, lookup, &sequencer)
}

/// Plan `stops` with a caller-supplied sequencer.
pub fn solve_with<L, P, F>(
    mut stops: Vec<Stop>,
    registry: &TerminalRegistry,
    config: &FleetConfig,
    lookup: &L,
    sequencer: &Sequencer<P, F>,
) -> Result<OptimizationResult, PlannerError>
where
    L: RoadLookup,
    P: RouteSolver,
    F: RouteSolver,
{
    config.validate()?;
    if stops.is_empty() {
        return Err(PlannerError::NoStops);
    }

    if let Some(destination) = &config.destination_override {
        for stop in &mut stops {
            stop.terminal = destination.clone();
        }
    }

    let mut terminals: HashMap<String, Terminal> = HashMap::new();
    for stop in &stops {
        check_location(stop)?;
        let key = normalize_name(&stop.terminal);
        if !terminals.contains_key(&key) {
            let terminal = registry
                .resolve(&stop.terminal)
                .ok_or_else(|| PlannerError::UnknownTerminal(stop.terminal.clone()))?;
            terminals.insert(key, terminal);
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_workers.max(1))
        .build()?;

    info!(
        "Planning {} stops for {} terminal(s) with {} worker(s)",
        stops.len(),
        terminals.len(),
        pool.current_num_threads()
    );

    pool.install(|| {
        stops.par_iter_mut().for_each(|stop| {
            if let Some(terminal) = terminals.get(&normalize_name(&stop.terminal)) {
                annotate_stop(stop, terminal, config, lookup);
            }
        })
    });

    // Earliest deadlines first; stable for equal times.
    stops.sort_by_key(Stop::presentation_key);

    let groups = group_by_terminal(stops);
    let shuttle_stop = registry.shuttle_stop();
    let terminal_routes = pool.install(|| {
        groups
            .into_par_iter()
            .map(|group| -> Result<Vec<VehicleRoute>, PlannerError> {
                let terminal = terminals
                    .get(&normalize_name(&group.terminal))
                    .ok_or_else(|| PlannerError::UnknownTerminal(group.terminal.clone()))?;
                Ok(plan_terminal(group, terminal, shuttle_stop, config, sequencer, lookup))
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let result = assemble(terminal_routes, config.baseline_multiplier);
    if result.requires_manual_review {
        warn!(
            "Planned {} routes, {:.1} km total - REQUIRES MANUAL REVIEW",
            result.routes.len(),
            result.total_distance_km
        );
    } else {
        info!(
            "Planned {} routes, {:.1} km total, {:.1}% saved",
            result.routes.len(),
            result.total_distance_km,
            result.distance_saved_percent
        );
    }
    Ok(result)
}

fn check_location(stop: &Stop) -> Result<(), PlannerError> {
    let (lat, lng) = stop.location;
    let valid = lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0;
    if valid {
        Ok(())
    } else {
        Err(PlannerError::InvalidCoordinate {
            name: stop.name.clone(),
            lat,
            lng,
        })
    }
}

/// Fill in distance, travel time and pickup deadline for one stop.
///
/// Road figures are used as-is; estimates from great-circle distance get
/// the safety multiplier. Non-finite or negative road figures count as
/// unknown.
pub fn annotate_stop<L: RoadLookup>(stop: &mut Stop, terminal: &Terminal, config: &FleetConfig, lookup: &L) {
    let road = lookup.leg(stop.location, terminal.location).filter(|leg| {
        leg.distance_km.is_finite()
            && leg.distance_km >= 0.0
            && leg.duration_minutes.is_finite()
            && leg.duration_minutes >= 0.0
    });
    let (distance_km, travel_minutes, travel_source) = match road {
        Some(leg) => (leg.distance_km, leg.duration_minutes, TravelSource::Road),
        None => {
            let km = haversine_km(stop.location, terminal.location);
            let minutes = config.travel.estimate_minutes(km, config.safety_multiplier());
            (km, minutes, TravelSource::Estimated)
        }
    };

    let window = pickup_window(&stop.presentation_time, travel_minutes);
    stop.timing = Some(StopTiming {
        distance_to_terminal_km: round_to(distance_km, 2),
        travel_time_minutes: round_to(window.travel_minutes, 1),
        travel_source,
        presentation_time: window.presentation_time,
        presentation_time_minutes: window.presentation_minutes,
        pickup_time_latest: window.latest_pickup_time,
        pickup_time_latest_minutes: window.latest_pickup_minutes,
    });
}

fn plan_terminal<P, F, L>(
    group: TerminalGroup,
    terminal: &Terminal,
    shuttle_stop: &ShuttleStop,
    config: &FleetConfig,
    sequencer: &Sequencer<P, F>,
    lookup: &L,
) -> Vec<VehicleRoute>
where
    P: RouteSolver,
    F: RouteSolver,
    L: RoadLookup,
{
    let vehicles = vehicle_count(group.stops.len(), config);
    info!(
        "Terminal {}: {} stops, {} vans, feeder mode {}",
        terminal.name,
        group.stops.len(),
        vehicles,
        terminal.feeder_mode
    );

    let clusters = partition(group.stops, vehicles, config.kmeans_max_iterations);

    if terminal.feeder_mode {
        return plan_feeder_terminal(terminal, shuttle_stop, clusters, config, sequencer, lookup);
    }

    clusters
        .into_iter()
        .enumerate()
        .map(|(index, cluster)| {
            let locations: Vec<(f64, f64)> = cluster.iter().map(|stop| stop.location).collect();
            let sequenced = sequencer.sequence(&locations);
            let header = RouteHeader {
                name: format!("Van {}", index + 1),
                van: Some(index + 1),
                terminal: terminal.name.clone(),
                destination: terminal.name.clone(),
                trip_type: TripType::Direct,
                capacity: config.vehicle_capacity,
            };
            VehicleRoute::sequenced(header, cluster, &sequenced, terminal.location, lookup)
        })
        .collect()
}
