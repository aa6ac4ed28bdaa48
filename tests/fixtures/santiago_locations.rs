//! Santiago de Chile locations for realistic fixtures.
//!
//! Approximate neighbourhood centres; good enough for great-circle routing.

#![allow(dead_code)]

use shuttle_planner::model::Stop;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

// ============================================================================
// Terminals
// ============================================================================

pub const TERMINAL_CONQUISTADOR: Location = Location::new("Terminal Conquistador", -33.51505, -70.8044);
pub const TERMINAL_AEROPUERTO_T1: Location = Location::new("Terminal Aeropuerto T1", -33.3928, -70.7856);
pub const SHUTTLE_STOP: Location = Location::new("Metro Cerrillos", -33.48343, -70.69556);

// ============================================================================
// Pickup neighbourhoods
// ============================================================================

pub const NEIGHBOURHOODS: &[Location] = &[
    Location::new("Maipú Centro", -33.5106, -70.7572),
    Location::new("Pudahuel", -33.4430, -70.7500),
    Location::new("Estación Central", -33.4531, -70.6830),
    Location::new("Quinta Normal", -33.4263, -70.6976),
    Location::new("Cerrillos", -33.4925, -70.7136),
    Location::new("Lo Prado", -33.4447, -70.7246),
    Location::new("Santiago Centro", -33.4489, -70.6693),
    Location::new("Ñuñoa", -33.4569, -70.5975),
    Location::new("La Florida", -33.5227, -70.5983),
    Location::new("Puente Alto", -33.6117, -70.5758),
    Location::new("San Bernardo", -33.5927, -70.6996),
    Location::new("Renca", -33.4036, -70.7280),
];

/// `count` stops cycling through the neighbourhoods, each nudged so no two
/// share a coordinate.
pub fn stops_around(count: usize, terminal: &str, presentation: &str) -> Vec<Stop> {
    (0..count)
        .map(|i| {
            let base = &NEIGHBOURHOODS[i % NEIGHBOURHOODS.len()];
            let nudge = (i / NEIGHBOURHOODS.len()) as f64 * 0.004;
            Stop::new(
                format!("driver-{:02}", i + 1),
                (base.lat + nudge, base.lng - nudge),
                terminal,
                presentation,
            )
            .with_code(format!("D{:03}", i + 1))
            .with_address(base.name)
        })
        .collect()
}
