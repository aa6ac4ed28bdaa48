//! Fleet and planner configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::PlannerError;
use crate::timing::TravelModel;

/// Seats per van.
pub const VAN_CAPACITY: usize = 10;
/// Seats on the shared feeder shuttle.
pub const SHUTTLE_CAPACITY: usize = 40;
/// Standard fleet size per terminal.
pub const DEFAULT_NUM_VANS: usize = 10;
/// Default safety margin applied to estimated travel times.
pub const DEFAULT_SAFETY_MARGIN: f64 = 0.20;
/// Manual routes are assumed this much longer than optimized ones.
pub const BASELINE_MULTIPLIER: f64 = 1.12;

/// How many vans serve one terminal group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FleetSize {
    /// `FleetConfig::default_vehicle_count` vans.
    #[default]
    Default,
    /// Exactly this many vans (raised if the group would overflow capacity).
    Exact(usize),
    /// `ceil(stops / capacity)` clamped to `min_vehicles..=max_vehicles`.
    Auto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub vehicle_capacity: usize,
    pub shuttle_capacity: usize,
    pub fleet_size: FleetSize,
    pub default_vehicle_count: usize,
    pub min_vehicles: usize,
    pub max_vehicles: usize,
    /// Fraction added to estimated travel times (0.2 = +20%).
    pub safety_margin: f64,
    /// Route every stop to this terminal instead of its own.
    pub destination_override: Option<String>,
    #[serde(with = "duration_secs")]
    pub solver_time_limit: Duration,
    /// Guided local search rounds for the preferred solver.
    pub solver_max_iterations: usize,
    pub two_opt_max_passes: usize,
    pub kmeans_max_iterations: usize,
    /// Upper bound on terminal groups planned concurrently.
    pub max_workers: usize,
    pub baseline_multiplier: f64,
    pub travel: TravelModel,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            vehicle_capacity: VAN_CAPACITY,
            shuttle_capacity: SHUTTLE_CAPACITY,
            fleet_size: FleetSize::Default,
            default_vehicle_count: DEFAULT_NUM_VANS,
            min_vehicles: 1,
            max_vehicles: DEFAULT_NUM_VANS,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            destination_override: None,
            solver_time_limit: Duration::from_secs(30),
            solver_max_iterations: 100,
            two_opt_max_passes: 50,
            kmeans_max_iterations: 100,
            max_workers: 10,
            baseline_multiplier: BASELINE_MULTIPLIER,
            travel: TravelModel::default(),
        }
    }
}

impl FleetConfig {
    /// Multiplier applied to estimated (not road-sourced) travel times.
    pub fn safety_multiplier(&self) -> f64 {
        1.0 + self.safety_margin
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.vehicle_capacity == 0 {
            return Err(PlannerError::InvalidCapacity);
        }
        if self.shuttle_capacity == 0 {
            return Err(PlannerError::InvalidShuttleCapacity);
        }
        match self.fleet_size {
            FleetSize::Exact(0) => return Err(PlannerError::InvalidVehicleCount),
            FleetSize::Default if self.default_vehicle_count == 0 => {
                return Err(PlannerError::InvalidVehicleCount);
            }
            FleetSize::Auto if self.min_vehicles == 0 || self.min_vehicles > self.max_vehicles => {
                return Err(PlannerError::InvalidFleetBounds {
                    min: self.min_vehicles,
                    max: self.max_vehicles,
                });
            }
            _ => {}
        }
        if !self.safety_margin.is_finite() || self.safety_margin < 0.0 {
            return Err(PlannerError::InvalidSafetyMargin(self.safety_margin));
        }
        self.travel.validate()?;
        if !self.baseline_multiplier.is_finite() || self.baseline_multiplier < 1.0 {
            return Err(PlannerError::InvalidBaselineMultiplier(self.baseline_multiplier));
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
