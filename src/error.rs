//! Error types.

use thiserror::Error;

/// Configuration or input errors surfaced to the caller before any
/// partitioning begins.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("no stops provided")]
    NoStops,

    #[error("vehicle capacity must be positive")]
    InvalidCapacity,

    #[error("shuttle capacity must be positive")]
    InvalidShuttleCapacity,

    #[error("vehicle count must be positive")]
    InvalidVehicleCount,

    #[error("invalid fleet bounds: min {min}, max {max}")]
    InvalidFleetBounds { min: usize, max: usize },

    #[error("safety margin must be a finite, non-negative fraction (got {0})")]
    InvalidSafetyMargin(f64),

    #[error("invalid travel model: {0}")]
    InvalidTravelModel(String),

    #[error("baseline multiplier must be finite and at least 1.0 (got {0})")]
    InvalidBaselineMultiplier(f64),

    #[error("stop {name:?} has an invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { name: String, lat: f64, lng: f64 },

    #[error("unknown terminal {0:?}")]
    UnknownTerminal(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single route solver attempt. Never leaves the sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("solver exceeded its time budget")]
    Timeout,

    #[error("{stops} stops exceed vehicle capacity {capacity}")]
    CapacityExceeded { stops: usize, capacity: usize },

    #[error("solver returned an invalid visiting order")]
    InvalidPermutation,

    #[error("solver unavailable: {0}")]
    Unavailable(String),

    #[error("solver panicked")]
    Panicked,
}
