//! shuttle-planner core
//!
//! Assigns geocoded pickup stops to a bounded van fleet, sequences each van,
//! routes feeder terminals through a shared shuttle, and derives per-stop
//! pickup deadlines.

pub mod assemble;
pub mod config;
pub mod error;
pub mod feeder;
pub mod haversine;
pub mod model;
pub mod osrm;
pub mod partition;
pub mod sequencer;
pub mod solver;
pub mod terminals;
pub mod timing;
pub mod traits;
