//! Test fixtures for shuttle-planner.
//!
//! Provides realistic test data:
//! - Santiago de Chile pickup neighbourhoods and terminals
//! - Stop builders spread around those neighbourhoods

pub mod santiago_locations;

pub use santiago_locations::*;
