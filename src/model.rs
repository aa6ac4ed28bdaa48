//! Pickup stops and their derived timing.

use serde::{Deserialize, Serialize};

/// Where a stop's travel time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelSource {
    /// Real road figure from the caller's lookup.
    Road,
    /// Great-circle distance and the speed model.
    Estimated,
}

/// Derived fields filled in by the planner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTiming {
    pub distance_to_terminal_km: f64,
    pub travel_time_minutes: f64,
    pub travel_source: TravelSource,
    pub presentation_time: String,
    pub presentation_time_minutes: u32,
    pub pickup_time_latest: String,
    pub pickup_time_latest_minutes: u32,
}

/// A single geocoded pickup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub address: String,
    /// `(lat, lng)`.
    pub location: (f64, f64),
    pub terminal: String,
    /// `HH:MM` presentation time at the terminal.
    pub presentation_time: String,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub timing: Option<StopTiming>,
}

impl Stop {
    pub fn new(
        name: impl Into<String>,
        location: (f64, f64),
        terminal: impl Into<String>,
        presentation_time: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            code: None,
            address: String::new(),
            location,
            terminal: terminal.into(),
            presentation_time: presentation_time.into(),
            timing: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Minutes used to order stops by deadline; untimed stops sort last.
    pub fn presentation_key(&self) -> u32 {
        self.timing
            .as_ref()
            .map(|timing| timing.presentation_time_minutes)
            .unwrap_or(u32::MAX)
    }
}
