//! Pickup deadline calculation.
//!
//! Times are minutes since midnight. The latest safe pickup is the
//! presentation time minus the travel time, floored at midnight.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PlannerError;

/// Presentation time used when the input cannot be parsed (08:00).
pub const DEFAULT_PRESENTATION_MINUTES: u32 = 8 * 60;

/// Speed model for travel time estimates when no road duration is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelModel {
    pub city_speed_kmh: f64,
    pub highway_speed_kmh: f64,
    /// Legs shorter than this are driven at city speed.
    pub city_threshold_km: f64,
    /// Share of highway speed in the blended speed for longer legs.
    pub highway_weight: f64,
}

impl Default for TravelModel {
    fn default() -> Self {
        Self {
            city_speed_kmh: 60.0,
            highway_speed_kmh: 105.0,
            city_threshold_km: 15.0,
            highway_weight: 0.7,
        }
    }
}

impl TravelModel {
    /// Speeds must be finite and positive, the threshold non-negative and
    /// the highway weight within `0..=1`.
    pub fn validate(&self) -> Result<(), PlannerError> {
        let speeds = [("city_speed_kmh", self.city_speed_kmh), ("highway_speed_kmh", self.highway_speed_kmh)];
        for (field, speed) in speeds {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(PlannerError::InvalidTravelModel(format!("{} must be positive (got {})", field, speed)));
            }
        }
        if !self.city_threshold_km.is_finite() || self.city_threshold_km < 0.0 {
            return Err(PlannerError::InvalidTravelModel(format!(
                "city_threshold_km must be non-negative (got {})",
                self.city_threshold_km
            )));
        }
        if !(0.0..=1.0).contains(&self.highway_weight) {
            return Err(PlannerError::InvalidTravelModel(format!(
                "highway_weight must be within 0..=1 (got {})",
                self.highway_weight
            )));
        }
        Ok(())
    }

    /// Average speed assumed for a leg of this length.
    pub fn speed_kmh(&self, distance_km: f64) -> f64 {
        if distance_km < self.city_threshold_km {
            self.city_speed_kmh
        } else {
            self.highway_speed_kmh * self.highway_weight
                + self.city_speed_kmh * (1.0 - self.highway_weight)
        }
    }

    /// Estimated minutes for a leg, scaled by `safety_multiplier` and
    /// rounded to one decimal.
    pub fn estimate_minutes(&self, distance_km: f64, safety_multiplier: f64) -> f64 {
        let raw = distance_km / self.speed_kmh(distance_km) * 60.0;
        round_to(raw * safety_multiplier, 1)
    }
}

/// Presentation and latest-pickup times for one stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickupWindow {
    pub presentation_minutes: u32,
    pub latest_pickup_minutes: u32,
    pub travel_minutes: f64,
    pub presentation_time: String,
    pub latest_pickup_time: String,
}

/// Parse `HH:MM` or `H:MM` into minutes since midnight.
pub fn parse_clock(text: &str) -> Option<u32> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Like [`parse_clock`] but substitutes 08:00 for malformed input.
pub fn presentation_minutes(text: &str) -> u32 {
    parse_clock(text).unwrap_or_else(|| {
        warn!("Could not parse presentation time {:?}, using 08:00", text);
        DEFAULT_PRESENTATION_MINUTES
    })
}

/// Format minutes since midnight as zero-padded `HH:MM`.
pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn pickup_window(presentation: &str, travel_minutes: f64) -> PickupWindow {
    let presentation_minutes = presentation_minutes(presentation);
    let travel = if travel_minutes.is_finite() {
        travel_minutes.max(0.0)
    } else {
        0.0
    };

    let latest = (f64::from(presentation_minutes) - travel).floor().max(0.0) as u32;
    let latest_pickup_minutes = latest.min(presentation_minutes);

    PickupWindow {
        presentation_minutes,
        latest_pickup_minutes,
        travel_minutes: travel,
        presentation_time: format_clock(presentation_minutes),
        latest_pickup_time: format_clock(latest_pickup_minutes),
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
