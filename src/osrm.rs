//! OSRM HTTP adapter for road legs.

use serde::Deserialize;
use tracing::debug;

use crate::traits::{RoadLeg, RoadLookup};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Route service URL for a single leg. OSRM takes `lng,lat` pairs.
    pub fn route_url(&self, from: (f64, f64), to: (f64, f64)) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            from.1,
            from.0,
            to.1,
            to.0
        )
    }
}

impl RoadLookup for OsrmClient {
    fn leg(&self, from: (f64, f64), to: (f64, f64)) -> Option<RoadLeg> {
        let response = self
            .client
            .get(self.route_url(from, to))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>());

        match response {
            Ok(body) => body.first_leg(),
            Err(err) => {
                debug!("OSRM route lookup failed: {}", err);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
}

impl OsrmRouteResponse {
    pub(crate) fn first_leg(&self) -> Option<RoadLeg> {
        if self.code != "Ok" {
            return None;
        }
        self.routes.first().map(|route| RoadLeg {
            distance_km: route.distance / 1000.0,
            duration_minutes: route.duration / 60.0,
        })
    }
}
