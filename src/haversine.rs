//! Great-circle distance oracle.
//!
//! Used for sequencing between stops and as the fallback for any leg
//! without a road figure.

use crate::traits::DistanceMatrixProvider;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two `(lat, lng)` points in kilometers.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Sum of consecutive great-circle legs along `points`, in kilometers.
pub fn path_km(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Haversine-based distance matrix in integer meters.
///
/// Symmetric with a zero diagonal; kilometers are scaled by 1000 and
/// truncated.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineMatrix;

impl HaversineMatrix {
    fn km_to_meters(km: f64) -> i32 {
        (km * 1000.0) as i32
    }
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<i32>> {
        let n = locations.len();
        let mut matrix = vec![vec![0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let meters = Self::km_to_meters(haversine_km(locations[i], locations[j]));
                matrix[i][j] = meters;
                matrix[j][i] = meters;
            }
        }

        matrix
    }
}
