//! Great-circle geometry
//!
//! Distances on a spherical Earth using the mean radius. Ellipsoidal
//! precision is not needed at survey-cluster scale.

use std::f64::consts::PI;

/// Mean Earth radius in kilometers (IUGG mean radius R1)
pub const EARTH_RADIUS_KM: f64 = 6371.009;

/// Latitude bound in degrees
pub const MAX_LATITUDE: f64 = 90.0;

/// Largest possible great-circle distance (antipodal points)
pub const MAX_GREAT_CIRCLE_KM: f64 = PI * EARTH_RADIUS_KM;

/// A point on the sphere in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another point in kilometers
    pub fn great_circle_km(&self, other: &GeoPoint) -> f64 {
        great_circle_km(self, other)
    }
}

/// Great-circle distance between two points in kilometers
///
/// Uses the atan2 form of the spherical Vincenty formula, which stays
/// well-conditioned for both nearly coincident and nearly antipodal points.
pub fn great_circle_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_lat2, cos_lat2) = lat2.sin_cos();
    let (sin_delta, cos_delta) = delta_lng.sin_cos();

    let y = ((cos_lat2 * sin_delta).powi(2)
        + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_delta).powi(2))
    .sqrt();
    let x = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_delta;

    EARTH_RADIUS_KM * y.atan2(x)
}
