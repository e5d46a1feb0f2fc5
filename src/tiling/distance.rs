//! Great-circle distance between two points.

use geo::{Distance, Haversine};

use crate::models::GeoPoint;

/// Haversine distance in meters
pub fn distance_m_f64(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine.distance(a.to_point(), b.to_point())
}

/// Haversine distance truncated to whole meters
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> u64 {
    distance_m_f64(a, b) as u64
}
