//! Validated nearby search request.

use super::GeoPoint;
use crate::error::NearbyError;

/// Bounds enforced on incoming requests
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    /// Largest radius a caller may ask for, in meters
    pub max_radius_m: u32,
    /// Largest result limit a caller may ask for
    pub max_limit: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_radius_m: 100_000,
            max_limit: 500,
        }
    }
}

/// "Find pages within `radius_m` of `center`, at most `limit` of them"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRequest {
    pub center: GeoPoint,
    pub radius_m: u32,
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(
        center: GeoPoint,
        radius_m: u32,
        limit: usize,
        limits: &SearchLimits,
    ) -> Result<Self, NearbyError> {
        if !center.is_valid() {
            return Err(NearbyError::InvalidRequest(format!(
                "coordinates {} are out of range",
                center
            )));
        }
        if radius_m == 0 || radius_m > limits.max_radius_m {
            return Err(NearbyError::InvalidRequest(format!(
                "radius must be between 1 and {} meters",
                limits.max_radius_m
            )));
        }
        if limit == 0 || limit > limits.max_limit {
            return Err(NearbyError::InvalidRequest(format!(
                "limit must be between 1 and {}",
                limits.max_limit
            )));
        }

        Ok(Self {
            center,
            radius_m,
            limit,
        })
    }
}
