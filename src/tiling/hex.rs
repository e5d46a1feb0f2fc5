//! Hexagonal lattice tiling of a large search disk into small sub-disks.

use super::EARTH_RADIUS_KM;
use crate::models::GeoPoint;

/// Radius of one sub-disk; the largest the Wikipedia geosearch accepts
pub const DEFAULT_SUB_DISK_RADIUS_KM: f64 = 10.0;

/// Keeps the longitude scale finite for a center sitting on a pole
const MIN_COS_LAT: f64 = 1e-9;

/// Planar (x, y) offsets in kilometers of every sub-disk center needed to
/// cover a disk of `radius_km` with disks of `small_radius_km`.
///
/// Centers sit on a hexagonal covering lattice: columns `sqrt(3) * r` apart,
/// rows `1.5 * r` apart, odd rows shifted by half a column. Every point of
/// the plane is then within `r` of a lattice point. A lattice point is kept
/// when it lies within `radius_km + small_radius_km` of the origin, which is
/// enough to keep every center whose disk reaches into the requested one.
///
/// A sub-disk radius that is not a positive finite number (or an infinite
/// search radius) cannot be tiled and yields no offsets.
pub fn planar_offsets(radius_km: f64, small_radius_km: f64) -> Vec<(f64, f64)> {
    if !(small_radius_km > 0.0 && small_radius_km.is_finite()) || radius_km.is_infinite() {
        return Vec::new();
    }

    let dx = 3f64.sqrt() * small_radius_km;
    let dy = 1.5 * small_radius_km;
    let max_dist = radius_km.max(0.0) + small_radius_km;

    // Loop bounds only trim the search; the distance test decides membership
    let n_y = ((max_dist / dy).ceil() as i64).saturating_add(1);
    let n_x = (((max_dist + dx / 2.0) / dx).ceil() as i64).saturating_add(1);

    let mut offsets = Vec::new();
    for row in -n_y..=n_y {
        let y = row as f64 * dy;
        let shift = if row.rem_euclid(2) == 0 { 0.0 } else { dx / 2.0 };

        for col in -n_x..=n_x {
            let x = col as f64 * dx + shift;
            if x.hypot(y) <= max_dist {
                offsets.push((x, y));
            }
        }
    }

    offsets
}

/// Sub-disk centers covering the disk of `radius_km` around `center`.
///
/// Offsets are mapped to degrees on the local tangent plane at `center`.
/// That is only accurate for radii far below the Earth's radius and the
/// longitude spacing stretches towards the poles.
pub fn tile(center: GeoPoint, radius_km: f64, small_radius_km: f64) -> Vec<GeoPoint> {
    let lat_rad = center.lat.to_radians();
    let cos_lat = lat_rad.cos().abs().max(MIN_COS_LAT);

    planar_offsets(radius_km, small_radius_km)
        .into_iter()
        .map(|(x, y)| {
            let delta_lat = (y / EARTH_RADIUS_KM).to_degrees();
            let delta_lon = (x / (EARTH_RADIUS_KM * cos_lat)).to_degrees();

            GeoPoint::new(
                (center.lat + delta_lat).clamp(-90.0, 90.0),
                wrap_longitude(center.lon + delta_lon),
            )
        })
        .collect()
}

/// Fold a longitude into [-180, 180]
fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}
