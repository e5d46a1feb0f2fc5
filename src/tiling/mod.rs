//! Disk tiling and distance helpers.
//!
//! Splits a search disk of arbitrary radius into fixed-size sub-disks that
//! the radius-limited upstream geosearch can answer one at a time.

mod distance;
mod hex;

pub use distance::{distance_m, distance_m_f64};
pub use hex::{planar_offsets, tile, DEFAULT_SUB_DISK_RADIUS_KM};

/// Mean Earth radius used by the planar offset conversion
pub const EARTH_RADIUS_KM: f64 = 6371.0;
