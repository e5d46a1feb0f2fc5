//! Candidate filtering and result trimming.

use rand::Rng;

use crate::models::{CandidatePage, GeoPoint, GeoSearchPage};
use crate::tiling::distance_m_f64;

/// Keep pages whose great-circle distance from `center` is within `radius_m`.
///
/// The distance is recomputed from the true search center; upstream
/// distances are relative to whatever point was queried. Pages without
/// usable coordinates, or whose distance is not a positive number, are
/// dropped.
pub fn filter_candidates(
    center: GeoPoint,
    radius_m: u32,
    pages: Vec<GeoSearchPage>,
) -> Vec<CandidatePage> {
    pages
        .into_iter()
        .filter_map(|page| {
            let location = page.location().filter(GeoPoint::is_valid)?;

            let distance = distance_m_f64(center, location);
            if !distance.is_finite() || distance <= 0.0 {
                return None;
            }

            let distance = distance as u64;
            (distance <= u64::from(radius_m)).then(|| CandidatePage::new(page, distance))
        })
        .collect()
}

/// Uniform random subset of `limit` items, drawn without replacement.
///
/// Returns `items` untouched when there are no more than `limit` of them.
pub fn sample_without_replacement<T, R>(items: Vec<T>, limit: usize, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    if items.len() <= limit {
        return items;
    }

    let picked = rand::seq::index::sample(rng, items.len(), limit);
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();

    picked
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}
