//! Large-radius nearby page search.

mod engine;
mod filter;

pub use engine::{NearbySearch, SearchSettings};
pub use filter::{filter_candidates, sample_without_replacement};
