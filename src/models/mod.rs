//! Core data models for the nearby search.

pub mod page;
pub mod point;
pub mod request;

pub use page::{CandidatePage, GeoSearchPage, ResultSet};
pub use point::GeoPoint;
pub use request::{SearchLimits, SearchRequest};
