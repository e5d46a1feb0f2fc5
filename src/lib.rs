//! Geowiki - nearby Wikipedia page search beyond the geosearch radius limit
//!
//! This library provides the tiling, fan-out search and upstream clients used
//! by the HTTP server binary.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod nearby;
pub mod nominatim;
pub mod tiling;
pub mod wikipedia;

pub use error::{NearbyError, UpstreamError};
pub use models::{CandidatePage, GeoPoint, GeoSearchPage, ResultSet, SearchRequest};
pub use nearby::{NearbySearch, SearchSettings};
