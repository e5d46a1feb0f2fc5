//! Wikipedia API access.
//!
//! The nearby search only talks to the upstream through the [`GeoSearch`]
//! trait so that the fan-out can be exercised against in-process fakes.

mod client;
mod summary;

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::models::{GeoPoint, GeoSearchPage};

pub use client::{parse_geosearch, WikipediaClient};
pub use summary::{PageSummary, SummaryCoordinates};

/// One radius-limited geosearch call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoSearchQuery {
    pub center: GeoPoint,
    pub radius_m: u32,
    pub limit: u32,
}

/// Upstream able to list pages around a point
#[async_trait]
pub trait GeoSearch: Send + Sync {
    /// Pages within `query.radius_m` of `query.center`.
    ///
    /// A payload without a result list is an empty answer, not an error.
    async fn geosearch(&self, query: &GeoSearchQuery) -> Result<Vec<GeoSearchPage>, UpstreamError>;
}
