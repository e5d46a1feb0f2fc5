//! Page records returned by the geosearch upstream and by the nearby search.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::GeoPoint;

/// Page record as returned by the upstream geosearch.
///
/// Only the fields the search needs are typed; everything else the provider
/// sends is preserved untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoSearchPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pageid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Provider-specific metadata (namespace, primary flag, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GeoSearchPage {
    pub fn new(pageid: u64, title: &str, lat: f64, lon: f64) -> Self {
        Self {
            pageid: Some(pageid),
            title: Some(title.to_string()),
            lat: Some(lat),
            lon: Some(lon),
            extra: Map::new(),
        }
    }

    /// Coordinates, if the upstream sent both of them
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

/// Page accepted into a result set, with its distance from the search center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePage {
    #[serde(flatten)]
    pub page: GeoSearchPage,
    /// Great-circle distance from the request center in whole meters
    pub distance: u64,
}

impl CandidatePage {
    /// Attach a computed distance, dropping the upstream's own `dist`
    /// which is relative to whatever center the upstream was queried with.
    pub fn new(mut page: GeoSearchPage, distance: u64) -> Self {
        page.extra.remove("dist");
        Self { page, distance }
    }
}

/// Final answer of a nearby search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub pages: Vec<CandidatePage>,
    pub count: usize,
}

impl ResultSet {
    pub fn new(pages: Vec<CandidatePage>) -> Self {
        let count = pages.len();
        Self { pages, count }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
