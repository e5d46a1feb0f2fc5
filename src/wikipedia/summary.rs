//! Page summaries from the Wikipedia REST API.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::WikipediaClient;
use crate::error::UpstreamError;
use crate::models::GeoPoint;

/// Subset of `page/summary/{title}` the service exposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub title: String,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub coordinates: Option<SummaryCoordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryCoordinates {
    pub lat: f64,
    pub lon: f64,
}

impl PageSummary {
    pub fn location(&self) -> Option<GeoPoint> {
        self.coordinates.map(|c| GeoPoint::new(c.lat, c.lon))
    }
}

impl WikipediaClient {
    /// Fetch the summary of a page by title.
    ///
    /// Returns `Ok(None)` when Wikipedia answers with any non-success status.
    pub async fn page_summary(&self, title: &str) -> Result<Option<PageSummary>, UpstreamError> {
        let mut url = self.rest_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["page", "summary", title]);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            debug!("No summary for '{}': status {}", title, response.status());
            return Ok(None);
        }

        let body = response.text().await?;
        let summary = serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(Some(summary))
    }
}
