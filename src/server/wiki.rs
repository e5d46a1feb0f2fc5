//! Page lookup: summary extract plus coordinates.

use serde::{Deserialize, Serialize};
use tracing::warn;

use geowiki::models::GeoPoint;
use geowiki::nominatim::NominatimClient;
use geowiki::wikipedia::{PageSummary, WikipediaClient};
use geowiki::UpstreamError;

const NO_CONTENT: &str = "No content available";

/// Page returned by the wiki endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl WikiPage {
    fn from_summary(page_name: &str, summary: PageSummary, location: Option<GeoPoint>) -> Self {
        Self {
            title: page_name.to_string(),
            content: summary
                .extract
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| NO_CONTENT.to_string()),
            description: summary.description,
            latitude: location.map(|p| p.lat),
            longitude: location.map(|p| p.lon),
        }
    }
}

/// Fetch a page summary and locate the page.
///
/// The geocoder is asked first; the summary's own coordinates are the
/// fallback when it finds nothing or fails. `Ok(None)` means Wikipedia has
/// no such page.
pub async fn lookup_page(
    wikipedia: &WikipediaClient,
    geocoder: &NominatimClient,
    page_name: &str,
) -> Result<Option<WikiPage>, UpstreamError> {
    let Some(summary) = wikipedia.page_summary(page_name).await? else {
        return Ok(None);
    };

    let location = match geocoder.geocode(page_name).await {
        Ok(Some(point)) => Some(point),
        Ok(None) => summary.location(),
        Err(e) => {
            warn!("Geocoding '{}' failed: {}", page_name, e);
            summary.location()
        }
    };

    Ok(Some(WikiPage::from_summary(page_name, summary, location)))
}
