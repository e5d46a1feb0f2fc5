//! Place-name geocoding through a Nominatim instance.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::NominatimConfig;
use crate::error::UpstreamError;
use crate::models::GeoPoint;

/// Nominatim returns coordinates as strings
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Clone)]
pub struct NominatimClient {
    client: Client,
    search_url: Url,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut search_url = Url::parse(&config.url)?;
        search_url
            .path_segments_mut()
            .map_err(|_| UpstreamError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("search");

        Ok(Self { client, search_url })
    }

    /// Best match for a free-form query, if any
    pub async fn geocode(&self, query: &str) -> Result<Option<GeoPoint>, UpstreamError> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", "1");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let Some(place) = places.into_iter().next() else {
            debug!("Nominatim found nothing for '{}'", query);
            return Ok(None);
        };

        match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Ok(Some(GeoPoint::new(lat, lon))),
            _ => {
                warn!(
                    "Nominatim returned unusable coordinates for '{}': {}, {}",
                    query, place.lat, place.lon
                );
                Ok(None)
            }
        }
    }
}
