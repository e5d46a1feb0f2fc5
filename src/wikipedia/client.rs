//! Wikipedia geosearch client using the MediaWiki action API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{GeoSearch, GeoSearchQuery};
use crate::config::WikipediaConfig;
use crate::error::UpstreamError;
use crate::models::GeoSearchPage;

/// HTTP client for the Wikipedia action and REST APIs
#[derive(Clone)]
pub struct WikipediaClient {
    pub(super) client: Client,
    api_url: Url,
    pub(super) rest_url: Url,
}

impl WikipediaClient {
    pub fn new(config: &WikipediaConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: Url::parse(&config.api_url)?,
            rest_url: Url::parse(&config.rest_url)?,
        })
    }

    fn geosearch_url(&self, query: &GeoSearchQuery) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "geosearch")
            .append_pair(
                "gscoord",
                &format!("{}|{}", query.center.lat, query.center.lon),
            )
            .append_pair("gsradius", &query.radius_m.to_string())
            .append_pair("gslimit", &query.limit.to_string())
            .append_pair("format", "json");
        url
    }
}

#[async_trait]
impl GeoSearch for WikipediaClient {
    async fn geosearch(&self, query: &GeoSearchQuery) -> Result<Vec<GeoSearchPage>, UpstreamError> {
        let url = self.geosearch_url(query);
        debug!("Geosearch request: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = response.text().await?;
        Ok(parse_geosearch(&body))
    }
}

/// Extract `query.geosearch` from a geosearch response body.
///
/// Anything that does not have that shape yields no pages. Entries that do
/// not decode as a page record are skipped individually.
pub fn parse_geosearch(body: &str) -> Vec<GeoSearchPage> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Geosearch response is not valid JSON: {}", e);
            return Vec::new();
        }
    };

    if let Some(error) = value.get("error") {
        warn!("Geosearch returned an API error: {}", error);
    }

    let Some(entries) = value.pointer("/query/geosearch").and_then(Value::as_array) else {
        debug!("Geosearch response has no query.geosearch list");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(page) => Some(page),
            Err(e) => {
                debug!("Skipping undecodable geosearch entry: {}", e);
                None
            }
        })
        .collect()
}
