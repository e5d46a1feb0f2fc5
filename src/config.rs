//! Service configuration loaded from a TOML file.
//!
//! Every section has defaults, so an empty file (or no file) gives a working
//! configuration pointed at English Wikipedia and the public Nominatim.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::SearchLimits;
use crate::nearby::SearchSettings;

const USER_AGENT: &str = concat!("geowiki/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub wikipedia: WikipediaConfig,
    pub nominatim: NominatimConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WikipediaConfig {
    /// MediaWiki action API endpoint
    pub api_url: String,
    /// REST API base, used for page summaries
    pub rest_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            rest_url: "https://en.wikipedia.org/api/rest_v1/".to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NominatimConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            url: "https://nominatim.openstreetmap.org/".to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub max_radius_m: u32,
    pub max_limit: usize,
    /// Per-call radius ceiling of the upstream geosearch
    pub sub_disk_radius_m: u32,
    /// Page limit for each fan-out sub-query
    pub sub_query_limit: u32,
    pub sub_query_timeout_secs: u64,
    /// Cap on in-flight sub-queries; unset means all at once
    pub max_concurrent_queries: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let limits = SearchLimits::default();
        let settings = SearchSettings::default();
        Self {
            max_radius_m: limits.max_radius_m,
            max_limit: limits.max_limit,
            sub_disk_radius_m: settings.sub_disk_radius_m,
            sub_query_limit: settings.sub_query_limit,
            sub_query_timeout_secs: settings.sub_query_timeout.as_secs(),
            max_concurrent_queries: settings.max_concurrent_queries,
        }
    }
}

impl SearchConfig {
    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            max_radius_m: self.max_radius_m,
            max_limit: self.max_limit,
        }
    }

    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            sub_disk_radius_m: self.sub_disk_radius_m,
            sub_query_limit: self.sub_query_limit,
            sub_query_timeout: Duration::from_secs(self.sub_query_timeout_secs),
            max_concurrent_queries: self.max_concurrent_queries,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_entries: 1024,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let search = &self.search;
        if search.sub_disk_radius_m == 0 {
            anyhow::bail!("search.sub_disk_radius_m must be positive");
        }
        if search.sub_query_limit == 0 {
            anyhow::bail!("search.sub_query_limit must be positive");
        }
        if search.max_concurrent_queries == Some(0) {
            anyhow::bail!("search.max_concurrent_queries must be positive when set");
        }
        Ok(())
    }
}
