//! Error types shared by the upstream clients and the nearby search engine.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single call to an upstream HTTP service
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, DNS, TLS or body transfer failure
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success HTTP status
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),

    /// Call did not complete within its deadline
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// Response body could not be decoded
    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    /// Endpoint URL could not be built
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
}

/// Error returned by a nearby search to the HTTP layer
#[derive(Debug, Error)]
pub enum NearbyError {
    /// Caller supplied parameters outside the accepted ranges
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The single-disk upstream query failed
    #[error("geosearch failed: {0}")]
    Upstream(#[from] UpstreamError),

    /// The fan-out could not be set up at all
    #[error("nearby search failed: {0}")]
    Orchestration(String),
}

impl NearbyError {
    /// Whether the error was caused by the caller rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, NearbyError::InvalidRequest(_))
    }
}
