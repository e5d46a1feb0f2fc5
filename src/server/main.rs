//! HTTP server for nearby Wikipedia page search.
//!
//! Exposes nearby search (with tiling for radii beyond the geosearch limit),
//! page lookup with geocoding, and a great-circle distance helper.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use geowiki::cache::{Cache, MemoryCache};
use geowiki::config::Config;
use geowiki::models::{GeoPoint, ResultSet, SearchLimits, SearchRequest};
use geowiki::nearby::NearbySearch;
use geowiki::nominatim::NominatimClient;
use geowiki::tiling::distance_m;
use geowiki::wikipedia::WikipediaClient;
use geowiki::NearbyError;

mod wiki;
use wiki::{lookup_page, WikiPage};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Nearby Wikipedia search server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,
}

/// Application state shared across handlers
struct AppState {
    search: NearbySearch,
    limits: SearchLimits,
    wikipedia: WikipediaClient,
    geocoder: NominatimClient,
    pages: Box<dyn Cache<WikiPage>>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    info!("Geowiki Server");
    info!("Wikipedia API at {}", config.wikipedia.api_url);

    let wikipedia =
        WikipediaClient::new(&config.wikipedia).context("Failed to create Wikipedia client")?;
    let geocoder =
        NominatimClient::new(&config.nominatim).context("Failed to create Nominatim client")?;

    let settings = config.search.settings();
    if settings.max_concurrent_queries.is_none() {
        warn!("No sub-query concurrency cap set; large searches send every sub-query at once");
    }

    let state = Arc::new(AppState {
        search: NearbySearch::new(Arc::new(wikipedia.clone()), settings),
        limits: config.search.limits(),
        wikipedia,
        geocoder,
        pages: Box::new(MemoryCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        )),
    });

    // Build router
    let app = Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/nearby", get(nearby_handler))
        .route("/distance", get(distance_handler))
        .route("/wiki/{page_name}", get(wiki_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Pages near a point, tiling the search when the radius is large
async fn nearby_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<NearbyQueryParams>, QueryRejection>,
) -> Result<Json<ResultSet>, ApiError> {
    let Query(params) = params.map_err(query_error)?;
    let request = SearchRequest::new(
        GeoPoint::new(params.lat, params.lon),
        params.radius.unwrap_or(DEFAULT_RADIUS_M),
        params.limit.unwrap_or(DEFAULT_LIMIT),
        &state.limits,
    )
    .map_err(nearby_error)?;

    let results = state.search.search(&request).await.map_err(|e| {
        tracing::error!("Nearby search failed: {}", e);
        nearby_error(e)
    })?;

    Ok(Json(results))
}

/// Great-circle distance between two points
async fn distance_handler(
    params: Result<Query<DistanceQueryParams>, QueryRejection>,
) -> Result<Json<DistanceResponse>, ApiError> {
    let Query(params) = params.map_err(query_error)?;
    let from = GeoPoint::new(params.lat1, params.lon1);
    let to = GeoPoint::new(params.lat2, params.lon2);

    if !from.is_valid() || !to.is_valid() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "coordinates are out of range".to_string(),
        ));
    }

    Ok(Json(DistanceResponse {
        distance: distance_m(from, to),
    }))
}

/// Page summary with coordinates, cached per page name
async fn wiki_handler(
    State(state): State<Arc<AppState>>,
    Path(page_name): Path<String>,
) -> Result<Json<WikiPage>, ApiError> {
    if let Some(page) = state.pages.get(&page_name) {
        return Ok(Json(page));
    }

    let page = lookup_page(&state.wikipedia, &state.geocoder, &page_name)
        .await
        .map_err(|e| {
            tracing::error!("Page lookup for '{}' failed: {}", page_name, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Page not found".to_string()))?;

    state.pages.put(page_name, page.clone());
    Ok(Json(page))
}

const DEFAULT_RADIUS_M: u32 = 10_000;
const DEFAULT_LIMIT: usize = 10;

#[derive(Deserialize)]
struct NearbyQueryParams {
    lat: f64,
    lon: f64,
    /// Search radius in meters
    radius: Option<u32>,
    /// Maximum number of pages
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct DistanceQueryParams {
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
}

#[derive(Serialize)]
struct DistanceResponse {
    /// Meters
    distance: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorResponse { error: message }))
}

/// Malformed or missing query parameters
fn query_error(rejection: QueryRejection) -> ApiError {
    error_response(rejection.status(), rejection.body_text())
}

fn nearby_error(err: NearbyError) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, err.to_string())
}
