//! Nearby search over a radius-limited upstream.
//!
//! Requests within the upstream's per-call radius go out as one geosearch
//! call. Larger requests are tiled into sub-disks, every sub-disk is queried
//! concurrently, and the merged candidates are re-filtered against the real
//! center and radius before being trimmed to the requested limit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::filter::{filter_candidates, sample_without_replacement};
use crate::error::{NearbyError, UpstreamError};
use crate::models::{GeoPoint, GeoSearchPage, ResultSet, SearchRequest};
use crate::tiling::tile;
use crate::wikipedia::{GeoSearch, GeoSearchQuery};

/// Tunables for talking to the upstream geosearch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    /// Largest radius a single upstream call accepts, in meters
    pub sub_disk_radius_m: u32,
    /// Page limit sent with every fan-out sub-query
    pub sub_query_limit: u32,
    /// Deadline for each individual upstream call
    pub sub_query_timeout: Duration,
    /// Upper bound on in-flight sub-queries; `None` sends them all at once
    pub max_concurrent_queries: Option<usize>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            sub_disk_radius_m: 10_000,
            sub_query_limit: 500,
            sub_query_timeout: Duration::from_secs(10),
            max_concurrent_queries: None,
        }
    }
}

/// Nearby page search service
#[derive(Clone)]
pub struct NearbySearch {
    upstream: Arc<dyn GeoSearch>,
    settings: SearchSettings,
}

impl NearbySearch {
    pub fn new(upstream: Arc<dyn GeoSearch>, settings: SearchSettings) -> Self {
        Self { upstream, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Pages within the request radius, at most `request.limit` of them
    pub async fn search(&self, request: &SearchRequest) -> Result<ResultSet, NearbyError> {
        if request.radius_m > self.settings.sub_disk_radius_m {
            self.search_large(request).await
        } else {
            self.search_single(request).await
        }
    }

    /// One upstream call covering the whole request.
    ///
    /// There is nothing to fall back on here, so an upstream failure is
    /// returned to the caller.
    pub async fn search_single(&self, request: &SearchRequest) -> Result<ResultSet, NearbyError> {
        let query = GeoSearchQuery {
            center: request.center,
            radius_m: request.radius_m,
            limit: u32::try_from(request.limit).unwrap_or(u32::MAX),
        };

        let pages = self.query_upstream(query).await?;
        let returned = pages.len();

        let candidates = filter_candidates(request.center, request.radius_m, pages);
        if candidates.len() < returned {
            debug!(
                "Dropped {} of {} upstream pages outside {} m of {}",
                returned - candidates.len(),
                returned,
                request.radius_m,
                request.center
            );
        }

        let pages = sample_without_replacement(candidates, request.limit, &mut rand::thread_rng());
        Ok(ResultSet::new(pages))
    }

    /// Fan out one upstream call per sub-disk and merge the answers.
    ///
    /// Failed or timed-out sub-queries contribute nothing; the search still
    /// succeeds with whatever the others returned.
    pub async fn search_large(&self, request: &SearchRequest) -> Result<ResultSet, NearbyError> {
        let started = Instant::now();
        let centers = tile(
            request.center,
            f64::from(request.radius_m) / 1000.0,
            f64::from(self.settings.sub_disk_radius_m) / 1000.0,
        );

        if centers.is_empty() {
            return Err(NearbyError::Orchestration(format!(
                "no sub-disks generated for {} m around {}",
                request.radius_m, request.center
            )));
        }

        let total = centers.len();
        let concurrency = self.settings.max_concurrent_queries.unwrap_or(total).max(1);
        info!(
            "Searching {} m around {} with {} sub-queries (concurrency {})",
            request.radius_m, request.center, total, concurrency
        );

        let outcomes: Vec<Option<Vec<GeoSearchPage>>> = stream::iter(centers)
            .map(|center| self.sub_query(center))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut failed = 0;
        let mut merged = Vec::new();
        for outcome in outcomes {
            match outcome {
                Some(pages) => merged.extend(pages),
                None => failed += 1,
            }
        }

        let scanned = merged.len();
        let candidates = filter_candidates(request.center, request.radius_m, merged);
        let kept = candidates.len();
        let pages = sample_without_replacement(candidates, request.limit, &mut rand::thread_rng());

        info!(
            "Sub-queries: {} ok, {} failed; {} pages scanned, {} within radius, {} returned in {:?}",
            total - failed,
            failed,
            scanned,
            kept,
            pages.len(),
            started.elapsed()
        );

        Ok(ResultSet::new(pages))
    }

    /// Query one sub-disk at the full upstream radius. `None` on failure.
    async fn sub_query(&self, center: GeoPoint) -> Option<Vec<GeoSearchPage>> {
        let query = GeoSearchQuery {
            center,
            radius_m: self.settings.sub_disk_radius_m,
            limit: self.settings.sub_query_limit,
        };

        match self.query_upstream(query).await {
            Ok(pages) => {
                debug!("Sub-disk {} returned {} pages", center, pages.len());
                Some(pages)
            }
            Err(e) => {
                warn!("Sub-query at {} failed: {}", center, e);
                None
            }
        }
    }

    async fn query_upstream(&self, query: GeoSearchQuery) -> Result<Vec<GeoSearchPage>, UpstreamError> {
        let timeout = self.settings.sub_query_timeout;
        tokio::time::timeout(timeout, self.upstream.geosearch(&query))
            .await
            .map_err(|_| UpstreamError::Timeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchLimits;
    use async_trait::async_trait;
    use geo::{Destination, Haversine};
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Responder =
        dyn Fn(&GeoSearchQuery) -> Result<Vec<GeoSearchPage>, UpstreamError> + Send + Sync;

    struct FakeUpstream {
        respond: Box<Responder>,
        calls: Mutex<Vec<GeoSearchQuery>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Option<Duration>,
        hang_at: Option<GeoPoint>,
        hang_all: bool,
    }

    /// Counts a call as in flight until its future finishes or is dropped
    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl FakeUpstream {
        fn new<F>(respond: F) -> Self
        where
            F: Fn(&GeoSearchQuery) -> Result<Vec<GeoSearchPage>, UpstreamError> + Send + Sync + 'static,
        {
            Self {
                respond: Box::new(respond),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: None,
                hang_at: None,
                hang_all: false,
            }
        }

        fn calls(&self) -> Vec<GeoSearchQuery> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GeoSearch for FakeUpstream {
        async fn geosearch(&self, query: &GeoSearchQuery) -> Result<Vec<GeoSearchPage>, UpstreamError> {
            self.calls.lock().unwrap().push(*query);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(&self.in_flight);
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if self.hang_all || self.hang_at == Some(query.center) {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            (self.respond)(query)
        }
    }

    const TULA: GeoPoint = GeoPoint {
        lat: 54.163337,
        lon: 37.561109,
    };

    fn page_at(from: GeoPoint, bearing: f64, distance_m: f64, title: &str) -> GeoSearchPage {
        let p: GeoPoint = Haversine.destination(from.to_point(), bearing, distance_m).into();
        GeoSearchPage::new(1, title, p.lat, p.lon)
    }

    fn request(radius_m: u32, limit: usize) -> SearchRequest {
        SearchRequest::new(TULA, radius_m, limit, &SearchLimits::default()).unwrap()
    }

    fn engine(upstream: &Arc<FakeUpstream>) -> NearbySearch {
        NearbySearch::new(upstream.clone(), SearchSettings::default())
    }

    fn unavailable() -> UpstreamError {
        UpstreamError::Status(StatusCode::SERVICE_UNAVAILABLE)
    }

    #[tokio::test]
    async fn test_large_radius_queries_every_sub_disk() {
        let upstream = Arc::new(FakeUpstream::new(|_| Ok(Vec::new())));
        let result = engine(&upstream).search(&request(50_000, 5)).await.unwrap();

        let expected = tile(TULA, 50.0, 10.0);
        let calls = upstream.calls();
        assert!(result.is_empty());
        assert_eq!(calls.len(), expected.len());
        assert!(calls.iter().all(|q| q.radius_m == 10_000 && q.limit == 500));
        for center in expected {
            assert!(calls.iter().any(|q| q.center == center));
        }
    }

    #[tokio::test]
    async fn test_large_radius_excludes_points_outside_true_radius() {
        let upstream = Arc::new(FakeUpstream::new(|_| {
            Ok(vec![
                page_at(TULA, 0.0, 20_000.0, "inside"),
                // Within reach of an edge sub-disk, but past the requested radius
                page_at(TULA, 90.0, 50_500.0, "outside"),
            ])
        }));

        let result = engine(&upstream).search(&request(50_000, 500)).await.unwrap();

        assert_eq!(result.count, upstream.calls().len());
        assert!(result.pages.iter().all(|p| p.distance <= 50_000));
        assert!(result
            .pages
            .iter()
            .all(|p| p.page.title.as_deref() == Some("inside")));
    }

    #[tokio::test]
    async fn test_limit_is_exact_when_candidates_exceed_it() {
        let upstream = Arc::new(FakeUpstream::new(|q| {
            Ok((0..20)
                .map(|i| page_at(TULA, f64::from(i) * 18.0, 1_000.0 + f64::from(i) * 100.0, &format!("{}", q.center)))
                .collect())
        }));

        let result = engine(&upstream).search(&request(50_000, 5)).await.unwrap();
        assert_eq!(result.pages.len(), 5);
        assert_eq!(result.count, 5);
    }

    #[tokio::test]
    async fn test_partial_failures_are_tolerated() {
        let upstream = Arc::new(FakeUpstream::new(|q| {
            if q.center.lat > TULA.lat {
                Err(unavailable())
            } else {
                Ok(vec![page_at(TULA, 180.0, 5_000.0, "south")])
            }
        }));

        let result = engine(&upstream).search(&request(50_000, 500)).await.unwrap();

        let healthy = tile(TULA, 50.0, 10.0)
            .into_iter()
            .filter(|c| c.lat <= TULA.lat)
            .count();
        assert!(healthy > 0);
        assert_eq!(result.count, healthy);
    }

    #[tokio::test]
    async fn test_all_sub_queries_failing_gives_empty_result() {
        let upstream = Arc::new(FakeUpstream::new(|_| Err(unavailable())));
        let result = engine(&upstream).search(&request(30_000, 10)).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_sub_query_times_out() {
        let mut fake = FakeUpstream::new(|_| Ok(vec![page_at(TULA, 45.0, 2_000.0, "page")]));
        fake.hang_at = Some(TULA);
        let upstream = Arc::new(fake);

        let result = engine(&upstream).search(&request(50_000, 500)).await.unwrap();

        let total = tile(TULA, 50.0, 10.0).len();
        assert_eq!(result.count, total - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_queries_run_concurrently() {
        let mut fake = FakeUpstream::new(|_| Ok(Vec::new()));
        fake.delay = Some(Duration::from_millis(50));
        let upstream = Arc::new(fake);

        engine(&upstream).search(&request(50_000, 5)).await.unwrap();

        let total = tile(TULA, 50.0, 10.0).len();
        assert_eq!(upstream.max_in_flight.load(Ordering::SeqCst), total);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap() {
        let mut fake = FakeUpstream::new(|_| Ok(Vec::new()));
        fake.delay = Some(Duration::from_millis(50));
        let upstream = Arc::new(fake);

        let settings = SearchSettings {
            max_concurrent_queries: Some(4),
            ..SearchSettings::default()
        };
        NearbySearch::new(upstream.clone(), settings)
            .search(&request(50_000, 5))
            .await
            .unwrap();

        assert_eq!(upstream.max_in_flight.load(Ordering::SeqCst), 4);
        assert_eq!(upstream.calls().len(), tile(TULA, 50.0, 10.0).len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_search_cancels_sub_queries() {
        let mut fake = FakeUpstream::new(|_| Ok(Vec::new()));
        fake.hang_all = true;
        let upstream = Arc::new(fake);
        let search = engine(&upstream);
        let req = request(50_000, 5);

        let outcome =
            tokio::time::timeout(Duration::from_millis(50), search.search(&req)).await;

        assert!(outcome.is_err());
        assert_eq!(upstream.calls().len(), tile(TULA, 50.0, 10.0).len());
        assert!(upstream.max_in_flight.load(Ordering::SeqCst) > 1);
        assert_eq!(upstream.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unusable_sub_disk_radius_is_an_error() {
        let upstream = Arc::new(FakeUpstream::new(|_| Ok(Vec::new())));
        let settings = SearchSettings {
            sub_disk_radius_m: 0,
            ..SearchSettings::default()
        };

        let err = NearbySearch::new(upstream.clone(), settings)
            .search(&request(20_000, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, NearbyError::Orchestration(_)));
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_small_radius_is_single_query() {
        let upstream = Arc::new(FakeUpstream::new(|_| {
            Ok(vec![page_at(TULA, 10.0, 3_000.0, "close")])
        }));

        let result = engine(&upstream).search(&request(5_000, 7)).await.unwrap();

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].center, TULA);
        assert_eq!(calls[0].radius_m, 5_000);
        assert_eq!(calls[0].limit, 7);
        assert_eq!(result.count, 1);
        assert!((2_990..=3_010).contains(&result.pages[0].distance));
    }

    #[tokio::test]
    async fn test_radius_at_ceiling_is_single_query() {
        let upstream = Arc::new(FakeUpstream::new(|_| Ok(Vec::new())));
        engine(&upstream).search(&request(10_000, 10)).await.unwrap();
        assert_eq!(upstream.calls().len(), 1);

        engine(&upstream).search(&request(10_001, 10)).await.unwrap();
        assert!(upstream.calls().len() > 2);
    }

    #[tokio::test]
    async fn test_single_query_failure_is_an_error() {
        let upstream = Arc::new(FakeUpstream::new(|_| Err(unavailable())));
        let err = engine(&upstream).search(&request(2_000, 10)).await.unwrap_err();
        assert!(matches!(err, NearbyError::Upstream(UpstreamError::Status(_))));
        assert!(!err.is_client_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_query_timeout_is_an_error() {
        let mut fake = FakeUpstream::new(|_| Ok(Vec::new()));
        fake.hang_at = Some(TULA);
        let upstream = Arc::new(fake);

        let err = engine(&upstream).search(&request(2_000, 10)).await.unwrap_err();
        assert!(matches!(err, NearbyError::Upstream(UpstreamError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_single_query_trims_over_returning_upstream() {
        let upstream = Arc::new(FakeUpstream::new(|_| {
            Ok((0..30)
                .map(|i| page_at(TULA, f64::from(i) * 12.0, 500.0, "dense"))
                .collect())
        }));

        let result = engine(&upstream).search(&request(1_000, 10)).await.unwrap();
        assert_eq!(result.count, 10);
    }

    #[tokio::test]
    async fn test_single_query_drops_pages_beyond_radius() {
        let upstream = Arc::new(FakeUpstream::new(|_| {
            Ok(vec![
                page_at(TULA, 0.0, 900.0, "inside"),
                page_at(TULA, 0.0, 1_500.0, "outside"),
            ])
        }));

        let result = engine(&upstream).search(&request(1_000, 10)).await.unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.pages[0].page.title.as_deref(), Some("inside"));
    }
}
