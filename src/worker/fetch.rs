//! Request interception and the two caching strategies.
//!
//! ## Routing
//!
//! Only same-origin GET requests are handled; everything else goes to the
//! network untouched. For handled requests, in order:
//!
//! 1. Path contains the API marker → network-first (runtime partition)
//! 2. Document request, or path ends in a core extension → cache-first
//!    (assets partition)
//! 3. Anything else → network-first
//!
//! A given request therefore only ever lands in one of the two partitions.

use super::ServiceWorker;
use crate::cache::CacheStorage;
use crate::config::WorkerConfig;
use crate::host::Host;
use crate::http::{RequestDestination, RequestSnapshot, ResponseSnapshot};
use crate::network::Network;
use crate::queue::QueueStore;

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not handled by the worker.
    Passthrough,
    CacheFirst,
    NetworkFirst,
}

/// Picks the route for `request`.
pub fn classify(request: &RequestSnapshot, config: &WorkerConfig, origin: &url::Url) -> Route {
    if !request.is_get() {
        return Route::Passthrough;
    }
    let Ok(url) = url::Url::parse(&request.url) else {
        return Route::Passthrough;
    };
    if url.origin() != origin.origin() {
        return Route::Passthrough;
    }

    let path = url.path();
    if path.contains(&config.api_marker) {
        return Route::NetworkFirst;
    }
    if request.destination == RequestDestination::Document
        || config.core_extensions.iter().any(|ext| path.ends_with(ext))
    {
        return Route::CacheFirst;
    }
    Route::NetworkFirst
}

/// Fetches `request` and writes the response into `partition` when it's ok.
///
/// Returns the response whatever its status. A failed cache write is logged
/// and doesn't affect the result.
async fn fetch_and_store<C: CacheStorage, N: Network>(
    caches: &C,
    network: &N,
    partition: &str,
    request: &RequestSnapshot,
) -> Result<ResponseSnapshot, crate::error::NetworkError> {
    let response = network.fetch(request).await?;
    if response.ok() {
        if let Err(e) = caches.put(partition, request.cache_key(), &response).await {
            log::warn!("Failed to cache {}: {}", request.url, e);
        }
    }
    Ok(response)
}

impl<C, N, Q, H> ServiceWorker<C, N, Q, H>
where
    C: CacheStorage,
    N: Network,
    Q: QueueStore,
    H: Host,
{
    /// Handles a fetch event.
    ///
    /// Returns `None` when the worker doesn't intervene and the platform
    /// should perform the request itself.
    pub async fn on_fetch(&self, request: &RequestSnapshot) -> Option<ResponseSnapshot> {
        self.serve(self.route(request), request).await
    }

    /// Routes `request`. Synchronous, so the platform can be told whether
    /// the worker will respond before any I/O starts.
    pub fn route(&self, request: &RequestSnapshot) -> Route {
        classify(request, &self.config, self.host.origin())
    }

    /// Serves `request` along an already chosen route.
    pub async fn serve(&self, route: Route, request: &RequestSnapshot) -> Option<ResponseSnapshot> {
        log::debug!("{:?}: {}", route, request.url);
        match route {
            Route::Passthrough => None,
            Route::CacheFirst => Some(self.cache_first(request).await),
            Route::NetworkFirst => Some(self.network_first(request).await),
        }
    }

    /// Serves from the assets partition, refreshing hits in the background.
    pub async fn cache_first(&self, request: &RequestSnapshot) -> ResponseSnapshot {
        let partition = self.config.assets_cache();

        let cached = match self.caches.lookup(&partition, request.cache_key()).await {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("Cache lookup failed for {}: {}", request.url, e);
                None
            }
        };

        if let Some(cached) = cached {
            log::debug!("Cache hit: {}", request.url);
            self.spawn_refresh(partition, request.clone());
            return cached;
        }

        log::debug!("Cache miss: {}", request.url);
        match fetch_and_store(&self.caches, &self.network, &partition, request).await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("Offline and not cached: {}", e);
                ResponseSnapshot::offline(&self.config.offline_message)
            }
        }
    }

    /// Serves from the network, falling back to the runtime partition only
    /// when the fetch itself fails.
    pub async fn network_first(&self, request: &RequestSnapshot) -> ResponseSnapshot {
        let partition = self.config.runtime_cache();

        let error = match fetch_and_store(&self.caches, &self.network, &partition, request).await {
            Ok(response) => return response,
            Err(e) => e,
        };
        log::debug!("Network failed, trying cache: {}", error);

        match self.caches.lookup(&partition, request.cache_key()).await {
            Ok(Some(cached)) => cached,
            Ok(None) => ResponseSnapshot::offline(&self.config.offline_message),
            Err(e) => {
                log::warn!("Cache lookup failed for {}: {}", request.url, e);
                ResponseSnapshot::offline(&self.config.offline_message)
            }
        }
    }

    /// Refetches a cache hit without holding up the response. Errors are
    /// discarded.
    fn spawn_refresh(&self, partition: String, request: RequestSnapshot) {
        let caches = self.caches.clone();
        let network = self.network.clone();
        self.host.spawn_detached(Box::pin(async move {
            match fetch_and_store(&caches, &network, &partition, &request).await {
                Ok(response) if response.ok() => log::debug!("Refreshed {}", request.url),
                Ok(response) => {
                    log::debug!("Refresh of {} got HTTP {}", request.url, response.status)
                }
                Err(e) => log::debug!("Background refresh failed: {}", e),
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{url, TestWorker, ORIGIN};
    use pollster::block_on;

    fn origin() -> url::Url {
        url::Url::parse(ORIGIN).unwrap()
    }

    fn route(request: RequestSnapshot) -> Route {
        classify(&request, &WorkerConfig::default(), &origin())
    }

    #[test]
    fn test_classify_core_assets_cache_first() {
        assert_eq!(route(RequestSnapshot::get(url("/app.js"))), Route::CacheFirst);
        assert_eq!(route(RequestSnapshot::get(url("/styles.css"))), Route::CacheFirst);
        assert_eq!(route(RequestSnapshot::get(url("/index.html"))), Route::CacheFirst);
        assert_eq!(
            route(
                RequestSnapshot::get(url("/flows/42"))
                    .with_destination(RequestDestination::Document)
            ),
            Route::CacheFirst
        );
    }

    #[test]
    fn test_classify_api_network_first() {
        assert_eq!(route(RequestSnapshot::get(url("/api/flows"))), Route::NetworkFirst);
        // API marker wins over the extension rule
        assert_eq!(route(RequestSnapshot::get(url("/api/export.js"))), Route::NetworkFirst);
        assert_eq!(
            route(
                RequestSnapshot::get(url("/api/flows"))
                    .with_destination(RequestDestination::Document)
            ),
            Route::NetworkFirst
        );
    }

    #[test]
    fn test_classify_other_network_first() {
        assert_eq!(route(RequestSnapshot::get(url("/logo.png"))), Route::NetworkFirst);
        assert_eq!(route(RequestSnapshot::get(url("/manifest.json"))), Route::NetworkFirst);
    }

    #[test]
    fn test_classify_passthrough() {
        assert_eq!(
            route(RequestSnapshot::get(url("/api/flows")).with_method("POST")),
            Route::Passthrough
        );
        assert_eq!(
            route(RequestSnapshot::get("https://cdn.example.com/lib.js")),
            Route::Passthrough
        );
        assert_eq!(
            route(RequestSnapshot::get("http://flowforge.test/app.js")),
            Route::Passthrough
        );
        assert_eq!(route(RequestSnapshot::get("not a url")), Route::Passthrough);
    }

    #[test]
    fn test_on_fetch_passthrough_does_not_touch_network() {
        let t = TestWorker::new();
        let request = RequestSnapshot::get(url("/api/flows")).with_method("DELETE");
        assert_eq!(block_on(t.worker.on_fetch(&request)), None);
        assert!(t.network.calls().is_empty());
    }

    #[test]
    fn test_cache_first_hit_returns_cached_and_refreshes_once() {
        let t = TestWorker::new();
        let assets = t.worker.config().assets_cache();
        let cached = ResponseSnapshot::new(200, "old");
        block_on(t.caches.put(&assets, &url("/app.js"), &cached)).unwrap();
        t.network.respond(&url("/app.js"), ResponseSnapshot::new(200, "new"));

        let response = block_on(t.worker.on_fetch(&RequestSnapshot::get(url("/app.js")))).unwrap();

        // Returned before the refresh ran
        assert_eq!(response.body_text(), "old");
        assert_eq!(t.network.call_count(&url("/app.js")), 0);
        assert_eq!(t.host.pending_tasks(), 1);

        assert_eq!(t.host.run_pending(), 1);
        assert_eq!(t.network.call_count(&url("/app.js")), 1);
        let refreshed = block_on(t.caches.lookup(&assets, &url("/app.js"))).unwrap().unwrap();
        assert_eq!(refreshed.body_text(), "new");
    }

    #[test]
    fn test_cache_first_refresh_failure_is_swallowed() {
        let t = TestWorker::new();
        let assets = t.worker.config().assets_cache();
        block_on(t.caches.put(
            &assets,
            &url("/app.js"),
            &ResponseSnapshot::new(200, "old"),
        ))
        .unwrap();
        t.network.fail(&url("/app.js"));

        let response = block_on(t.worker.cache_first(&RequestSnapshot::get(url("/app.js"))));
        assert_eq!(response.body_text(), "old");

        t.host.run_pending();
        let kept = block_on(t.caches.lookup(&assets, &url("/app.js"))).unwrap().unwrap();
        assert_eq!(kept.body_text(), "old");
    }

    #[test]
    fn test_cache_first_miss_fetches_and_stores() {
        let t = TestWorker::new();
        t.network.respond(&url("/app.js"), ResponseSnapshot::new(200, "live"));

        let response = block_on(t.worker.cache_first(&RequestSnapshot::get(url("/app.js"))));

        assert_eq!(response.body_text(), "live");
        assert!(t.caches.contains(&t.worker.config().assets_cache(), &url("/app.js")));
        assert!(!t.caches.contains(&t.worker.config().runtime_cache(), &url("/app.js")));
        assert_eq!(t.host.pending_tasks(), 0);
    }

    #[test]
    fn test_cache_first_miss_does_not_store_errors() {
        let t = TestWorker::new();
        t.network.respond(&url("/missing.js"), ResponseSnapshot::new(404, "nope"));

        let response = block_on(t.worker.cache_first(&RequestSnapshot::get(url("/missing.js"))));

        assert_eq!(response.status, 404);
        assert_eq!(t.caches.entry_count(&t.worker.config().assets_cache()), 0);
    }

    #[test]
    fn test_cache_first_offline_miss_is_503() {
        let t = TestWorker::new();
        t.network.fail(&url("/app.js"));

        let response = block_on(t.worker.cache_first(&RequestSnapshot::get(url("/app.js"))));

        assert_eq!(response.status, 503);
        assert_eq!(response.body_text(), "Offline - content not available");
        assert_eq!(response.headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn test_network_first_success_stores_in_runtime() {
        let t = TestWorker::new();
        t.network.respond(&url("/api/flows"), ResponseSnapshot::new(200, "[]"));

        let response =
            block_on(t.worker.on_fetch(&RequestSnapshot::get(url("/api/flows")))).unwrap();

        assert_eq!(response.body_text(), "[]");
        assert!(t.caches.contains(&t.worker.config().runtime_cache(), &url("/api/flows")));
        assert!(!t.caches.contains(&t.worker.config().assets_cache(), &url("/api/flows")));
    }

    #[test]
    fn test_network_first_offline_uses_runtime_copy() {
        let t = TestWorker::new();
        let runtime = t.worker.config().runtime_cache();
        block_on(t.caches.put(
            &runtime,
            &url("/api/flows"),
            &ResponseSnapshot::new(200, "cached"),
        ))
        .unwrap();
        t.network.fail(&url("/api/flows"));

        let response = block_on(t.worker.network_first(&RequestSnapshot::get(url("/api/flows"))));
        assert_eq!(response.body_text(), "cached");
    }

    #[test]
    fn test_network_first_offline_without_copy_is_503() {
        let t = TestWorker::new();
        t.network.fail(&url("/api/flows"));

        let response = block_on(t.worker.network_first(&RequestSnapshot::get(url("/api/flows"))));
        assert_eq!(response.status, 503);
    }

    #[test]
    fn test_network_first_http_error_is_not_a_fallback() {
        let t = TestWorker::new();
        let runtime = t.worker.config().runtime_cache();
        block_on(t.caches.put(
            &runtime,
            &url("/api/flows"),
            &ResponseSnapshot::new(200, "cached"),
        ))
        .unwrap();
        t.network.respond(&url("/api/flows"), ResponseSnapshot::new(500, "boom"));

        let response = block_on(t.worker.network_first(&RequestSnapshot::get(url("/api/flows"))));

        assert_eq!(response.status, 500);
        // The stale copy is kept, not overwritten by the error
        let kept = block_on(t.caches.lookup(&runtime, &url("/api/flows"))).unwrap().unwrap();
        assert_eq!(kept.body_text(), "cached");
    }
}
