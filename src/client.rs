//! Resource Client
//!
//! The explicitly-owned service object the UI layer talks to. Created once
//! at application start, it ties the gateway transport to the search
//! cache, the cover fetch queue, and the cover-URL cache, so no piece of
//! this layer lives in module-level global state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{cover_key, CoverCache, CoverResolution, SearchCache};
use crate::gateway::{
    FetchOutcome, GatewayAction, GatewayError, GatewayTransport, HttpGateway, PublishRequest,
    ResourceInfo, SearchParams, Service,
};
use crate::queue::{FetchQueue, TaskHandle};

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the local gateway node
    pub base_url: String,
    /// TTL for general search/list results
    pub search_ttl: Duration,
    /// TTL for the aggregated home-feed queries (shorter, fresher)
    pub feed_ttl: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:12391".to_string(),
            search_ttl: Duration::from_secs(60),
            feed_ttl: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of asking for a cover image
pub enum CoverRequest {
    /// Resolution already known (possibly negative)
    Cached(CoverResolution),
    /// A fetch was enqueued; the handle settles when it has run
    Scheduled(TaskHandle),
    /// A fetch for the same cover is already queued or executing
    InFlight,
}

/// Facade over the content gateway with caching and fetch throttling
pub struct ResourceClient {
    transport: Arc<dyn GatewayTransport>,
    search_cache: SearchCache,
    cover_cache: Arc<CoverCache>,
    fetch_queue: FetchQueue,
    config: ClientConfig,
}

impl ResourceClient {
    /// Create a client backed by the HTTP gateway transport
    ///
    /// Must be called from within a Tokio runtime (the fetch queue spawns
    /// its worker here).
    pub fn new(config: ClientConfig) -> Result<Self, GatewayError> {
        let transport = HttpGateway::with_timeout(&config.base_url, config.request_timeout)?;
        info!(base_url = %config.base_url, "Resource client ready");
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over a caller-supplied transport (tests, bridges)
    pub fn with_transport(transport: Arc<dyn GatewayTransport>, config: ClientConfig) -> Self {
        Self {
            transport,
            search_cache: SearchCache::new(),
            cover_cache: Arc::new(CoverCache::new()),
            fetch_queue: FetchQueue::new(),
            config,
        }
    }

    /// Search resources, memoized at the general search TTL
    pub async fn search(&self, params: SearchParams) -> Result<Vec<ResourceInfo>, GatewayError> {
        self.search_with_ttl(params, self.config.search_ttl).await
    }

    /// Search resources for the home feed, memoized at the shorter feed TTL
    pub async fn search_feed(
        &self,
        params: SearchParams,
    ) -> Result<Vec<ResourceInfo>, GatewayError> {
        self.search_with_ttl(params, self.config.feed_ttl).await
    }

    /// Search resources with an explicit TTL
    ///
    /// Malformed params are not validated here; the gateway's own error
    /// surfaces to the caller, and the failed entry is dropped so the next
    /// call retries.
    pub async fn search_with_ttl(
        &self,
        params: SearchParams,
        ttl: Duration,
    ) -> Result<Vec<ResourceInfo>, GatewayError> {
        let key = params.canonical_key();
        let transport = Arc::clone(&self.transport);
        let value = self
            .search_cache
            .get_or_fetch(&key, ttl, move || async move {
                transport
                    .request(GatewayAction::SearchResources(params))
                    .await
            })
            .await?;

        serde_json::from_value(value.as_ref().clone())
            .map_err(|e| GatewayError::Request(format!("Malformed search response: {e}")))
    }

    /// Fetch a resource's content by (publisher, service, identifier)
    pub async fn fetch_resource(
        &self,
        name: &str,
        service: Service,
        identifier: Option<&str>,
    ) -> Result<FetchOutcome, GatewayError> {
        let value = self
            .transport
            .request(GatewayAction::FetchResource {
                name: name.to_string(),
                service,
                identifier: identifier.map(String::from),
            })
            .await?;
        Ok(FetchOutcome::from_value(value))
    }

    /// Resolve the gateway URL a resource can be fetched from
    pub async fn resolve_url(
        &self,
        name: &str,
        service: Service,
        identifier: Option<&str>,
    ) -> Result<FetchOutcome, GatewayError> {
        let value = self
            .transport
            .request(GatewayAction::ResourceUrl {
                name: name.to_string(),
                service,
                identifier: identifier.map(String::from),
            })
            .await?;
        Ok(FetchOutcome::from_value(value))
    }

    /// Publish a single resource
    pub async fn publish(&self, request: PublishRequest) -> Result<Value, GatewayError> {
        debug!(name = %request.name, identifier = %request.identifier, "Publishing resource");
        self.transport
            .request(GatewayAction::PublishResource(request))
            .await
    }

    /// Publish several resources in one gateway action (e.g. audio + cover)
    pub async fn publish_multiple(
        &self,
        requests: Vec<PublishRequest>,
    ) -> Result<Value, GatewayError> {
        debug!(count = requests.len(), "Publishing resource batch");
        self.transport
            .request(GatewayAction::PublishMultiple {
                resources: requests,
            })
            .await
    }

    /// Delete a previously published resource
    pub async fn delete(&self, service: Service, identifier: &str) -> Result<(), GatewayError> {
        self.transport
            .request(GatewayAction::DeleteResource {
                service,
                identifier: identifier.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Ask for a cover image's URL
    ///
    /// Answers from the cover cache when possible (including cached
    /// "missing" markers). On a miss, a resolution task is enqueued on the
    /// sequential fetch queue; its result lands in the cover cache. A
    /// request for a cover that is already queued or executing is dropped.
    ///
    /// Transport failures during resolution leave the cache untouched, so
    /// a later request retries; only a definitive "does not exist" answer
    /// is recorded negatively.
    pub fn request_cover(&self, name: &str, identifier: &str, service: Service) -> CoverRequest {
        let key = cover_key(name, identifier, service);
        if let Some(resolution) = self.cover_cache.get(&key) {
            return CoverRequest::Cached(resolution);
        }

        let transport = Arc::clone(&self.transport);
        let cover_cache = Arc::clone(&self.cover_cache);
        let action = GatewayAction::ResourceUrl {
            name: name.to_string(),
            service,
            identifier: Some(identifier.to_string()),
        };
        let task_key = key.clone();

        let operation = async move {
            match transport.request(action).await {
                Ok(value) => {
                    let resolution = match FetchOutcome::from_value(value) {
                        FetchOutcome::Found(v) => match v.as_str() {
                            Some(url) => CoverResolution::Url(url.to_string()),
                            None => CoverResolution::Missing,
                        },
                        FetchOutcome::Missing => CoverResolution::Missing,
                    };
                    cover_cache.insert(task_key, resolution);
                }
                Err(err) => {
                    debug!(key = %task_key, error = %err, "Cover resolution failed");
                }
            }
        };

        match self.fetch_queue.push(&key, operation) {
            Some(handle) => CoverRequest::Scheduled(handle),
            None => CoverRequest::InFlight,
        }
    }

    /// Drop cached search results (e.g. right after publishing into a feed)
    pub fn invalidate_searches(&self) {
        self.search_cache.clear();
    }

    pub fn search_cache(&self) -> &SearchCache {
        &self.search_cache
    }

    pub fn cover_cache(&self) -> &CoverCache {
        &self.cover_cache
    }

    pub fn fetch_queue(&self) -> &FetchQueue {
        &self.fetch_queue
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SearchMode;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that counts calls and replies from a canned script
    struct MockTransport {
        calls: AtomicUsize,
        actions: Mutex<Vec<String>>,
        reply: Box<dyn Fn(&GatewayAction) -> Result<Value, GatewayError> + Send + Sync>,
    }

    impl MockTransport {
        fn returning(
            reply: impl Fn(&GatewayAction) -> Result<Value, GatewayError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                actions: Mutex::new(Vec::new()),
                reply: Box::new(reply),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GatewayTransport for MockTransport {
        async fn request(&self, action: GatewayAction) -> Result<Value, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.actions.lock().unwrap().push(action.name().to_string());
            tokio::time::sleep(Duration::from_millis(20)).await;
            (self.reply)(&action)
        }
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            mode: SearchMode::All,
            service: Some(Service::Audio),
            query: Some(query.to_string()),
            name: None,
            identifier: None,
            limit: 20,
            offset: 0,
            reverse: true,
            include_metadata: true,
            include_status: false,
            exclude_blocked: true,
            exact_match_names: false,
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn listing(name: &str) -> Value {
        json!([{
            "name": name,
            "service": "AUDIO",
            "identifier": "song1",
            "size": 10,
            "created": 1000,
            "updated": 1000
        }])
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_searches_hit_gateway_once() {
        init_tracing();
        let transport = MockTransport::returning(|_| Ok(listing("alice")));
        let client = Arc::new(ResourceClient::with_transport(
            transport.clone(),
            ClientConfig::default(),
        ));

        let (a, b, c) = tokio::join!(
            client.search(params("lofi")),
            client.search(params("lofi")),
            client.search(params("lofi")),
        );

        assert_eq!(transport.call_count(), 1);
        assert_eq!(a.unwrap()[0].name, "alice");
        assert_eq!(b.unwrap()[0].name, "alice");
        assert_eq!(c.unwrap()[0].name, "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_ttl_respected_through_client() {
        let transport = MockTransport::returning(|_| Ok(listing("alice")));
        let client =
            ResourceClient::with_transport(transport.clone(), ClientConfig::default());

        client.search(params("lofi")).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        client.search(params("lofi")).await.unwrap();
        assert_eq!(transport.call_count(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        client.search(params("lofi")).await.unwrap();
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_retries_on_next_call() {
        let transport = MockTransport::returning({
            let first = AtomicUsize::new(0);
            move |_| {
                if first.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(GatewayError::Server(503, "overloaded".to_string()))
                } else {
                    Ok(listing("alice"))
                }
            }
        });
        let client =
            ResourceClient::with_transport(transport.clone(), ClientConfig::default());

        let err = client.search(params("lofi")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Server(503, _)));

        // Same params, still inside the TTL window
        let ok = client.search(params("lofi")).await.unwrap();
        assert_eq!(ok[0].name, "alice");
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_url_maps_sentinel_to_missing() {
        let transport =
            MockTransport::returning(|_| Ok(json!("Resource does not exist")));
        let client = ResourceClient::with_transport(transport, ClientConfig::default());

        let outcome = client
            .resolve_url("alice", Service::Thumbnail, Some("song1"))
            .await
            .unwrap();
        assert!(outcome.is_missing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cover_request_caches_and_dedups() {
        let transport = MockTransport::returning(|action| match action {
            GatewayAction::ResourceUrl { .. } => {
                Ok(json!("http://gateway/arbitrary/THUMBNAIL/alice/song1"))
            }
            _ => Err(GatewayError::Request("unexpected action".to_string())),
        });
        let client = ResourceClient::with_transport(transport.clone(), ClientConfig::default());

        let first = client.request_cover("alice", "song1", Service::Thumbnail);
        let handle = match first {
            CoverRequest::Scheduled(handle) => handle,
            _ => panic!("expected a scheduled fetch"),
        };

        // Same cover while the fetch is still queued: dropped
        assert!(matches!(
            client.request_cover("alice", "song1", Service::Thumbnail),
            CoverRequest::InFlight
        ));

        handle.wait().await;
        assert_eq!(transport.call_count(), 1);

        match client.request_cover("alice", "song1", Service::Thumbnail) {
            CoverRequest::Cached(CoverResolution::Url(url)) => {
                assert_eq!(url, "http://gateway/arbitrary/THUMBNAIL/alice/song1");
            }
            _ => panic!("expected cached URL"),
        }
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_cover_recorded_negatively() {
        let transport = MockTransport::returning(|_| Ok(json!("Resource does not exist")));
        let client = ResourceClient::with_transport(transport.clone(), ClientConfig::default());

        match client.request_cover("bob", "song2", Service::Thumbnail) {
            CoverRequest::Scheduled(handle) => handle.wait().await,
            _ => panic!("expected a scheduled fetch"),
        }

        // The negative marker short-circuits the next request
        assert!(matches!(
            client.request_cover("bob", "song2", Service::Thumbnail),
            CoverRequest::Cached(CoverResolution::Missing)
        ));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cover_resolution_not_cached() {
        let transport = MockTransport::returning({
            let first = AtomicUsize::new(0);
            move |_| {
                if first.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(GatewayError::Timeout)
                } else {
                    Ok(json!("http://gateway/arbitrary/THUMBNAIL/alice/song1"))
                }
            }
        });
        let client = ResourceClient::with_transport(transport.clone(), ClientConfig::default());

        match client.request_cover("alice", "song1", Service::Thumbnail) {
            CoverRequest::Scheduled(handle) => handle.wait().await,
            _ => panic!("expected a scheduled fetch"),
        }

        // Failure left no marker; the retry schedules a fresh fetch
        match client.request_cover("alice", "song1", Service::Thumbnail) {
            CoverRequest::Scheduled(handle) => handle.wait().await,
            _ => panic!("expected a retry to be scheduled"),
        }
        assert_eq!(transport.call_count(), 2);
        assert!(matches!(
            client.request_cover("alice", "song1", Service::Thumbnail),
            CoverRequest::Cached(CoverResolution::Url(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_and_delete_pass_through() {
        let transport = MockTransport::returning(|_| Ok(json!({"signature": "abc"})));
        let client = ResourceClient::with_transport(transport.clone(), ClientConfig::default());

        let request = PublishRequest::with_data("alice", Service::Audio, "song1", b"bytes");
        let receipt = client.publish(request).await.unwrap();
        assert_eq!(receipt["signature"], "abc");

        client.delete(Service::Audio, "song1").await.unwrap();

        let actions = transport.actions.lock().unwrap().clone();
        assert_eq!(
            actions,
            vec!["PUBLISH_QDN_RESOURCE", "DELETE_QDN_RESOURCE"]
        );
    }
}
