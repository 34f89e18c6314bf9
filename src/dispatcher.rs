use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{ResponseCache, make_cache_key};
use crate::errors::FetchError;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE, FETCH_TOTAL};
use crate::models::ApiRequest;
use crate::transport::Transport;
use crate::worker::{Scheduler, SchedulerConfig};

/// Default time-to-live for cached responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Serves fresh responses from the cache and sends everything else through
/// the scheduler, exactly once per miss.
///
/// Construct one per process (or per test) and share it behind an `Arc`.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    scheduler: Scheduler,
    cache: ResponseCache,
    ttl: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, scheduler: Scheduler, ttl: Duration) -> Self {
        Self {
            transport,
            scheduler,
            cache: ResponseCache::new(),
            ttl,
        }
    }

    /// 60 calls per rolling minute, one hour TTL. Needs a tokio runtime.
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        Self::new(
            transport,
            Scheduler::new(SchedulerConfig::default()),
            DEFAULT_CACHE_TTL,
        )
    }

    /// Fetch `request`, answering from the cache while the entry is fresh.
    ///
    /// On a miss the call is queued on the scheduler. Only a payload that
    /// deserializes into `T` is cached; failures leave any existing entry
    /// exactly as it was.
    pub async fn fetch_cached<T>(&self, request: ApiRequest) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        FETCH_TOTAL.inc();
        let cache_key = make_cache_key(&request.url, &request.options);

        // check cache first
        if let Some(payload) = self.cache.get_fresh(&cache_key) {
            CACHE_HITS.inc();
            debug!("Cache HIT {}", request.url);
            return Ok(serde_json::from_value(payload)?);
        }
        CACHE_MISSES.inc();
        debug!("Cache MISS {} - queueing upstream call", request.url);

        let transport = Arc::clone(&self.transport);
        let payload = self
            .scheduler
            .submit(move || async move { transport.execute(&request).await })
            .await?;

        let data = serde_json::from_value::<T>(payload.clone())?;
        self.cache.insert(cache_key, payload, self.ttl);
        CACHE_SIZE.set(self.cache.len() as i64);

        Ok(data)
    }

    /// Remove stale entries. Lookups already ignore them, this only frees memory.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.cache.sweep_expired();
        CACHE_SIZE.set(self.cache.len() as i64);
        removed
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::RequestOptions;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Answers `{"url": <url>}` for every call, or a 503 while `failing` is set.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub calls: AtomicUsize,
        pub failing: AtomicBool,
        pub body: Mutex<Option<Value>>,
        pub seen: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: &ApiRequest) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Http {
                    status: 503,
                    status_text: "Service Unavailable".to_string(),
                });
            }
            if let Some(body) = self.body.lock().unwrap().clone() {
                return Ok(body);
            }
            Ok(json!({ "url": request.url }))
        }
    }

    fn dispatcher(transport: Arc<MockTransport>) -> Dispatcher {
        Dispatcher::with_defaults(transport)
    }

    fn get(url: &str) -> ApiRequest {
        ApiRequest::new(url, RequestOptions::get())
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_fetch_served_from_cache() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&transport));

        let first: Value = dispatcher.fetch_cached(get("https://x.test/a")).await.unwrap();
        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        let second: Value = dispatcher.fetch_cached(get("https://x.test/a")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.scheduler().queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_ttl_elapses() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&transport));

        let _: Value = dispatcher.fetch_cached(get("https://x.test/a")).await.unwrap();
        tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;

        *transport.body.lock().unwrap() = Some(json!({ "v": 2 }));
        let refreshed: Value = dispatcher.fetch_cached(get("https://x.test/a")).await.unwrap();

        assert_eq!(refreshed, json!({ "v": 2 }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        // overwritten in place, not duplicated
        assert_eq!(dispatcher.cache().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_entry() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&transport));
        let request = get("https://x.test/a");
        let key = make_cache_key(&request.url, &request.options);

        let _: Value = dispatcher.fetch_cached(request.clone()).await.unwrap();
        let before = dispatcher.cache().entry(&key).unwrap();

        tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;
        transport.failing.store(true, Ordering::SeqCst);

        let result = dispatcher.fetch_cached::<Value>(request.clone()).await;
        match result {
            Err(e) => assert_eq!(e.to_string(), "Failed to fetch data: Service Unavailable"),
            Ok(_) => panic!("expected upstream failure"),
        }

        let after = dispatcher.cache().entry(&key).unwrap();
        assert_eq!(after.payload, before.payload);
        assert_eq!(after.expires_at, before.expires_at);

        // not cached as a failure either: the next call goes upstream again
        transport.failing.store(false, Ordering::SeqCst);
        let _: Value = dispatcher.fetch_cached(request).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_failure_is_not_cached() {
        let transport = Arc::new(MockTransport::default());
        *transport.body.lock().unwrap() = Some(json!("not a list"));
        let dispatcher = dispatcher(Arc::clone(&transport));

        let result = dispatcher.fetch_cached::<Vec<u32>>(get("https://x.test/list")).await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
        assert!(dispatcher.cache().is_empty());

        *transport.body.lock().unwrap() = Some(json!([1, 2, 3]));
        let list: Vec<u32> = dispatcher.fetch_cached(get("https://x.test/list")).await.unwrap();
        assert_eq!(list, vec![1, 2, 3]);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_query_does_not_share_entry() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&transport));

        let aapl: Value = dispatcher
            .fetch_cached(get("https://x.test/search?query=AAPL"))
            .await
            .unwrap();
        let msft: Value = dispatcher
            .fetch_cached(get("https://x.test/search?query=MSFT"))
            .await
            .unwrap();

        assert_ne!(aapl, msft);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.cache().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_do_not_change_key() {
        use crate::models::Auth;

        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&transport));

        let with_key = |key: &str| {
            get("https://x.test/a").with_auth(Auth::QueryParam {
                name: "apikey".to_string(),
                value: key.to_string(),
            })
        };
        let _: Value = dispatcher.fetch_cached(with_key("one")).await.unwrap();
        let _: Value = dispatcher.fetch_cached(with_key("two")).await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired_clears_stale_entries() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = dispatcher(Arc::clone(&transport));

        let _: Value = dispatcher.fetch_cached(get("https://x.test/a")).await.unwrap();
        assert_eq!(dispatcher.sweep_expired(), 0);

        tokio::time::advance(DEFAULT_CACHE_TTL).await;
        assert_eq!(dispatcher.sweep_expired(), 1);
        assert!(dispatcher.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_65_splits_across_windows() {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = Arc::new(dispatcher(Arc::clone(&transport)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for i in 0..65 {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                let url = format!("https://x.test/quote/{}", i);
                let body: Value = dispatcher.fetch_cached(get(&url)).await?;
                Ok::<_, FetchError>((url, body, Instant::now()))
            }));
        }

        let mut in_first_window = 0;
        let mut after_rollover = 0;
        for handle in handles {
            let (url, body, done_at) = handle.await.unwrap().unwrap();
            assert_eq!(body, json!({ "url": url }));
            if done_at < start + Duration::from_secs(60) {
                in_first_window += 1;
            } else {
                after_rollover += 1;
            }
        }

        assert_eq!(in_first_window, 60);
        assert_eq!(after_rollover, 5);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 65);
    }
}
