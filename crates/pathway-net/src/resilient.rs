use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use pathway_core::config::ClientConfig;
use pathway_core::error::{PathwayError, Result};
use pathway_core::traits::{HttpRequest, Method};

/// Identity of a request for deduplication and caching: method, url, body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    url: String,
    body: String,
}

impl RequestKey {
    pub fn new(method: Method, url: impl Into<String>, body: Option<&serde_json::Value>) -> Self {
        Self {
            method,
            url: url.into(),
            body: body.map(|b| b.to_string()).unwrap_or_default(),
        }
    }

    pub fn for_request(request: &HttpRequest) -> Self {
        Self::new(request.method, request.url.clone(), request.body.as_ref())
    }

    pub fn method(&self) -> Method {
        self.method
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method.as_str(), self.url)?;
        if !self.body.is_empty() {
            write!(f, " {}", self.body)?;
        }
        Ok(())
    }
}

/// Per-request policy.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Cache successful GET responses for this long.
    pub cache_ttl: Option<Duration>,
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Collapse concurrent identical requests onto one network call.
    pub dedupe: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cache_ttl: None,
            max_retries: 3,
            timeout: Duration::from_secs(10),
            dedupe: true,
        }
    }
}

impl RequestOptions {
    /// Short timeout for calls a user is waiting on.
    pub fn interactive(config: &ClientConfig) -> Self {
        Self {
            cache_ttl: None,
            max_retries: config.max_retries,
            timeout: config.interactive_timeout(),
            dedupe: true,
        }
    }

    /// Long timeout for AI generation calls.
    pub fn generation(config: &ClientConfig) -> Self {
        Self {
            timeout: config.generation_timeout(),
            ..Self::interactive(config)
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn without_dedupe(mut self) -> Self {
        self.dedupe = false;
        self
    }
}

/// Exponential backoff: the delay after failed attempt `n` is `base * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            max: Duration::from_millis(60_000),
        }
    }
}

impl Backoff {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            base: Duration::from_millis(config.initial_backoff_ms),
            max: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay before the attempt following failed attempt `failed_attempt` (1-based).
    pub fn delay(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(failed_attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

type SharedResponse = Shared<BoxFuture<'static, Result<serde_json::Value>>>;

struct CacheEntry {
    value: serde_json::Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

struct Inner {
    in_flight: Mutex<HashMap<RequestKey, SharedResponse>>,
    cache: Mutex<HashMap<RequestKey, CacheEntry>>,
    cache_capacity: usize,
    backoff: Backoff,
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<RequestKey, SharedResponse>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<RequestKey, CacheEntry>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cached(&self, key: &RequestKey) -> Option<serde_json::Value> {
        let mut cache = self.lock_cache();
        match cache.get(key) {
            Some(entry) if entry.is_fresh(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: RequestKey, value: serde_json::Value, ttl: Duration) {
        let mut cache = self.lock_cache();
        let now = Instant::now();
        cache.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                ttl,
            },
        );

        if cache.len() > self.cache_capacity {
            let before = cache.len();
            cache.retain(|_, entry| entry.is_fresh(now));
            debug!(purged = before - cache.len(), remaining = cache.len(), "Swept expired cache entries");
        }
    }

    /// Clear the in-flight record and cache a success, in one critical section.
    fn settle(
        &self,
        key: &RequestKey,
        result: &Result<serde_json::Value>,
        cache_ttl: Option<Duration>,
    ) {
        let mut in_flight = self.lock_in_flight();
        in_flight.remove(key);
        if let (Ok(value), Some(ttl)) = (result, cache_ttl) {
            self.store(key.clone(), value.clone(), ttl);
        }
    }
}

/// Wraps outbound requests with deduplication, TTL caching, per-attempt
/// timeout, and exponential-backoff retry.
///
/// Cloning is cheap and clones share the same in-flight and cache maps;
/// separate instances built with `new` are fully isolated.
#[derive(Clone)]
pub struct ResilientClient {
    inner: Arc<Inner>,
}

impl ResilientClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_backoff(Backoff::from_config(config), config.cache_capacity)
    }

    pub fn with_backoff(backoff: Backoff, cache_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                in_flight: Mutex::new(HashMap::new()),
                cache: Mutex::new(HashMap::new()),
                cache_capacity,
                backoff,
            }),
        }
    }

    /// Run `fetch` under the given policy.
    ///
    /// `fetch` is invoked once per attempt. All callers sharing a deduplicated
    /// key receive the same value or the same error.
    pub async fn request<F, Fut>(
        &self,
        key: RequestKey,
        fetch: F,
        options: RequestOptions,
    ) -> Result<serde_json::Value>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        let cache_ttl = options.cache_ttl.filter(|_| key.method().is_cacheable());

        if cache_ttl.is_some() {
            if let Some(value) = self.inner.cached(&key) {
                debug!(key = %key, "Serving cached response");
                return Ok(value);
            }
        }

        if !options.dedupe {
            let result = attempt_with_retry(&fetch, &options, self.inner.backoff, &key).await;
            if let (Ok(value), Some(ttl)) = (&result, cache_ttl) {
                self.inner.store(key, value.clone(), ttl);
            }
            return result;
        }

        let pending = {
            let mut in_flight = self.inner.lock_in_flight();
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!(key = %key, "Joining in-flight request");
                    pending.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let owned_key = key.clone();
                    let shared = async move {
                        let result =
                            attempt_with_retry(&fetch, &options, inner.backoff, &owned_key).await;
                        inner.settle(&owned_key, &result, cache_ttl);
                        result
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };

        pending.await
    }

    /// Drop a cached response.
    pub fn invalidate(&self, key: &RequestKey) {
        self.inner.lock_cache().remove(key);
    }

    pub fn clear_cache(&self) {
        self.inner.lock_cache().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.inner.lock_cache().len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.lock_in_flight().len()
    }
}

async fn attempt_with_retry<F, Fut>(
    fetch: &F,
    options: &RequestOptions,
    backoff: Backoff,
    key: &RequestKey,
) -> Result<serde_json::Value>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<serde_json::Value>>,
{
    let max_attempts = options.max_retries.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(options.timeout, fetch()).await {
            Ok(result) => result,
            Err(_) => Err(PathwayError::Timeout {
                timeout_ms: options.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff.delay(attempt);
                warn!(
                    key = %key,
                    attempt,
                    max_attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(key = %key, attempt, error = %e, "Request failed");
                return Err(e);
            }
        }
    }
}
