//! Single-flight Search Cache
//!
//! Memoizes gateway search/list calls by canonical parameter key with a
//! time-to-live. The cached value is the shared in-flight future itself,
//! stored before the first await, so any number of concurrent callers for
//! the same key join one underlying request and observe the same result.
//!
//! Failed flights are dropped immediately: the next call for that key
//! issues a fresh request instead of replaying the rejection. Successful
//! entries are never evicted, only superseded once expired; the cache is
//! sized by the set of distinct queries its owner makes and lives as long
//! as the owning client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::gateway::GatewayError;

type SharedFlight = Shared<BoxFuture<'static, Result<Arc<Value>, GatewayError>>>;

/// One cached flight: when it started and the shared future producing its
/// result. The generation guards invalidation — a caller observing a
/// failure only removes the entry it actually awaited, never a newer
/// flight that has already replaced it.
struct Entry {
    generation: u64,
    created_at: Instant,
    flight: SharedFlight,
}

/// Request-deduplicating TTL cache for gateway search calls
pub struct SearchCache {
    entries: Mutex<HashMap<String, Entry>>,
    next_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SearchCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached result for `key`, joining the in-flight request
    /// if one exists, or run `fetch` and cache it for `ttl`.
    ///
    /// A `ttl` of zero disables caching: every lookup counts as expired,
    /// so each call starts its own flight. Errors from `fetch` propagate
    /// verbatim to every joined caller.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Arc<Value>, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, GatewayError>> + Send + 'static,
    {
        // Construct the future before taking the lock: futures are lazy,
        // so this costs nothing on a hit, and a panicking `fetch` cannot
        // poison the entries mutex.
        let fut = fetch();

        let (generation, flight) = {
            let mut entries = self.entries.lock().unwrap();
            let fresh = entries
                .get(key)
                .filter(|entry| entry.created_at.elapsed() < ttl)
                .map(|entry| (entry.generation, entry.flight.clone()));
            match fresh {
                Some(hit) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(key = key, "Search cache HIT");
                    hit
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    if entries.contains_key(key) {
                        trace!(key = key, "Search cache entry expired");
                    } else {
                        trace!(key = key, "Search cache MISS");
                    }
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let flight: SharedFlight =
                        async move { fut.await.map(Arc::new) }.boxed().shared();
                    // Stored before the first await: concurrent callers for
                    // this key must join this flight, not start their own.
                    entries.insert(
                        key.to_string(),
                        Entry {
                            generation,
                            created_at: Instant::now(),
                            flight: flight.clone(),
                        },
                    );
                    (generation, flight)
                }
            }
        };

        match flight.await {
            Ok(value) => Ok(value),
            Err(err) => {
                let mut entries = self.entries.lock().unwrap();
                if entries.get(key).map(|e| e.generation) == Some(generation) {
                    entries.remove(key);
                    debug!(key = key, error = %err, "Dropped failed search cache entry");
                }
                Err(err)
            }
        }
    }

    /// Remove a specific entry (e.g. after publishing into a listed feed)
    pub fn invalidate(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
        debug!(key = key, "Invalidated search cache entry");
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Cleared search cache");
    }

    /// Number of live entries (including expired ones not yet superseded)
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    ///
    /// Returns (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new()
    }
}
