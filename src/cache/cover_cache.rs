//! Cover-URL Result Cache
//!
//! Remembers where a cover/avatar image for a resource can be fetched
//! from, using Moka with a TTL. A gateway answer of "resource does not
//! exist" is stored as a negative marker so absent artwork does not get
//! re-resolved on every render pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, trace};

use crate::gateway::Service;

/// Default TTL for resolved cover URLs (positive and negative)
const DEFAULT_COVER_TTL: Duration = Duration::from_secs(600);

/// Outcome of a cover-image resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoverResolution {
    /// Gateway URL the image can be fetched from
    Url(String),
    /// The publisher has no cover for this resource
    Missing,
}

/// Composite key identifying one logical cover image
///
/// Name and identifier are percent-encoded so a `:` inside either cannot
/// shift the field boundaries.
pub fn cover_key(name: &str, identifier: &str, service: Service) -> String {
    format!(
        "{}:{}:{service}",
        urlencoding::encode(name),
        urlencoding::encode(identifier)
    )
}

/// TTL cache for cover resolutions with hit/miss accounting
pub struct CoverCache {
    entries: Cache<String, CoverResolution>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CoverCache {
    /// Create a cover cache with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_COVER_TTL)
    }

    /// Create a cover cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .time_to_live(ttl)
            .name("cover_url_cache")
            .build();

        Self {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cover resolution from cache
    ///
    /// Returns Some(resolution) if found, None otherwise. A cached
    /// [`CoverResolution::Missing`] is a hit — that is the point of the
    /// negative marker.
    pub fn get(&self, key: &str) -> Option<CoverResolution> {
        match self.entries.get(key) {
            Some(resolution) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Cover cache HIT");
                Some(resolution)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = key, "Cover cache MISS");
                None
            }
        }
    }

    /// Record a resolution (positive or negative) for a cover key
    pub fn insert(&self, key: String, resolution: CoverResolution) {
        let negative = matches!(resolution, CoverResolution::Missing);
        debug!(key = %key, negative = negative, "Cached cover resolution");
        self.entries.insert(key, resolution);
    }

    /// Invalidate one cover entry (e.g. after the publisher updates art)
    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(key);
        debug!(key = key, "Invalidated cover cache entry");
    }

    /// Clear all entries and reset counters
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Cleared cover cache");
    }

    /// Get cache statistics
    ///
    /// Returns (hits, misses, hit_rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }
}

impl Default for CoverCache {
    fn default() -> Self {
        Self::new()
    }
}
