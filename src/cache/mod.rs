//! Caching layer
//!
//! Two caches with different jobs: [`SearchCache`] collapses concurrent
//! identical gateway calls into a single flight and holds results for a
//! TTL; [`CoverCache`] remembers resolved cover-image URLs, including
//! negative "missing" answers, so absent thumbnails are not re-fetched on
//! every render.

pub mod cover_cache;
pub mod search_cache;

pub use cover_cache::{cover_key, CoverCache, CoverResolution};
pub use search_cache::SearchCache;
