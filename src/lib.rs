//! qdn-media-client
//!
//! Client-side resource resolution and caching layer for media apps built
//! on a decentralized content network (QDN). Sits between UI code and the
//! gateway node, providing:
//!
//! - a request-deduplicating, TTL-based cache for search/list calls
//!   (single-flight: concurrent identical requests share one call),
//! - a strictly sequential, key-deduplicating fetch queue for cover and
//!   avatar resolution,
//! - a cover-URL cache that remembers negative "does not exist" answers,
//! - file-backed favorites and publish-draft stores with debounced
//!   autosave,
//! - a deadline/cancellation helper for time-bounded gateway calls.
//!
//! All state is owned by [`ResourceClient`] (or the individual stores),
//! created once at application start — nothing lives in module globals.
//!
//! ```no_run
//! use qdn_media_client::{ClientConfig, ResourceClient, SearchParams, Service};
//!
//! # async fn run() -> Result<(), qdn_media_client::GatewayError> {
//! let client = ResourceClient::new(ClientConfig::default())?;
//! let latest = client.search(SearchParams::latest(Service::Audio, 20)).await?;
//! for resource in latest {
//!     client.request_cover(&resource.name, resource.identifier.as_deref().unwrap_or(""), Service::Thumbnail);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod deadline;
pub mod gateway;
pub mod queue;
pub mod store;

pub use cache::{cover_key, CoverCache, CoverResolution, SearchCache};
pub use client::{ClientConfig, CoverRequest, ResourceClient};
pub use deadline::{with_deadline, DeadlineExceeded, DeadlineToken};
pub use gateway::{
    FetchOutcome, GatewayAction, GatewayError, GatewayTransport, HttpGateway, PublishRequest,
    ResourceInfo, ResourceMetadata, ResourceStatus, SearchMode, SearchParams, Service,
};
pub use queue::{FetchQueue, TaskHandle};
pub use store::{
    ContentType, DraftAutosaver, DraftStore, FavoriteEntry, FavoritesStore, PublishDraft,
};
