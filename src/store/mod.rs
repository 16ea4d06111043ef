//! Local persistence
//!
//! Small file-backed stores for state the gateway does not hold: favorites
//! lists keyed by content type, and publish drafts with a debounced
//! autosave layer. Everything is last-write-wins JSON with atomic writes.

pub mod drafts;
pub mod favorites;

pub use drafts::{DraftAutosaver, DraftStore, PublishDraft};
pub use favorites::{ContentType, FavoriteEntry, FavoritesStore};
