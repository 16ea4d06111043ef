//! Favorites Store
//!
//! Per-content-type favorites lists persisted as JSON files under a store
//! directory. Lists are loaded once on open and written back atomically on
//! every mutation; last write wins.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::gateway::Service;

/// Content type a favorites list is kept for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Songs,
    Albums,
    Playlists,
    Podcasts,
    Audiobooks,
    Videos,
}

impl ContentType {
    /// All content types, for load/enumeration
    pub fn all() -> [ContentType; 6] {
        [
            ContentType::Songs,
            ContentType::Albums,
            ContentType::Playlists,
            ContentType::Podcasts,
            ContentType::Audiobooks,
            ContentType::Videos,
        ]
    }

    fn file_name(self) -> &'static str {
        match self {
            ContentType::Songs => "favorites_songs.json",
            ContentType::Albums => "favorites_albums.json",
            ContentType::Playlists => "favorites_playlists.json",
            ContentType::Podcasts => "favorites_podcasts.json",
            ContentType::Audiobooks => "favorites_audiobooks.json",
            ContentType::Videos => "favorites_videos.json",
        }
    }
}

/// One favorited resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    /// Publisher name
    pub name: String,
    pub identifier: String,
    pub service: Service,
    #[serde(default)]
    pub title: Option<String>,
}

impl FavoriteEntry {
    fn matches(&self, name: &str, identifier: &str) -> bool {
        self.name == name && self.identifier == identifier
    }
}

/// File-backed favorites lists keyed by content type
pub struct FavoritesStore {
    dir: PathBuf,
    lists: Mutex<HashMap<ContentType, Vec<FavoriteEntry>>>,
}

impl FavoritesStore {
    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("qdn-media-client");
        Self::open(dir)
    }

    /// Open (or create) a favorites store rooted at `dir`
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory: {:?}", dir))?;

        let mut lists = HashMap::new();
        for content_type in ContentType::all() {
            let path = dir.join(content_type.file_name());
            let entries = load_list(&path)?;
            if !entries.is_empty() {
                debug!(
                    content_type = ?content_type,
                    count = entries.len(),
                    "Loaded favorites list"
                );
            }
            lists.insert(content_type, entries);
        }

        info!(dir = %dir.display(), "Favorites store opened");
        Ok(Self {
            dir,
            lists: Mutex::new(lists),
        })
    }

    /// Add an entry to a list; re-adding an existing favorite replaces it
    pub fn add(&self, content_type: ContentType, entry: FavoriteEntry) -> Result<()> {
        let snapshot = {
            let mut lists = self.lists.lock().unwrap();
            let list = lists.entry(content_type).or_default();
            list.retain(|e| !e.matches(&entry.name, &entry.identifier));
            list.push(entry);
            list.clone()
        };
        self.persist(content_type, &snapshot)
    }

    /// Remove an entry; returns whether it was present
    pub fn remove(&self, content_type: ContentType, name: &str, identifier: &str) -> Result<bool> {
        let (removed, snapshot) = {
            let mut lists = self.lists.lock().unwrap();
            let list = lists.entry(content_type).or_default();
            let before = list.len();
            list.retain(|e| !e.matches(name, identifier));
            (list.len() != before, list.clone())
        };
        if removed {
            self.persist(content_type, &snapshot)?;
        }
        Ok(removed)
    }

    pub fn contains(&self, content_type: ContentType, name: &str, identifier: &str) -> bool {
        self.lists
            .lock()
            .unwrap()
            .get(&content_type)
            .is_some_and(|list| list.iter().any(|e| e.matches(name, identifier)))
    }

    /// Snapshot of one list, in insertion order
    pub fn list(&self, content_type: ContentType) -> Vec<FavoriteEntry> {
        self.lists
            .lock()
            .unwrap()
            .get(&content_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Write one list to disk atomically
    fn persist(&self, content_type: ContentType, entries: &[FavoriteEntry]) -> Result<()> {
        let path = self.dir.join(content_type.file_name());
        let data = serde_json::to_vec_pretty(entries).context("Failed to serialize favorites")?;

        let parent = path.parent().unwrap_or(Path::new("/tmp"));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .context("Failed to create temp file for favorites")?;
        tmp.write_all(&data).context("Failed to write favorites")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist favorites file: {:?}", path))?;

        debug!(
            content_type = ?content_type,
            count = entries.len(),
            "Persisted favorites list"
        );
        Ok(())
    }
}

fn load_list(path: &Path) -> Result<Vec<FavoriteEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data =
        fs::read(path).with_context(|| format!("Failed to read favorites file: {:?}", path))?;
    match serde_json::from_slice(&data) {
        Ok(entries) => Ok(entries),
        Err(err) => {
            // A corrupt list is dropped rather than blocking the store
            warn!(path = %path.display(), error = %err, "Discarding unreadable favorites file");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, identifier: &str) -> FavoriteEntry {
        FavoriteEntry {
            name: name.to_string(),
            identifier: identifier.to_string(),
            service: Service::Audio,
            title: Some(format!("{identifier} by {name}")),
        }
    }

    #[test]
    fn test_add_remove_contains() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::open(dir.path().to_path_buf()).unwrap();

        store.add(ContentType::Songs, entry("alice", "song1")).unwrap();
        assert!(store.contains(ContentType::Songs, "alice", "song1"));
        assert!(!store.contains(ContentType::Albums, "alice", "song1"));

        assert!(store.remove(ContentType::Songs, "alice", "song1").unwrap());
        assert!(!store.contains(ContentType::Songs, "alice", "song1"));
        assert!(!store.remove(ContentType::Songs, "alice", "song1").unwrap());
    }

    #[test]
    fn test_re_add_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::open(dir.path().to_path_buf()).unwrap();

        store.add(ContentType::Songs, entry("alice", "song1")).unwrap();
        let mut updated = entry("alice", "song1");
        updated.title = Some("Renamed".to_string());
        store.add(ContentType::Songs, updated).unwrap();

        let list = store.list(ContentType::Songs);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title.as_deref(), Some("Renamed"));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FavoritesStore::open(dir.path().to_path_buf()).unwrap();
            store.add(ContentType::Songs, entry("alice", "song1")).unwrap();
            store.add(ContentType::Podcasts, entry("bob", "ep1")).unwrap();
        }

        let store = FavoritesStore::open(dir.path().to_path_buf()).unwrap();
        assert!(store.contains(ContentType::Songs, "alice", "song1"));
        assert!(store.contains(ContentType::Podcasts, "bob", "ep1"));
        assert!(store.list(ContentType::Albums).is_empty());
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("favorites_songs.json"), b"not json").unwrap();

        let store = FavoritesStore::open(dir.path().to_path_buf()).unwrap();
        assert!(store.list(ContentType::Songs).is_empty());

        // Store remains writable after discarding the corrupt list
        store.add(ContentType::Songs, entry("alice", "song1")).unwrap();
        assert!(store.contains(ContentType::Songs, "alice", "song1"));
    }
}
