//! Publish Draft Store
//!
//! Key-value persistence for in-progress publish forms, one JSON file per
//! draft id, plus a debounce layer that autosaves the latest edit after a
//! quiet period. Everything is last-write-wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gateway::Service;

/// Default quiet period before an edited draft is flushed to disk
const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(3);

/// An in-progress publish form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishDraft {
    pub id: String,
    pub service: Service,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Last-edit timestamp in milliseconds since epoch
    #[serde(default)]
    pub updated_at: u64,
}

/// File-backed draft store, one JSON file per draft id
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("qdn-media-client")
            .join("drafts");
        Self::open(dir)
    }

    /// Open (or create) a draft store rooted at `dir`
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create draft directory: {:?}", dir))?;
        info!(dir = %dir.display(), "Draft store opened");
        Ok(Self { dir })
    }

    /// Write a draft atomically, replacing any previous version
    pub fn put(&self, draft: &PublishDraft) -> Result<()> {
        let path = self.path_for(&draft.id);
        let data = serde_json::to_vec_pretty(draft).context("Failed to serialize draft")?;

        let parent = path.parent().unwrap_or(Path::new("/tmp"));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .context("Failed to create temp file for draft")?;
        tmp.write_all(&data).context("Failed to write draft")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist draft file: {:?}", path))?;

        debug!(id = %draft.id, "Persisted draft");
        Ok(())
    }

    /// Read a draft by id
    pub fn get(&self, id: &str) -> Result<Option<PublishDraft>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let data =
            fs::read(&path).with_context(|| format!("Failed to read draft file: {:?}", path))?;
        let draft = serde_json::from_slice(&data)
            .with_context(|| format!("Malformed draft file: {:?}", path))?;
        Ok(Some(draft))
    }

    /// Delete a draft; returns whether it existed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete draft file: {:?}", path))?;
        debug!(id = id, "Deleted draft");
        Ok(true)
    }

    /// Draft ids are arbitrary strings; encode them into safe file names
    fn path_for(&self, id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", urlencoding::encode(id)))
    }
}

struct AutosaveState {
    latest: Option<PublishDraft>,
    timer: Option<JoinHandle<()>>,
}

struct AutosaverInner {
    store: DraftStore,
    quiet_period: Duration,
    state: Mutex<AutosaveState>,
}

impl AutosaverInner {
    fn flush(&self) -> Result<()> {
        let draft = {
            let mut state = self.state.lock().unwrap();
            state.timer = None;
            state.latest.take()
        };
        if let Some(draft) = draft {
            self.store.put(&draft)?;
        }
        Ok(())
    }
}

/// Debounced autosave over a [`DraftStore`]
///
/// `record` keeps only the newest version of the draft and (re)arms a
/// quiet-period timer; the draft hits disk once editing pauses. Rapid
/// edits coalesce into a single write.
pub struct DraftAutosaver {
    inner: Arc<AutosaverInner>,
}

impl DraftAutosaver {
    /// Wrap a draft store with the default quiet period
    pub fn new(store: DraftStore) -> Self {
        Self::with_quiet_period(store, DEFAULT_QUIET_PERIOD)
    }

    /// Wrap a draft store with a custom quiet period
    ///
    /// Must be created and used within a Tokio runtime; the flush timer is
    /// a spawned task.
    pub fn with_quiet_period(store: DraftStore, quiet_period: Duration) -> Self {
        Self {
            inner: Arc::new(AutosaverInner {
                store,
                quiet_period,
                state: Mutex::new(AutosaveState {
                    latest: None,
                    timer: None,
                }),
            }),
        }
    }

    /// Record an edit; the draft is flushed after the quiet period unless
    /// superseded by a newer edit first
    pub fn record(&self, draft: PublishDraft) {
        let mut state = self.inner.state.lock().unwrap();
        state.latest = Some(draft);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let inner = Arc::clone(&self.inner);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.quiet_period).await;
            if let Err(err) = inner.flush() {
                warn!(error = %err, "Draft autosave failed");
            }
        }));
    }

    /// Flush the pending edit immediately (e.g. before navigating away)
    pub fn flush_now(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().unwrap();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }
        self.inner.flush()
    }

    /// Whether an edit is waiting to be flushed
    pub fn has_pending(&self) -> bool {
        self.inner.state.lock().unwrap().latest.is_some()
    }

    pub fn store(&self) -> &DraftStore {
        &self.inner.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str, title: &str) -> PublishDraft {
        PublishDraft {
            id: id.to_string(),
            service: Service::Audio,
            title: title.to_string(),
            description: String::new(),
            tags: vec![],
            updated_at: 0,
        }
    }

    #[test]
    fn test_put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::open(dir.path().to_path_buf()).unwrap();

        assert!(store.get("d1").unwrap().is_none());

        let d = draft("d1", "My Song");
        store.put(&d).unwrap();
        assert_eq!(store.get("d1").unwrap(), Some(d));

        assert!(store.delete("d1").unwrap());
        assert!(store.get("d1").unwrap().is_none());
        assert!(!store.delete("d1").unwrap());
    }

    #[test]
    fn test_awkward_ids_get_safe_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::open(dir.path().to_path_buf()).unwrap();

        let d = draft("alice/song: #1", "Slashes and colons");
        store.put(&d).unwrap();
        assert_eq!(store.get("alice/song: #1").unwrap(), Some(d));
    }

    #[tokio::test]
    async fn test_autosave_flushes_after_quiet_period() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::open(dir.path().to_path_buf()).unwrap();
        let saver = DraftAutosaver::with_quiet_period(store, Duration::from_millis(30));

        saver.record(draft("d1", "v1"));
        assert!(saver.has_pending());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!saver.has_pending());
        assert_eq!(
            saver.store().get("d1").unwrap().map(|d| d.title),
            Some("v1".to_string())
        );
    }

    #[tokio::test]
    async fn test_rapid_edits_coalesce_to_last_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::open(dir.path().to_path_buf()).unwrap();
        let saver = DraftAutosaver::with_quiet_period(store, Duration::from_millis(200));

        saver.record(draft("d1", "v1"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        saver.record(draft("d1", "v2"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        saver.record(draft("d1", "v3"));

        // First timers were superseded; nothing on disk yet
        assert!(saver.store().get("d1").unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(
            saver.store().get("d1").unwrap().map(|d| d.title),
            Some("v3".to_string())
        );
    }

    #[tokio::test]
    async fn test_flush_now_skips_the_wait() {
        let dir = tempfile::tempdir().unwrap();
        let store = DraftStore::open(dir.path().to_path_buf()).unwrap();
        let saver = DraftAutosaver::with_quiet_period(store, Duration::from_secs(60));

        saver.record(draft("d1", "v1"));
        saver.flush_now().unwrap();

        assert!(!saver.has_pending());
        assert_eq!(
            saver.store().get("d1").unwrap().map(|d| d.title),
            Some("v1".to_string())
        );
    }
}
