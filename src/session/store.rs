use std::sync::Arc;

use super::snapshot::{FeedSnapshot, SnapshotDraft};
use crate::storage::{SessionStorage, StorageError};

/// Default storage key for the reader snapshot.
pub const DEFAULT_SESSION_KEY: &str = "article-reader-state";

/// The scrollable surface the feed is rendered into.
pub trait Viewport: Send {
    fn scroll_offset(&self) -> f64;
    fn scroll_to(&mut self, offset: f64);
}

/// Restoration lifecycle. Only the first `load` may return a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    NotAttempted,
    /// The first load returned a snapshot.
    Restored,
    /// The first load found nothing usable.
    Exhausted,
}

/// Best-effort persistence of the feed snapshot.
///
/// Nothing here ever fails the caller: unreadable or unwritable storage
/// degrades to starting fresh.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    key: String,
    restore: RestoreState,
    pending_scroll: Option<f64>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            restore: RestoreState::NotAttempted,
            pending_scroll: None,
        }
    }

    pub fn restore_state(&self) -> RestoreState {
        self.restore
    }

    /// Return the saved snapshot, at most once.
    ///
    /// Later calls return `None` so a remount cannot clobber fresh state
    /// with the old snapshot.
    pub async fn load(&mut self) -> Option<FeedSnapshot> {
        if self.restore != RestoreState::NotAttempted {
            tracing::debug!(state = ?self.restore, "Session restore already attempted");
            return None;
        }

        let snapshot = self.read().await;
        self.restore = if snapshot.is_some() {
            RestoreState::Restored
        } else {
            RestoreState::Exhausted
        };
        snapshot
    }

    async fn read(&self) -> Option<FeedSnapshot> {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "Session storage read failed");
                return None;
            }
        };

        match serde_json::from_str::<FeedSnapshot>(&raw) {
            Ok(snapshot) => {
                tracing::debug!(
                    items = snapshot.items.len(),
                    scroll = snapshot.scroll_offset,
                    "Loaded session snapshot"
                );
                Some(snapshot)
            }
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "Discarding unreadable session snapshot");
                None
            }
        }
    }

    /// Capture the viewport's scroll offset and write the full snapshot.
    pub async fn save(&self, draft: SnapshotDraft, viewport: &dyn Viewport) {
        let snapshot = draft.with_scroll(viewport.scroll_offset());
        if let Err(e) = self.write(&snapshot).await {
            tracing::debug!(key = %self.key, error = %e, "Session snapshot not saved");
        }
    }

    async fn write(&self, snapshot: &FeedSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot)?;
        self.storage.set(&self.key, &json).await
    }

    /// Rewrite only the scroll offset of the stored snapshot.
    ///
    /// Does nothing when no snapshot has been saved yet.
    pub async fn save_scroll(&self, offset: f64) {
        let Some(mut snapshot) = self.read().await else {
            return;
        };
        snapshot.scroll_offset = offset;
        if let Err(e) = self.write(&snapshot).await {
            tracing::debug!(key = %self.key, error = %e, "Scroll offset not saved");
        }
    }

    /// Schedule a jump to `offset` on the next frame, once content is laid out.
    pub fn restore_scroll(&mut self, offset: f64) {
        self.pending_scroll = Some(offset);
    }

    pub fn take_pending_scroll(&mut self) -> Option<f64> {
        self.pending_scroll.take()
    }

    /// Apply a scheduled scroll jump. Returns whether one was pending.
    pub fn apply_pending_scroll(&mut self, viewport: &mut dyn Viewport) -> bool {
        match self.take_pending_scroll() {
            Some(offset) => {
                tracing::debug!(offset, "Restoring scroll position");
                viewport.scroll_to(offset);
                true
            }
            None => false,
        }
    }

    /// Forget the stored snapshot.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key).await
    }
}
