//! Snapshot persistence for resuming the feed across runs.

mod snapshot;
mod store;

pub use snapshot::{FeedSnapshot, SnapshotDraft};
pub use store::{RestoreState, SessionStore, Viewport, DEFAULT_SESSION_KEY};
