//! In-process implementations of the host capabilities, used by the CLI and
//! by tests. Each is cheaply cloneable so the caller can keep a handle after
//! moving one into a [`super::ReaderSession`].

use std::sync::{Arc, Mutex, MutexGuard};

use super::Location;
use crate::session::Viewport;
use crate::visibility::IntersectionSource;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A viewport that is just a shared scroll offset.
#[derive(Debug, Clone, Default)]
pub struct HeadlessViewport {
    offset: Arc<Mutex<f64>>,
}

impl HeadlessViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the user scrolling.
    pub fn set(&self, offset: f64) {
        *lock(&self.offset) = offset;
    }

    pub fn offset(&self) -> f64 {
        *lock(&self.offset)
    }
}

impl Viewport for HeadlessViewport {
    fn scroll_offset(&self) -> f64 {
        self.offset()
    }

    fn scroll_to(&mut self, offset: f64) {
        self.set(offset);
    }
}

/// Records every location replacement.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    history: Arc<Mutex<Vec<String>>>,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        lock(&self.history).last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }
}

impl Location for MemoryLocation {
    fn replace(&mut self, path: &str) {
        lock(&self.history).push(path.to_string());
    }
}

/// Remembers which ids are currently observed.
///
/// Without a real viewport there is nothing to observe; intersection events
/// are fed to the session by the host directly.
#[derive(Debug, Clone, Default)]
pub struct ObservedIds {
    ids: Arc<Mutex<Vec<String>>>,
}

impl ObservedIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> Vec<String> {
        lock(&self.ids).clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.ids).iter().any(|observed| observed == id)
    }
}

impl<H> IntersectionSource<H> for ObservedIds {
    fn observe(&mut self, id: &str, _target: &H, _thresholds: &[f64]) {
        lock(&self.ids).push(id.to_string());
    }

    fn unobserve(&mut self, id: &str, _target: &H) {
        lock(&self.ids).retain(|observed| observed != id);
    }
}
