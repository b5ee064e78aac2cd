use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::view::FeedView;
use super::Location;
use crate::api::{ArticlesApi, Category, FeedItem};
use crate::config::Config;
use crate::feed::{spawn_fetch, FeedController, FeedEvent, FetchOutcome, FetchTicket, FilterState};
use crate::session::{SessionStore, SnapshotDraft, Viewport, DEFAULT_SESSION_KEY};
use crate::storage::SessionStorage;
use crate::util::Debounced;
use crate::visibility::{IntersectionEvent, IntersectionSource, VisibilityTracker};

/// Capacity of the fetch completion channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Tunables, normally taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub page_size: u32,
    pub search_debounce: Duration,
    pub scroll_save_debounce: Duration,
    pub session_key: String,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ReaderOptions {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            search_debounce: config.search_debounce(),
            scroll_save_debounce: config.scroll_save_debounce(),
            session_key: if config.session_key.is_empty() {
                DEFAULT_SESSION_KEY.to_string()
            } else {
                config.session_key.clone()
            },
        }
    }
}

/// Host capabilities the session runs against.
pub struct ReaderDeps<H> {
    pub api: Arc<dyn ArticlesApi>,
    pub storage: Arc<dyn SessionStorage>,
    pub source: Box<dyn IntersectionSource<H> + Send>,
    pub viewport: Box<dyn Viewport>,
    pub location: Box<dyn Location>,
}

/// One mounted reader page.
///
/// Owns all feed state. Fetches run on background tasks and report back
/// through the receiver returned by [`ReaderSession::new`]; the owner feeds
/// each event to [`ReaderSession::handle_event`]. Time-based behavior
/// (search and scroll debouncing) advances only through
/// [`ReaderSession::tick`].
pub struct ReaderSession<H> {
    api: Arc<dyn ArticlesApi>,
    events: mpsc::Sender<FeedEvent>,
    controller: FeedController,
    tracker: VisibilityTracker<H>,
    store: SessionStore,
    viewport: Box<dyn Viewport>,
    location: Box<dyn Location>,

    /// Raw search box contents, updated on every keystroke.
    search_input: String,
    search: Debounced<String>,
    /// Settled search text.
    query: String,
    category: Option<Category>,
    reading_mode: bool,
    /// Filter the current items were fetched (or restored) for.
    last_fetched: Option<FilterState>,
    scroll_save: Debounced<f64>,
}

impl<H> ReaderSession<H> {
    pub fn new(deps: ReaderDeps<H>, options: ReaderOptions) -> (Self, mpsc::Receiver<FeedEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let session = Self {
            api: deps.api,
            events,
            controller: FeedController::new(options.page_size),
            tracker: VisibilityTracker::new(deps.source),
            store: SessionStore::new(deps.storage, options.session_key),
            viewport: deps.viewport,
            location: deps.location,
            search_input: String::new(),
            search: Debounced::new(options.search_debounce),
            query: String::new(),
            category: None,
            reading_mode: false,
            last_fetched: None,
            scroll_save: Debounced::new(options.scroll_save_debounce),
        };
        (session, rx)
    }

    /// Restore the previous session, or start loading the first page.
    ///
    /// A restored snapshot seeds the controller without a request, restores
    /// the search box and category, and schedules the saved scroll offset
    /// for the next frame. A snapshot saved before its first page landed
    /// only restores the filter; the first page is fetched again.
    pub async fn mount(&mut self) {
        let Some(snapshot) = self.store.load().await else {
            tracing::debug!("No session to restore, loading first page");
            self.apply_filter().await;
            return;
        };

        let filter = snapshot.filter();
        let scroll_offset = snapshot.scroll_offset;
        tracing::info!(
            items = snapshot.items.len(),
            query = %filter.query,
            category = ?filter.category,
            scroll_offset,
            "Restoring reader session"
        );

        self.search_input = filter.query.clone();
        self.query = filter.query.clone();
        self.category = filter.category;
        self.last_fetched = Some(filter.clone());
        if let Some(ticket) = self.controller.reset(filter, Some(snapshot.into_feed_state())) {
            self.spawn(ticket);
            self.persist().await;
            return;
        }

        if scroll_offset != 0.0 {
            self.store.restore_scroll(scroll_offset);
        }
    }

    // ========================================================================
    // User input
    // ========================================================================

    /// Record a keystroke in the search box. The query settles on a later tick.
    pub fn set_search_input(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.search_input = text.clone();
        self.search.push(text, now);
    }

    /// Apply search text immediately, skipping the debounce.
    pub async fn submit_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.search.cancel();
        self.search_input = text.clone();
        self.query = text;
        self.apply_filter().await;
    }

    pub async fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
        self.apply_filter().await;
    }

    /// Select `category`, or clear it if it is already selected.
    pub async fn toggle_category(&mut self, category: Category) {
        let next = if self.category == Some(category) {
            None
        } else {
            Some(category)
        };
        self.set_category(next).await;
    }

    /// Flip reading mode and return the new value.
    pub fn toggle_reading_mode(&mut self) -> bool {
        self.reading_mode = !self.reading_mode;
        tracing::debug!(reading_mode = self.reading_mode, "Reading mode toggled");
        self.reading_mode
    }

    /// Record a scroll position. Saved once scrolling has settled.
    pub fn on_scroll(&mut self, offset: f64, now: Instant) {
        self.scroll_save.push(offset, now);
    }

    /// The near-end sentinel entered or left the viewport.
    pub fn on_sentinel(&mut self, visible: bool) {
        if !visible {
            return;
        }
        if let Some(ticket) = self.controller.fetch_more() {
            self.spawn(ticket);
        }
    }

    /// Re-fetch the first page for the current filter.
    pub fn retry(&mut self) {
        let ticket = self.controller.retry();
        tracing::info!(generation = ticket.generation, "Retrying feed");
        self.spawn(ticket);
    }

    // ========================================================================
    // Time and events
    // ========================================================================

    /// Advance debouncers to `now`.
    pub async fn tick(&mut self, now: Instant) {
        if let Some(query) = self.search.poll(now) {
            self.query = query;
            self.apply_filter().await;
        }
        if let Some(offset) = self.scroll_save.poll(now) {
            self.store.save_scroll(offset).await;
        }
    }

    /// Settle any pending debounced input right away, e.g. before exit.
    pub async fn flush(&mut self) {
        if let Some(query) = self.search.flush() {
            self.query = query;
            self.apply_filter().await;
        }
        if let Some(offset) = self.scroll_save.flush() {
            self.store.save_scroll(offset).await;
        }
    }

    /// Apply a fetch completion and persist the result.
    pub async fn handle_event(&mut self, event: FeedEvent) -> FetchOutcome {
        match event {
            FeedEvent::PageLoaded { ticket, result } => {
                let outcome = self.controller.complete(&ticket, result);
                if let FetchOutcome::Applied { .. } = outcome {
                    self.persist().await;
                }
                outcome
            }
        }
    }

    /// Next frame after layout: apply a scheduled scroll restore.
    pub fn on_frame(&mut self) -> bool {
        self.store.apply_pending_scroll(self.viewport.as_mut())
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    /// Register a rendered item, or unregister it with `None`.
    pub fn register_item(&mut self, id: &str, target: Option<H>) {
        self.tracker.register(id, target);
    }

    /// Feed a batch of intersection observations.
    ///
    /// When the active item changes the location is replaced with
    /// `/read/{id}` and the new id is returned.
    pub fn on_intersections(&mut self, events: &[IntersectionEvent]) -> Option<String> {
        let active = self.tracker.observe_batch(events)?;
        self.location.replace(&format!("/read/{}", active));
        Some(active)
    }

    pub fn active_item(&self) -> Option<String> {
        self.tracker.active()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<Option<String>> {
        self.tracker.subscribe()
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn view(&self) -> FeedView {
        FeedView::from_controller(&self.controller)
    }

    pub fn items(&self) -> &[FeedItem] {
        self.controller.items()
    }

    pub fn controller(&self) -> &FeedController {
        &self.controller
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn reading_mode(&self) -> bool {
        self.reading_mode
    }

    /// Write the current snapshot, capturing the viewport's scroll offset.
    pub async fn persist(&self) {
        let draft = SnapshotDraft::new(self.controller.state(), self.controller.filter());
        self.store.save(draft, self.viewport.as_ref()).await;
    }

    /// Forget the stored snapshot.
    pub async fn clear_saved(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::debug!(error = %e, "Failed to clear saved session");
        }
    }

    /// Reset the feed if the settled filter differs from what is loaded.
    async fn apply_filter(&mut self) {
        let filter = FilterState::new(self.query.clone(), self.category);
        if self.last_fetched.as_ref() == Some(&filter) {
            tracing::trace!(query = %filter.query, category = ?filter.category, "Filter unchanged, not refetching");
            return;
        }

        self.last_fetched = Some(filter.clone());
        self.tracker.clear();
        if let Some(ticket) = self.controller.reset(filter, None) {
            self.spawn(ticket);
        }
        self.persist().await;
    }

    fn spawn(&self, ticket: FetchTicket) {
        spawn_fetch(Arc::clone(&self.api), ticket, self.events.clone());
    }
}
