use std::collections::HashSet;

use super::filter::{apply_post_filter, FilterState};
use crate::api::{ApiError, Category, FeedItem, Page, PageRequest};

/// Number of items requested per page unless configured otherwise.
pub const PAGE_SIZE: u32 = 10;

/// Fetch generation counter.
///
/// Incremented for every logical fetch (reset or continuation). A landed
/// response may only mutate state when its generation still matches.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Replaces the item list (initial load, reset, retry).
    FirstPage,
    /// Appends to the item list using the stored cursor.
    Continuation,
}

/// A fetch the controller wants performed.
///
/// Carries everything needed to run the request and to apply its result
/// later: the generation it was issued under and the client-side category
/// filter in force at that time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: Generation,
    pub kind: FetchKind,
    pub request: PageRequest,
    pub post_filter: Option<Category>,
}

/// A failed fetch as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    pub kind: FetchKind,
    pub message: String,
}

impl FeedError {
    /// First-page failures block the feed and get a retry control.
    /// Continuation failures are shown inline and keep loaded pages.
    pub fn is_fatal(&self) -> bool {
        self.kind == FetchKind::FirstPage
    }
}

/// What happened when a landed response was handed to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { kind: FetchKind, added: usize },
    Failed(FeedError),
    /// Superseded by a newer fetch; dropped without touching state.
    Stale,
}

/// Accumulated pagination state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    /// Every item fetched since the last reset, in server order.
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: true,
        }
    }
}

impl FeedState {
    /// No first page has landed yet: nothing loaded, nothing to continue
    /// from, and the feed not known to be exhausted.
    pub fn is_unfetched(&self) -> bool {
        self.items.is_empty() && self.next_cursor.is_none() && self.has_more
    }
}

/// Race-safe cursor pagination over the Articles API.
///
/// The controller never performs I/O itself. It issues [`FetchTicket`]s,
/// which the caller runs (see [`super::spawn_fetch`]), and applies their
/// results through [`FeedController::complete`]. Ordering between
/// overlapping fetches is decided solely by the generation counter: network
/// requests are never aborted, their late results are simply ignored.
#[derive(Debug)]
pub struct FeedController {
    filter: FilterState,
    state: FeedState,
    generation: Generation,
    /// Kind of the fetch currently in flight, if any.
    in_flight: Option<FetchKind>,
    error: Option<FeedError>,
    page_size: u32,
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl FeedController {
    pub fn new(page_size: u32) -> Self {
        Self {
            filter: FilterState::default(),
            state: FeedState::default(),
            generation: 0,
            in_flight: None,
            error: None,
            page_size: page_size.max(1),
        }
    }

    /// Switch to `filter`, abandoning anything in flight.
    ///
    /// Without a seed the item list is cleared and a first-page ticket is
    /// returned. With a seed (session restore) the restored pages are adopted
    /// as the result of that first-page fetch and no request is issued:
    /// fetching again would replace the restored pages with page one.
    /// A seed saved before any page landed carries nothing to adopt and is
    /// treated as no seed.
    pub fn reset(&mut self, filter: FilterState, seed: Option<FeedState>) -> Option<FetchTicket> {
        self.filter = filter;
        self.error = None;

        let seed = seed.filter(|seed| {
            let unfetched = seed.is_unfetched();
            if unfetched {
                tracing::debug!("Restored feed never received a page, fetching first page");
            }
            !unfetched
        });

        match seed {
            Some(seed) => {
                self.generation += 1;
                self.in_flight = None;
                tracing::debug!(
                    generation = self.generation,
                    items = seed.items.len(),
                    has_more = seed.has_more,
                    "Seeded feed from restored snapshot"
                );
                self.state = seed;
                None
            }
            None => {
                self.state = FeedState::default();
                Some(self.issue(FetchKind::FirstPage, None))
            }
        }
    }

    /// Request the next page.
    ///
    /// Returns `None` while any fetch is in flight, once the feed is
    /// exhausted, or when there is no cursor to continue from.
    pub fn fetch_more(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            tracing::trace!("fetch_more ignored, fetch already in flight");
            return None;
        }
        if !self.state.has_more {
            return None;
        }
        let cursor = self.state.next_cursor.clone()?;
        Some(self.issue(FetchKind::Continuation, Some(cursor)))
    }

    /// Re-issue a first-page fetch for the current filter.
    ///
    /// Loaded items stay visible until the new first page replaces them, and
    /// the previous error stays until the retry resolves.
    pub fn retry(&mut self) -> FetchTicket {
        self.issue(FetchKind::FirstPage, None)
    }

    fn issue(&mut self, kind: FetchKind, cursor: Option<String>) -> FetchTicket {
        self.generation += 1;
        self.in_flight = Some(kind);
        FetchTicket {
            generation: self.generation,
            kind,
            request: PageRequest {
                cursor,
                limit: self.page_size,
                q: self.filter.api_query(),
            },
            post_filter: self.filter.post_filter(),
        }
    }

    /// Apply a landed response.
    pub fn complete(&mut self, ticket: &FetchTicket, result: Result<Page, ApiError>) -> FetchOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                expected = self.generation,
                got = ticket.generation,
                kind = ?ticket.kind,
                "Ignoring stale feed response (generation mismatch)"
            );
            return FetchOutcome::Stale;
        }

        self.in_flight = None;

        match result {
            Ok(page) => {
                let page = page.normalized();
                let items = match ticket.post_filter {
                    Some(category) => apply_post_filter(page.items, category),
                    None => page.items,
                };
                let added = match ticket.kind {
                    FetchKind::FirstPage => {
                        let added = items.len();
                        self.state.items = items;
                        added
                    }
                    FetchKind::Continuation => self.append(items),
                };
                self.state.next_cursor = page.next_cursor;
                self.state.has_more = page.has_more;
                self.error = None;
                tracing::debug!(
                    generation = ticket.generation,
                    kind = ?ticket.kind,
                    added,
                    total = self.state.items.len(),
                    has_more = self.state.has_more,
                    "Feed page applied"
                );
                FetchOutcome::Applied {
                    kind: ticket.kind,
                    added,
                }
            }
            Err(e) => {
                let error = FeedError {
                    kind: ticket.kind,
                    message: e.to_string(),
                };
                tracing::warn!(
                    generation = ticket.generation,
                    kind = ?ticket.kind,
                    error = %e,
                    "Feed fetch failed"
                );
                self.error = Some(error.clone());
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Append a continuation page, skipping ids that are already loaded.
    fn append(&mut self, items: Vec<FeedItem>) -> usize {
        let mut seen: HashSet<String> = self.state.items.iter().map(|i| i.id.clone()).collect();
        let before = self.state.items.len();
        for item in items {
            if seen.insert(item.id.clone()) {
                self.state.items.push(item);
            } else {
                tracing::debug!(id = %item.id, "Dropping duplicate item from continuation page");
            }
        }
        self.state.items.len() - before
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.state.items
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.state.next_cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<FetchKind> {
        self.in_flight
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn item(id: &str, title: &str) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            title: title.to_string(),
            dek: String::new(),
            author: "Staff".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            reading_time_mins: 4,
            image_url: String::new(),
            content_html: String::new(),
        }
    }

    fn page(ids: std::ops::Range<usize>, cursor: Option<&str>, has_more: bool) -> Page {
        Page {
            items: ids
                .map(|i| item(&format!("a{}", i), &format!("Article {}", i)))
                .collect(),
            next_cursor: cursor.map(str::to_string),
            has_more,
        }
    }

    fn ids(controller: &FeedController) -> Vec<String> {
        controller.items().iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_reset_issues_first_page_ticket() {
        let mut controller = FeedController::default();
        let ticket = controller
            .reset(FilterState::new("rust", None), None)
            .unwrap();

        assert_eq!(ticket.kind, FetchKind::FirstPage);
        assert_eq!(ticket.request.cursor, None);
        assert_eq!(ticket.request.limit, PAGE_SIZE);
        assert_eq!(ticket.request.q.as_deref(), Some("rust"));
        assert!(controller.is_loading());
        assert!(controller.has_more());
    }

    #[test]
    fn test_pagination_end_to_end() {
        let mut controller = FeedController::default();
        let first = controller.reset(FilterState::default(), None).unwrap();
        controller.complete(&first, Ok(page(0..10, Some("c1"), true)));
        assert_eq!(controller.items().len(), 10);

        let more = controller.fetch_more().unwrap();
        assert_eq!(more.request.cursor.as_deref(), Some("c1"));
        let outcome = controller.complete(&more, Ok(page(10..15, None, false)));
        assert_eq!(
            outcome,
            FetchOutcome::Applied {
                kind: FetchKind::Continuation,
                added: 5
            }
        );

        let expected: Vec<String> = (0..15).map(|i| format!("a{}", i)).collect();
        assert_eq!(ids(&controller), expected);
        assert!(!controller.has_more());
        assert_eq!(controller.fetch_more(), None);
        assert_eq!(controller.fetch_more(), None);
    }

    #[test]
    fn test_fetch_more_while_in_flight_is_noop() {
        let mut controller = FeedController::default();
        let first = controller.reset(FilterState::default(), None).unwrap();
        controller.complete(&first, Ok(page(0..10, Some("c1"), true)));

        let generation_before = controller.generation();
        let more = controller.fetch_more().unwrap();
        assert_eq!(controller.fetch_more(), None);
        assert_eq!(controller.generation(), generation_before + 1);
        assert_eq!(controller.items().len(), 10);

        controller.complete(&more, Ok(page(10..12, Some("c2"), true)));
        assert_eq!(controller.items().len(), 12);
    }

    #[test]
    fn test_fetch_more_without_cursor_is_noop() {
        let mut controller = FeedController::default();
        assert_eq!(controller.fetch_more(), None);

        let first = controller.reset(FilterState::default(), None).unwrap();
        controller.complete(&first, Ok(page(0..3, None, true)));
        assert_eq!(controller.fetch_more(), None);
    }

    #[test]
    fn test_reset_discards_inflight_continuation() {
        let mut controller = FeedController::default();
        let first = controller.reset(FilterState::default(), None).unwrap();
        controller.complete(&first, Ok(page(0..10, Some("c1"), true)));
        let more = controller.fetch_more().unwrap();

        let fresh = controller
            .reset(FilterState::new("", Some(Category::Science)), None)
            .unwrap();
        assert!(controller.items().is_empty());

        assert_eq!(
            controller.complete(&more, Ok(page(10..15, Some("c2"), true))),
            FetchOutcome::Stale
        );
        assert!(controller.items().is_empty());
        assert!(controller.is_loading(), "stale response must not clear loading");

        controller.complete(&fresh, Ok(page(100..102, None, false)));
        assert_eq!(ids(&controller), vec!["a100", "a101"]);
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_combined_filter_post_filters_titles() {
        let mut controller = FeedController::default();
        let ticket = controller
            .reset(FilterState::new("a", Some(Category::Science)), None)
            .unwrap();
        assert_eq!(ticket.request.q.as_deref(), Some("a"));

        let response = Page {
            items: vec![
                item("1", "A new science of sleep"),
                item("2", "A market update"),
                item("3", "Data SCIENCE at scale"),
            ],
            next_cursor: Some("c1".to_string()),
            has_more: true,
        };
        controller.complete(&ticket, Ok(response));
        assert_eq!(ids(&controller), vec!["1", "3"]);

        let more = controller.fetch_more().unwrap();
        assert_eq!(more.kind, FetchKind::Continuation);
        assert_eq!(more.request.q.as_deref(), Some("a"));
        assert_eq!(more.post_filter, Some(Category::Science));

        let response = Page {
            items: vec![
                item("4", "A science fair"),
                item("5", "A quiet weekend"),
                item("6", "Rocket Science"),
            ],
            next_cursor: None,
            has_more: false,
        };
        assert_eq!(
            controller.complete(&more, Ok(response)),
            FetchOutcome::Applied {
                kind: FetchKind::Continuation,
                added: 2
            }
        );
        assert_eq!(ids(&controller), vec!["1", "3", "4", "6"]);
    }

    #[test]
    fn test_unfetched_seed_issues_first_page() {
        let mut controller = FeedController::default();
        let ticket = controller
            .reset(FilterState::new("rust", None), Some(FeedState::default()))
            .unwrap();
        assert_eq!(ticket.kind, FetchKind::FirstPage);
        assert_eq!(ticket.request.q.as_deref(), Some("rust"));
        assert_eq!(controller.in_flight(), Some(FetchKind::FirstPage));

        // An empty but finished result is a real answer and is adopted.
        let exhausted = FeedState {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        };
        assert_eq!(controller.reset(FilterState::default(), Some(exhausted)), None);
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_in_flight_reports_fetch_kind() {
        let mut controller = FeedController::default();
        let first = controller.reset(FilterState::default(), None).unwrap();
        controller.complete(&first, Ok(page(0..10, Some("c1"), true)));
        assert_eq!(controller.in_flight(), None);

        let more = controller.fetch_more().unwrap();
        assert_eq!(controller.in_flight(), Some(FetchKind::Continuation));
        controller.complete(&more, Ok(page(10..12, Some("c2"), true)));

        controller.retry();
        assert_eq!(controller.in_flight(), Some(FetchKind::FirstPage));
    }

    #[test]
    fn test_first_page_failure_is_fatal_and_retry_recovers() {
        let mut controller = FeedController::default();
        let ticket = controller.reset(FilterState::default(), None).unwrap();
        let outcome = controller.complete(&ticket, Err(ApiError::HttpStatus(503)));

        let error = controller.error().unwrap().clone();
        assert!(error.is_fatal());
        assert_eq!(outcome, FetchOutcome::Failed(error));
        assert!(!controller.is_loading());

        let retry = controller.retry();
        assert_eq!(retry.kind, FetchKind::FirstPage);
        assert!(controller.error().is_some(), "error persists until retry resolves");

        controller.complete(&retry, Ok(page(0..2, None, false)));
        assert!(controller.error().is_none());
        assert_eq!(controller.items().len(), 2);
    }

    #[test]
    fn test_continuation_failure_keeps_loaded_items() {
        let mut controller = FeedController::default();
        let first = controller.reset(FilterState::default(), None).unwrap();
        controller.complete(&first, Ok(page(0..10, Some("c1"), true)));

        let more = controller.fetch_more().unwrap();
        controller.complete(&more, Err(ApiError::Timeout));

        assert_eq!(controller.items().len(), 10);
        assert!(!controller.error().unwrap().is_fatal());
        assert_eq!(controller.next_cursor(), Some("c1"));

        let again = controller.fetch_more().unwrap();
        assert_eq!(again.request.cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn test_stale_failure_is_silent() {
        let mut controller = FeedController::default();
        let old = controller.reset(FilterState::new("old", None), None).unwrap();
        let _new = controller.reset(FilterState::new("new", None), None).unwrap();

        assert_eq!(
            controller.complete(&old, Err(ApiError::Timeout)),
            FetchOutcome::Stale
        );
        assert!(controller.error().is_none());
    }

    #[test]
    fn test_seeded_reset_adopts_state_without_fetching() {
        let mut controller = FeedController::default();
        let inflight = controller.reset(FilterState::default(), None).unwrap();

        let seed = FeedState {
            items: vec![item("s1", "Saved"), item("s2", "Saved too")],
            next_cursor: Some("c9".to_string()),
            has_more: true,
        };
        let ticket = controller.reset(FilterState::new("q", None), Some(seed.clone()));

        assert_eq!(ticket, None);
        assert_eq!(controller.state(), &seed);
        assert!(!controller.is_loading());
        assert_eq!(controller.complete(&inflight, Ok(page(0..3, None, false))), FetchOutcome::Stale);

        let more = controller.fetch_more().unwrap();
        assert_eq!(more.request.cursor.as_deref(), Some("c9"));
        assert_eq!(more.request.q.as_deref(), Some("q"));
    }

    #[test]
    fn test_duplicate_ids_dropped_on_append() {
        let mut controller = FeedController::default();
        let first = controller.reset(FilterState::default(), None).unwrap();
        controller.complete(&first, Ok(page(0..3, Some("c1"), true)));

        let more = controller.fetch_more().unwrap();
        let outcome = controller.complete(&more, Ok(page(2..5, None, false)));

        assert_eq!(
            outcome,
            FetchOutcome::Applied {
                kind: FetchKind::Continuation,
                added: 2
            }
        );
        assert_eq!(ids(&controller), vec!["a0", "a1", "a2", "a3", "a4"]);
    }

    proptest! {
        /// Whatever order a burst of reset responses lands in, only the
        /// last reset's response changes the item list.
        #[test]
        fn prop_only_latest_reset_mutates(
            resets in 1usize..8,
            order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle(),
        ) {
            let mut controller = FeedController::default();
            let tickets: Vec<FetchTicket> = (0..resets)
                .map(|n| controller.reset(FilterState::new(format!("q{}", n), None), None).unwrap())
                .collect();
            let last = resets - 1;

            for &n in order.iter().filter(|&&n| n < resets) {
                let response = page(n * 100..n * 100 + 2, None, false);
                let outcome = controller.complete(&tickets[n], Ok(response));
                if n == last {
                    prop_assert!(
                        matches!(outcome, FetchOutcome::Applied { .. }),
                        "latest reset response must apply"
                    );
                } else {
                    prop_assert_eq!(outcome, FetchOutcome::Stale);
                }
            }

            let expected = vec![format!("a{}", last * 100), format!("a{}", last * 100 + 1)];
            prop_assert_eq!(ids(&controller), expected);
            prop_assert!(!controller.is_loading());
        }
    }
}
