use crate::feed::{FeedController, FetchKind};

/// What the feed area should show, derived from controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedView {
    /// First page in flight with nothing to show yet.
    InitialLoading,
    /// Nothing loaded and the last fetch failed; offer a retry.
    Error { message: String },
    /// The filter matched nothing. `query` is the debounced search text.
    Empty { query: String },
    Items {
        count: usize,
        /// A continuation page is in flight.
        loading_more: bool,
        /// A first-page reload (retry) is in flight; loaded items stay
        /// until it lands.
        refreshing: bool,
        /// The feed is exhausted.
        caught_up: bool,
        /// Inline error from the last failed fetch.
        error: Option<String>,
    },
}

impl FeedView {
    pub fn from_controller(controller: &FeedController) -> Self {
        let items = controller.items();
        let error = controller.error().map(|e| e.message.clone());

        if items.is_empty() {
            return if controller.is_loading() {
                FeedView::InitialLoading
            } else if let Some(message) = error {
                FeedView::Error { message }
            } else {
                FeedView::Empty {
                    query: controller.filter().query.clone(),
                }
            };
        }

        FeedView::Items {
            count: items.len(),
            loading_more: controller.in_flight() == Some(FetchKind::Continuation),
            refreshing: controller.in_flight() == Some(FetchKind::FirstPage),
            caught_up: !controller.has_more(),
            error,
        }
    }

    /// One-line status for text front ends.
    pub fn status_line(&self) -> String {
        match self {
            FeedView::InitialLoading => "Loading articles...".to_string(),
            FeedView::Error { message } => format!("Error: {}", message),
            FeedView::Empty { query } if query.is_empty() => "No articles found.".to_string(),
            FeedView::Empty { query } => format!("No articles found for '{}'", query),
            FeedView::Items {
                refreshing: true, ..
            } => "Reloading articles...".to_string(),
            FeedView::Items {
                loading_more: true, ..
            } => "Loading more articles...".to_string(),
            FeedView::Items {
                error: Some(message),
                ..
            } => format!("Error: {}", message),
            FeedView::Items {
                caught_up: true, ..
            } => "You're all caught up!".to_string(),
            FeedView::Items { count, .. } => format!("{} articles", count),
        }
    }
}
