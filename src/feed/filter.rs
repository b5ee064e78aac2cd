use crate::api::{Category, FeedItem};

/// The user-facing filter: debounced search text plus an optional category.
///
/// Any change to either field invalidates the loaded feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub query: String,
    pub category: Option<Category>,
}

impl FilterState {
    pub fn new(query: impl Into<String>, category: Option<Category>) -> Self {
        Self {
            query: query.into(),
            category,
        }
    }

    /// Value for the API's single text-query slot.
    ///
    /// The API has no category parameter, so a lone category is sent as the
    /// text query. When both are set the search text wins and the category
    /// is applied client-side (see [`FilterState::post_filter`]).
    pub fn api_query(&self) -> Option<String> {
        match (self.query.is_empty(), self.category) {
            (false, _) => Some(self.query.clone()),
            (true, Some(category)) => Some(category.name().to_string()),
            (true, None) => None,
        }
    }

    /// Category to enforce client-side, only when search text is also set.
    pub fn post_filter(&self) -> Option<Category> {
        if self.query.is_empty() {
            None
        } else {
            self.category
        }
    }
}

/// Keep only items whose title mentions the category name, ignoring case.
///
/// Title-only matching under-returns for articles that belong to a category
/// without naming it; combined search+category results may be sparse.
pub fn apply_post_filter(items: Vec<FeedItem>, category: Category) -> Vec<FeedItem> {
    let needle = category.name().to_lowercase();
    let before = items.len();
    let kept: Vec<FeedItem> = items
        .into_iter()
        .filter(|item| item.title.to_lowercase().contains(&needle))
        .collect();
    tracing::trace!(
        category = %category,
        before,
        after = kept.len(),
        "Applied client-side category filter"
    );
    kept
}
