use serde::{Deserialize, Serialize};

use crate::api::{Category, FeedItem};
use crate::feed::{FeedState, FilterState};

/// Everything needed to resume the feed where the user left off.
///
/// `items` is the full list accumulated since the last reset, in server
/// order. Field names match the stored JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    #[serde(rename = "articles")]
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub active_category: Option<Category>,
    #[serde(rename = "scrollY", default)]
    pub scroll_offset: f64,
}

impl FeedSnapshot {
    pub fn filter(&self) -> FilterState {
        FilterState::new(self.search_query.clone(), self.active_category)
    }

    /// Pagination part of the snapshot, used to seed the controller.
    pub fn into_feed_state(self) -> FeedState {
        FeedState {
            items: self.items,
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

/// A snapshot before the scroll offset is captured.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDraft {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub search_query: String,
    pub active_category: Option<Category>,
}

impl SnapshotDraft {
    pub fn new(state: &FeedState, filter: &FilterState) -> Self {
        Self {
            items: state.items.clone(),
            next_cursor: state.next_cursor.clone(),
            has_more: state.has_more,
            search_query: filter.query.clone(),
            active_category: filter.category,
        }
    }

    pub fn with_scroll(self, scroll_offset: f64) -> FeedSnapshot {
        FeedSnapshot {
            items: self.items,
            next_cursor: self.next_cursor,
            has_more: self.has_more,
            search_query: self.search_query,
            active_category: self.active_category,
            scroll_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn item(id: &str) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            title: format!("Title {}", id),
            dek: String::new(),
            author: "Staff".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            reading_time_mins: 3,
            image_url: String::new(),
            content_html: "<p>body</p>".to_string(),
        }
    }

    #[test]
    fn test_stored_json_layout() {
        let snapshot = SnapshotDraft {
            items: vec![item("a1")],
            next_cursor: Some("c1".to_string()),
            has_more: true,
            search_query: "rust".to_string(),
            active_category: Some(Category::Science),
        }
        .with_scroll(640.0);

        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["articles"][0]["id"], "a1");
        assert_eq!(json["nextCursor"], "c1");
        assert_eq!(json["hasMore"], true);
        assert_eq!(json["searchQuery"], "rust");
        assert_eq!(json["activeCategory"], "Science");
        assert_eq!(json["scrollY"], 640.0);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"{"articles":[],"nextCursor":null,"hasMore":false}"#;
        let snapshot: FeedSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.search_query, "");
        assert_eq!(snapshot.active_category, None);
        assert_eq!(snapshot.scroll_offset, 0.0);
    }

    #[test]
    fn test_filter_and_feed_state() {
        let snapshot = SnapshotDraft {
            items: vec![item("a1"), item("a2")],
            next_cursor: None,
            has_more: false,
            search_query: "ai".to_string(),
            active_category: Some(Category::Health),
        }
        .with_scroll(0.0);

        assert_eq!(snapshot.filter(), FilterState::new("ai", Some(Category::Health)));
        let state = snapshot.into_feed_state();
        assert_eq!(state.items.len(), 2);
        assert!(!state.has_more);
    }
}
