use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Feed Items
// ============================================================================

/// A single article as delivered by the Articles API.
///
/// Items are immutable once received. `id` is the merge key used when
/// continuation pages are appended to the accumulated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    /// Short summary shown under the title.
    #[serde(default)]
    pub dek: String,
    #[serde(default)]
    pub author: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub reading_time_mins: u32,
    #[serde(default)]
    pub image_url: String,
    /// Pre-rendered article body. Never interpreted by this crate.
    #[serde(default)]
    pub content_html: String,
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of the feed plus its continuation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<FeedItem>,
    /// Opaque cursor for the next page. Never parsed client-side.
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl Page {
    /// Enforce the API contract that a missing cursor means the feed is exhausted.
    pub fn normalized(mut self) -> Self {
        if self.next_cursor.is_none() && self.has_more {
            tracing::debug!("Page reported has_more without a cursor, treating as exhausted");
            self.has_more = false;
        }
        self
    }
}

/// Query sent to the Articles API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub limit: u32,
    /// The API's single generic text-query slot.
    pub q: Option<String>,
}

// ============================================================================
// Categories
// ============================================================================

/// The fixed set of categories offered as filter pills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Technology,
    Science,
    Business,
    Health,
    Culture,
    Politics,
    Environment,
    Education,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Technology,
        Category::Science,
        Category::Business,
        Category::Health,
        Category::Culture,
        Category::Politics,
        Category::Environment,
        Category::Education,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Science => "Science",
            Category::Business => "Business",
            Category::Health => "Health",
            Category::Culture => "Culture",
            Category::Politics => "Politics",
            Category::Environment => "Environment",
            Category::Education => "Education",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive match against the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_decodes_camel_case_wire_format() {
        let json = r#"{
            "items": [{
                "id": "a1",
                "title": "Quantum sensors",
                "dek": "Short",
                "author": "R. Vega",
                "publishedAt": "2024-03-01T12:00:00Z",
                "readingTimeMins": 7,
                "imageUrl": "https://img.example.com/a1.jpg",
                "contentHtml": "<p>Body</p>"
            }],
            "nextCursor": "c1",
            "hasMore": true
        }"#;

        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].reading_time_mins, 7);
        assert_eq!(page.next_cursor.as_deref(), Some("c1"));
        assert!(page.has_more);
    }

    #[test]
    fn test_item_tolerates_missing_optional_fields() {
        let json = r#"{"id":"x","title":"T","publishedAt":"2024-01-01T00:00:00Z"}"#;
        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.dek, "");
        assert_eq!(item.reading_time_mins, 0);
    }

    #[test]
    fn test_normalized_clears_has_more_without_cursor() {
        let page = Page {
            items: Vec::new(),
            next_cursor: None,
            has_more: true,
        };
        assert!(!page.normalized().has_more);
    }

    #[test]
    fn test_category_from_str_case_insensitive() {
        assert_eq!("science".parse::<Category>(), Ok(Category::Science));
        assert_eq!(" EDUCATION ".parse::<Category>(), Ok(Category::Education));
        assert!("Sports".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_by_name() {
        let json = serde_json::to_string(&Category::Environment).unwrap();
        assert_eq!(json, "\"Environment\"");
    }
}
