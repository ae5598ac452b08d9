//! Announcement data structures.

use serde::{Deserialize, Serialize};

/// A single announcement link found on the watched page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateItem {
    /// Visible link text
    pub label: String,

    /// Absolute URL of the announcement detail page
    pub detail_url: String,

    /// Final path segment of the detail URL
    pub external_id: String,
}

impl CandidateItem {
    /// Build an item from a post link, deriving the id from its path.
    pub fn new(label: impl Into<String>, detail_url: impl Into<String>) -> Self {
        let detail_url = detail_url.into();
        let external_id = external_id(&detail_url);
        Self {
            label: label.into(),
            detail_url,
            external_id,
        }
    }
}

/// Trailing path segment of a URL or path, ignoring a trailing slash.
pub fn external_id(href: &str) -> String {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Whether a detail page belongs to the requested category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    pub matches_category: bool,

    /// Absolute category link that produced the match
    pub category_link: Option<String>,
}

impl ClassificationResult {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn matched(link: impl Into<String>) -> Self {
        Self {
            matches_category: true,
            category_link: Some(link.into()),
        }
    }
}

/// Normalized body of an announcement detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub url: String,

    /// Markdown-like text; empty when no body region was found
    pub body_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_from_path() {
        assert_eq!(external_id("/posts/999"), "999");
        assert_eq!(external_id("/posts/1000/"), "1000");
        assert_eq!(external_id("https://atcoder.jp/posts/1234"), "1234");
    }

    #[test]
    fn test_candidate_item_derives_id() {
        let item = CandidateItem::new("ABC 420", "https://atcoder.jp/posts/1500/");
        assert_eq!(item.external_id, "1500");
        assert_eq!(item.label, "ABC 420");
    }
}
