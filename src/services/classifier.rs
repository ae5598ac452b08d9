//! Announcement category classifier.
//!
//! A detail page matches a category when it links to a category page
//! (`/contests/<prefix>...`) or mentions such a URL in plain text. Either
//! signal is sufficient.

use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ClassificationResult, SourceConfig};
use crate::utils::{joined_text, resolve_on_host};

/// Decides whether a detail page belongs to a category.
#[derive(Debug, Clone)]
pub struct ItemClassifier {
    origin: Url,
    category_root: String,
    /// Any category URL on the origin host; group 1 is the slug tail.
    category_urls: Regex,
}

impl ItemClassifier {
    pub fn new(origin: &str, category_root: impl Into<String>) -> Result<Self> {
        let origin = Url::parse(origin)?;
        let category_root = category_root.into();
        let host = origin
            .host_str()
            .ok_or_else(|| AppError::config(format!("origin {origin} has no host")))?;
        let pattern = format!(
            r"https?://{}{}([a-z0-9\-_/]*)",
            regex::escape(host),
            regex::escape(&category_root)
        );
        let category_urls = RegexBuilder::new(&pattern).case_insensitive(true).build()?;

        Ok(Self {
            origin,
            category_root,
            category_urls,
        })
    }

    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        Self::new(source.origin(), &source.category_root)
    }

    /// Classify a parsed detail page against `category_prefix`.
    /// An empty prefix accepts any category.
    pub fn classify(&self, document: &Html, category_prefix: &str) -> ClassificationResult {
        if let Some(link) = self.anchor_signal(document, category_prefix) {
            return ClassificationResult::matched(link);
        }
        if let Some(link) = self.plain_text_signal(document, category_prefix) {
            return ClassificationResult::matched(link);
        }
        ClassificationResult::no_match()
    }

    /// Absolute URL of the first on-site anchor under the category path.
    pub fn anchor_signal(&self, document: &Html, category_prefix: &str) -> Option<String> {
        let link_sel = Selector::parse("a[href]").ok()?;
        let wanted = format!("{}{}", self.category_root, category_prefix);

        document.select(&link_sel).find_map(|link| {
            let href = link.value().attr("href")?;
            let url = resolve_on_host(&self.origin, href)?;
            if url.path().starts_with(&wanted) {
                Some(url.to_string())
            } else {
                None
            }
        })
    }

    /// First category URL written out in the page's visible text.
    pub fn plain_text_signal(&self, document: &Html, category_prefix: &str) -> Option<String> {
        let wanted = category_prefix.to_lowercase();
        let text = joined_text(document.root_element().text(), " ");

        self.category_urls.captures_iter(&text).find_map(|caps| {
            let slug = caps.get(1)?.as_str().to_lowercase();
            if slug.starts_with(&wanted) {
                Some(caps[0].to_string())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ItemClassifier {
        ItemClassifier::from_config(&SourceConfig::default()).unwrap()
    }

    #[test]
    fn test_relative_anchor_matches() {
        let doc = Html::parse_document(r#"<p>See <a href="/contests/abc420">ABC420</a></p>"#);
        let result = classifier().classify(&doc, "abc");
        assert!(result.matches_category);
        assert_eq!(
            result.category_link.as_deref(),
            Some("https://atcoder.jp/contests/abc420")
        );
    }

    #[test]
    fn test_absolute_anchor_matches() {
        let doc = Html::parse_document(
            r#"<a href="https://atcoder.jp/contests/arc200/tasks">ARC200</a>"#,
        );
        assert!(classifier().classify(&doc, "arc").matches_category);
    }

    #[test]
    fn test_empty_prefix_accepts_any_category() {
        let doc = Html::parse_document(r#"<a href="/contests/ahc050">AHC</a>"#);
        assert!(classifier().classify(&doc, "").matches_category);
    }

    #[test]
    fn test_plain_text_only_matches() {
        let doc = Html::parse_document(
            "<p>コンテストページ: https://AtCoder.jp/contests/abc421 をご覧ください</p>",
        );
        let result = classifier().classify(&doc, "abc");
        assert!(result.matches_category);
        assert_eq!(
            result.category_link.as_deref(),
            Some("https://AtCoder.jp/contests/abc421")
        );
    }

    #[test]
    fn test_plain_text_skips_other_categories() {
        let doc = Html::parse_document(
            "<p>https://atcoder.jp/contests/arc200 と https://atcoder.jp/contests/ABC421/tasks</p>",
        );
        let result = classifier().classify(&doc, "abc");
        assert_eq!(
            result.category_link.as_deref(),
            Some("https://atcoder.jp/contests/ABC421/tasks")
        );
        assert!(classifier().plain_text_signal(&doc, "agc").is_none());
    }

    #[test]
    fn test_origin_without_host_is_rejected() {
        assert!(ItemClassifier::new("data:text/plain,x", "/contests/").is_err());
    }

    #[test]
    fn test_both_signals_match() {
        let doc = Html::parse_document(
            r#"<a href="/contests/agc070">AGC070</a>
               <p>https://atcoder.jp/contests/agc070</p>"#,
        );
        assert!(classifier().classify(&doc, "agc").matches_category);
    }

    #[test]
    fn test_neither_signal() {
        let doc = Html::parse_document(
            r#"<a href="/contests/arc190">ARC</a>
               <a href="https://other.example/contests/abc1">foreign</a>
               <p>https://atcoder.jp/posts/5</p>"#,
        );
        let result = classifier().classify(&doc, "abc");
        assert_eq!(result, ClassificationResult::no_match());
    }
}
