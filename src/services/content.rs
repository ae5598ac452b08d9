//! Announcement body extraction.
//!
//! Converts the body region of a detail page into Markdown-like text. Steps
//! run in a fixed order:
//!
//! 1. unescape HTML entities in the serialized region
//! 2. drop `span`/`time`/`div` wrappers and convert to Markdown
//! 3. remove embedded images (and the whitespace after them)
//! 4. absolutize `(/users/...)` profile links

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{ExtractedContent, SourceConfig};

/// Body region selectors, most specific first.
const BODY_SELECTORS: [&str; 2] = ["div.panel-body.blog-post", "div.panel-body"];

/// Extracts and normalizes announcement bodies.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    origin: String,
    decorative_tags: Regex,
    images: Regex,
    user_links: Regex,
}

impl ContentExtractor {
    pub fn new(origin: &str) -> Result<Self> {
        Ok(Self {
            origin: origin.trim_end_matches('/').to_string(),
            decorative_tags: Regex::new(r"(?i)</?(?:span|time|div)(?:\s[^>]*)?/?>")?,
            images: Regex::new(r"!\[[^\]]*\]\([^)]*\)\s*")?,
            user_links: Regex::new(r"\((/users/[^)]*)\)")?,
        })
    }

    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        Self::new(source.origin())
    }

    /// Extract the body of a parsed detail page.
    pub fn extract(&self, document: &Html, title: &str, url: &str) -> ExtractedContent {
        let body_text = Self::body_region(document)
            .map(|body| self.to_text(&body.html()))
            .unwrap_or_default();

        ExtractedContent {
            title: title.to_string(),
            url: url.to_string(),
            body_text,
        }
    }

    /// The announcement body element, if the page has one.
    pub fn body_region(document: &Html) -> Option<ElementRef<'_>> {
        BODY_SELECTORS.iter().find_map(|s| {
            let sel = Selector::parse(s).ok()?;
            document.select(&sel).next()
        })
    }

    /// Run the conversion pipeline over a serialized HTML fragment.
    pub fn to_text(&self, fragment: &str) -> String {
        let unescaped = html_escape::decode_html_entities(fragment);
        let unwrapped = self.decorative_tags.replace_all(&unescaped, "");

        let markdown = match htmd::convert(&unwrapped) {
            Ok(markdown) => markdown,
            Err(e) => {
                log::warn!("Markdown conversion failed: {e}");
                return String::new();
            }
        };

        let without_images = self.images.replace_all(&markdown, "");
        let replacement = format!("({}$1)", self.origin);
        let absolute = self
            .user_links
            .replace_all(&without_images, replacement.as_str());

        absolute.trim().to_string()
    }
}
