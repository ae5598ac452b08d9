//! Announcement link extraction.

use std::collections::HashSet;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::error::Result;
use crate::models::{CandidateItem, SourceConfig};
use crate::utils::{joined_text, resolve_on_host};

/// Extracts announcement links (posts) from a panel or a whole page.
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    origin: Url,
    post_prefix: String,
}

impl ItemExtractor {
    pub fn new(origin: &str, post_prefix: impl Into<String>) -> Result<Self> {
        Ok(Self {
            origin: Url::parse(origin)?,
            post_prefix: post_prefix.into(),
        })
    }

    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        Self::new(source.origin(), &source.post_path_prefix)
    }

    /// First post link within `scope`, in document order.
    pub fn extract_first(&self, scope: ElementRef<'_>) -> Option<CandidateItem> {
        self.post_links(scope).next()
    }

    /// Up to `limit` post links within `scope`, deduplicated by URL.
    pub fn extract_ordered(&self, scope: ElementRef<'_>, limit: usize) -> Vec<CandidateItem> {
        let mut seen = HashSet::new();
        self.post_links(scope)
            .filter(|item| seen.insert(item.detail_url.clone()))
            .take(limit)
            .collect()
    }

    fn post_links<'a>(&'a self, scope: ElementRef<'a>) -> impl Iterator<Item = CandidateItem> + 'a {
        let link_sel = Selector::parse("a[href]").ok();
        link_sel
            .into_iter()
            .flat_map(move |sel| scope.select(&sel).collect::<Vec<_>>())
            .filter_map(move |link| self.to_item(link))
    }

    fn to_item(&self, link: ElementRef<'_>) -> Option<CandidateItem> {
        let href = link.value().attr("href")?;
        if !href.trim().starts_with(&self.post_prefix) {
            return None;
        }
        let mut url = resolve_on_host(&self.origin, href)?;
        url.set_fragment(None);

        let label = joined_text(link.text(), "");
        Some(CandidateItem::new(label, url.to_string()))
    }
}
