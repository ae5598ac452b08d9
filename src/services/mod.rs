//! Service layer for the watcher.
//!
//! This module contains the page-reading logic:
//! - Panel location (`PanelLocator`)
//! - Announcement link extraction (`ItemExtractor`)
//! - Category classification (`ItemClassifier`)
//! - Body conversion (`ContentExtractor`)
//!
//! Everything here is synchronous and works on a borrowed `scraper::Html`;
//! parsed documents never outlive the call that parsed them.

mod classifier;
mod content;
mod items;
mod panel;

pub use classifier::ItemClassifier;
pub use content::ContentExtractor;
pub use items::ItemExtractor;
pub use panel::PanelLocator;

use scraper::Html;

use crate::error::Result;
use crate::models::{CandidateItem, ClassificationResult, ExtractedContent, SourceConfig};

/// Classification and body of one detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub classification: ClassificationResult,
    pub content: ExtractedContent,
}

/// All page readers built from one source configuration.
#[derive(Debug, Clone)]
pub struct PageReaders {
    pub panel: PanelLocator,
    pub items: ItemExtractor,
    pub classifier: ItemClassifier,
    pub content: ContentExtractor,
}

impl PageReaders {
    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        Ok(Self {
            panel: PanelLocator::from_config(source),
            items: ItemExtractor::from_config(source)?,
            classifier: ItemClassifier::from_config(source)?,
            content: ContentExtractor::from_config(source)?,
        })
    }
}

impl PageReaders {
    /// Newest post inside the announcements panel. No whole-page fallback:
    /// a missing panel means the item cascade failed.
    pub fn newest_in_panel(&self, page: &str) -> Option<CandidateItem> {
        let document = Html::parse_document(page);
        let panel = self.panel.locate(&document)?;
        self.items.extract_first(panel)
    }

    /// Up to `limit` recent posts, from the panel when it has any,
    /// otherwise from the whole page.
    pub fn recent_items(&self, page: &str, limit: usize) -> Vec<CandidateItem> {
        let document = Html::parse_document(page);
        let from_panel = self
            .panel
            .locate(&document)
            .map(|panel| self.items.extract_ordered(panel, limit))
            .unwrap_or_default();

        if !from_panel.is_empty() {
            return from_panel;
        }
        log::debug!("No posts in panel; scanning the whole page");
        self.items.extract_ordered(document.root_element(), limit)
    }

    /// Classify a detail page and extract its body in one parse.
    pub fn inspect_detail(
        &self,
        page: &str,
        item: &CandidateItem,
        category_prefix: &str,
    ) -> Inspection {
        let document = Html::parse_document(page);
        Inspection {
            classification: self.classifier.classify(&document, category_prefix),
            content: self
                .content
                .extract(&document, &item.label, &item.detail_url),
        }
    }
}
