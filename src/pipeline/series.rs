// src/pipeline/series.rs

//! On-demand lookup of the newest announcement of one contest series.
//!
//! Always scans live pages and never touches the change store.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, ExtractedContent, Series};
use crate::notify::{MessageBuilder, Sink};
use crate::pipeline::inspect_item;
use crate::services::PageReaders;
use crate::utils::http::Fetch;

const DEFAULT_LABEL: &str = "Announcement";

pub struct SeriesQuery {
    fetcher: Arc<dyn Fetch>,
    readers: PageReaders,
    messages: MessageBuilder,
    home_url: String,
    scan_limit: usize,
}

impl SeriesQuery {
    pub fn new(config: &Config, fetcher: Arc<dyn Fetch>) -> Result<Self> {
        Ok(Self {
            fetcher,
            readers: PageReaders::from_config(&config.source)?,
            messages: MessageBuilder::new(&config.notify)?,
            home_url: config.source.home_url.clone(),
            scan_limit: config.watch.series_scan_limit,
        })
    }

    /// Content of the newest of up to `scan_limit` recent posts that matches
    /// `category_prefix`. Detail pages are fetched one at a time; a post whose
    /// page cannot be fetched is skipped.
    pub async fn find_latest_matching(
        &self,
        category_prefix: &str,
        scan_limit: usize,
    ) -> Result<Option<ExtractedContent>> {
        let page = self.fetcher.fetch(&self.home_url).await?;
        let mut candidates = self.readers.recent_items(&page, scan_limit);
        log::debug!(
            "Scanning {} recent posts for '{}'",
            candidates.len(),
            category_prefix
        );

        for item in candidates.iter_mut() {
            if item.label.is_empty() {
                item.label = DEFAULT_LABEL.to_string();
            }
            let Some(inspection) =
                inspect_item(self.fetcher.as_ref(), &self.readers, item, category_prefix).await
            else {
                continue;
            };
            if inspection.classification.matches_category {
                log::info!("Found '{}' announcement: {}", category_prefix, item.detail_url);
                return Ok(Some(inspection.content));
            }
        }
        Ok(None)
    }

    /// Look up `series` with the configured scan limit and deliver the result,
    /// or a not-found message, to `sink`. An unreachable home page counts as
    /// not found.
    pub async fn announce(&self, series: Series, sink: &dyn Sink) -> Result<Option<ExtractedContent>> {
        let found = match self
            .find_latest_matching(series.category_prefix(), self.scan_limit)
            .await
        {
            Ok(found) => found,
            Err(e) if e.is_fetch_failure() => {
                log::warn!("{series} lookup could not read {}: {}", self.home_url, e);
                None
            }
            Err(e) => return Err(e),
        };
        let notification = match &found {
            Some(content) => self.messages.series(series, content),
            None => self.messages.series_missing(series),
        };
        sink.send(&notification).await?;
        Ok(found)
    }
}
