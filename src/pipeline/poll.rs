// src/pipeline/poll.rs

//! Change-detection poll loop.
//!
//! One cycle: fetch the watched page, find the newest panel post, compare it
//! with the stored record, notify on a same-scheme change, persist. When no
//! post can be found the whole page hash is tracked instead.
//!
//! An empty store, or a record of the other scheme, is a baseline: it is
//! overwritten silently and never produces a notification.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::error::Result;
use crate::models::{CandidateItem, ChangeRecord, Config, ExtractedContent};
use crate::notify::{MessageBuilder, Notification, Sink};
use crate::pipeline::inspect_item;
use crate::services::PageReaders;
use crate::storage::ChangeStore;
use crate::utils::http::Fetch;
use crate::utils::page_digest;

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The watched page could not be fetched; nothing was persisted.
    FetchFailed,
    /// No comparable record existed; the record was initialised.
    Baseline(ChangeRecord),
    /// Same identifier or hash as last time.
    Unchanged(ChangeRecord),
    /// A change was detected and a notification handed to the sink.
    Notified(ChangeRecord),
    /// A new post was seen but did not match the target category.
    Suppressed(ChangeRecord),
}

impl PollOutcome {
    /// Record persisted by this cycle, if any.
    pub fn record(&self) -> Option<&ChangeRecord> {
        match self {
            Self::FetchFailed => None,
            Self::Baseline(r) | Self::Unchanged(r) | Self::Notified(r) | Self::Suppressed(r) => {
                Some(r)
            }
        }
    }

    pub fn notified(&self) -> bool {
        matches!(self, Self::Notified(_))
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed => write!(f, "fetch failed"),
            Self::Baseline(r) => write!(f, "baseline {r}"),
            Self::Unchanged(r) => write!(f, "unchanged {r}"),
            Self::Notified(r) => write!(f, "notified {r}"),
            Self::Suppressed(r) => write!(f, "suppressed {r}"),
        }
    }
}

/// The poll loop and the operations that share its state.
pub struct Watcher {
    fetcher: Arc<dyn Fetch>,
    store: Arc<dyn ChangeStore>,
    sink: Arc<dyn Sink>,
    readers: PageReaders,
    messages: MessageBuilder,
    home_url: String,
    target_category: String,
    interval: Duration,
}

impl Watcher {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn Fetch>,
        store: Arc<dyn ChangeStore>,
        sink: Arc<dyn Sink>,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            store,
            sink,
            readers: PageReaders::from_config(&config.source)?,
            messages: MessageBuilder::new(&config.notify)?,
            home_url: config.source.home_url.clone(),
            target_category: config.watch.target_category.clone(),
            interval: Duration::from_secs(config.watch.poll_interval_secs),
        })
    }

    /// Poll forever. A failing or panicking cycle is logged and the previous
    /// record stays authoritative.
    pub async fn run(&self) {
        log::info!(
            "Watching {} every {}s",
            self.home_url,
            self.interval.as_secs()
        );
        loop {
            match AssertUnwindSafe(self.poll_once()).catch_unwind().await {
                Ok(Ok(outcome)) => log::info!("Poll cycle: {outcome}"),
                Ok(Err(e)) => log::error!("Poll cycle failed: {e}"),
                Err(_) => log::error!("Poll cycle panicked; keeping previous state"),
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Run one fetch → compare → notify → persist cycle.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let page = match self.fetcher.fetch(&self.home_url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Failed to fetch {}: {}", self.home_url, e);
                return Ok(PollOutcome::FetchFailed);
            }
        };

        let previous = self.store.read().await;
        let outcome = match self.readers.newest_in_panel(&page) {
            Some(item) => self.on_item(previous.as_ref(), item).await,
            None => self.on_page_hash(previous.as_ref(), &page).await,
        };

        if let Some(record) = outcome.record() {
            if let Err(e) = self.store.write(record).await {
                log::error!("Failed to persist {record}: {e}. The next cycle may notify again.");
            }
        }
        Ok(outcome)
    }

    async fn on_item(&self, previous: Option<&ChangeRecord>, item: CandidateItem) -> PollOutcome {
        let record = ChangeRecord::Item(item.external_id.clone());
        let last_id = match previous.and_then(ChangeRecord::as_item) {
            Some(id) => id,
            None => {
                log::info!(
                    "Baseline: newest post {} (previous record: {})",
                    item.external_id,
                    previous.map_or("none", ChangeRecord::scheme)
                );
                return PollOutcome::Baseline(record);
            }
        };
        if last_id == item.external_id {
            return PollOutcome::Unchanged(record);
        }

        log::info!("New post detected: {} ({})", item.label, item.detail_url);
        let inspection =
            inspect_item(self.fetcher.as_ref(), &self.readers, &item, &self.target_category).await;

        match inspection {
            Some(i) if i.classification.matches_category => {
                let notification = self
                    .messages
                    .new_item(&i.content, i.classification.category_link.as_deref());
                self.deliver(&notification).await;
                PollOutcome::Notified(record)
            }
            Some(_) => {
                log::info!(
                    "Post {} is not a contest announcement; not notifying",
                    item.detail_url
                );
                PollOutcome::Suppressed(record)
            }
            None => {
                log::warn!(
                    "Post {} could not be classified; not notifying",
                    item.detail_url
                );
                PollOutcome::Suppressed(record)
            }
        }
    }

    async fn on_page_hash(&self, previous: Option<&ChangeRecord>, page: &str) -> PollOutcome {
        let digest = page_digest(page);
        let record = ChangeRecord::Hash(digest.clone());

        match previous.and_then(ChangeRecord::as_hash) {
            None => {
                log::info!("No post found in panel; tracking page hash from now on");
                PollOutcome::Baseline(record)
            }
            Some(last) if last == digest => PollOutcome::Unchanged(record),
            Some(_) => {
                let notification = self.messages.page_changed(&self.home_url);
                self.deliver(&notification).await;
                PollOutcome::Notified(record)
            }
        }
    }

    /// Announce the newest panel post regardless of the stored record, then
    /// record it so the poll loop does not announce it again.
    pub async fn announce_latest(&self, test_send: bool) -> Result<Option<ExtractedContent>> {
        let page = self.fetcher.fetch(&self.home_url).await?;
        let Some(item) = self.readers.newest_in_panel(&page) else {
            log::warn!("No post link found in the announcements panel");
            return Ok(None);
        };

        let inspection =
            inspect_item(self.fetcher.as_ref(), &self.readers, &item, &self.target_category).await;

        let record = ChangeRecord::Item(item.external_id.clone());
        if let Err(e) = self.store.write(&record).await {
            log::error!("Failed to persist {record}: {e}");
        }

        match inspection {
            Some(i) if i.classification.matches_category => {
                let notification = self.messages.latest(&i.content, test_send);
                self.deliver(&notification).await;
                Ok(Some(i.content))
            }
            _ => {
                log::info!(
                    "Latest post {} is not a contest announcement",
                    item.detail_url
                );
                Ok(None)
            }
        }
    }

    async fn deliver(&self, notification: &Notification) {
        if let Err(e) = self.sink.send(notification).await {
            log::error!("Notification delivery failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::pipeline::testing::{FakeFetcher, RecordingSink, detail_page, home_page};
    use crate::storage::MemoryChangeStore;

    const HOME: &str = "https://atcoder.jp/home?lang=ja";

    /// Store that keeps its initial record and rejects every write.
    struct ReadOnlyStore(ChangeRecord);

    #[async_trait]
    impl ChangeStore for ReadOnlyStore {
        async fn read(&self) -> Option<ChangeRecord> {
            Some(self.0.clone())
        }

        async fn write(&self, _record: &ChangeRecord) -> Result<()> {
            Err(AppError::persist("/read-only/state", "permission denied"))
        }
    }

    /// Panics on its first fetch, then serves pages like `FakeFetcher`.
    #[derive(Default)]
    struct PanicOnceFetcher {
        inner: FakeFetcher,
        panicked: AtomicBool,
    }

    #[async_trait]
    impl Fetch for PanicOnceFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("connection pool poisoned");
            }
            self.inner.fetch(url).await
        }
    }

    struct Harness {
        fetcher: Arc<FakeFetcher>,
        store: Arc<MemoryChangeStore>,
        sink: Arc<RecordingSink>,
        watcher: Watcher,
    }

    fn harness_with(store: MemoryChangeStore) -> Harness {
        let fetcher = Arc::new(FakeFetcher::default());
        let store = Arc::new(store);
        let sink = Arc::new(RecordingSink::default());
        let watcher = Watcher::new(
            &Config::default(),
            fetcher.clone(),
            store.clone(),
            sink.clone(),
        )
        .unwrap();
        Harness {
            fetcher,
            store,
            sink,
            watcher,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryChangeStore::new())
    }

    #[tokio::test]
    async fn test_cold_start_writes_without_notifying() {
        let h = harness();
        h.fetcher.set(HOME, &home_page(&["999"]));

        let outcome = h.watcher.poll_once().await.unwrap();

        assert_eq!(outcome, PollOutcome::Baseline(ChangeRecord::Item("999".into())));
        assert_eq!(h.store.read().await, Some(ChangeRecord::Item("999".into())));
        assert_eq!(h.store.write_count(), 1);
        assert!(h.sink.sent().is_empty());
        // The detail page is not even fetched on a baseline.
        assert!(!h.fetcher.was_fetched("https://atcoder.jp/posts/999"));
    }

    #[tokio::test]
    async fn test_cold_start_hash_scheme() {
        let h = harness();
        h.fetcher.set(HOME, "<html><body>maintenance</body></html>");

        let outcome = h.watcher.poll_once().await.unwrap();

        assert!(matches!(outcome, PollOutcome::Baseline(ChangeRecord::Hash(_))));
        assert!(h.sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_announcement_scenario() {
        let h = harness();
        h.fetcher.set(HOME, &home_page(&["999"]));
        h.fetcher
            .set("https://atcoder.jp/posts/999", &detail_page("/contests/abc999", "ABC999"));

        // First poll: baseline.
        let first = h.watcher.poll_once().await.unwrap();
        assert_eq!(first, PollOutcome::Baseline(ChangeRecord::Item("999".into())));

        // Second poll, unchanged page: no notification, record rewritten.
        let second = h.watcher.poll_once().await.unwrap();
        assert_eq!(second, PollOutcome::Unchanged(ChangeRecord::Item("999".into())));
        assert_eq!(h.store.write_count(), 2);
        assert!(h.sink.sent().is_empty());

        // Third poll: a new post linking to abc420.
        h.fetcher.set(HOME, &home_page(&["1000", "999"]));
        h.fetcher
            .set("https://atcoder.jp/posts/1000", &detail_page("/contests/abc420", "ABC420"));
        let third = h.watcher.poll_once().await.unwrap();

        assert_eq!(third, PollOutcome::Notified(ChangeRecord::Item("1000".into())));
        assert_eq!(h.store.read().await, Some(ChangeRecord::Item("1000".into())));
        let sent = h.sink.sent();
        assert_eq!(sent.len(), 1);
        let embed = sent[0].embed.as_ref().unwrap();
        assert_eq!(embed.url, "https://atcoder.jp/posts/1000");
        assert!(embed.description.contains("ABC420"));
    }

    #[tokio::test]
    async fn test_identical_polls_notify_once() {
        let h = harness_with(MemoryChangeStore::with_record(ChangeRecord::Item("1".into())));
        h.fetcher.set(HOME, &home_page(&["2"]));
        h.fetcher
            .set("https://atcoder.jp/posts/2", &detail_page("/contests/arc200", "ARC200"));

        assert!(h.watcher.poll_once().await.unwrap().notified());
        assert!(!h.watcher.poll_once().await.unwrap().notified());
        assert_eq!(h.sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_panel_outage_and_recovery_is_silent() {
        let h = harness_with(MemoryChangeStore::with_record(ChangeRecord::Item("999".into())));

        h.fetcher.set(HOME, "<html><body><p>Under maintenance</p></body></html>");
        let outage = h.watcher.poll_once().await.unwrap();
        assert!(matches!(outage, PollOutcome::Baseline(ChangeRecord::Hash(_))));

        h.fetcher.set(HOME, &home_page(&["999"]));
        let recovered = h.watcher.poll_once().await.unwrap();
        assert_eq!(recovered, PollOutcome::Baseline(ChangeRecord::Item("999".into())));

        assert!(h.sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_page_hash_change_notifies() {
        let h = harness();
        h.fetcher.set(HOME, "<p>version 1</p>");
        h.watcher.poll_once().await.unwrap();

        h.fetcher.set(HOME, "<p>version 2</p>");
        let outcome = h.watcher.poll_once().await.unwrap();

        assert!(outcome.notified());
        assert_eq!(
            h.sink.sent()[0].content,
            format!("The watched page was updated: {HOME}")
        );
    }

    #[tokio::test]
    async fn test_non_contest_post_is_suppressed_but_recorded() {
        let h = harness_with(MemoryChangeStore::with_record(ChangeRecord::Item("1".into())));
        h.fetcher.set(HOME, &home_page(&["2"]));
        h.fetcher.set(
            "https://atcoder.jp/posts/2",
            r#"<div class="panel-body blog-post"><p>Site maintenance notice</p></div>"#,
        );

        let outcome = h.watcher.poll_once().await.unwrap();

        assert_eq!(outcome, PollOutcome::Suppressed(ChangeRecord::Item("2".into())));
        assert_eq!(h.store.read().await, Some(ChangeRecord::Item("2".into())));
        assert!(h.sink.sent().is_empty());

        // Not retried on the next cycle.
        let again = h.watcher.poll_once().await.unwrap();
        assert_eq!(again, PollOutcome::Unchanged(ChangeRecord::Item("2".into())));
    }

    #[tokio::test]
    async fn test_detail_fetch_failure_is_suppressed() {
        let h = harness_with(MemoryChangeStore::with_record(ChangeRecord::Item("1".into())));
        h.fetcher.set(HOME, &home_page(&["2"]));

        let outcome = h.watcher.poll_once().await.unwrap();

        assert_eq!(outcome, PollOutcome::Suppressed(ChangeRecord::Item("2".into())));
        assert!(h.sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_home_fetch_failure_leaves_state() {
        let h = harness_with(MemoryChangeStore::with_record(ChangeRecord::Item("1".into())));

        let outcome = h.watcher.poll_once().await.unwrap();

        assert_eq!(outcome, PollOutcome::FetchFailed);
        assert_eq!(h.store.write_count(), 0);
        assert_eq!(h.store.read().await, Some(ChangeRecord::Item("1".into())));
    }

    #[tokio::test]
    async fn test_target_category_filters_posts() {
        let fetcher = Arc::new(FakeFetcher::default());
        let store = Arc::new(MemoryChangeStore::with_record(ChangeRecord::Item("1".into())));
        let sink = Arc::new(RecordingSink::default());
        let mut config = Config::default();
        config.watch.target_category = "abc".to_string();
        let watcher = Watcher::new(&config, fetcher.clone(), store, sink.clone()).unwrap();

        fetcher.set(HOME, &home_page(&["2"]));
        fetcher.set("https://atcoder.jp/posts/2", &detail_page("/contests/arc200", "ARC200"));

        let outcome = watcher.poll_once().await.unwrap();
        assert!(matches!(outcome, PollOutcome::Suppressed(_)));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_announce_latest_sends_and_records() {
        let h = harness();
        h.fetcher.set(HOME, &home_page(&["1000"]));
        h.fetcher
            .set("https://atcoder.jp/posts/1000", &detail_page("/contests/abc420", "ABC420"));

        let content = h.watcher.announce_latest(true).await.unwrap().unwrap();

        assert_eq!(content.url, "https://atcoder.jp/posts/1000");
        assert_eq!(h.store.read().await, Some(ChangeRecord::Item("1000".into())));
        let sent = h.sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.starts_with("[Test] "));

        // The poll loop then sees nothing new.
        let outcome = h.watcher.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Unchanged(ChangeRecord::Item("1000".into())));
    }

    #[tokio::test]
    async fn test_announce_latest_without_panel() {
        let h = harness();
        h.fetcher.set(HOME, "<p>nothing here</p>");

        assert!(h.watcher.announce_latest(false).await.unwrap().is_none());
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_cycle_and_renotifies() {
        let fetcher = Arc::new(FakeFetcher::default());
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(ReadOnlyStore(ChangeRecord::Item("1".into())));
        let watcher = Watcher::new(&Config::default(), fetcher.clone(), store, sink.clone()).unwrap();

        fetcher.set(HOME, &home_page(&["2"]));
        fetcher.set("https://atcoder.jp/posts/2", &detail_page("/contests/abc420", "ABC420"));

        let first = watcher.poll_once().await.unwrap();
        assert_eq!(first, PollOutcome::Notified(ChangeRecord::Item("2".into())));

        // The record never moved on, so the same post is announced again.
        let second = watcher.poll_once().await.unwrap();
        assert_eq!(second, PollOutcome::Notified(ChangeRecord::Item("2".into())));
        assert_eq!(sink.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_panicking_cycle() {
        let fetcher = Arc::new(PanicOnceFetcher::default());
        let store = Arc::new(MemoryChangeStore::with_record(ChangeRecord::Item("1".into())));
        let sink = Arc::new(RecordingSink::default());
        let watcher =
            Watcher::new(&Config::default(), fetcher.clone(), store.clone(), sink.clone()).unwrap();

        fetcher.inner.set(HOME, &home_page(&["2"]));
        fetcher
            .inner
            .set("https://atcoder.jp/posts/2", &detail_page("/contests/abc420", "ABC420"));

        // Cycles at 0s (panics), 300s (notifies) and 600s (unchanged).
        let stopped = tokio::time::timeout(Duration::from_secs(700), watcher.run()).await;

        assert!(stopped.is_err(), "run never returns");
        assert_eq!(store.read().await, Some(ChangeRecord::Item("2".into())));
        assert_eq!(store.write_count(), 2);
        assert_eq!(sink.sent().len(), 1);
    }
}
