//! Pipeline entry points for watcher operations.
//!
//! - `Watcher::run`: poll the watched page and notify on new announcements
//! - `Watcher::announce_latest`: send the newest panel announcement
//! - `SeriesQuery::find_latest_matching`: newest announcement of one series

mod gate;
mod poll;
mod series;

pub use gate::StartGate;
pub use poll::{PollOutcome, Watcher};
pub use series::SeriesQuery;

use crate::models::CandidateItem;
use crate::services::{Inspection, PageReaders};
use crate::utils::http::Fetch;

/// Fetch a detail page and inspect it. A failed fetch is logged and
/// reported as `None`.
pub(crate) async fn inspect_item(
    fetcher: &dyn Fetch,
    readers: &PageReaders,
    item: &CandidateItem,
    category_prefix: &str,
) -> Option<Inspection> {
    match fetcher.fetch(&item.detail_url).await {
        Ok(page) => Some(readers.inspect_detail(&page, item, category_prefix)),
        Err(e) => {
            log::warn!("Failed to fetch {}: {}", item.detail_url, e);
            None
        }
    }
}
