//! Sink that only logs; used when no delivery target is configured.

use async_trait::async_trait;

use crate::error::Result;
use crate::notify::{Notification, Sink};

#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    async fn send(&self, notification: &Notification) -> Result<()> {
        match &notification.embed {
            Some(embed) => log::info!(
                "No delivery target configured; change detected: {} | {} <{}>",
                notification.content,
                embed.title,
                embed.url
            ),
            None => log::info!(
                "No delivery target configured; change detected: {}",
                notification.content
            ),
        }
        Ok(())
    }
}
