//! Notification delivery.
//!
//! The pipeline hands finished [`Notification`]s to a [`Sink`] and never
//! depends on delivery succeeding; sink errors are logged by the caller.

pub mod discord;
pub mod log_sink;
pub mod message;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use discord::DiscordWebhookSink;
pub use log_sink::LogSink;
pub use message::{MessageBuilder, truncate_description};

/// Rich card attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub content: String,
    pub embed: Option<Embed>,
}

impl Notification {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embed: None,
        }
    }

    pub fn with_embed(content: impl Into<String>, embed: Embed) -> Self {
        Self {
            content: content.into(),
            embed: Some(embed),
        }
    }
}

/// Notification delivery backend.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}
