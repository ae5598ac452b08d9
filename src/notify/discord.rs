//! Discord webhook sink.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::notify::{Embed, Notification, Sink};
use crate::utils::http::create_async_client;

/// Posts notifications to a Discord webhook.
#[derive(Clone)]
pub struct DiscordWebhookSink {
    webhook: String,
    client: Client,
}

impl DiscordWebhookSink {
    pub fn new(webhook: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            webhook: webhook.into(),
            client: create_async_client(http)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct AllowedMentions {
    parse: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<&'a Embed>,
    allowed_mentions: AllowedMentions,
}

impl<'a> WebhookPayload<'a> {
    fn from_notification(notification: &'a Notification) -> Self {
        Self {
            content: &notification.content,
            embeds: notification.embed.iter().collect(),
            allowed_mentions: AllowedMentions {
                parse: vec!["roles"],
            },
        }
    }
}

#[async_trait]
impl Sink for DiscordWebhookSink {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let payload = WebhookPayload::from_notification(notification);
        let response = self
            .client
            .post(&self.webhook)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::delivery(format!("Discord webhook request failed: {e}")))?;

        if let Err(e) = response.error_for_status_ref() {
            return Err(AppError::delivery(format!("Discord webhook HTTP error: {e}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_with_embed() {
        let notification = Notification::with_embed(
            "<@&1> [AtCoder] New announcement",
            Embed {
                title: "ABC420".to_string(),
                url: "https://atcoder.jp/posts/1".to_string(),
                description: "body".to_string(),
            },
        );
        let json = serde_json::to_value(WebhookPayload::from_notification(&notification)).unwrap();
        assert_eq!(json["content"], "<@&1> [AtCoder] New announcement");
        assert_eq!(json["embeds"][0]["title"], "ABC420");
        assert_eq!(json["embeds"][0]["url"], "https://atcoder.jp/posts/1");
        assert_eq!(json["allowed_mentions"]["parse"][0], "roles");
    }

    #[test]
    fn test_payload_without_embed_omits_embeds() {
        let notification = Notification::text("plain");
        let json = serde_json::to_value(WebhookPayload::from_notification(&notification)).unwrap();
        assert!(json.get("embeds").is_none());
    }
}
