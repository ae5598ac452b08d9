//! Notification text for each kind of event.
//!
//! Truncation is a display concern and happens here, never in
//! [`ExtractedContent`].

use regex::Regex;

use crate::error::Result;
use crate::models::{ExtractedContent, MentionRule, NotifyConfig, Series};
use crate::notify::{Embed, Notification};

const ELLIPSIS: char = '…';

/// Cut `text` to `max_chars` characters, marking the cut with one ellipsis.
pub fn truncate_description(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = text[..cut].to_string();
            out.push(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}

/// Builds notifications from extracted announcements.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    mentions: Vec<MentionRule>,
    max_chars: usize,
    slug: Regex,
}

impl MessageBuilder {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        Ok(Self {
            mentions: config.mentions.clone(),
            max_chars: config.max_description_chars,
            slug: Regex::new(r"/contests/([a-zA-Z0-9_\-]+)/?")?,
        })
    }

    /// Lower-cased contest slug (`abc420`) from a URL containing `/contests/<slug>`.
    pub fn contest_slug(&self, url: &str) -> String {
        self.slug
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default()
    }

    /// Role mention (with trailing space) for the category behind `url`.
    pub fn mention_for(&self, url: &str) -> String {
        let slug = self.contest_slug(url);
        if slug.is_empty() {
            return String::new();
        }
        self.mentions
            .iter()
            .filter(|rule| {
                !rule.role_id.is_empty() && rule.role_id.chars().all(|c| c.is_ascii_digit())
            })
            .find(|rule| slug.starts_with(&rule.prefix.to_lowercase()))
            .map(|rule| format!("<@&{}> ", rule.role_id))
            .unwrap_or_default()
    }

    fn embed(&self, title: String, content: &ExtractedContent) -> Embed {
        Embed {
            title,
            url: content.url.clone(),
            description: truncate_description(&content.body_text, self.max_chars),
        }
    }

    /// A new announcement found by the poll loop.
    pub fn new_item(&self, content: &ExtractedContent, category_link: Option<&str>) -> Notification {
        let mention = self.mention_for(category_link.unwrap_or(&content.url));
        if content.body_text.is_empty() {
            return Notification::text(format!(
                "{mention}[AtCoder] New announcement: {}\n{}",
                content.title, content.url
            ));
        }
        Notification::with_embed(
            format!("{mention}[AtCoder] New announcement"),
            self.embed(content.title.clone(), content),
        )
    }

    /// The watched page changed but no announcement could be identified.
    pub fn page_changed(&self, home_url: &str) -> Notification {
        Notification::text(format!("The watched page was updated: {home_url}"))
    }

    /// The newest panel announcement, sent on demand or at startup.
    pub fn latest(&self, content: &ExtractedContent, test_send: bool) -> Notification {
        let tag = if test_send { "[Test] " } else { "" };
        if content.body_text.is_empty() {
            return Notification::text(format!(
                "{tag}Latest contest announcement: {} (the body could not be retrieved)",
                content.url
            ));
        }
        Notification::with_embed(
            format!("{tag}[AtCoder] Sending the latest contest announcement"),
            self.embed(
                format!("Latest contest announcement: {}", content.title),
                content,
            ),
        )
    }

    /// Result of a series query.
    pub fn series(&self, series: Series, content: &ExtractedContent) -> Notification {
        Notification::with_embed(
            format!("[AtCoder] Latest {series} announcement"),
            self.embed(
                format!("Latest {series} announcement: {}", content.title),
                content,
            ),
        )
    }

    /// A series query found nothing within its scan budget.
    pub fn series_missing(&self, series: Series) -> Notification {
        Notification::text(format!("No recent {series} announcement was found."))
    }
}
