//! Application configuration structures.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Watched page and its markup landmarks
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Poll loop settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Notification delivery settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply environment variable overrides on top of file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ATCODER_URL") {
            self.source.home_url = url;
        }
        if let Some(raw) = lookup("POLL_INTERVAL") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.watch.poll_interval_secs = secs,
                Err(e) => log::warn!("Ignoring POLL_INTERVAL={raw:?}: {e}"),
            }
        }
        if let Some(path) = lookup("STATE_FILE") {
            self.watch.state_file = PathBuf::from(path);
        }
        if let Some(url) = lookup("DISCORD_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                self.notify.webhook_url = Some(url.trim().to_string());
            }
        }
        if let Some(role_id) = lookup("ABC_ROLE_ID") {
            self.notify.mentions.retain(|m| m.prefix != "abc");
            self.notify.mentions.push(MentionRule {
                prefix: "abc".to_string(),
                role_id: role_id.trim().to_string(),
            });
        }
        if let Some(flag) = lookup("SEND_LATEST_ON_STARTUP") {
            self.watch.send_latest_on_startup =
                matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.home_url)?;
        url::Url::parse(&self.source.site_origin)?;
        if self.source.panel_heading.trim().is_empty() {
            return Err(AppError::validation("source.panel_heading is empty"));
        }
        if !self.source.post_path_prefix.starts_with('/') {
            return Err(AppError::validation(
                "source.post_path_prefix must start with '/'",
            ));
        }
        if !self.source.category_root.starts_with('/') {
            return Err(AppError::validation(
                "source.category_root must start with '/'",
            ));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.watch.poll_interval_secs == 0 {
            return Err(AppError::validation("watch.poll_interval_secs must be > 0"));
        }
        if self.watch.series_scan_limit == 0 {
            return Err(AppError::validation("watch.series_scan_limit must be > 0"));
        }
        if self.notify.max_description_chars == 0 {
            return Err(AppError::validation(
                "notify.max_description_chars must be > 0",
            ));
        }
        if let Some(webhook) = &self.notify.webhook_url {
            url::Url::parse(webhook)?;
        }
        Ok(())
    }

    /// Location of the change record. Relative paths sit next to the executable.
    pub fn state_path(&self) -> PathBuf {
        let path = &self.watch.state_file;
        if path.is_absolute() {
            return path.clone();
        }
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(path)))
            .unwrap_or_else(|| path.clone())
    }
}

/// The watched page and the landmarks used to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page polled for new announcements
    #[serde(default = "defaults::home_url")]
    pub home_url: String,

    /// Origin used to absolutize relative links
    #[serde(default = "defaults::site_origin")]
    pub site_origin: String,

    /// Heading phrase identifying the announcements panel
    #[serde(default = "defaults::panel_heading")]
    pub panel_heading: String,

    /// Stable id attribute of the panel container
    #[serde(default = "defaults::panel_id")]
    pub panel_id: String,

    /// Path prefix of announcement detail pages
    #[serde(default = "defaults::post_path_prefix")]
    pub post_path_prefix: String,

    /// Path prefix of category (contest) pages
    #[serde(default = "defaults::category_root")]
    pub category_root: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            home_url: defaults::home_url(),
            site_origin: defaults::site_origin(),
            panel_heading: defaults::panel_heading(),
            panel_id: defaults::panel_id(),
            post_path_prefix: defaults::post_path_prefix(),
            category_root: defaults::category_root(),
        }
    }
}

impl SourceConfig {
    /// Site origin without a trailing slash.
    pub fn origin(&self) -> &str {
        self.site_origin.trim_end_matches('/')
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Seconds to sleep between poll cycles
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// File holding the last observed change record
    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,

    /// Category prefix a new post must link to (empty = any category)
    #[serde(default)]
    pub target_category: String,

    /// How many recent posts a series query inspects
    #[serde(default = "defaults::series_scan_limit")]
    pub series_scan_limit: usize,

    /// Announce the newest post once before polling starts
    #[serde(default)]
    pub send_latest_on_startup: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
            state_file: defaults::state_file(),
            target_category: String::new(),
            series_scan_limit: defaults::series_scan_limit(),
            send_latest_on_startup: false,
        }
    }
}

/// Notification delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Discord webhook; notifications are only logged when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Display budget for embed descriptions, in characters
    #[serde(default = "defaults::max_description_chars")]
    pub max_description_chars: usize,

    /// Role mentions keyed by category slug prefix
    #[serde(default)]
    pub mentions: Vec<MentionRule>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            max_description_chars: defaults::max_description_chars(),
            mentions: Vec::new(),
        }
    }
}

/// Mention a role when the announced category slug starts with `prefix`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MentionRule {
    pub prefix: String,
    pub role_id: String,
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn home_url() -> String {
        "https://atcoder.jp/home?lang=ja".into()
    }
    pub fn site_origin() -> String {
        "https://atcoder.jp".into()
    }
    pub fn panel_heading() -> String {
        "直近のコンテストの告知".into()
    }
    pub fn panel_id() -> String {
        "contest-table-upcoming".into()
    }
    pub fn post_path_prefix() -> String {
        "/posts/".into()
    }
    pub fn category_root() -> String {
        "/contests/".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "AtCoderWatchBot/1.0 (+https://example.local/)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Watch defaults
    pub fn poll_interval() -> u64 {
        300
    }
    pub fn state_file() -> PathBuf {
        PathBuf::from(".last_atcoder_hash")
    }
    pub fn series_scan_limit() -> usize {
        40
    }

    // Notify defaults
    pub fn max_description_chars() -> usize {
        1900
    }
}
