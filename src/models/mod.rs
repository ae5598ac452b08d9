// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;
mod record;
mod series;

// Re-export all public types
pub use config::{Config, HttpConfig, MentionRule, NotifyConfig, SourceConfig, WatchConfig};
pub use item::{CandidateItem, ClassificationResult, ExtractedContent, external_id};
pub use record::ChangeRecord;
pub use series::Series;
