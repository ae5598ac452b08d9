//! Utility functions and helpers.

pub mod http;

use sha2::{Digest, Sha256};
use url::Url;

/// Resolve an href and return it only if it stays on the base host.
pub fn resolve_on_host(base: &Url, href: &str) -> Option<Url> {
    let resolved = base.join(href.trim()).ok()?;
    if resolved.host_str() == base.host_str() {
        Some(resolved)
    } else {
        None
    }
}

/// Hex-encoded SHA-256 of a page body.
pub fn page_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Concatenate the trimmed text pieces of an element, skipping blanks.
pub fn joined_text<'a>(pieces: impl Iterator<Item = &'a str>, separator: &str) -> String {
    pieces
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
