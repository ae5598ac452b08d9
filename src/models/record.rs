//! Persisted change record.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Last observed state of the watched page.
///
/// Serialized as `item:<id>` or `hash:<hex>`; the two schemes are never
/// compared with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    /// Newest announcement id from the panel
    Item(String),
    /// SHA-256 of the whole page, used when no announcement was found
    Hash(String),
}

impl ChangeRecord {
    const ITEM_PREFIX: &'static str = "item:";
    const HASH_PREFIX: &'static str = "hash:";

    pub fn as_item(&self) -> Option<&str> {
        match self {
            Self::Item(id) => Some(id),
            Self::Hash(_) => None,
        }
    }

    pub fn as_hash(&self) -> Option<&str> {
        match self {
            Self::Hash(digest) => Some(digest),
            Self::Item(_) => None,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Item(_) => "item",
            Self::Hash(_) => "hash",
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(id) => write!(f, "{}{}", Self::ITEM_PREFIX, id),
            Self::Hash(digest) => write!(f, "{}{}", Self::HASH_PREFIX, digest),
        }
    }
}

impl FromStr for ChangeRecord {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let record = if let Some(id) = raw.strip_prefix(Self::ITEM_PREFIX) {
            Self::Item(id.to_string())
        } else if let Some(digest) = raw.strip_prefix(Self::HASH_PREFIX) {
            Self::Hash(digest.to_string())
        } else {
            return Err(AppError::validation(format!(
                "unknown change record scheme: {raw:?}"
            )));
        };

        match &record {
            Self::Item(v) | Self::Hash(v) if v.is_empty() || v.contains('\n') => Err(
                AppError::validation(format!("malformed change record: {raw:?}")),
            ),
            _ => Ok(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        let record: ChangeRecord = "item:999".parse().unwrap();
        assert_eq!(record, ChangeRecord::Item("999".to_string()));
        assert_eq!(record.to_string(), "item:999");
    }

    #[test]
    fn test_parse_hash_with_trailing_newline() {
        let record: ChangeRecord = "hash:abc123\n".parse().unwrap();
        assert_eq!(record.as_hash(), Some("abc123"));
        assert_eq!(record.as_item(), None);
    }

    #[test]
    fn test_rejects_unknown_scheme_and_empty_value() {
        assert!("contest:999".parse::<ChangeRecord>().is_err());
        assert!("item:".parse::<ChangeRecord>().is_err());
        assert!("".parse::<ChangeRecord>().is_err());
    }
}
