//! Change record persistence.
//!
//! A single slot holding the last observed [`ChangeRecord`]. There is no
//! history: every write overwrites the slot.
//!
//! Reads never fail. A missing, unreadable or garbled slot reads as empty,
//! which the poll loop treats as a cold start.

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ChangeRecord;

// Re-export for convenience
pub use local::FileChangeStore;
pub use memory::MemoryChangeStore;

/// Trait for change record backends.
#[async_trait]
pub trait ChangeStore: Send + Sync {
    /// Current record, or `None` when empty or unreadable.
    async fn read(&self) -> Option<ChangeRecord>;

    /// Overwrite the record.
    async fn write(&self, record: &ChangeRecord) -> Result<()>;
}
