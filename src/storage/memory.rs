//! In-memory change store.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ChangeRecord;
use crate::storage::ChangeStore;

/// Change store kept in process memory; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryChangeStore {
    record: Mutex<Option<ChangeRecord>>,
    writes: Mutex<usize>,
}

impl MemoryChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: ChangeRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            writes: Mutex::new(0),
        }
    }

    /// Number of writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl ChangeStore for MemoryChangeStore {
    async fn read(&self) -> Option<ChangeRecord> {
        self.record.lock().ok().and_then(|r| r.clone())
    }

    async fn write(&self, record: &ChangeRecord) -> Result<()> {
        if let Ok(mut slot) = self.record.lock() {
            *slot = Some(record.clone());
        }
        if let Ok(mut n) = self.writes.lock() {
            *n += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = MemoryChangeStore::new();
        assert!(store.read().await.is_none());

        store.write(&ChangeRecord::Item("1".into())).await.unwrap();
        store.write(&ChangeRecord::Item("2".into())).await.unwrap();

        assert_eq!(store.read().await, Some(ChangeRecord::Item("2".into())));
        assert_eq!(store.write_count(), 2);
    }
}
