use std::sync::Mutex;

use crate::crypto::SignedRoot;
use crate::error::{Result, SealError};
use crate::store::RootStore;

/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryRootStore {
    records: Mutex<Vec<SignedRoot>>,
}

impl MemoryRootStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record in insertion order.
    pub fn records(&self) -> Vec<SignedRoot> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RootStore for MemoryRootStore {
    fn store(&self, record: &SignedRoot) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SealError::StorageError("Record store lock poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }
}
