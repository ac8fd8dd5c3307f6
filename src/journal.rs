//! Operation snapshot journal
//!
//! One entry per operation name; each save replaces the previous snapshot.
//! Terminal snapshots are kept until removed, so a finished operation's
//! outcome can still be read after a restart. Call `prune_terminal` to drop
//! them once they have been consumed.

use serde::{Deserialize, Serialize};

/// Snapshot storage trait, keyed by operation name
pub trait OperationJournal: Send + Sync + 'static {
    fn save(&self, name: &str, snapshot: serde_json::Value) -> Result<u64, JournalError>;
    fn load(&self, name: &str) -> Result<JournalEntry, JournalError>;
    fn list_operations(&self) -> Result<Vec<Box<str>>, JournalError>;
    fn remove(&self, name: &str) -> Result<(), JournalError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub recorded_at_millis: u64,
    pub snapshot: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("Storage error: {0}")]
    Storage(Box<str>),
    #[error("Not found: {0}")]
    NotFound(Box<str>),
    #[error("Snapshot codec error: {0}")]
    Codec(#[from] crate::CodecError),
}

/// In-memory journal for testing
pub struct InMemoryJournal {
    data: std::sync::RwLock<std::collections::HashMap<Box<str>, JournalEntry>>,
    counter: std::sync::atomic::AtomicU64,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self {
            data: std::sync::RwLock::new(std::collections::HashMap::new()),
            counter: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

impl OperationJournal for InMemoryJournal {
    fn save(&self, name: &str, snapshot: serde_json::Value) -> Result<u64, JournalError> {
        let seq = self.counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let entry = JournalEntry {
            sequence: seq,
            recorded_at_millis: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
            snapshot,
        };

        let mut data = self.data.write().map_err(|e| JournalError::Storage(e.to_string().into()))?;
        data.insert(name.into(), entry);

        Ok(seq)
    }

    fn load(&self, name: &str) -> Result<JournalEntry, JournalError> {
        let data = self.data.read().map_err(|e| JournalError::Storage(e.to_string().into()))?;
        data.get(name)
            .cloned()
            .ok_or_else(|| JournalError::NotFound(name.into()))
    }

    fn list_operations(&self) -> Result<Vec<Box<str>>, JournalError> {
        let data = self.data.read().map_err(|e| JournalError::Storage(e.to_string().into()))?;
        let mut names: Vec<Box<str>> = data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn remove(&self, name: &str) -> Result<(), JournalError> {
        let mut data = self.data.write().map_err(|e| JournalError::Storage(e.to_string().into()))?;
        data.remove(name);
        Ok(())
    }
}

impl Default for InMemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}
