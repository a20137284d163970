// LedgerStore - Persistent snapshot storage using sled
//
// The ledger core never touches disk. This store is what a host (the CLI)
// uses to keep a ledger between invocations. The snapshot lives under one key
// and holds no history; events are appended under their own sequence keys.

use crate::ledger::{LedgerError, LedgerEvent, LedgerState};
use std::path::Path;
use thiserror::Error;

/// Key prefixes for organizing data
mod keys {
    pub const LEDGER_STATE: &[u8] = b"ledger:state";
    pub const EVENT_PREFIX: &[u8] = b"events:";
}

/// Big-endian sequence numbers keep `scan_prefix` in append order
fn event_key(seq: u64) -> Vec<u8> {
    [keys::EVENT_PREFIX, &seq.to_be_bytes()].concat()
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent key-value store for ledger snapshots.
///
/// Writes are durable after `flush`.
pub struct LedgerStore {
    db: sled::Db,
}

impl LedgerStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }

    // ========================================================================
    // LEDGER STATE
    // ========================================================================

    /// Save the ledger state, replacing any previous snapshot
    pub fn save_state(&self, state: &LedgerState) -> Result<(), StoreError> {
        self.db.insert(keys::LEDGER_STATE, encode_state(state)?)?;
        Ok(())
    }

    /// Save the state and append `events` in one atomic batch
    pub fn commit(&self, state: &LedgerState, events: &[LedgerEvent]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        batch.insert(keys::LEDGER_STATE, encode_state(state)?);
        for event in events {
            batch.insert(event_key(self.db.generate_id()?), encode_event(event)?);
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Load the ledger state, if one was saved
    pub fn load_state(&self) -> Result<Option<LedgerState>, StoreError> {
        match self.db.get(keys::LEDGER_STATE)? {
            Some(bytes) => {
                let state = LedgerState::from_bytes(&bytes)
                    .map_err(|e: LedgerError| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Remove the saved ledger state
    pub fn clear_state(&self) -> Result<(), StoreError> {
        self.db.remove(keys::LEDGER_STATE)?;
        Ok(())
    }

    // ========================================================================
    // EVENT LOG
    // ========================================================================

    /// Append events after any already stored
    pub fn append_events(&self, events: &[LedgerEvent]) -> Result<(), StoreError> {
        for event in events {
            self.db.insert(event_key(self.db.generate_id()?), encode_event(event)?)?;
        }
        Ok(())
    }

    /// Load every stored event, oldest first
    pub fn load_events(&self) -> Result<Vec<LedgerEvent>, StoreError> {
        let mut events = Vec::new();
        for result in self.db.scan_prefix(keys::EVENT_PREFIX) {
            let (_, bytes) = result?;
            let event = postcard::from_bytes(&bytes)
                .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }

    /// Number of stored events
    pub fn event_count(&self) -> usize {
        self.db.scan_prefix(keys::EVENT_PREFIX).count()
    }
}

fn encode_state(state: &LedgerState) -> Result<Vec<u8>, StoreError> {
    state.to_bytes().map_err(|e| match e {
        LedgerError::SerializationFailed(msg) => StoreError::SerializationFailed(msg),
        other => StoreError::SerializationFailed(other.to_string()),
    })
}

fn encode_event(event: &LedgerEvent) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(event).map_err(|e| StoreError::SerializationFailed(e.to_string()))
}
