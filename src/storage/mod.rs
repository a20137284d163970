// Storage module - sled-backed ledger snapshots

mod store;

pub use store::{LedgerStore, StorageStats, StoreError};
