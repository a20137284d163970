// LoveCoin - single-asset token ledger
//
// Direct and delegated transfers plus permissioned, rate-limited minting.
// Callers are authenticated upstream; the ledger trusts the `caller` it is given.

pub mod identity;
pub mod ledger;
pub mod storage;

pub use identity::Address;
pub use ledger::{Amount, GenesisConfig, Ledger, LedgerError, SharedLedger};
