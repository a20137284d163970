// Ledger module - THE BOOKS
// Balances, allowances, issuance config and the clock that paces minting

mod amount;
mod clock;
mod config;
mod event;
mod shared;
mod state;

pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, GenesisConfig, DEFAULT_DECIMALS, DEFAULT_INITIAL_SUPPLY, DEFAULT_MINT_DELAY_SECS,
    DEFAULT_NAME, DEFAULT_SYMBOL, MAX_DECIMALS,
};
pub use event::LedgerEvent;
pub use shared::SharedLedger;
pub use state::{Ledger, LedgerError, LedgerState, Role, TokenMetadata};
