// Genesis configuration for a new ledger

use super::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_NAME: &str = "LoveCoin";
pub const DEFAULT_SYMBOL: &str = "LOVE";
pub const DEFAULT_DECIMALS: u8 = 18;
/// Whole tokens credited to the deployer at genesis
pub const DEFAULT_INITIAL_SUPPLY: u128 = 10_000_000;
/// One day
pub const DEFAULT_MINT_DELAY_SECS: u64 = 60 * 60 * 24;

/// Largest `decimals` for which `10^decimals` still fits in an `Amount`
pub const MAX_DECIMALS: u8 = 38;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Token name cannot be empty")]
    EmptyName,

    #[error("Token symbol cannot be empty")]
    EmptySymbol,

    #[error("Too many decimals: {0} (max 38)")]
    TooManyDecimals(u8),

    #[error("Initial supply of {units} tokens overflows at {decimals} decimals")]
    SupplyOverflow { units: u128, decimals: u8 },
}

/// Parameters fixed when the ledger is created
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Initial supply in whole tokens (scaled by `decimals`)
    pub initial_supply: u128,
    /// Cooldown between mints to the same account, in seconds
    pub mint_delay_secs: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
            initial_supply: DEFAULT_INITIAL_SUPPLY,
            mint_delay_secs: DEFAULT_MINT_DELAY_SECS,
        }
    }
}

impl GenesisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_initial_supply(mut self, whole_tokens: u128) -> Self {
        self.initial_supply = whole_tokens;
        self
    }

    pub fn with_mint_delay_secs(mut self, secs: u64) -> Self {
        self.mint_delay_secs = secs;
        self
    }

    /// Check the configuration and return the initial supply in base units
    pub fn validate(&self) -> Result<Amount, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::TooManyDecimals(self.decimals));
        }
        Amount::from_whole(self.initial_supply, self.decimals).ok_or(ConfigError::SupplyOverflow {
            units: self.initial_supply,
            decimals: self.decimals,
        })
    }
}
