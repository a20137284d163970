// Ledger State - balances, allowances and rate-limited issuance
//
// Every operation validates all of its preconditions before the first write,
// so a failed call leaves the ledger exactly as it was.

use crate::identity::Address;
use crate::ledger::clock::{Clock, SystemClock};
use crate::ledger::config::{ConfigError, GenesisConfig, MAX_DECIMALS};
use crate::ledger::event::LedgerEvent;
use crate::ledger::Amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Role required by a privileged operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Errors that can occur during ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: {account} has {available}, requested {requested}")]
    InsufficientBalance {
        account: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance: {spender} may spend {available} of {owner}, requested {requested}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("Unauthorized: {caller} does not hold the {required_role} role")]
    Unauthorized { caller: Address, required_role: Role },

    #[error("Minting is not enabled")]
    MintingDisabled,

    #[error("Mint cooldown active for {account} until {next_eligible_time}")]
    MintCooldownActive {
        account: Address,
        next_eligible_time: u64,
    },

    #[error("Invalid spender: {spender}")]
    InvalidSpender { spender: Address },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed")]
    DeserializationFailed,

    #[error("Corrupt ledger state: {0}")]
    CorruptState(String),
}

/// Static token metadata, fixed at genesis
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Serializable ledger contents.
///
/// Zero balances and zero allowances are never stored, so two states that
/// answer every query the same way also encode to the same bytes. Events are
/// not part of the state; hosts drain them from the `Ledger` and keep them
/// wherever they like.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    metadata: TokenMetadata,
    admin: Address,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
    /// (owner, spender) -> remaining allowance
    allowances: BTreeMap<(Address, Address), Amount>,
    mint_amount: Amount,
    mint_delay: u64,
    last_mint: BTreeMap<Address, u64>,
}

impl LedgerState {
    /// Build the genesis state: the whole initial supply belongs to `deployer`,
    /// who also becomes the admin. Minting starts disabled.
    pub fn genesis(config: &GenesisConfig, deployer: Address) -> Result<Self, ConfigError> {
        let initial_supply = config.validate()?;

        let mut balances = BTreeMap::new();
        if !initial_supply.is_zero() {
            balances.insert(deployer, initial_supply);
        }

        Ok(Self {
            metadata: TokenMetadata {
                name: config.name.clone(),
                symbol: config.symbol.clone(),
                decimals: config.decimals,
            },
            admin: deployer,
            total_supply: initial_supply,
            balances,
            allowances: BTreeMap::new(),
            mint_amount: Amount::ZERO,
            mint_delay: config.mint_delay_secs,
            last_mint: BTreeMap::new(),
        })
    }

    /// Get the token metadata
    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Check the invariants a decoded state must satisfy: balances sum to the
    /// total supply and no zero entry is stored.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.metadata.decimals > MAX_DECIMALS {
            return Err(LedgerError::CorruptState(format!(
                "decimals {} out of range",
                self.metadata.decimals
            )));
        }

        let mut sum = Amount::ZERO;
        for (account, amount) in &self.balances {
            if amount.is_zero() {
                return Err(LedgerError::CorruptState(format!("zero balance stored for {}", account)));
            }
            sum = sum
                .checked_add(*amount)
                .ok_or_else(|| LedgerError::CorruptState("balance sum overflows".into()))?;
        }
        if sum != self.total_supply {
            return Err(LedgerError::CorruptState(format!(
                "balances sum to {} but total supply is {}",
                sum, self.total_supply
            )));
        }

        if let Some(((owner, spender), _)) = self.allowances.iter().find(|(_, a)| a.is_zero()) {
            return Err(LedgerError::CorruptState(format!(
                "zero allowance stored for {} -> {}",
                owner, spender
            )));
        }
        Ok(())
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        postcard::to_allocvec(self).map_err(|e| LedgerError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from bytes and validate the result
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let state: LedgerState =
            postcard::from_bytes(bytes).map_err(|_| LedgerError::DeserializationFailed)?;
        state.validate()?;
        Ok(state)
    }
}

/// The ledger: state, the clock used for mint cooldowns, and events not yet
/// drained by the host
pub struct Ledger {
    state: LedgerState,
    clock: Arc<dyn Clock>,
    pending: Vec<LedgerEvent>,
}

impl Ledger {
    /// Create a ledger at genesis using the system clock
    pub fn new(config: &GenesisConfig, deployer: Address) -> Result<Self, ConfigError> {
        Self::with_clock(config, deployer, Arc::new(SystemClock))
    }

    /// Create a ledger at genesis with an injected clock
    pub fn with_clock(
        config: &GenesisConfig,
        deployer: Address,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let state = LedgerState::genesis(config, deployer)?;
        info!(
            name = %state.metadata.name,
            symbol = %state.metadata.symbol,
            admin = %deployer,
            supply = %state.total_supply,
            "ledger created"
        );
        Ok(Self {
            state,
            clock,
            pending: Vec::new(),
        })
    }

    /// Restore a ledger from a previously taken snapshot
    pub fn from_state(state: LedgerState, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        state.validate()?;
        Ok(Self {
            state,
            clock,
            pending: Vec::new(),
        })
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> LedgerState {
        self.state.clone()
    }

    /// Borrow the current state
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.state.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.state.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.state.metadata.decimals
    }

    pub fn total_supply(&self) -> Amount {
        self.state.total_supply
    }

    /// Balance of an account (zero for accounts never seen)
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.balances.get(account).copied().unwrap_or_default()
    }

    /// Amount `spender` may still move out of `owner`'s balance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// The account allowed to change issuance settings
    pub fn admin(&self) -> &Address {
        &self.state.admin
    }

    /// Units credited per mint (zero means minting is disabled)
    pub fn mint_amount(&self) -> Amount {
        self.state.mint_amount
    }

    /// Minimum seconds between two mints to the same account
    pub fn mint_delay(&self) -> u64 {
        self.state.mint_delay
    }

    /// Time of the last successful mint to `account`, if any
    pub fn last_mint(&self, account: &Address) -> Option<u64> {
        self.state.last_mint.get(account).copied()
    }

    /// Earliest time at which `account` may receive another mint.
    /// `None` if it has never minted.
    pub fn next_mint_time(&self, account: &Address) -> Option<u64> {
        self.last_mint(account)
            .map(|last| last.saturating_add(self.state.mint_delay))
    }

    /// All accounts with a non-zero balance, in address order
    pub fn holders(&self) -> Vec<(Address, Amount)> {
        self.state
            .balances
            .iter()
            .map(|(account, amount)| (*account, *amount))
            .collect()
    }

    /// Events emitted since the last drain, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        &self.pending
    }

    /// Take the events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.pending)
    }

    // ========================================================================
    // TRANSFERS
    // ========================================================================

    /// Move `amount` from the caller to `to`
    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.move_funds(caller, to, amount).inspect_err(|e| {
            warn!(from = %caller, to = %to, %amount, error = %e, "transfer rejected");
        })?;

        self.pending.push(LedgerEvent::Transfer {
            from: *caller,
            to: *to,
            amount,
        });
        debug!(from = %caller, to = %to, %amount, "transfer");
        Ok(())
    }

    /// Set the allowance of `spender` over the caller's balance (absolute, not additive)
    pub fn approve(&mut self, caller: &Address, spender: &Address, amount: Amount) -> Result<(), LedgerError> {
        if spender.is_zero() {
            warn!(owner = %caller, "approve rejected: zero spender");
            return Err(LedgerError::InvalidSpender { spender: *spender });
        }

        self.set_allowance(caller, spender, amount);
        self.pending.push(LedgerEvent::Approval {
            owner: *caller,
            spender: *spender,
            amount,
        });
        debug!(owner = %caller, spender = %spender, %amount, "approve");
        Ok(())
    }

    /// Spend the caller's allowance over `from` by moving `amount` to `to`.
    ///
    /// The allowance is checked before the balance, so when both fall short
    /// the caller sees `InsufficientAllowance`.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let result = self.checked_allowance_spend(caller, from, amount).and_then(|remaining| {
            self.move_funds(from, to, amount)?;
            self.set_allowance(from, caller, remaining);
            Ok(())
        });

        if let Err(e) = &result {
            warn!(spender = %caller, from = %from, to = %to, %amount, error = %e, "transfer_from rejected");
            return result;
        }

        self.pending.push(LedgerEvent::Transfer {
            from: *from,
            to: *to,
            amount,
        });
        debug!(spender = %caller, from = %from, to = %to, %amount, "transfer_from");
        Ok(())
    }

    // ========================================================================
    // ISSUANCE
    // ========================================================================

    /// Set the amount credited per mint. Zero disables minting.
    pub fn set_mint_amount(&mut self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.require_admin(caller)?;

        self.state.mint_amount = amount;
        self.pending.push(LedgerEvent::MintAmountChanged { amount });
        info!(%amount, "mint amount changed");
        Ok(())
    }

    /// Set the per-account mint cooldown in seconds
    pub fn set_mint_delay(&mut self, caller: &Address, delay_secs: u64) -> Result<(), LedgerError> {
        self.require_admin(caller)?;

        self.state.mint_delay = delay_secs;
        self.pending.push(LedgerEvent::MintDelayChanged { delay_secs });
        info!(delay_secs, "mint delay changed");
        Ok(())
    }

    /// Credit the configured mint amount to `to`.
    ///
    /// Anyone may call this. The cooldown is tracked per recipient, not per
    /// caller. Returns the amount minted.
    pub fn mint(&mut self, caller: &Address, to: &Address) -> Result<Amount, LedgerError> {
        let amount = self.state.mint_amount;
        if amount.is_zero() {
            warn!(caller = %caller, to = %to, "mint rejected: minting disabled");
            return Err(LedgerError::MintingDisabled);
        }

        let now = self.clock.now();
        if let Some(next_eligible_time) = self.next_mint_time(to) {
            if now < next_eligible_time {
                warn!(to = %to, now, next_eligible_time, "mint rejected: cooldown active");
                return Err(LedgerError::MintCooldownActive {
                    account: *to,
                    next_eligible_time,
                });
            }
        }

        let credited = self
            .state
            .total_supply
            .checked_add(amount)
            .zip(self.balance_of(to).checked_add(amount));
        let Some((supply, balance)) = credited else {
            warn!(to = %to, %amount, "mint rejected: overflow");
            return Err(LedgerError::Overflow);
        };

        self.state.total_supply = supply;
        self.set_balance(to, balance);
        self.state.last_mint.insert(*to, now);
        self.pending.push(LedgerEvent::Mint {
            caller: *caller,
            to: *to,
            amount,
            timestamp: now,
        });
        debug!(caller = %caller, to = %to, %amount, now, "mint");
        Ok(amount)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn require_admin(&self, caller: &Address) -> Result<(), LedgerError> {
        if caller != &self.state.admin {
            warn!(caller = %caller, "admin operation rejected");
            return Err(LedgerError::Unauthorized {
                caller: *caller,
                required_role: Role::Admin,
            });
        }
        Ok(())
    }

    /// Allowance left after spending `amount`, or the shortfall error
    fn checked_allowance_spend(
        &self,
        spender: &Address,
        owner: &Address,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let available = self.allowance(owner, spender);
        available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                requested: amount,
                available,
            })
    }

    /// Debit `from` and credit `to`. Nothing is written unless both sides succeed.
    fn move_funds(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(from);
        let from_balance = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: *from,
                requested: amount,
                available,
            })?;

        if from == to {
            return Ok(());
        }

        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.set_balance(from, from_balance);
        self.set_balance(to, to_balance);
        Ok(())
    }

    fn set_balance(&mut self, account: &Address, amount: Amount) {
        if amount.is_zero() {
            self.state.balances.remove(account);
        } else {
            self.state.balances.insert(*account, amount);
        }
    }

    fn set_allowance(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        if amount.is_zero() {
            self.state.allowances.remove(&(*owner, *spender));
        } else {
            self.state.allowances.insert((*owner, *spender), amount);
        }
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("state", &self.state)
            .field("now", &self.clock.now())
            .finish()
    }
}
