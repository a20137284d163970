// SharedLedger - single-writer handle for multi-threaded hosts

use crate::identity::Address;
use crate::ledger::{Amount, Ledger, LedgerError, LedgerEvent, LedgerState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle that serializes every ledger call behind one lock.
///
/// Reads take the same lock as writes, so a query never observes half of
/// an operation.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    // Ledger operations check everything before writing, so a panic while
    // the lock is held cannot leave a half-applied mutation behind.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the ledger
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.lock().transfer(caller, to, amount)
    }

    pub fn approve(&self, caller: &Address, spender: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.lock().approve(caller, spender, amount)
    }

    pub fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.lock().transfer_from(caller, from, to, amount)
    }

    pub fn set_mint_amount(&self, caller: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.lock().set_mint_amount(caller, amount)
    }

    pub fn set_mint_delay(&self, caller: &Address, delay_secs: u64) -> Result<(), LedgerError> {
        self.lock().set_mint_delay(caller, delay_secs)
    }

    pub fn mint(&self, caller: &Address, to: &Address) -> Result<Amount, LedgerError> {
        self.lock().mint(caller, to)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.lock().balance_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.lock().allowance(owner, spender)
    }

    pub fn total_supply(&self) -> Amount {
        self.lock().total_supply()
    }

    /// Consistent copy of the whole state
    pub fn snapshot(&self) -> LedgerState {
        self.lock().snapshot()
    }

    /// Take the events emitted since the last drain
    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        self.lock().drain_events()
    }
}
