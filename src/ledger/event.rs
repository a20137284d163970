// Ledger events - append-only record of successful mutations

use super::Amount;
use crate::identity::Address;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Balance moved between accounts (direct or delegated)
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// Allowance set by `owner` for `spender`
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    /// New units issued to `to`
    Mint {
        caller: Address,
        to: Address,
        amount: Amount,
        timestamp: u64,
    },
    MintAmountChanged {
        amount: Amount,
    },
    MintDelayChanged {
        delay_secs: u64,
    },
}

impl LedgerEvent {
    /// Accounts touched by this event
    pub fn involves(&self, account: &Address) -> bool {
        match self {
            LedgerEvent::Transfer { from, to, .. } => from == account || to == account,
            LedgerEvent::Approval { owner, spender, .. } => owner == account || spender == account,
            LedgerEvent::Mint { caller, to, .. } => caller == account || to == account,
            LedgerEvent::MintAmountChanged { .. } | LedgerEvent::MintDelayChanged { .. } => false,
        }
    }
}
