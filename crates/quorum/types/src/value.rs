//! Value transfer primitive
//!
//! Deposits and bonds are pulled from the caller and refunds are pushed back
//! through a `ValueLedger`. A failed push fails the whole operation; there is
//! no silent drop.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::error::TransferError;
use crate::ids::{Address, Amount};

/// Transferable value as provided by the host environment.
pub trait ValueLedger: Send + Sync {
    /// Current balance of an account.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Move `amount` from `from` to `to`. Either fully applies or fails.
    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError>;
}

/// In-memory ledger for development and tests.
pub struct InMemoryValueLedger {
    balances: RwLock<HashMap<Address, Amount>>,
    rejecting: RwLock<HashSet<Address>>,
}

impl InMemoryValueLedger {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            rejecting: RwLock::new(HashSet::new()),
        }
    }

    /// Credit an account out of thin air (genesis funding).
    pub fn mint(&self, account: Address, amount: Amount) {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let entry = balances.entry(account).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Make `account` refuse every incoming transfer.
    pub fn reject_incoming(&self, account: Address) {
        self.rejecting
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account);
    }

    /// Undo `reject_incoming`.
    pub fn accept_incoming(&self, account: &Address) {
        self.rejecting
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account);
    }
}

impl Default for InMemoryValueLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueLedger for InMemoryValueLedger {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), TransferError> {
        if amount == 0 {
            return Ok(());
        }

        if self
            .rejecting
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(to)
        {
            return Err(TransferError::Rejected(*to));
        }

        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: *from,
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(TransferError::Overflow(*to))?;

        balances.insert(*from, available - amount);
        balances.insert(*to, credited);
        Ok(())
    }
}
