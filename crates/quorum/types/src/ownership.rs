//! NFT-style ownership accounting
//!
//! Units and services are owned tokens: minting credits the owner's balance,
//! transfers move both the owner record and the balances.

use std::collections::HashMap;
use std::hash::Hash;

use crate::ids::Address;

/// Owner and balance bookkeeping for a family of token ids.
#[derive(Clone, Debug)]
pub struct OwnershipLedger<Id> {
    owners: HashMap<Id, Address>,
    balances: HashMap<Address, u64>,
}

impl<Id: Copy + Eq + Hash> OwnershipLedger<Id> {
    pub fn new() -> Self {
        Self {
            owners: HashMap::new(),
            balances: HashMap::new(),
        }
    }

    /// Record `owner` as the holder of a freshly created id.
    pub fn mint(&mut self, id: Id, owner: Address) {
        if let Some(previous) = self.owners.insert(id, owner) {
            self.debit(&previous);
        }
        *self.balances.entry(owner).or_insert(0) += 1;
    }

    pub fn owner_of(&self, id: &Id) -> Option<Address> {
        self.owners.get(id).copied()
    }

    /// Number of ids held by `owner`.
    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Move `id` to `to`, returning the previous owner. `None` if the id was never minted.
    pub fn transfer(&mut self, id: Id, to: Address) -> Option<Address> {
        let previous = self.owners.get(&id).copied()?;
        self.debit(&previous);
        self.owners.insert(id, to);
        *self.balances.entry(to).or_insert(0) += 1;
        Some(previous)
    }

    fn debit(&mut self, owner: &Address) {
        if let Some(balance) = self.balances.get_mut(owner) {
            *balance = balance.saturating_sub(1);
        }
    }
}

impl<Id: Copy + Eq + Hash> Default for OwnershipLedger<Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UnitId;

    #[test]
    fn mint_increments_balance() {
        let owner = Address::from_label("owner");
        let mut ledger = OwnershipLedger::new();
        ledger.mint(UnitId::new(1), owner);
        ledger.mint(UnitId::new(2), owner);

        assert_eq!(ledger.balance_of(&owner), 2);
        assert_eq!(ledger.owner_of(&UnitId::new(1)), Some(owner));
    }

    #[test]
    fn transfer_moves_balance() {
        let a = Address::from_label("a");
        let b = Address::from_label("b");
        let mut ledger = OwnershipLedger::new();
        ledger.mint(UnitId::new(1), a);

        assert_eq!(ledger.transfer(UnitId::new(1), b), Some(a));
        assert_eq!(ledger.balance_of(&a), 0);
        assert_eq!(ledger.balance_of(&b), 1);
        assert_eq!(ledger.owner_of(&UnitId::new(1)), Some(b));
    }

    #[test]
    fn transfer_of_unknown_id_is_none() {
        let mut ledger: OwnershipLedger<UnitId> = OwnershipLedger::new();
        assert_eq!(ledger.transfer(UnitId::new(9), Address::from_label("x")), None);
    }
}
