//! Multisig backend capability

use std::collections::HashSet;

use quorum_types::Address;

use crate::error::{MultisigError, Result};

/// Creates, or re-verifies, the wallet jointly owned by a service's agent
/// instances.
///
/// Implementations are untrusted beyond this interface. The service registry
/// only invokes backends whose `address()` is on its whitelist.
pub trait MultisigBackend: Send + Sync {
    /// Address the whitelist is keyed by.
    fn address(&self) -> Address;

    /// Return a wallet controlled by exactly `owners` (in order) with the given
    /// signing threshold.
    fn create(&self, owners: &[Address], threshold: u32, payload: &[u8]) -> Result<Address>;
}

/// Owners must be non-empty, non-zero and distinct, and
/// `1 <= threshold <= owners.len()`.
pub fn validate_owner_set(owners: &[Address], threshold: u32) -> Result<()> {
    if owners.is_empty() {
        return Err(MultisigError::ZeroValue);
    }
    if threshold == 0 || threshold as usize > owners.len() {
        return Err(MultisigError::WrongThreshold {
            provided: threshold,
            expected: owners.len() as u32,
        });
    }

    let mut seen = HashSet::with_capacity(owners.len());
    for owner in owners {
        if owner.is_zero() {
            return Err(MultisigError::ZeroAddress);
        }
        if !seen.insert(*owner) {
            return Err(MultisigError::DuplicateOwner(*owner));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn owner_set_rules() {
        let a = Address::from_label("a");
        let b = Address::from_label("b");

        assert_eq!(validate_owner_set(&[], 1), Err(MultisigError::ZeroValue));
        assert!(matches!(
            validate_owner_set(&[a, b], 0),
            Err(MultisigError::WrongThreshold { .. })
        ));
        assert!(matches!(
            validate_owner_set(&[a, b], 3),
            Err(MultisigError::WrongThreshold { .. })
        ));
        assert_eq!(
            validate_owner_set(&[a, a], 1),
            Err(MultisigError::DuplicateOwner(a))
        );
        assert_eq!(
            validate_owner_set(&[a, Address::ZERO], 1),
            Err(MultisigError::ZeroAddress)
        );
        assert!(validate_owner_set(&[a, b], 2).is_ok());
    }

    proptest! {
        #[test]
        fn threshold_must_fit_owner_count(count in 1usize..12, threshold in 0u32..16) {
            let owners: Vec<Address> = (0..count)
                .map(|i| Address::from_label(&format!("owner-{i}")))
                .collect();
            let valid = threshold >= 1 && threshold as usize <= count;
            prop_assert_eq!(validate_owner_set(&owners, threshold).is_ok(), valid);
        }
    }
}
