//! Same-address re-verification backend
//!
//! Deploys nothing. The payload names an existing wallet; the backend checks
//! that its current owners and threshold exactly match the requested set and
//! hands the same address back. This lets a service be redeployed onto a wallet
//! its instances reconfigured out of band.

use quorum_types::Address;
use tracing::{info, warn};

use crate::backend::{validate_owner_set, MultisigBackend};
use crate::error::{MultisigError, Result};
use crate::payload::SameAddressPayload;
use crate::wallet::WalletHost;

pub struct SameAddressBackend {
    address: Address,
    host: WalletHost,
}

impl SameAddressBackend {
    pub fn new(address: Address, host: WalletHost) -> Self {
        Self { address, host }
    }

    /// Compare a wallet against the requested configuration: threshold first,
    /// then owner count, then owners position by position.
    pub fn verify(&self, multisig: Address, owners: &[Address], threshold: u32) -> Result<()> {
        let wallet = self
            .host
            .wallet(&multisig)
            .ok_or(MultisigError::WalletNotFound(multisig))?;

        if wallet.threshold != threshold {
            return Err(MultisigError::WrongThreshold {
                provided: threshold,
                expected: wallet.threshold,
            });
        }
        if wallet.owners.len() != owners.len() {
            return Err(MultisigError::WrongNumOwners {
                provided: owners.len(),
                expected: wallet.owners.len(),
            });
        }
        if let Some((requested, _)) = owners
            .iter()
            .zip(wallet.owners.iter())
            .find(|(requested, current)| requested != current)
        {
            return Err(MultisigError::WrongOwner(*requested));
        }
        Ok(())
    }
}

impl MultisigBackend for SameAddressBackend {
    fn address(&self) -> Address {
        self.address
    }

    fn create(&self, owners: &[Address], threshold: u32, payload: &[u8]) -> Result<Address> {
        validate_owner_set(owners, threshold)?;
        let SameAddressPayload { multisig } = SameAddressPayload::decode(payload)?;

        self.verify(multisig, owners, threshold).inspect_err(|e| {
            warn!(backend = %self.address, wallet = %multisig, error = %e, "Wallet does not match service");
        })?;

        info!(backend = %self.address, wallet = %multisig, threshold, "Existing multisig verified");
        Ok(multisig)
    }
}
