//! Fresh-deploy backend

use std::sync::atomic::{AtomicU64, Ordering};

use quorum_types::Address;
use tracing::{debug, info};

use crate::backend::{validate_owner_set, MultisigBackend};
use crate::error::Result;
use crate::payload::FreshDeployPayload;
use crate::wallet::{DeployRequest, SetupCall, WalletHost};

/// Deploys a brand-new wallet for every call.
///
/// Without a payload the salt comes from an internal counter, so repeated
/// deployments for the same owner set get distinct addresses.
pub struct FreshDeployBackend {
    address: Address,
    host: WalletHost,
    counter: AtomicU64,
}

impl FreshDeployBackend {
    pub fn new(address: Address, host: WalletHost) -> Self {
        Self {
            address,
            host,
            counter: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &WalletHost {
        &self.host
    }

    /// Deploy with `modules` enabled from the start.
    pub(crate) fn deploy_with_modules(
        &self,
        owners: &[Address],
        threshold: u32,
        payload: &[u8],
        modules: Vec<Address>,
    ) -> Result<Address> {
        validate_owner_set(owners, threshold)?;
        let decoded = FreshDeployPayload::decode(payload)?;

        let request = match decoded {
            Some(p) => {
                debug!(
                    backend = %self.address,
                    to = %p.to,
                    nonce = p.nonce,
                    payment = p.payment,
                    setup_len = p.setup_data.len(),
                    "Decoded deployment payload"
                );
                DeployRequest {
                    factory: self.address,
                    owners: owners.to_vec(),
                    threshold,
                    salt: p.nonce,
                    fallback_handler: p.fallback_handler,
                    modules,
                    setup: (!p.to.is_zero()).then(|| SetupCall {
                        to: p.to,
                        data: p.setup_data,
                    }),
                }
            }
            None => DeployRequest {
                factory: self.address,
                owners: owners.to_vec(),
                threshold,
                salt: self.next_salt(),
                fallback_handler: Address::ZERO,
                modules,
                setup: None,
            },
        };

        let wallet = self.host.deploy(request)?;
        info!(backend = %self.address, wallet = %wallet, threshold, "Fresh multisig created");
        Ok(wallet)
    }

    fn next_salt(&self) -> u128 {
        // high bit keeps counter salts apart from payload nonces
        (1u128 << 127) | self.counter.fetch_add(1, Ordering::Relaxed) as u128
    }
}

impl MultisigBackend for FreshDeployBackend {
    fn address(&self) -> Address {
        self.address
    }

    fn create(&self, owners: &[Address], threshold: u32, payload: &[u8]) -> Result<Address> {
        self.deploy_with_modules(owners, threshold, payload, Vec::new())
    }
}
