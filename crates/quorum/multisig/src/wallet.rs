//! In-process wallet host
//!
//! Models the external joint-custody wallet infrastructure: deterministic
//! deployment, out-of-band reconfiguration approved by a threshold of the
//! wallet's owners, and modules. Setup calls run against registered [`SetupHandler`]s with no host
//! lock held, so a handler may call back into the host or into a backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use quorum_types::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::validate_owner_set;
use crate::error::{MultisigError, Result};

/// A deployed joint-custody wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub owners: Vec<Address>,
    pub threshold: u32,
    pub fallback_handler: Address,
    pub modules: Vec<Address>,
    /// Number of transactions the wallet has executed.
    pub nonce: u64,
}

impl Wallet {
    pub fn is_owner(&self, account: &Address) -> bool {
        self.owners.contains(account)
    }

    pub fn is_module_enabled(&self, module: &Address) -> bool {
        self.modules.contains(module)
    }
}

/// Code invoked with a freshly built wallet before it is persisted.
pub trait SetupHandler: Send + Sync {
    fn on_setup(&self, wallet: &Wallet, data: &[u8]) -> std::result::Result<(), String>;
}

/// Post-deployment call: `data` is dispatched to the handler at `to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupCall {
    pub to: Address,
    pub data: Vec<u8>,
}

/// Everything needed to deploy one wallet.
#[derive(Clone, Debug)]
pub struct DeployRequest {
    pub factory: Address,
    pub owners: Vec<Address>,
    pub threshold: u32,
    pub salt: u128,
    pub fallback_handler: Address,
    pub modules: Vec<Address>,
    pub setup: Option<SetupCall>,
}

impl DeployRequest {
    /// Deterministic wallet address for this request.
    pub fn predicted_address(&self) -> Address {
        let owners: Vec<u8> = self
            .owners
            .iter()
            .flat_map(|o| o.as_bytes().iter().copied())
            .collect();
        Address::derive(
            "quorum.wallet",
            &[
                self.factory.as_bytes(),
                &owners,
                &self.threshold.to_be_bytes(),
                &self.salt.to_be_bytes(),
            ],
        )
    }
}

#[derive(Default)]
struct HostState {
    wallets: HashMap<Address, Wallet>,
    handlers: HashMap<Address, Arc<dyn SetupHandler>>,
}

/// Shared handle to the wallet infrastructure.
#[derive(Clone, Default)]
pub struct WalletHost {
    state: Arc<RwLock<HostState>>,
}

impl WalletHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register code reachable as a setup-call target.
    pub fn register_handler(&self, address: Address, handler: Arc<dyn SetupHandler>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .insert(address, handler);
    }

    /// Deploy a wallet. If the setup call fails nothing is persisted.
    pub fn deploy(&self, request: DeployRequest) -> Result<Address> {
        validate_owner_set(&request.owners, request.threshold)?;

        let address = request.predicted_address();
        if self.contains(&address) {
            return Err(MultisigError::WalletExists(address));
        }

        let wallet = Wallet {
            address,
            owners: request.owners,
            threshold: request.threshold,
            fallback_handler: request.fallback_handler,
            modules: request.modules,
            nonce: 0,
        };

        if let Some(call) = request.setup {
            let handler = self
                .state
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .handlers
                .get(&call.to)
                .cloned();
            match handler {
                Some(handler) => {
                    debug!(wallet = %address, target = %call.to, "Running wallet setup call");
                    handler.on_setup(&wallet, &call.data).map_err(|reason| {
                        warn!(wallet = %address, target = %call.to, %reason, "Wallet setup failed");
                        MultisigError::SetupFailed {
                            target: call.to,
                            reason,
                        }
                    })?;
                }
                None if call.data.is_empty() => {}
                None => {
                    return Err(MultisigError::SetupFailed {
                        target: call.to,
                        reason: "no code at target".to_string(),
                    })
                }
            }
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.wallets.contains_key(&address) {
            return Err(MultisigError::WalletExists(address));
        }
        info!(
            wallet = %address,
            owners = wallet.owners.len(),
            threshold = wallet.threshold,
            "Wallet deployed"
        );
        state.wallets.insert(address, wallet);
        Ok(address)
    }

    pub fn wallet(&self, address: &Address) -> Option<Wallet> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .wallets
            .get(address)
            .cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .wallets
            .contains_key(address)
    }

    pub fn wallet_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .wallets
            .len()
    }

    pub fn is_module_enabled(&self, wallet: &Address, module: &Address) -> bool {
        self.wallet(wallet)
            .map(|w| w.is_module_enabled(module))
            .unwrap_or(false)
    }

    /// Replace a wallet's owners and threshold.
    ///
    /// Authorized when `approvals` holds at least `threshold` distinct current
    /// owners, or includes the wallet itself or one of its enabled modules.
    pub fn reconfigure(
        &self,
        approvals: &[Address],
        wallet: Address,
        owners: Vec<Address>,
        threshold: u32,
    ) -> Result<()> {
        validate_owner_set(&owners, threshold)?;
        self.with_wallet(approvals, wallet, |w| {
            w.owners = owners;
            w.threshold = threshold;
        })?;
        info!(wallet = %wallet, approvals = approvals.len(), threshold, "Wallet reconfigured");
        Ok(())
    }

    /// Enable `module` on a wallet. Same authorization as [`reconfigure`](Self::reconfigure).
    pub fn enable_module(
        &self,
        approvals: &[Address],
        wallet: Address,
        module: Address,
    ) -> Result<()> {
        if module.is_zero() {
            return Err(MultisigError::ZeroAddress);
        }
        self.with_wallet(approvals, wallet, |w| {
            if !w.modules.contains(&module) {
                w.modules.push(module);
            }
        })?;
        info!(wallet = %wallet, module = %module, "Wallet module enabled");
        Ok(())
    }

    fn with_wallet(
        &self,
        approvals: &[Address],
        address: Address,
        apply: impl FnOnce(&mut Wallet),
    ) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let wallet = state
            .wallets
            .get_mut(&address)
            .ok_or(MultisigError::WalletNotFound(address))?;

        let privileged = approvals
            .iter()
            .any(|a| *a == address || wallet.is_module_enabled(a));
        if !privileged {
            let signers: HashSet<&Address> =
                approvals.iter().filter(|a| wallet.is_owner(a)).collect();
            if signers.len() < wallet.threshold as usize {
                warn!(wallet = %address, signers = signers.len(), threshold = wallet.threshold, "Rejected wallet change");
                return Err(MultisigError::InsufficientApprovals {
                    wallet: address,
                    approvals: signers.len(),
                    threshold: wallet.threshold,
                });
            }
        }

        apply(wallet);
        wallet.nonce += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners(n: usize) -> Vec<Address> {
        (0..n)
            .map(|i| Address::from_label(&format!("owner-{i}")))
            .collect()
    }

    fn request(salt: u128) -> DeployRequest {
        DeployRequest {
            factory: Address::from_label("factory"),
            owners: owners(3),
            threshold: 2,
            salt,
            fallback_handler: Address::ZERO,
            modules: vec![],
            setup: None,
        }
    }

    struct Failing;

    impl SetupHandler for Failing {
        fn on_setup(&self, _wallet: &Wallet, _data: &[u8]) -> std::result::Result<(), String> {
            Err("boom".to_string())
        }
    }

    #[test]
    fn deploy_is_deterministic() {
        let host = WalletHost::new();
        let expected = request(7).predicted_address();
        let address = host.deploy(request(7)).unwrap();
        assert_eq!(address, expected);
        assert_eq!(
            host.deploy(request(7)),
            Err(MultisigError::WalletExists(address))
        );
        assert_ne!(host.deploy(request(8)).unwrap(), address);
    }

    #[test]
    fn failed_setup_persists_nothing() {
        let host = WalletHost::new();
        let target = Address::from_label("setup");
        host.register_handler(target, Arc::new(Failing));

        let mut req = request(1);
        req.setup = Some(SetupCall {
            to: target,
            data: vec![1, 2, 3],
        });
        let err = host.deploy(req).unwrap_err();
        assert!(matches!(err, MultisigError::SetupFailed { .. }));
        assert_eq!(host.wallet_count(), 0);
    }

    #[test]
    fn setup_data_without_code_fails() {
        let host = WalletHost::new();
        let mut req = request(1);
        req.setup = Some(SetupCall {
            to: Address::from_label("nowhere"),
            data: vec![1],
        });
        assert!(matches!(
            host.deploy(req),
            Err(MultisigError::SetupFailed { .. })
        ));
    }

    #[test]
    fn reconfiguration_needs_threshold_approvals() {
        let host = WalletHost::new();
        let wallet = host.deploy(request(1)).unwrap();
        let stranger = Address::from_label("stranger");
        let owners = owners(3);

        assert_eq!(
            host.reconfigure(&[stranger], wallet, vec![stranger], 1),
            Err(MultisigError::InsufficientApprovals {
                wallet,
                approvals: 0,
                threshold: 2
            })
        );
        // one owner of a 2-of-3 wallet, counted once however often it appears
        assert_eq!(
            host.reconfigure(&[owners[0], owners[0], stranger], wallet, vec![owners[0]], 1),
            Err(MultisigError::InsufficientApprovals {
                wallet,
                approvals: 1,
                threshold: 2
            })
        );
        assert_eq!(host.wallet(&wallet).unwrap().owners, owners);

        host.reconfigure(&[owners[0], owners[2]], wallet, vec![stranger], 1)
            .unwrap();
        let updated = host.wallet(&wallet).unwrap();
        assert_eq!(updated.owners, vec![stranger]);
        assert_eq!(updated.threshold, 1);
        assert_eq!(updated.nonce, 1);
    }

    #[test]
    fn single_owner_cannot_take_over_full_threshold_wallet() {
        let host = WalletHost::new();
        let owners = owners(3);
        let mut req = request(1);
        req.threshold = 3;
        let wallet = host.deploy(req).unwrap();

        assert!(matches!(
            host.reconfigure(&[owners[0]], wallet, vec![owners[0]], 1),
            Err(MultisigError::InsufficientApprovals { .. })
        ));
        assert!(matches!(
            host.enable_module(&owners[..2], wallet, Address::from_label("module")),
            Err(MultisigError::InsufficientApprovals { .. })
        ));
        let unchanged = host.wallet(&wallet).unwrap();
        assert_eq!(unchanged.owners.len(), 3);
        assert!(unchanged.modules.is_empty());
        assert_eq!(unchanged.nonce, 0);
    }

    #[test]
    fn enabled_module_may_reconfigure() {
        let host = WalletHost::new();
        let wallet = host.deploy(request(1)).unwrap();
        let module = Address::from_label("module");
        host.enable_module(&[wallet], wallet, module).unwrap();
        assert!(host.is_module_enabled(&wallet, &module));

        host.reconfigure(&[module], wallet, owners(1), 1).unwrap();
    }
}
