//! Recovery-module backend and the recovery module itself
//!
//! The backend deploys fresh wallets with a recovery module enabled. Wallet
//! setup runs arbitrary code, so the whole `create` call holds a reentrancy
//! guard. The module later lets a service owner take over the service's last
//! wallet once the service is no longer deployed.

use quorum_types::{Address, CallContext, ReentrancyGuard, ServiceId};
use tracing::{info, warn};

use crate::backend::MultisigBackend;
use crate::error::{MultisigError, Result};
use crate::fresh::FreshDeployBackend;
use crate::wallet::WalletHost;

/// Read access to the service facts recovery depends on.
pub trait ServiceDirectory {
    fn service_owner(&self, service_id: ServiceId) -> Option<Address>;

    /// Last wallet the service was deployed to, if any.
    fn last_multisig(&self, service_id: ServiceId) -> Option<Address>;

    /// True while the service is not deployed, i.e. its instances no longer
    /// hold the wallet on the service's behalf.
    fn accepts_recovery(&self, service_id: ServiceId) -> bool;
}

pub struct RecoveryModuleBackend {
    inner: FreshDeployBackend,
    recovery_module: Address,
    guard: ReentrancyGuard,
}

impl RecoveryModuleBackend {
    pub fn new(address: Address, host: WalletHost, recovery_module: Address) -> Self {
        Self {
            inner: FreshDeployBackend::new(address, host),
            recovery_module,
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn recovery_module(&self) -> Address {
        self.recovery_module
    }
}

impl MultisigBackend for RecoveryModuleBackend {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn create(&self, owners: &[Address], threshold: u32, payload: &[u8]) -> Result<Address> {
        let _token = self.guard.enter().ok_or_else(|| {
            warn!(backend = %self.address(), "Rejected reentrant multisig creation");
            MultisigError::ReentrancyGuard
        })?;

        let wallet =
            self.inner
                .deploy_with_modules(owners, threshold, payload, vec![self.recovery_module])?;
        info!(backend = %self.address(), wallet = %wallet, module = %self.recovery_module, "Recovery module attached");
        Ok(wallet)
    }
}

/// Module that hands a wallet back to its service owner.
pub struct RecoveryModule {
    address: Address,
    host: WalletHost,
}

impl RecoveryModule {
    pub fn new(address: Address, host: WalletHost) -> Self {
        Self { address, host }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Make the service owner the sole owner of the service's last wallet,
    /// threshold 1.
    pub fn recover_access(
        &self,
        ctx: &CallContext,
        service_id: ServiceId,
        directory: &dyn ServiceDirectory,
    ) -> Result<Address> {
        let owner = directory
            .service_owner(service_id)
            .ok_or(MultisigError::ServiceNotFound(service_id))?;
        if ctx.caller != owner {
            return Err(MultisigError::OwnerOnly {
                caller: ctx.caller,
                owner,
            });
        }
        if !directory.accepts_recovery(service_id) {
            return Err(MultisigError::NotRecoverable(service_id));
        }
        let multisig = directory
            .last_multisig(service_id)
            .ok_or(MultisigError::NotRecoverable(service_id))?;
        if !self.host.is_module_enabled(&multisig, &self.address) {
            return Err(MultisigError::ModuleNotEnabled {
                wallet: multisig,
                module: self.address,
            });
        }

        self.host.reconfigure(&[self.address], multisig, vec![owner], 1)?;
        info!(service_id = %service_id, wallet = %multisig, owner = %owner, "Wallet access recovered");
        Ok(multisig)
    }
}
