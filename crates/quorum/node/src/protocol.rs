//! Protocol assembly
//!
//! Builds every registry and capability from a [`QuorumConfig`] and wires them
//! together: the service registry checks agents against the agent registry's
//! supply, all three multisig backends share one wallet host and start
//! whitelisted, and the staking factory consults the verifier.

use std::sync::Arc;

use quorum_multisig::{
    FreshDeployBackend, MultisigBackend, RecoveryModule, RecoveryModuleBackend,
    SameAddressBackend, WalletHost,
};
use quorum_service::ServiceRegistry;
use quorum_staking::{StakingFactory, StakingVerifier, StandardStaking};
use quorum_types::{Address, CallContext, InMemoryValueLedger, ServiceId};
use quorum_units::{RegistriesManager, UnitKind, UnitRegistry};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::QuorumConfig;

/// Deterministic address of a protocol singleton.
pub fn system_address(name: &str) -> Address {
    Address::derive("quorum.node.system", &[name.as_bytes()])
}

/// Multisig backends installed by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Fresh,
    SameAddress,
    Recovery,
}

pub struct Protocol {
    pub owner: Address,
    pub ledger: Arc<InMemoryValueLedger>,
    pub units: RegistriesManager,
    pub services: ServiceRegistry,
    pub host: WalletHost,
    pub fresh: FreshDeployBackend,
    pub same_address: SameAddressBackend,
    pub recovery: RecoveryModuleBackend,
    pub recovery_module: RecoveryModule,
    pub verifier: Arc<StakingVerifier>,
    pub staking: StakingFactory,
    /// Implementation registered with the factory and whitelisted at startup
    pub standard_staking: Address,
}

impl Protocol {
    /// Assemble a protocol administered by `owner`.
    pub fn from_config(config: &QuorumConfig, owner: Address) -> anyhow::Result<Self> {
        let as_owner = CallContext::new(owner);
        let ledger = Arc::new(InMemoryValueLedger::new());

        let components = UnitRegistry::new(
            UnitKind::Component,
            &config.units.component_name,
            &config.units.component_symbol,
            &config.units.base_uri,
            owner,
        );
        let agents = UnitRegistry::new(
            UnitKind::Agent,
            &config.units.agent_name,
            &config.units.agent_symbol,
            &config.units.base_uri,
            owner,
        );
        let units = RegistriesManager::new(
            system_address("registries-manager"),
            owner,
            components,
            agents,
        )?;

        let mut services = ServiceRegistry::new(
            system_address("service-registry"),
            owner,
            Arc::new(units.agents().supply_view()),
            ledger.clone(),
        )
        .with_metadata(
            &config.service.name,
            &config.service.symbol,
            &config.service.base_uri,
        );

        let host = WalletHost::new();
        let fresh = FreshDeployBackend::new(system_address("multisig.fresh"), host.clone());
        let same_address =
            SameAddressBackend::new(system_address("multisig.same-address"), host.clone());
        let recovery_module = RecoveryModule::new(system_address("recovery-module"), host.clone());
        let recovery = RecoveryModuleBackend::new(
            system_address("multisig.recovery"),
            host.clone(),
            recovery_module.address(),
        );
        for backend in [fresh.address(), same_address.address(), recovery.address()] {
            services.change_multisig_permission(&as_owner, backend, true)?;
        }

        let verifier = Arc::new(StakingVerifier::new(
            system_address("staking-verifier"),
            owner,
            config.staking.limits(),
        )?);
        let standard_staking = system_address("staking.standard");
        verifier.set_implementations_statuses(&as_owner, vec![standard_staking], vec![true], true)?;
        verifier.set_implementations_check(&as_owner, config.staking.check_implementations)?;

        let staking = StakingFactory::new(
            system_address("staking-factory"),
            owner,
            Some(verifier.clone()),
        )?;
        staking.deploy_implementation(standard_staking, Arc::new(StandardStaking))?;

        info!(
            owner = %owner,
            service_registry = %services.address(),
            staking_factory = %staking.address(),
            "Protocol assembled"
        );

        Ok(Self {
            owner,
            ledger,
            units,
            services,
            host,
            fresh,
            same_address,
            recovery,
            recovery_module,
            verifier,
            staking,
            standard_staking,
        })
    }

    pub fn backend(&self, kind: BackendKind) -> &dyn MultisigBackend {
        select_backend(&self.fresh, &self.same_address, &self.recovery, kind)
    }

    /// Deploy a service through one of the installed backends.
    pub fn deploy(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        service_id: ServiceId,
        kind: BackendKind,
        payload: &[u8],
    ) -> quorum_service::Result<Address> {
        // field-level borrows so `services` stays mutably borrowable
        let backend = select_backend(&self.fresh, &self.same_address, &self.recovery, kind);
        self.services
            .deploy(ctx, owner, service_id, backend, payload)
    }

    /// Hand the last wallet of a service back to its owner.
    pub fn recover_access(
        &self,
        ctx: &CallContext,
        service_id: ServiceId,
    ) -> quorum_multisig::Result<Address> {
        self.recovery_module
            .recover_access(ctx, service_id, &self.services)
    }
}

fn select_backend<'a>(
    fresh: &'a FreshDeployBackend,
    same_address: &'a SameAddressBackend,
    recovery: &'a RecoveryModuleBackend,
    kind: BackendKind,
) -> &'a dyn MultisigBackend {
    match kind {
        BackendKind::Fresh => fresh,
        BackendKind::SameAddress => same_address,
        BackendKind::Recovery => recovery,
    }
}
