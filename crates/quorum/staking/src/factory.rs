//! Staking instance factory
//!
//! Instances are clones of a registered implementation. Creation derives a
//! fresh address from the factory nonce, runs the implementation's initializer
//! and, if a verifier is set, admits the instance only when both the
//! implementation and the initialised parameters pass it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use quorum_types::{Address, CallContext, ReentrancyGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StakingError};
use crate::event::StakingEvent;
use crate::params::{StakingParams, SELECTOR_LEN};
use crate::verifier::InstanceVerifier;

/// Code a staking instance runs.
pub trait StakingImplementation: Send + Sync {
    /// Initialise the clone at `instance` from the raw payload and return the
    /// parameters it ended up with. An error reverts the creation.
    fn initialize(
        &self,
        instance: Address,
        payload: &[u8],
    ) -> std::result::Result<StakingParams, String>;
}

/// Implementation accepting the standard initializer payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardStaking;

impl StakingImplementation for StandardStaking {
    fn initialize(
        &self,
        _instance: Address,
        payload: &[u8],
    ) -> std::result::Result<StakingParams, String> {
        let params = StakingParams::decode_init(payload).map_err(|e| e.to_string())?;
        if params.has_zero_field() {
            return Err("zero staking parameter".to_string());
        }
        Ok(params)
    }
}

/// What the factory remembers about an instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub implementation: Address,
    pub deployer: Address,
    pub enabled: bool,
    pub params: StakingParams,
}

struct FactoryState {
    owner: Address,
    verifier: Option<Arc<dyn InstanceVerifier>>,
    implementations: HashMap<Address, Arc<dyn StakingImplementation>>,
    instances: HashMap<Address, InstanceRecord>,
    nonce: u64,
    events: Vec<StakingEvent>,
}

pub struct StakingFactory {
    address: Address,
    state: RwLock<FactoryState>,
    guard: ReentrancyGuard,
}

impl StakingFactory {
    pub fn new(
        address: Address,
        owner: Address,
        verifier: Option<Arc<dyn InstanceVerifier>>,
    ) -> Result<Self> {
        if owner.is_zero() {
            return Err(StakingError::ZeroAddress);
        }
        Ok(Self {
            address,
            state: RwLock::new(FactoryState {
                owner,
                verifier,
                implementations: HashMap::new(),
                instances: HashMap::new(),
                nonce: 0,
                events: Vec::new(),
            }),
            guard: ReentrancyGuard::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.read().owner
    }

    pub fn verifier(&self) -> Option<Address> {
        self.read().verifier.as_ref().map(|v| v.address())
    }

    pub fn nonce(&self) -> u64 {
        self.read().nonce
    }

    pub fn events(&self) -> Vec<StakingEvent> {
        self.read().events.clone()
    }

    /// Register code at `address` so instances can be cloned from it.
    pub fn deploy_implementation(
        &self,
        address: Address,
        code: Arc<dyn StakingImplementation>,
    ) -> Result<()> {
        if address.is_zero() {
            return Err(StakingError::ZeroAddress);
        }
        let mut state = self.write();
        if state.implementations.contains_key(&address) {
            return Err(StakingError::ImplementationExists(address));
        }
        state.implementations.insert(address, code);
        debug!(factory = %self.address, implementation = %address, "Implementation deployed");
        Ok(())
    }

    pub fn is_implementation(&self, address: &Address) -> bool {
        self.read().implementations.contains_key(address)
    }

    /// Address the next instance of `implementation` will be created at.
    pub fn predict_instance_address(&self, implementation: &Address) -> Address {
        self.instance_address(implementation, self.read().nonce)
    }

    /// Clone `implementation`, initialise it with `init_payload` and record it.
    ///
    /// Identical calls are not deduplicated; each one gets a fresh address.
    pub fn create_instance(
        &self,
        ctx: &CallContext,
        implementation: Address,
        init_payload: &[u8],
    ) -> Result<Address> {
        if implementation.is_zero() {
            return Err(StakingError::ZeroAddress);
        }
        let (code, verifier) = {
            let state = self.read();
            let code = state
                .implementations
                .get(&implementation)
                .cloned()
                .ok_or(StakingError::ContractOnly(implementation))?;
            (code, state.verifier.clone())
        };
        if init_payload.len() < SELECTOR_LEN {
            return Err(StakingError::IncorrectDataLength {
                provided: init_payload.len(),
                expected: SELECTOR_LEN,
            });
        }
        if let Some(verifier) = &verifier {
            if !verifier.verify_implementation(&implementation) {
                return Err(StakingError::UnverifiedImplementation(implementation));
            }
        }

        let _token = self.guard.enter().ok_or_else(|| {
            warn!(factory = %self.address, "Rejected reentrant instance creation");
            StakingError::ReentrancyGuard
        })?;

        let instance = self.predict_instance_address(&implementation);
        let params = code
            .initialize(instance, init_payload)
            .map_err(|reason| {
                warn!(factory = %self.address, instance = %instance, reason = %reason, "Instance initialization failed");
                StakingError::InitializationFailed { instance, reason }
            })?;

        if let Some(verifier) = &verifier {
            if !verifier.verify_instance(&implementation, &params) {
                return Err(StakingError::UnverifiedProxy(instance));
            }
        }

        let mut state = self.write();
        state.nonce += 1;
        state.instances.insert(
            instance,
            InstanceRecord {
                implementation,
                deployer: ctx.caller,
                enabled: true,
                params,
            },
        );
        state.events.push(StakingEvent::InstanceCreated {
            sender: ctx.caller,
            instance,
            implementation,
        });
        info!(
            factory = %self.address,
            instance = %instance,
            implementation = %implementation,
            deployer = %ctx.caller,
            "Staking instance created"
        );
        Ok(instance)
    }

    /// Enable or disable an instance. Only its deployer may do this.
    pub fn set_instance_status(
        &self,
        ctx: &CallContext,
        instance: Address,
        enabled: bool,
    ) -> Result<()> {
        let mut state = self.write();
        let record = state
            .instances
            .get_mut(&instance)
            .ok_or(StakingError::InstanceNotFound(instance))?;
        if record.deployer != ctx.caller {
            return Err(StakingError::DeployerOnly {
                caller: ctx.caller,
                deployer: record.deployer,
            });
        }
        record.enabled = enabled;
        state
            .events
            .push(StakingEvent::InstanceStatusChanged { instance, enabled });
        info!(factory = %self.address, instance = %instance, enabled, "Instance status changed");
        Ok(())
    }

    /// True if `instance` was created here, is enabled, and its parameters
    /// still pass the current verifier.
    pub fn verify_instance(&self, instance: &Address) -> bool {
        let (record, verifier) = {
            let state = self.read();
            match state.instances.get(instance) {
                Some(record) => (record.clone(), state.verifier.clone()),
                None => return false,
            }
        };
        if !record.enabled {
            return false;
        }
        verifier.map_or(true, |v| {
            v.verify_instance(&record.implementation, &record.params)
        })
    }

    pub fn instance(&self, instance: &Address) -> Option<InstanceRecord> {
        self.read().instances.get(instance).cloned()
    }

    pub fn instance_params(&self, instance: &Address) -> Option<StakingParams> {
        self.read().instances.get(instance).map(|r| r.params)
    }

    /// Replace or remove the verifier. Owner only.
    pub fn change_verifier(
        &self,
        ctx: &CallContext,
        verifier: Option<Arc<dyn InstanceVerifier>>,
    ) -> Result<()> {
        let mut state = self.write();
        check_owner(&state, ctx)?;
        let address = verifier.as_ref().map(|v| v.address());
        state.verifier = verifier;
        state
            .events
            .push(StakingEvent::VerifierUpdated { verifier: address });
        info!(factory = %self.address, verifier = ?address, "Verifier updated");
        Ok(())
    }

    pub fn change_owner(&self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        let mut state = self.write();
        check_owner(&state, ctx)?;
        if new_owner.is_zero() {
            return Err(StakingError::ZeroAddress);
        }
        state.owner = new_owner;
        state.events.push(StakingEvent::OwnerUpdated { owner: new_owner });
        info!(factory = %self.address, owner = %new_owner, "Factory owner updated");
        Ok(())
    }

    fn instance_address(&self, implementation: &Address, nonce: u64) -> Address {
        Address::derive(
            "quorum.staking.instance",
            &[
                self.address.as_bytes(),
                implementation.as_bytes(),
                &nonce.to_be_bytes(),
            ],
        )
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, FactoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, FactoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_owner(state: &FactoryState, ctx: &CallContext) -> Result<()> {
    if ctx.caller != state.owner {
        return Err(StakingError::OwnerOnly {
            caller: ctx.caller,
            owner: state.owner,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::StakingLimits;
    use crate::params::APY_SCALE;
    use crate::verifier::StakingVerifier;
    use std::sync::{Mutex, OnceLock};

    fn owner() -> CallContext {
        CallContext::new(Address::from_label("factory-owner"))
    }

    fn deployer() -> CallContext {
        CallContext::new(Address::from_label("deployer"))
    }

    fn implementation() -> Address {
        Address::from_label("staking-impl")
    }

    fn params() -> StakingParams {
        StakingParams {
            min_staking_deposit: 1_000,
            rewards_per_second: 1,
            time_for_emissions: 1_000,
            max_num_services: 10,
            num_agent_instances: 1,
        }
    }

    fn verifier() -> Arc<StakingVerifier> {
        let verifier = StakingVerifier::new(
            Address::from_label("verifier"),
            owner().caller,
            StakingLimits {
                min_deposit: 1_000,
                max_emissions_duration: 1_000,
                max_services: 10,
                max_apy: 2_000 * APY_SCALE,
            },
        )
        .unwrap();
        verifier
            .set_implementations_statuses(&owner(), vec![implementation()], vec![true], true)
            .unwrap();
        Arc::new(verifier)
    }

    fn factory(verifier: Option<Arc<dyn InstanceVerifier>>) -> StakingFactory {
        let factory =
            StakingFactory::new(Address::from_label("factory"), owner().caller, verifier).unwrap();
        factory
            .deploy_implementation(implementation(), Arc::new(StandardStaking))
            .unwrap();
        factory
    }

    #[test]
    fn identical_calls_yield_distinct_instances() {
        let factory = factory(None);
        let predicted = factory.predict_instance_address(&implementation());
        let first = factory
            .create_instance(&deployer(), implementation(), &params().encode_init())
            .unwrap();
        let second = factory
            .create_instance(&deployer(), implementation(), &params().encode_init())
            .unwrap();

        assert_eq!(first, predicted);
        assert_ne!(first, second);
        assert_eq!(factory.nonce(), 2);
        assert_eq!(factory.instance_params(&first), Some(params()));
        assert!(factory.verify_instance(&second));
    }

    #[test]
    fn creation_failures_in_order() {
        let factory = factory(None);
        assert_eq!(
            factory.create_instance(&deployer(), Address::ZERO, &[]),
            Err(StakingError::ZeroAddress)
        );
        let missing = Address::from_label("missing");
        assert_eq!(
            factory.create_instance(&deployer(), missing, &params().encode_init()),
            Err(StakingError::ContractOnly(missing))
        );
        assert_eq!(
            factory.create_instance(&deployer(), implementation(), &[1, 2, 3]),
            Err(StakingError::IncorrectDataLength {
                provided: 3,
                expected: 4
            })
        );
        assert!(matches!(
            factory.create_instance(&deployer(), implementation(), &[0u8; 4]),
            Err(StakingError::InitializationFailed { .. })
        ));
        assert_eq!(factory.nonce(), 0);
    }

    #[test]
    fn zero_parameters_fail_initialization() {
        let factory = factory(None);
        let zero = StakingParams {
            rewards_per_second: 0,
            ..params()
        };
        assert!(matches!(
            factory.create_instance(&deployer(), implementation(), &zero.encode_init()),
            Err(StakingError::InitializationFailed { .. })
        ));
    }

    #[test]
    fn verifier_gates_implementation_and_parameters() {
        let verifier = verifier();
        let factory = factory(Some(verifier.clone()));

        let other = Address::from_label("other-impl");
        factory
            .deploy_implementation(other, Arc::new(StandardStaking))
            .unwrap();
        assert_eq!(
            factory.create_instance(&deployer(), other, &params().encode_init()),
            Err(StakingError::UnverifiedImplementation(other))
        );

        let greedy = StakingParams {
            max_num_services: 11,
            ..params()
        };
        assert!(matches!(
            factory.create_instance(&deployer(), implementation(), &greedy.encode_init()),
            Err(StakingError::UnverifiedProxy(_))
        ));

        let instance = factory
            .create_instance(&deployer(), implementation(), &params().encode_init())
            .unwrap();
        assert!(factory.verify_instance(&instance));

        // tightened limits reject existing instances on re-check
        let tighter = StakingLimits {
            max_services: 5,
            ..verifier.limits()
        };
        verifier.change_staking_limits(&owner(), tighter).unwrap();
        assert!(!factory.verify_instance(&instance));
        assert!(factory.instance(&instance).is_some());
    }

    #[test]
    fn only_deployer_toggles_status() {
        let factory = factory(None);
        let instance = factory
            .create_instance(&deployer(), implementation(), &params().encode_init())
            .unwrap();

        assert!(matches!(
            factory.set_instance_status(&owner(), instance, false),
            Err(StakingError::DeployerOnly { .. })
        ));
        factory
            .set_instance_status(&deployer(), instance, false)
            .unwrap();
        assert!(!factory.verify_instance(&instance));

        let ghost = Address::from_label("ghost");
        assert_eq!(
            factory.set_instance_status(&deployer(), ghost, true),
            Err(StakingError::InstanceNotFound(ghost))
        );
    }

    #[test]
    fn implementation_registered_once() {
        let factory = factory(None);
        assert_eq!(
            factory.deploy_implementation(implementation(), Arc::new(StandardStaking)),
            Err(StakingError::ImplementationExists(implementation()))
        );
    }

    #[test]
    fn verifier_and_owner_are_owner_only() {
        let factory = factory(None);
        assert!(matches!(
            factory.change_verifier(&deployer(), None),
            Err(StakingError::OwnerOnly { .. })
        ));
        factory.change_verifier(&owner(), Some(verifier())).unwrap();
        assert_eq!(factory.verifier(), Some(Address::from_label("verifier")));

        let next = Address::from_label("next-owner");
        factory.change_owner(&owner(), next).unwrap();
        assert_eq!(factory.owner(), next);
    }

    /// Initializer that tries to create another instance mid-initialisation.
    #[derive(Default)]
    struct Reenter {
        factory: OnceLock<Arc<StakingFactory>>,
        outcome: Mutex<Option<Result<Address>>>,
    }

    impl StakingImplementation for Reenter {
        fn initialize(
            &self,
            _instance: Address,
            payload: &[u8],
        ) -> std::result::Result<StakingParams, String> {
            let factory = self.factory.get().ok_or("factory not wired")?;
            let nested = factory.create_instance(&deployer(), implementation(), payload);
            *self.outcome.lock().map_err(|e| e.to_string())? = Some(nested);
            StandardStaking.initialize(Address::ZERO, payload)
        }
    }

    #[test]
    fn reentrant_initializer_is_rejected() {
        let factory = Arc::new(
            StakingFactory::new(Address::from_label("factory"), owner().caller, None).unwrap(),
        );
        let reenter = Arc::new(Reenter::default());
        reenter.factory.set(factory.clone()).ok();
        factory
            .deploy_implementation(implementation(), reenter.clone())
            .unwrap();

        factory
            .create_instance(&deployer(), implementation(), &params().encode_init())
            .unwrap();
        let nested = reenter.outcome.lock().unwrap().clone();
        assert_eq!(nested, Some(Err(StakingError::ReentrancyGuard)));
        assert_eq!(factory.nonce(), 1);
    }
}
