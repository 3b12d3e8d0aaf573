//! Staking verifier
//!
//! Shared by the factory and administered by its owner, so state sits behind a
//! lock and every method takes `&self`.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use quorum_types::{Address, Amount, CallContext};
use tracing::{info, warn};

use crate::error::{Result, StakingError};
use crate::event::StakingEvent;
use crate::limits::StakingLimits;
use crate::params::StakingParams;

/// Admission checks the factory consults.
pub trait InstanceVerifier: Send + Sync {
    fn address(&self) -> Address;

    /// Whether instances of `implementation` may be created.
    fn verify_implementation(&self, implementation: &Address) -> bool;

    /// Whether an instance of `implementation` initialised with `params` is
    /// admissible under the current limits.
    fn verify_instance(&self, implementation: &Address, params: &StakingParams) -> bool;
}

struct VerifierState {
    owner: Address,
    implementations: HashSet<Address>,
    check_implementations: bool,
    limits: StakingLimits,
    events: Vec<StakingEvent>,
}

pub struct StakingVerifier {
    address: Address,
    state: RwLock<VerifierState>,
}

impl StakingVerifier {
    /// New verifier with the implementation whitelist check enabled.
    pub fn new(address: Address, owner: Address, limits: StakingLimits) -> Result<Self> {
        if owner.is_zero() {
            return Err(StakingError::ZeroAddress);
        }
        if limits.has_zero_field() {
            return Err(StakingError::ZeroValue);
        }
        Ok(Self {
            address,
            state: RwLock::new(VerifierState {
                owner,
                implementations: HashSet::new(),
                check_implementations: true,
                limits,
                events: Vec::new(),
            }),
        })
    }

    pub fn owner(&self) -> Address {
        self.read().owner
    }

    pub fn limits(&self) -> StakingLimits {
        self.read().limits
    }

    pub fn is_implementation_permitted(&self, implementation: &Address) -> bool {
        self.read().implementations.contains(implementation)
    }

    pub fn implementations_check(&self) -> bool {
        self.read().check_implementations
    }

    pub fn events(&self) -> Vec<StakingEvent> {
        self.read().events.clone()
    }

    pub fn change_owner(&self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        let mut state = self.write();
        check_owner(&state, ctx)?;
        if new_owner.is_zero() {
            return Err(StakingError::ZeroAddress);
        }
        state.owner = new_owner;
        state.events.push(StakingEvent::OwnerUpdated { owner: new_owner });
        info!(verifier = %self.address, owner = %new_owner, "Verifier owner updated");
        Ok(())
    }

    /// Turn the implementation whitelist check on or off.
    pub fn set_implementations_check(&self, ctx: &CallContext, enabled: bool) -> Result<()> {
        let mut state = self.write();
        check_owner(&state, ctx)?;
        state.check_implementations = enabled;
        state
            .events
            .push(StakingEvent::ImplementationsCheckUpdated { enabled });
        info!(verifier = %self.address, enabled, "Implementation check updated");
        Ok(())
    }

    /// Permit or forbid implementations.
    ///
    /// With `strict` the arrays must have equal length; otherwise extra entries
    /// in the longer array are ignored.
    pub fn set_implementations_statuses(
        &self,
        ctx: &CallContext,
        implementations: Vec<Address>,
        statuses: Vec<bool>,
        strict: bool,
    ) -> Result<()> {
        let mut state = self.write();
        check_owner(&state, ctx)?;
        if implementations.is_empty()
            || statuses.is_empty()
            || (strict && implementations.len() != statuses.len())
        {
            return Err(StakingError::WrongArrayLength {
                left: implementations.len(),
                right: statuses.len(),
            });
        }
        let count = implementations.len().min(statuses.len());
        if implementations[..count].iter().any(Address::is_zero) {
            return Err(StakingError::ZeroAddress);
        }

        for (implementation, permitted) in implementations.iter().zip(statuses.iter()).take(count) {
            if *permitted {
                state.implementations.insert(*implementation);
            } else {
                state.implementations.remove(implementation);
            }
        }
        state.events.push(StakingEvent::ImplementationsStatusesUpdated {
            implementations: implementations[..count].to_vec(),
            statuses: statuses[..count].to_vec(),
        });
        info!(verifier = %self.address, count, "Implementation statuses updated");
        Ok(())
    }

    /// Replace every limit at once. Existing instances are not re-checked.
    pub fn change_staking_limits(&self, ctx: &CallContext, limits: StakingLimits) -> Result<()> {
        let mut state = self.write();
        check_owner(&state, ctx)?;
        if limits.has_zero_field() {
            return Err(StakingError::ZeroValue);
        }
        state.limits = limits;
        state
            .events
            .push(StakingEvent::StakingLimitsUpdated { limits });
        info!(
            verifier = %self.address,
            min_deposit = limits.min_deposit,
            max_emissions_duration = limits.max_emissions_duration,
            max_services = limits.max_services,
            max_apy = limits.max_apy,
            "Staking limits updated"
        );
        Ok(())
    }

    /// Upper bound on total emissions for an instance shaped like `params`.
    pub fn emissions_amount_limit(&self, params: &StakingParams) -> Amount {
        self.read().limits.emissions_amount_limit(params)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VerifierState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, VerifierState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InstanceVerifier for StakingVerifier {
    fn address(&self) -> Address {
        self.address
    }

    fn verify_implementation(&self, implementation: &Address) -> bool {
        let state = self.read();
        !state.check_implementations || state.implementations.contains(implementation)
    }

    fn verify_instance(&self, implementation: &Address, params: &StakingParams) -> bool {
        if !self.verify_implementation(implementation) {
            return false;
        }
        let admitted = self.read().limits.admits(params);
        if !admitted {
            warn!(verifier = %self.address, implementation = %implementation, "Staking parameters exceed limits");
        }
        admitted
    }
}

fn check_owner(state: &VerifierState, ctx: &CallContext) -> Result<()> {
    if ctx.caller != state.owner {
        return Err(StakingError::OwnerOnly {
            caller: ctx.caller,
            owner: state.owner,
        });
    }
    Ok(())
}
