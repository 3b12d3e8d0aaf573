//! Service registry
//!
//! Owns every service, the global agent-instance index and the bond escrow.
//! Operations validate everything first, then move value, then commit state:
//! a failed pull or refund leaves the registry untouched.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use quorum_multisig::{MultisigBackend, ServiceDirectory};
use quorum_types::{
    Address, AgentId, Amount, CallContext, ContentHash, OwnershipLedger, ReentrancyGuard,
    ServiceId, ValueLedger,
};
use quorum_units::UnitDirectory;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::service::{AgentInstance, AgentParams, Service, ServiceEvent};
use crate::state::{ServiceState, Transition};

struct ServiceEntry {
    service: Service,
    config_hashes: Vec<ContentHash>,
    operator_bonds: BTreeMap<Address, Amount>,
    deposit_held: Amount,
}

impl ServiceEntry {
    fn escrow(&self) -> Amount {
        self.operator_bonds
            .values()
            .fold(self.deposit_held, |acc, bond| acc.saturating_add(*bond))
    }
}

pub struct ServiceRegistry {
    address: Address,
    name: String,
    symbol: String,
    base_uri: String,
    owner: Address,
    manager: Address,
    drainer: Address,
    agents: Arc<dyn UnitDirectory>,
    ledger: Arc<dyn ValueLedger>,
    services: Vec<ServiceEntry>,
    ownership: OwnershipLedger<ServiceId>,
    /// instance -> (service, operator) for every currently registered instance
    instance_index: HashMap<Address, (ServiceId, Address)>,
    /// operator -> number of instances registered across all services
    operator_instances: HashMap<Address, u32>,
    multisig_whitelist: HashSet<Address>,
    slashers: HashSet<Address>,
    slashed_funds: Amount,
    guard: ReentrancyGuard,
    events: Vec<ServiceEvent>,
}

impl ServiceRegistry {
    /// `address` is the escrow account holding deposits and bonds.
    pub fn new(
        address: Address,
        owner: Address,
        agents: Arc<dyn UnitDirectory>,
        ledger: Arc<dyn ValueLedger>,
    ) -> Self {
        Self {
            address,
            name: "Service Registry".to_string(),
            symbol: "SERVICE".to_string(),
            base_uri: String::new(),
            owner,
            manager: Address::ZERO,
            drainer: Address::ZERO,
            agents,
            ledger,
            services: Vec::new(),
            ownership: OwnershipLedger::new(),
            instance_index: HashMap::new(),
            operator_instances: HashMap::new(),
            multisig_whitelist: HashSet::new(),
            slashers: HashSet::new(),
            slashed_funds: 0,
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
        }
    }

    pub fn with_metadata(
        mut self,
        name: impl Into<String>,
        symbol: impl Into<String>,
        base_uri: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self.symbol = symbol.into();
        self.base_uri = base_uri.into();
        self
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Define a new service in PreRegistration.
    pub fn create(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        config_hash: ContentHash,
        agent_ids: Vec<AgentId>,
        agent_params: Vec<AgentParams>,
        max_threshold: u32,
    ) -> Result<ServiceId> {
        if owner.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }
        self.authorize(ctx, owner)?;
        let security_deposit =
            self.validate_definition(&config_hash, &agent_ids, &agent_params, max_threshold)?;

        let service_id = ServiceId::new(self.total_supply() + 1);
        self.services.push(ServiceEntry {
            service: Service {
                id: service_id,
                owner,
                config_hash,
                security_deposit,
                max_threshold,
                state: ServiceState::PreRegistration,
                agent_ids,
                agent_params,
                ..Service::default()
            },
            config_hashes: vec![config_hash],
            operator_bonds: BTreeMap::new(),
            deposit_held: 0,
        });
        self.ownership.mint(service_id, owner);
        self.events.push(ServiceEvent::CreateService {
            service_id,
            config_hash,
        });

        info!(
            service_id = %service_id,
            owner = %owner,
            max_threshold,
            security_deposit,
            "Service created"
        );
        Ok(service_id)
    }

    /// Redefine a service that is back in PreRegistration.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        service_id: ServiceId,
        config_hash: ContentHash,
        agent_ids: Vec<AgentId>,
        agent_params: Vec<AgentParams>,
        max_threshold: u32,
    ) -> Result<()> {
        self.authorize(ctx, owner)?;
        let state = self.entry(service_id)?.service.state;
        self.check_service_owner(owner, service_id)?;
        let next = step(service_id, state, Transition::Update)?;
        let security_deposit =
            self.validate_definition(&config_hash, &agent_ids, &agent_params, max_threshold)?;

        let entry = self.entry_mut(service_id)?;
        if entry.service.config_hash != config_hash {
            entry.config_hashes.push(config_hash);
            entry.service.config_hash = config_hash;
        }
        entry.service.agent_ids = agent_ids;
        entry.service.agent_params = agent_params;
        entry.service.max_threshold = max_threshold;
        entry.service.security_deposit = security_deposit;
        entry.service.state = next;
        self.events.push(ServiceEvent::UpdateService {
            service_id,
            config_hash,
        });

        info!(service_id = %service_id, max_threshold, security_deposit, "Service updated");
        Ok(())
    }

    /// Pay the security deposit and open registration.
    pub fn activate_registration(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        service_id: ServiceId,
    ) -> Result<()> {
        self.authorize(ctx, owner)?;
        let entry = self.entry(service_id)?;
        let state = entry.service.state;
        let expected = entry.service.security_deposit;
        self.check_service_owner(owner, service_id)?;
        let next = step(service_id, state, Transition::ActivateRegistration)?;
        if ctx.value != expected {
            return Err(ServiceError::IncorrectRegistrationDepositValue {
                provided: ctx.value,
                expected,
            });
        }

        self.collect(ctx)?;

        let entry = self.entry_mut(service_id)?;
        entry.deposit_held = expected;
        entry.service.state = next;
        self.events.push(ServiceEvent::ActivateRegistration {
            service_id,
            deposit: expected,
        });

        info!(service_id = %service_id, deposit = expected, "Registration activated");
        Ok(())
    }

    /// Bond and register agent instances. Filling the last slot finishes
    /// registration.
    pub fn register_agents(
        &mut self,
        ctx: &CallContext,
        operator: Address,
        service_id: ServiceId,
        instances: Vec<Address>,
        agent_ids: Vec<AgentId>,
    ) -> Result<()> {
        if operator.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }
        self.authorize(ctx, operator)?;
        if instances.is_empty() || instances.len() != agent_ids.len() {
            return Err(ServiceError::WrongArrayLength {
                left: instances.len(),
                right: agent_ids.len(),
            });
        }

        let entry = self.entry(service_id)?;
        let service = &entry.service;
        step(service_id, service.state, Transition::RegisterAgents)?;
        if self.instance_index.contains_key(&operator) {
            return Err(ServiceError::WrongOperator(operator));
        }

        let mut pending: HashMap<AgentId, u32> = HashMap::new();
        let mut batch = HashSet::with_capacity(instances.len());
        let mut total_bond: Amount = 0;
        for (instance, agent_id) in instances.iter().zip(agent_ids.iter()) {
            if instance.is_zero() {
                return Err(ServiceError::ZeroAddress);
            }
            if *instance == operator || self.operator_instances.contains_key(instance) {
                return Err(ServiceError::WrongOperator(*instance));
            }
            let params = service
                .params_for(*agent_id)
                .ok_or(ServiceError::AgentNotInService {
                    agent_id: *agent_id,
                    service_id,
                })?;
            if self.instance_index.contains_key(instance) || !batch.insert(*instance) {
                return Err(ServiceError::AgentInstanceRegistered(*instance));
            }

            let queued = pending.entry(*agent_id).or_insert(0);
            *queued += 1;
            let taken = service.instances_for(*agent_id).count() as u32 + *queued;
            if taken > params.slots {
                return Err(ServiceError::SlotsFilled {
                    service_id,
                    agent_id: *agent_id,
                });
            }
            total_bond = total_bond
                .checked_add(params.bond)
                .ok_or(ServiceError::Overflow)?;
        }

        let registered = service.num_instances() + instances.len() as u32;
        let next = if registered == service.max_threshold {
            step(service_id, service.state, Transition::FillSlots)?
        } else {
            service.state
        };
        if ctx.value != total_bond {
            return Err(ServiceError::IncorrectAgentBondingValue {
                provided: ctx.value,
                expected: total_bond,
            });
        }
        let operator_bond = entry
            .operator_bonds
            .get(&operator)
            .copied()
            .unwrap_or(0)
            .checked_add(total_bond)
            .ok_or(ServiceError::Overflow)?;
        debug!(service_id = %service_id, operator = %operator, total_bond, "Registration passed checks");

        self.collect(ctx)?;

        let entry = self.entry_mut(service_id)?;
        for (instance, agent_id) in instances.iter().zip(agent_ids.iter()) {
            entry.service.instances.push(AgentInstance {
                instance: *instance,
                agent_id: *agent_id,
                operator,
            });
        }
        entry.operator_bonds.insert(operator, operator_bond);
        entry.service.state = next;

        for (instance, agent_id) in instances.iter().zip(agent_ids.iter()) {
            self.instance_index
                .insert(*instance, (service_id, operator));
            self.events.push(ServiceEvent::RegisterInstance {
                operator,
                service_id,
                instance: *instance,
                agent_id: *agent_id,
            });
        }
        *self.operator_instances.entry(operator).or_insert(0) += instances.len() as u32;

        info!(
            service_id = %service_id,
            operator = %operator,
            instances = instances.len(),
            bond = total_bond,
            state = %next,
            "Agent instances registered"
        );
        Ok(())
    }

    /// Obtain the service wallet from a whitelisted backend.
    ///
    /// The owner set is the registered instances in registration order and the
    /// threshold is `max_threshold`.
    pub fn deploy(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        service_id: ServiceId,
        backend: &dyn MultisigBackend,
        payload: &[u8],
    ) -> Result<Address> {
        let entry = self.entry(service_id)?;
        let acting_for_owner =
            ctx.caller == owner || (!self.manager.is_zero() && ctx.caller == self.manager);
        if !acting_for_owner || self.ownership.owner_of(&service_id) != Some(owner) {
            warn!(caller = %ctx.caller, service_id = %service_id, "Rejected deploy by non-owner");
            return Err(ServiceError::UnauthorizedMultisig {
                caller: ctx.caller,
                service_id,
            });
        }
        let backend_address = backend.address();
        if !self.multisig_whitelist.contains(&backend_address) {
            warn!(service_id = %service_id, backend = %backend_address, "Rejected non-whitelisted multisig backend");
            return Err(ServiceError::MultisigNotWhitelisted(backend_address));
        }
        let next = step(service_id, entry.service.state, Transition::Deploy)?;

        let owners: Vec<Address> = entry.service.instances.iter().map(|i| i.instance).collect();
        let threshold = entry.service.max_threshold;

        let multisig = {
            let _token = self.guard.enter().ok_or(ServiceError::ReentrancyGuard)?;
            backend.create(&owners, threshold, payload)?
        };

        let entry = self.entry_mut(service_id)?;
        entry.service.multisig = Some(multisig);
        entry.service.last_multisig = Some(multisig);
        entry.service.state = next;
        self.events.push(ServiceEvent::DeployService {
            service_id,
            multisig,
        });

        info!(
            service_id = %service_id,
            backend = %backend_address,
            multisig = %multisig,
            threshold,
            "Service deployed"
        );
        Ok(multisig)
    }

    /// Stop the service and refund the security deposit. Operator bonds stay
    /// in escrow until each operator unbonds.
    pub fn terminate(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        service_id: ServiceId,
    ) -> Result<Amount> {
        self.authorize(ctx, owner)?;
        let entry = self.entry(service_id)?;
        self.check_service_owner(owner, service_id)?;
        let transition = if entry.service.instances.is_empty() {
            Transition::TerminateEmpty
        } else {
            Transition::Terminate
        };
        let next = step(service_id, entry.service.state, transition)?;
        let refund = entry.deposit_held;

        self.refund(owner, refund)?;

        let entry = self.entry_mut(service_id)?;
        entry.deposit_held = 0;
        entry.service.multisig = None;
        entry.service.state = next;
        self.events.push(ServiceEvent::TerminateService { service_id, refund });

        info!(service_id = %service_id, refund, state = %next, "Service terminated");
        Ok(refund)
    }

    /// Return an operator's remaining bond and release its instances.
    pub fn unbond(
        &mut self,
        ctx: &CallContext,
        operator: Address,
        service_id: ServiceId,
    ) -> Result<Amount> {
        self.authorize(ctx, operator)?;
        let entry = self.entry(service_id)?;
        let state = entry.service.state;
        step(service_id, state, Transition::Unbond)?;

        let (released, remaining): (Vec<AgentInstance>, Vec<AgentInstance>) = entry
            .service
            .instances
            .iter()
            .copied()
            .partition(|i| i.operator == operator);
        if released.is_empty() {
            return Err(ServiceError::OperatorHasNoInstances {
                operator,
                service_id,
            });
        }
        let next = if remaining.is_empty() {
            step(service_id, state, Transition::UnbondLast)?
        } else {
            state
        };
        let refund = entry.operator_bonds.get(&operator).copied().unwrap_or(0);

        self.refund(operator, refund)?;

        let entry = self.entry_mut(service_id)?;
        entry.service.instances = remaining;
        entry.operator_bonds.remove(&operator);
        entry.service.state = next;

        for record in &released {
            self.instance_index.remove(&record.instance);
        }
        if let Some(count) = self.operator_instances.get_mut(&operator) {
            *count = count.saturating_sub(released.len() as u32);
            if *count == 0 {
                self.operator_instances.remove(&operator);
            }
        }
        self.events.push(ServiceEvent::OperatorUnbond {
            operator,
            service_id,
            refund,
        });

        info!(
            service_id = %service_id,
            operator = %operator,
            refund,
            released = released.len(),
            state = %next,
            "Operator unbonded"
        );
        Ok(refund)
    }

    /// Move part of the bonds behind misbehaving instances into the slashed
    /// pool. Each amount is capped at the operator's remaining bond.
    pub fn slash(
        &mut self,
        ctx: &CallContext,
        instances: Vec<Address>,
        amounts: Vec<Amount>,
        service_id: ServiceId,
    ) -> Result<Amount> {
        if !self.slashers.contains(&ctx.caller) {
            return Err(ServiceError::SlasherOnly(ctx.caller));
        }
        if instances.is_empty() || instances.len() != amounts.len() {
            return Err(ServiceError::WrongArrayLength {
                left: instances.len(),
                right: amounts.len(),
            });
        }
        let entry = self.entry(service_id)?;
        let next = step(service_id, entry.service.state, Transition::Slash)?;

        let mut bonds = entry.operator_bonds.clone();
        let mut slashed: BTreeMap<Address, Amount> = BTreeMap::new();
        for (instance, amount) in instances.iter().zip(amounts.iter()) {
            let record = entry
                .service
                .instances
                .iter()
                .find(|i| i.instance == *instance)
                .ok_or(ServiceError::AgentInstanceNotRegistered {
                    instance: *instance,
                    service_id,
                })?;
            let bond = bonds.entry(record.operator).or_insert(0);
            let taken = (*amount).min(*bond);
            *bond -= taken;
            *slashed.entry(record.operator).or_insert(0) += taken;
        }
        let total: Amount = slashed.values().sum();
        let pool = self
            .slashed_funds
            .checked_add(total)
            .ok_or(ServiceError::Overflow)?;

        let entry = self.entry_mut(service_id)?;
        entry.operator_bonds = bonds;
        entry.service.state = next;
        self.slashed_funds = pool;
        for (operator, amount) in slashed.into_iter().filter(|(_, a)| *a > 0) {
            self.events.push(ServiceEvent::OperatorSlashed {
                operator,
                service_id,
                amount,
            });
        }

        info!(service_id = %service_id, slasher = %ctx.caller, total, "Operators slashed");
        Ok(total)
    }

    /// Send the slashed pool to the drainer.
    pub fn drain(&mut self, ctx: &CallContext) -> Result<Amount> {
        if self.drainer.is_zero() || ctx.caller != self.drainer {
            return Err(ServiceError::DrainerOnly(ctx.caller));
        }
        let amount = self.slashed_funds;
        if amount == 0 {
            return Ok(0);
        }

        self.refund(self.drainer, amount)?;
        self.slashed_funds = 0;
        self.events.push(ServiceEvent::Drain {
            drainer: self.drainer,
            amount,
        });

        info!(drainer = %self.drainer, amount, "Slashed funds drained");
        Ok(amount)
    }

    /// Transfer service ownership.
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, service_id: ServiceId) -> Result<()> {
        let owner = self
            .ownership
            .owner_of(&service_id)
            .ok_or(ServiceError::ServiceNotFound(service_id))?;
        if ctx.caller != owner {
            return Err(ServiceError::OwnerOnly {
                caller: ctx.caller,
                service_id,
            });
        }
        if to.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }

        self.ownership.transfer(service_id, to);
        self.entry_mut(service_id)?.service.owner = to;
        self.events.push(ServiceEvent::Transfer {
            from: owner,
            to,
            service_id,
        });
        info!(service_id = %service_id, from = %owner, to = %to, "Service transferred");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    pub fn change_owner(&mut self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        self.check_registry_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }
        self.owner = new_owner;
        self.events.push(ServiceEvent::OwnerUpdated { owner: new_owner });
        info!(owner = %new_owner, "Service registry owner updated");
        Ok(())
    }

    pub fn change_manager(&mut self, ctx: &CallContext, new_manager: Address) -> Result<()> {
        self.check_registry_owner(ctx)?;
        if new_manager.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }
        self.manager = new_manager;
        self.events.push(ServiceEvent::ManagerUpdated {
            manager: new_manager,
        });
        info!(manager = %new_manager, "Service registry manager updated");
        Ok(())
    }

    pub fn change_drainer(&mut self, ctx: &CallContext, new_drainer: Address) -> Result<()> {
        self.check_registry_owner(ctx)?;
        if new_drainer.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }
        self.drainer = new_drainer;
        self.events.push(ServiceEvent::DrainerUpdated {
            drainer: new_drainer,
        });
        info!(drainer = %new_drainer, "Service registry drainer updated");
        Ok(())
    }

    /// Add or remove a multisig backend from the whitelist.
    pub fn change_multisig_permission(
        &mut self,
        ctx: &CallContext,
        backend: Address,
        permitted: bool,
    ) -> Result<()> {
        self.check_registry_owner(ctx)?;
        if backend.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }
        if permitted {
            self.multisig_whitelist.insert(backend);
        } else {
            self.multisig_whitelist.remove(&backend);
        }
        self.events
            .push(ServiceEvent::MultisigPermission { backend, permitted });
        info!(backend = %backend, permitted, "Multisig permission changed");
        Ok(())
    }

    pub fn change_slasher_permission(
        &mut self,
        ctx: &CallContext,
        slasher: Address,
        permitted: bool,
    ) -> Result<()> {
        self.check_registry_owner(ctx)?;
        if slasher.is_zero() {
            return Err(ServiceError::ZeroAddress);
        }
        if permitted {
            self.slashers.insert(slasher);
        } else {
            self.slashers.remove(&slasher);
        }
        self.events
            .push(ServiceEvent::SlasherPermission { slasher, permitted });
        info!(slasher = %slasher, permitted, "Slasher permission changed");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn manager(&self) -> Address {
        self.manager
    }

    pub fn drainer(&self) -> Address {
        self.drainer
    }

    /// Service record, or the zeroed record for unknown ids.
    pub fn get_service(&self, service_id: ServiceId) -> Service {
        self.lookup(service_id)
            .map(|e| e.service.clone())
            .unwrap_or_default()
    }

    pub fn get_agent_params(&self, service_id: ServiceId) -> Vec<(AgentId, AgentParams)> {
        self.lookup(service_id)
            .map(|e| {
                e.service
                    .agent_ids
                    .iter()
                    .copied()
                    .zip(e.service.agent_params.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_agent_instances(&self, service_id: ServiceId) -> Vec<Address> {
        self.lookup(service_id)
            .map(|e| e.service.instances.iter().map(|i| i.instance).collect())
            .unwrap_or_default()
    }

    pub fn get_instances_for_agent_id(&self, service_id: ServiceId, agent_id: AgentId) -> Vec<Address> {
        self.lookup(service_id)
            .map(|e| e.service.instances_for(agent_id).map(|i| i.instance).collect())
            .unwrap_or_default()
    }

    /// Bond the operator currently has escrowed in the service.
    pub fn get_operator_balance(&self, operator: &Address, service_id: ServiceId) -> Amount {
        self.lookup(service_id)
            .and_then(|e| e.operator_bonds.get(operator).copied())
            .unwrap_or(0)
    }

    /// Operator of a currently registered instance.
    pub fn operator_of(&self, instance: &Address) -> Option<Address> {
        self.instance_index.get(instance).map(|(_, operator)| *operator)
    }

    /// Value held for the service: the owner deposit plus all operator bonds.
    pub fn escrow_balance(&self, service_id: ServiceId) -> Amount {
        self.lookup(service_id).map(ServiceEntry::escrow).unwrap_or(0)
    }

    /// Config hashes the service has had, oldest first.
    pub fn get_config_hashes(&self, service_id: ServiceId) -> Vec<ContentHash> {
        self.lookup(service_id)
            .map(|e| e.config_hashes.clone())
            .unwrap_or_default()
    }

    pub fn token_uri(&self, service_id: ServiceId) -> Option<String> {
        self.lookup(service_id)
            .map(|e| format!("{}{}", self.base_uri, e.service.config_hash.to_hex()))
    }

    pub fn exists(&self, service_id: ServiceId) -> bool {
        self.lookup(service_id).is_some()
    }

    pub fn total_supply(&self) -> u32 {
        self.services.len() as u32
    }

    pub fn owner_of(&self, service_id: ServiceId) -> Option<Address> {
        self.ownership.owner_of(&service_id)
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.ownership.balance_of(owner)
    }

    pub fn slashed_funds(&self) -> Amount {
        self.slashed_funds
    }

    pub fn is_multisig_permitted(&self, backend: &Address) -> bool {
        self.multisig_whitelist.contains(backend)
    }

    pub fn is_slasher(&self, account: &Address) -> bool {
        self.slashers.contains(account)
    }

    pub fn events(&self) -> &[ServiceEvent] {
        &self.events
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn lookup(&self, service_id: ServiceId) -> Option<&ServiceEntry> {
        let index = service_id.get().checked_sub(1)?;
        self.services.get(index as usize)
    }

    fn entry(&self, service_id: ServiceId) -> Result<&ServiceEntry> {
        self.lookup(service_id)
            .ok_or(ServiceError::ServiceNotFound(service_id))
    }

    fn entry_mut(&mut self, service_id: ServiceId) -> Result<&mut ServiceEntry> {
        let index = service_id
            .get()
            .checked_sub(1)
            .ok_or(ServiceError::ServiceNotFound(service_id))?;
        self.services
            .get_mut(index as usize)
            .ok_or(ServiceError::ServiceNotFound(service_id))
    }

    /// The caller acts for `party` if it is `party` or the registry manager.
    fn authorize(&self, ctx: &CallContext, party: Address) -> Result<()> {
        if ctx.caller == party || (!self.manager.is_zero() && ctx.caller == self.manager) {
            return Ok(());
        }
        warn!(caller = %ctx.caller, party = %party, "Rejected call on behalf of another account");
        Err(ServiceError::Unauthorized {
            caller: ctx.caller,
            party,
        })
    }

    fn check_service_owner(&self, party: Address, service_id: ServiceId) -> Result<()> {
        if self.ownership.owner_of(&service_id) != Some(party) {
            return Err(ServiceError::OwnerOnly {
                caller: party,
                service_id,
            });
        }
        Ok(())
    }

    fn check_registry_owner(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.owner {
            warn!(caller = %ctx.caller, "Rejected non-owner admin call");
            return Err(ServiceError::RegistryOwnerOnly {
                caller: ctx.caller,
                owner: self.owner,
            });
        }
        Ok(())
    }

    fn validate_definition(
        &self,
        config_hash: &ContentHash,
        agent_ids: &[AgentId],
        agent_params: &[AgentParams],
        max_threshold: u32,
    ) -> Result<Amount> {
        if agent_ids.len() != agent_params.len() {
            return Err(ServiceError::WrongArrayLength {
                left: agent_ids.len(),
                right: agent_params.len(),
            });
        }
        if config_hash.is_zero() {
            return Err(ServiceError::WrongAgentsData("empty config hash"));
        }
        if agent_ids.is_empty() {
            return Err(ServiceError::WrongAgentsData("no agents"));
        }

        let mut last = 0u32;
        let mut slots = 0u32;
        let mut deposit: Amount = 0;
        for (agent_id, params) in agent_ids.iter().zip(agent_params.iter()) {
            if agent_id.get() <= last {
                return Err(ServiceError::WrongAgentsData(
                    "agent ids must be strictly ascending",
                ));
            }
            last = agent_id.get();
            if !self.agents.exists(*agent_id) {
                return Err(ServiceError::AgentNotFound(*agent_id));
            }
            if params.slots == 0 || params.bond == 0 {
                return Err(ServiceError::WrongAgentsData("zero slots or bond"));
            }
            slots = slots
                .checked_add(params.slots)
                .ok_or(ServiceError::Overflow)?;
            deposit = deposit.max(params.bond);
        }
        if slots != max_threshold {
            return Err(ServiceError::WrongAgentsData(
                "slot total must equal max threshold",
            ));
        }
        Ok(deposit)
    }

    /// Pull the attached value into escrow.
    fn collect(&self, ctx: &CallContext) -> Result<()> {
        self.ledger
            .transfer(&ctx.caller, &self.address, ctx.value)
            .map_err(|e| {
                warn!(payer = %ctx.caller, amount = ctx.value, error = %e, "Value pull failed");
                ServiceError::from(e)
            })
    }

    /// Push value out of escrow.
    fn refund(&self, to: Address, amount: Amount) -> Result<()> {
        self.ledger
            .transfer(&self.address, &to, amount)
            .map_err(|e| {
                warn!(recipient = %to, amount, error = %e, "Refund failed");
                ServiceError::from(e)
            })
    }
}

fn step(service_id: ServiceId, state: ServiceState, transition: Transition) -> Result<ServiceState> {
    state
        .transition(transition)
        .ok_or(ServiceError::WrongServiceState {
            service_id,
            state,
            transition,
        })
}

impl ServiceDirectory for ServiceRegistry {
    fn service_owner(&self, service_id: ServiceId) -> Option<Address> {
        self.owner_of(service_id)
    }

    fn last_multisig(&self, service_id: ServiceId) -> Option<Address> {
        self.lookup(service_id)
            .and_then(|e| e.service.last_multisig)
    }

    fn accepts_recovery(&self, service_id: ServiceId) -> bool {
        matches!(
            self.lookup(service_id).map(|e| e.service.state),
            Some(ServiceState::PreRegistration | ServiceState::TerminatedBonded)
        )
    }
}
