//! Service records and events

use quorum_types::{Address, AgentId, Amount, ContentHash, ServiceId};
use serde::{Deserialize, Serialize};

use crate::state::ServiceState;

/// Slot count and per-instance bond for one agent id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentParams {
    pub slots: u32,
    pub bond: Amount,
}

impl AgentParams {
    pub fn new(slots: u32, bond: Amount) -> Self {
        Self { slots, bond }
    }
}

/// One filled slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInstance {
    pub instance: Address,
    pub agent_id: AgentId,
    pub operator: Address,
}

/// A service definition plus its lifecycle position.
///
/// `Default` is the zeroed record returned for unknown ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub owner: Address,
    pub config_hash: ContentHash,
    /// Owner deposit required to activate registration: the largest bond
    /// across the service's agents.
    pub security_deposit: Amount,
    /// Signing threshold of the service wallet; equals the total slot count.
    pub max_threshold: u32,
    pub state: ServiceState,
    /// Ascending agent ids with their params, same order.
    pub agent_ids: Vec<AgentId>,
    pub agent_params: Vec<AgentParams>,
    /// Registered instances in registration order.
    pub instances: Vec<AgentInstance>,
    pub multisig: Option<Address>,
    pub last_multisig: Option<Address>,
}

impl Service {
    pub fn num_instances(&self) -> u32 {
        self.instances.len() as u32
    }

    pub fn params_for(&self, agent_id: AgentId) -> Option<AgentParams> {
        self.agent_ids
            .iter()
            .position(|id| *id == agent_id)
            .map(|i| self.agent_params[i])
    }

    pub fn instances_for(&self, agent_id: AgentId) -> impl Iterator<Item = &AgentInstance> {
        self.instances.iter().filter(move |i| i.agent_id == agent_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceEvent {
    CreateService {
        service_id: ServiceId,
        config_hash: ContentHash,
    },
    UpdateService {
        service_id: ServiceId,
        config_hash: ContentHash,
    },
    ActivateRegistration {
        service_id: ServiceId,
        deposit: Amount,
    },
    RegisterInstance {
        operator: Address,
        service_id: ServiceId,
        instance: Address,
        agent_id: AgentId,
    },
    DeployService {
        service_id: ServiceId,
        multisig: Address,
    },
    TerminateService {
        service_id: ServiceId,
        refund: Amount,
    },
    OperatorUnbond {
        operator: Address,
        service_id: ServiceId,
        refund: Amount,
    },
    OperatorSlashed {
        operator: Address,
        service_id: ServiceId,
        amount: Amount,
    },
    Drain {
        drainer: Address,
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        service_id: ServiceId,
    },
    OwnerUpdated {
        owner: Address,
    },
    ManagerUpdated {
        manager: Address,
    },
    DrainerUpdated {
        drainer: Address,
    },
    MultisigPermission {
        backend: Address,
        permitted: bool,
    },
    SlasherPermission {
        slasher: Address,
        permitted: bool,
    },
}
