//! Service registry error types

use quorum_multisig::MultisigError;
use quorum_types::{Address, AgentId, Amount, Classify, ErrorKind, ServiceId, TransferError};
use thiserror::Error;

use crate::state::{ServiceState, Transition};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{caller} may not act for {party}")]
    Unauthorized { caller: Address, party: Address },

    #[error("only the registry owner {owner} may call this, got {caller}")]
    RegistryOwnerOnly { caller: Address, owner: Address },

    #[error("{caller} does not own service {service_id}")]
    OwnerOnly { caller: Address, service_id: ServiceId },

    #[error("only the drainer may drain, got {0}")]
    DrainerOnly(Address),

    #[error("{0} is not a whitelisted slasher")]
    SlasherOnly(Address),

    #[error("zero address")]
    ZeroAddress,

    #[error("service not found: {0}")]
    ServiceNotFound(ServiceId),

    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("wrong agents data: {0}")]
    WrongAgentsData(&'static str),

    #[error("array length mismatch: {left} vs {right}")]
    WrongArrayLength { left: usize, right: usize },

    #[error("service {service_id} is {state}, cannot {transition:?}")]
    WrongServiceState {
        service_id: ServiceId,
        state: ServiceState,
        transition: Transition,
    },

    #[error("incorrect registration deposit: got {provided}, expected {expected}")]
    IncorrectRegistrationDepositValue { provided: Amount, expected: Amount },

    #[error("incorrect agent bonding value: got {provided}, expected {expected}")]
    IncorrectAgentBondingValue { provided: Amount, expected: Amount },

    #[error("agent {agent_id} is not part of service {service_id}")]
    AgentNotInService {
        agent_id: AgentId,
        service_id: ServiceId,
    },

    #[error("agent instance already registered: {0}")]
    AgentInstanceRegistered(Address),

    #[error("instance {instance} is not registered in service {service_id}")]
    AgentInstanceNotRegistered {
        instance: Address,
        service_id: ServiceId,
    },

    #[error("operator and instance roles overlap at {0}")]
    WrongOperator(Address),

    #[error("all slots of agent {agent_id} in service {service_id} are filled")]
    SlotsFilled {
        service_id: ServiceId,
        agent_id: AgentId,
    },

    #[error("operator {operator} has no instances in service {service_id}")]
    OperatorHasNoInstances {
        operator: Address,
        service_id: ServiceId,
    },

    #[error("{caller} is not the owner of service {service_id}")]
    UnauthorizedMultisig { caller: Address, service_id: ServiceId },

    #[error("multisig backend not whitelisted: {0}")]
    MultisigNotWhitelisted(Address),

    #[error("reentrant call")]
    ReentrancyGuard,

    #[error("amount overflow")]
    Overflow,

    #[error(transparent)]
    Multisig(#[from] MultisigError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl Classify for ServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Unauthorized { .. }
            | ServiceError::RegistryOwnerOnly { .. }
            | ServiceError::OwnerOnly { .. }
            | ServiceError::DrainerOnly(_)
            | ServiceError::SlasherOnly(_)
            | ServiceError::WrongOperator(_)
            | ServiceError::UnauthorizedMultisig { .. } => ErrorKind::Unauthorized,
            ServiceError::ZeroAddress
            | ServiceError::WrongAgentsData(_)
            | ServiceError::WrongArrayLength { .. }
            | ServiceError::Overflow => ErrorKind::InvalidArgument,
            ServiceError::ServiceNotFound(_)
            | ServiceError::AgentNotFound(_)
            | ServiceError::AgentNotInService { .. }
            | ServiceError::AgentInstanceNotRegistered { .. }
            | ServiceError::OperatorHasNoInstances { .. } => ErrorKind::NotFound,
            ServiceError::AgentInstanceRegistered(_) | ServiceError::SlotsFilled { .. } => {
                ErrorKind::Conflict
            }
            ServiceError::WrongServiceState { .. } | ServiceError::ReentrancyGuard => {
                ErrorKind::StateViolation
            }
            ServiceError::IncorrectRegistrationDepositValue { .. }
            | ServiceError::IncorrectAgentBondingValue { .. } => ErrorKind::ValueMismatch,
            ServiceError::MultisigNotWhitelisted(_) => ErrorKind::CapabilityRejected,
            ServiceError::Multisig(e) => e.kind(),
            ServiceError::Transfer(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
