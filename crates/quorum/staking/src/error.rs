//! Staking admission error types

use quorum_types::{Address, Classify, ErrorKind, WordError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("only the owner {owner} may call this, got {caller}")]
    OwnerOnly { caller: Address, owner: Address },

    #[error("only the deployer {deployer} may change this instance, got {caller}")]
    DeployerOnly { caller: Address, deployer: Address },

    #[error("zero address")]
    ZeroAddress,

    #[error("zero value")]
    ZeroValue,

    #[error("array length mismatch: {left} vs {right}")]
    WrongArrayLength { left: usize, right: usize },

    #[error("no contract deployed at {0}")]
    ContractOnly(Address),

    #[error("implementation already deployed at {0}")]
    ImplementationExists(Address),

    #[error("incorrect data length: got {provided} bytes, expected at least {expected}")]
    IncorrectDataLength { provided: usize, expected: usize },

    #[error("unknown initializer selector")]
    UnknownSelector,

    #[error("malformed initializer payload: {0}")]
    Payload(#[from] WordError),

    #[error("initialization of {instance} failed: {reason}")]
    InitializationFailed { instance: Address, reason: String },

    #[error("implementation not verified: {0}")]
    UnverifiedImplementation(Address),

    #[error("instance parameters not verified: {0}")]
    UnverifiedProxy(Address),

    #[error("instance not found: {0}")]
    InstanceNotFound(Address),

    #[error("reentrant call")]
    ReentrancyGuard,
}

impl Classify for StakingError {
    fn kind(&self) -> ErrorKind {
        match self {
            StakingError::OwnerOnly { .. } | StakingError::DeployerOnly { .. } => {
                ErrorKind::Unauthorized
            }
            StakingError::ZeroAddress
            | StakingError::ZeroValue
            | StakingError::WrongArrayLength { .. }
            | StakingError::IncorrectDataLength { .. }
            | StakingError::UnknownSelector
            | StakingError::Payload(_) => ErrorKind::InvalidArgument,
            StakingError::ContractOnly(_) | StakingError::InstanceNotFound(_) => {
                ErrorKind::NotFound
            }
            StakingError::ImplementationExists(_) => ErrorKind::Conflict,
            StakingError::InitializationFailed { .. }
            | StakingError::UnverifiedImplementation(_)
            | StakingError::UnverifiedProxy(_) => ErrorKind::CapabilityRejected,
            StakingError::ReentrancyGuard => ErrorKind::StateViolation,
        }
    }
}

pub type Result<T> = std::result::Result<T, StakingError>;
