//! Multisig backend error types

use quorum_types::{Address, Classify, ErrorKind, ServiceId, WordError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("incorrect payload length: got {provided} bytes, expected {expected}")]
    IncorrectDataLength { provided: usize, expected: usize },

    #[error("malformed payload: {0}")]
    Payload(#[from] WordError),

    #[error("owner set is empty")]
    ZeroValue,

    #[error("zero address in owner set")]
    ZeroAddress,

    #[error("duplicate owner: {0}")]
    DuplicateOwner(Address),

    #[error("wrong threshold: got {provided}, expected {expected}")]
    WrongThreshold { provided: u32, expected: u32 },

    #[error("wrong number of owners: got {provided}, expected {expected}")]
    WrongNumOwners { provided: usize, expected: usize },

    #[error("wrong owner: {0}")]
    WrongOwner(Address),

    #[error("wallet not found: {0}")]
    WalletNotFound(Address),

    #[error("wallet already exists: {0}")]
    WalletExists(Address),

    #[error("wallet {wallet} change approved by {approvals} owners, threshold is {threshold}")]
    InsufficientApprovals {
        wallet: Address,
        approvals: usize,
        threshold: u32,
    },

    #[error("setup call to {target} failed: {reason}")]
    SetupFailed { target: Address, reason: String },

    #[error("module {module} is not enabled on {wallet}")]
    ModuleNotEnabled { wallet: Address, module: Address },

    #[error("reentrant call")]
    ReentrancyGuard,

    #[error("service not found: {0}")]
    ServiceNotFound(ServiceId),

    #[error("only the service owner {owner} may recover access, got {caller}")]
    OwnerOnly { caller: Address, owner: Address },

    #[error("service {0} is deployed or has never been deployed")]
    NotRecoverable(ServiceId),
}

impl Classify for MultisigError {
    fn kind(&self) -> ErrorKind {
        match self {
            MultisigError::IncorrectDataLength { .. }
            | MultisigError::Payload(_)
            | MultisigError::ZeroValue
            | MultisigError::ZeroAddress
            | MultisigError::DuplicateOwner(_) => ErrorKind::InvalidArgument,
            MultisigError::WrongThreshold { .. }
            | MultisigError::WrongNumOwners { .. }
            | MultisigError::WrongOwner(_)
            | MultisigError::SetupFailed { .. }
            | MultisigError::ModuleNotEnabled { .. } => ErrorKind::CapabilityRejected,
            MultisigError::WalletNotFound(_) | MultisigError::ServiceNotFound(_) => {
                ErrorKind::NotFound
            }
            MultisigError::WalletExists(_) => ErrorKind::Conflict,
            MultisigError::InsufficientApprovals { .. } | MultisigError::OwnerOnly { .. } => {
                ErrorKind::Unauthorized
            }
            MultisigError::ReentrancyGuard | MultisigError::NotRecoverable(_) => {
                ErrorKind::StateViolation
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MultisigError>;
