//! Unit registry error types

use quorum_types::{Address, Classify, ContentHash, ErrorKind, UnitId};
use thiserror::Error;

use crate::unit::UnitKind;

/// Unit registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("only the manager {manager} may call this, got {caller}")]
    ManagerOnly { caller: Address, manager: Address },

    #[error("only the owner {owner} may call this, got {caller}")]
    OwnerOnly { caller: Address, owner: Address },

    #[error("zero address")]
    ZeroAddress,

    #[error("zero value")]
    ZeroValue,

    #[error("hash already registered: {0}")]
    HashExists(ContentHash),

    #[error("component not found: {0}")]
    ComponentNotFound(UnitId),

    #[error("agent not found: {0}")]
    AgentNotFound(UnitId),

    #[error("operation expects a {expected} registry, this is a {actual} registry")]
    WrongUnitKind { expected: UnitKind, actual: UnitKind },
}

impl UnitError {
    /// The kind-specific "not found" error for a unit id.
    pub fn not_found(kind: UnitKind, id: UnitId) -> Self {
        match kind {
            UnitKind::Component => UnitError::ComponentNotFound(id),
            UnitKind::Agent => UnitError::AgentNotFound(id),
        }
    }
}

impl Classify for UnitError {
    fn kind(&self) -> ErrorKind {
        match self {
            UnitError::ManagerOnly { .. } | UnitError::OwnerOnly { .. } => ErrorKind::Unauthorized,
            UnitError::ZeroAddress | UnitError::ZeroValue | UnitError::WrongUnitKind { .. } => {
                ErrorKind::InvalidArgument
            }
            UnitError::HashExists(_) => ErrorKind::Conflict,
            UnitError::ComponentNotFound(_) | UnitError::AgentNotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Result type for unit registry operations
pub type Result<T> = std::result::Result<T, UnitError>;
