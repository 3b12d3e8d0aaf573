//! Shared error types and the error-kind taxonomy

use thiserror::Error;

use crate::ids::{Address, Amount};

/// Coarse classification of every registry failure.
///
/// Each crate keeps its own precisely-named error enum; `ErrorKind` lets
/// integrations branch on the cause without matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Zero address/value, malformed payload length, array-length mismatch.
    InvalidArgument,
    /// Unit, service, wallet or dependency absent.
    NotFound,
    /// Hash collision, instance already registered, slot exhausted.
    Conflict,
    /// Wrong lifecycle state for the requested transition.
    StateViolation,
    /// Caller is not the owner/manager/operator of record.
    Unauthorized,
    /// Backend or implementation not whitelisted, initializer failed.
    CapabilityRejected,
    /// Attached payment does not equal the required deposit or bond.
    ValueMismatch,
}

/// Maps a concrete error to its `ErrorKind`.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Failure of the value-transfer primitive. Always aborts the calling operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Address,
        required: Amount,
        available: Amount,
    },

    #[error("recipient {0} rejected the transfer")]
    Rejected(Address),

    #[error("balance overflow for {0}")]
    Overflow(Address),
}

impl Classify for TransferError {
    fn kind(&self) -> ErrorKind {
        match self {
            TransferError::InsufficientBalance { .. } => ErrorKind::ValueMismatch,
            TransferError::Rejected(_) => ErrorKind::CapabilityRejected,
            TransferError::Overflow(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Failure to parse an address or hash from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("wrong length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}
