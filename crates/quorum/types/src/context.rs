use serde::{Deserialize, Serialize};

use crate::ids::{Address, Amount};

/// Authenticated caller of an operation plus the value attached to the call.
///
/// The host environment guarantees `caller` is authentic; registries only
/// compare it against stored owners, managers and operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub value: Amount,
}

impl CallContext {
    /// A call with no value attached.
    pub fn new(caller: Address) -> Self {
        Self { caller, value: 0 }
    }

    /// A payable call.
    pub fn with_value(caller: Address, value: Amount) -> Self {
        Self { caller, value }
    }
}
