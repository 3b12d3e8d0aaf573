use quorum_types::Address;
use serde::{Deserialize, Serialize};

use crate::limits::StakingLimits;

/// Events emitted by the verifier and the factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingEvent {
    ImplementationsStatusesUpdated {
        implementations: Vec<Address>,
        statuses: Vec<bool>,
    },
    ImplementationsCheckUpdated {
        enabled: bool,
    },
    StakingLimitsUpdated {
        limits: StakingLimits,
    },
    InstanceCreated {
        sender: Address,
        instance: Address,
        implementation: Address,
    },
    InstanceStatusChanged {
        instance: Address,
        enabled: bool,
    },
    VerifierUpdated {
        verifier: Option<Address>,
    },
    OwnerUpdated {
        owner: Address,
    },
}
