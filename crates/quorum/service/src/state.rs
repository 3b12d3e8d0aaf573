//! Service lifecycle state machine
//!
//! ```text
//! PreRegistration ──activate──▶ ActiveRegistration ──fill──▶ FinishedRegistration
//!        ▲                            │                              │
//!        │                        terminate                      deploy
//!        │                            ▼                              ▼
//!        └────unbond (last)──── TerminatedBonded ◀──terminate──── Deployed
//! ```
//!
//! Every operation asks [`ServiceState::transition`] before touching state; a
//! `None` answer is a `WrongServiceState` rejection.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceState {
    #[default]
    NonExistent,
    PreRegistration,
    ActiveRegistration,
    FinishedRegistration,
    Deployed,
    TerminatedBonded,
}

/// Requested lifecycle step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// Redefine agents, params or config hash.
    Update,
    ActivateRegistration,
    /// Register instances without filling every slot.
    RegisterAgents,
    /// Register the instances that fill the last slots.
    FillSlots,
    Deploy,
    Slash,
    /// Terminate with instances left to unbond.
    Terminate,
    /// Terminate with no instances registered.
    TerminateEmpty,
    /// An operator unbonds while others still have instances.
    Unbond,
    /// The last operator unbonds.
    UnbondLast,
}

impl ServiceState {
    /// The transition table. `None` means the step is not allowed from `self`.
    pub fn transition(self, step: Transition) -> Option<ServiceState> {
        use ServiceState::*;
        use Transition as T;

        match (self, step) {
            (PreRegistration, T::Update) => Some(PreRegistration),
            (PreRegistration, T::ActivateRegistration) => Some(ActiveRegistration),
            (ActiveRegistration, T::RegisterAgents) => Some(ActiveRegistration),
            (ActiveRegistration, T::FillSlots) => Some(FinishedRegistration),
            (FinishedRegistration, T::Deploy) => Some(Deployed),
            (Deployed, T::Slash) => Some(Deployed),
            (ActiveRegistration | FinishedRegistration | Deployed, T::Terminate) => {
                Some(TerminatedBonded)
            }
            (ActiveRegistration, T::TerminateEmpty) => Some(PreRegistration),
            (TerminatedBonded, T::Unbond) => Some(TerminatedBonded),
            (TerminatedBonded, T::UnbondLast) => Some(PreRegistration),
            _ => None,
        }
    }

    /// Whether the service's instances currently hold its wallet.
    pub fn is_deployed(self) -> bool {
        self == ServiceState::Deployed
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::NonExistent => "non-existent",
            ServiceState::PreRegistration => "pre-registration",
            ServiceState::ActiveRegistration => "active-registration",
            ServiceState::FinishedRegistration => "finished-registration",
            ServiceState::Deployed => "deployed",
            ServiceState::TerminatedBonded => "terminated-bonded",
        };
        f.write_str(name)
    }
}
