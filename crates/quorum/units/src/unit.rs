use quorum_types::{Address, ContentHash, UnitId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which registry a unit lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Component,
    Agent,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Component => write!(f, "component"),
            UnitKind::Agent => write!(f, "agent"),
        }
    }
}

/// A registered content-addressed unit.
///
/// `hash_history` always starts with the creation hash and ends with
/// `current_hash`. The default value is the zeroed record returned for
/// unknown ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub owner: Address,
    pub developer: Address,
    pub current_hash: ContentHash,
    pub hash_history: Vec<ContentHash>,
    pub dependencies: Vec<UnitId>,
}

/// Events emitted by a unit registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitRegistryEvent {
    CreateUnit {
        unit_id: UnitId,
        kind: UnitKind,
        hash: ContentHash,
    },
    UpdateUnitHash {
        unit_id: UnitId,
        kind: UnitKind,
        hash: ContentHash,
    },
    Transfer {
        from: Address,
        to: Address,
        unit_id: UnitId,
    },
    OwnerUpdated {
        owner: Address,
    },
    ManagerUpdated {
        manager: Address,
    },
    BaseUriChanged {
        base_uri: String,
    },
}
