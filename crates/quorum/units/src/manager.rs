//! Registries manager
//!
//! The manager role of both unit registries. It is the only account allowed to
//! create units or update their hashes, and the place where hash uniqueness is
//! enforced across the component and agent registries together.

use quorum_types::{Address, CallContext, ContentHash, UnitId};
use tracing::{debug, warn};

use crate::error::{Result, UnitError};
use crate::registry::UnitRegistry;
use crate::unit::UnitKind;

/// Write surface for the component and agent registries.
pub struct RegistriesManager {
    address: Address,
    components: UnitRegistry,
    agents: UnitRegistry,
}

impl RegistriesManager {
    /// Take over the manager role of both registries.
    ///
    /// `owner` must be the owner of both registries.
    pub fn new(
        address: Address,
        owner: Address,
        mut components: UnitRegistry,
        mut agents: UnitRegistry,
    ) -> Result<Self> {
        if address.is_zero() {
            return Err(UnitError::ZeroAddress);
        }
        if components.kind() != UnitKind::Component {
            return Err(UnitError::WrongUnitKind {
                expected: UnitKind::Component,
                actual: components.kind(),
            });
        }
        if agents.kind() != UnitKind::Agent {
            return Err(UnitError::WrongUnitKind {
                expected: UnitKind::Agent,
                actual: agents.kind(),
            });
        }

        let as_owner = CallContext::new(owner);
        components.change_manager(&as_owner, address)?;
        agents.change_manager(&as_owner, address)?;

        Ok(Self {
            address,
            components,
            agents,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn components(&self) -> &UnitRegistry {
        &self.components
    }

    pub fn agents(&self) -> &UnitRegistry {
        &self.agents
    }

    pub fn registry(&self, kind: UnitKind) -> &UnitRegistry {
        match kind {
            UnitKind::Component => &self.components,
            UnitKind::Agent => &self.agents,
        }
    }

    fn registry_mut(&mut self, kind: UnitKind) -> &mut UnitRegistry {
        match kind {
            UnitKind::Component => &mut self.components,
            UnitKind::Agent => &mut self.agents,
        }
    }

    /// Transfer a unit. The caller must own it.
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        kind: UnitKind,
        to: Address,
        unit_id: UnitId,
    ) -> Result<()> {
        self.registry_mut(kind).transfer(ctx, to, unit_id)
    }

    /// Hand a registry to a new owner. Registry owner only.
    pub fn change_owner(
        &mut self,
        ctx: &CallContext,
        kind: UnitKind,
        new_owner: Address,
    ) -> Result<()> {
        self.registry_mut(kind).change_owner(ctx, new_owner)
    }

    /// Registry owner only.
    pub fn set_base_uri(
        &mut self,
        ctx: &CallContext,
        kind: UnitKind,
        base_uri: impl Into<String>,
    ) -> Result<()> {
        self.registry_mut(kind).set_base_uri(ctx, base_uri)
    }

    /// Create a unit of `kind`. Agent dependencies are checked against the
    /// component registry.
    pub fn create(
        &mut self,
        kind: UnitKind,
        owner: Address,
        developer: Address,
        hash: ContentHash,
        dependencies: Vec<UnitId>,
    ) -> Result<UnitId> {
        if owner.is_zero() || developer.is_zero() {
            return Err(UnitError::ZeroAddress);
        }
        if hash.is_zero() {
            return Err(UnitError::ZeroValue);
        }
        self.ensure_fresh(&hash)?;

        let inner = CallContext::new(self.address);
        match kind {
            UnitKind::Component => {
                self.components
                    .create_component(&inner, owner, developer, hash, dependencies)
            }
            UnitKind::Agent => self.agents.create_agent(
                &inner,
                owner,
                developer,
                hash,
                dependencies,
                &self.components,
            ),
        }
    }

    /// Append a hash to a unit. The caller must own the unit.
    pub fn update_hash(
        &mut self,
        ctx: &CallContext,
        kind: UnitKind,
        unit_id: UnitId,
        hash: ContentHash,
    ) -> Result<()> {
        if hash.is_zero() {
            return Err(UnitError::ZeroValue);
        }
        self.ensure_fresh(&hash)?;

        let inner = CallContext::new(self.address);
        self.registry_mut(kind)
            .update_hash(&inner, ctx.caller, unit_id, hash)
    }

    /// Sorted transitive component closure of a unit. For an agent this is the
    /// union of its component dependencies' closures.
    pub fn get_subcomponents(&self, kind: UnitKind, unit_id: UnitId) -> Vec<UnitId> {
        match kind {
            UnitKind::Component => self.components.get_subcomponents(unit_id),
            UnitKind::Agent => {
                let roots = self.agents.get_dependencies(unit_id);
                self.components.component_closure(&roots)
            }
        }
    }

    /// Whether `hash` is or was used by any unit in either registry.
    pub fn contains_hash(&self, hash: &ContentHash) -> bool {
        self.components.contains_hash(hash) || self.agents.contains_hash(hash)
    }

    fn ensure_fresh(&self, hash: &ContentHash) -> Result<()> {
        if self.contains_hash(hash) {
            warn!(hash = %hash, "Rejected duplicate unit hash");
            return Err(UnitError::HashExists(*hash));
        }
        debug!(hash = %hash, "Hash is unused across registries");
        Ok(())
    }
}
