//! Generic unit registry
//!
//! One `UnitRegistry` type serves both the component and the agent registry.
//! Ids are assigned sequentially from 1; a unit's dependency list is validated
//! once at creation and never changes afterwards.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use quorum_types::{Address, CallContext, ContentHash, OwnershipLedger, UnitId};
use tracing::{debug, info, warn};

use crate::error::{Result, UnitError};
use crate::unit::{Unit, UnitKind, UnitRegistryEvent};

/// Multibase/multicodec prefix prepended to the hex hash in token URIs.
const CID_PREFIX: &str = "f01701220";

/// Read-only existence checks against a registry.
pub trait UnitDirectory: Send + Sync {
    fn exists(&self, id: UnitId) -> bool;

    fn total_supply(&self) -> u32;
}

/// Shared, cheaply cloneable view of a registry's supply.
///
/// Units are never destroyed and ids are sequential, so `id` exists iff
/// `1 <= id <= supply`. Other registries hold this view instead of the
/// registry itself.
#[derive(Clone, Debug, Default)]
pub struct SupplyView {
    supply: Arc<AtomicU32>,
}

impl SupplyView {
    pub fn new(initial: u32) -> Self {
        Self {
            supply: Arc::new(AtomicU32::new(initial)),
        }
    }

    fn set(&self, supply: u32) {
        self.supply.store(supply, Ordering::Release);
    }
}

impl UnitDirectory for SupplyView {
    fn exists(&self, id: UnitId) -> bool {
        !id.is_zero() && id.get() <= self.total_supply()
    }

    fn total_supply(&self) -> u32 {
        self.supply.load(Ordering::Acquire)
    }
}

/// Append-only registry of content-addressed units.
pub struct UnitRegistry {
    kind: UnitKind,
    name: String,
    symbol: String,
    base_uri: String,
    owner: Address,
    manager: Address,
    units: Vec<Unit>,
    hash_index: HashMap<ContentHash, UnitId>,
    ownership: OwnershipLedger<UnitId>,
    supply: SupplyView,
    events: Vec<UnitRegistryEvent>,
}

impl UnitRegistry {
    /// Create an empty registry. The manager starts unset (zero address).
    pub fn new(
        kind: UnitKind,
        name: impl Into<String>,
        symbol: impl Into<String>,
        base_uri: impl Into<String>,
        owner: Address,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            symbol: symbol.into(),
            base_uri: base_uri.into(),
            owner,
            manager: Address::ZERO,
            units: Vec::new(),
            hash_index: HashMap::new(),
            ownership: OwnershipLedger::new(),
            supply: SupplyView::default(),
            events: Vec::new(),
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn manager(&self) -> Address {
        self.manager
    }

    /// Create a component. Dependencies must be existing components in strictly
    /// ascending order.
    pub fn create_component(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        developer: Address,
        hash: ContentHash,
        dependencies: Vec<UnitId>,
    ) -> Result<UnitId> {
        self.expect_kind(UnitKind::Component)?;
        self.check_manager(ctx)?;
        self.check_creation(owner, developer, &hash)?;
        check_dependencies(&dependencies, self.total_supply())?;
        Ok(self.insert(owner, developer, hash, dependencies))
    }

    /// Create an agent. Dependencies must be a non-empty, strictly ascending
    /// list of components existing in `components`.
    pub fn create_agent(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        developer: Address,
        hash: ContentHash,
        dependencies: Vec<UnitId>,
        components: &UnitRegistry,
    ) -> Result<UnitId> {
        self.expect_kind(UnitKind::Agent)?;
        if components.kind != UnitKind::Component {
            return Err(UnitError::WrongUnitKind {
                expected: UnitKind::Component,
                actual: components.kind,
            });
        }
        self.check_manager(ctx)?;
        self.check_creation(owner, developer, &hash)?;
        if dependencies.is_empty() {
            return Err(UnitError::ZeroValue);
        }
        check_dependencies(&dependencies, components.total_supply())?;
        Ok(self.insert(owner, developer, hash, dependencies))
    }

    /// Append a new hash to a unit owned by `owner` and make it current.
    pub fn update_hash(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        unit_id: UnitId,
        hash: ContentHash,
    ) -> Result<()> {
        self.check_manager(ctx)?;

        if self.ownership.owner_of(&unit_id) != Some(owner) {
            return Err(UnitError::not_found(self.kind, unit_id));
        }
        if hash.is_zero() {
            return Err(UnitError::ZeroValue);
        }
        if self.hash_index.contains_key(&hash) {
            return Err(UnitError::HashExists(hash));
        }

        let kind = self.kind;
        let unit = self
            .unit_mut(unit_id)
            .ok_or(UnitError::not_found(kind, unit_id))?;
        unit.hash_history.push(hash);
        unit.current_hash = hash;
        self.hash_index.insert(hash, unit_id);
        self.events.push(UnitRegistryEvent::UpdateUnitHash {
            unit_id,
            kind,
            hash,
        });

        info!(kind = %kind, unit_id = %unit_id, hash = %hash, "Unit hash updated");
        Ok(())
    }

    /// Unit record, or the zeroed record for unknown ids.
    pub fn get_info(&self, unit_id: UnitId) -> Unit {
        self.unit(unit_id).cloned().unwrap_or_default()
    }

    /// Dependencies in creation order; empty for unknown ids.
    pub fn get_dependencies(&self, unit_id: UnitId) -> Vec<UnitId> {
        self.unit(unit_id)
            .map(|u| u.dependencies.clone())
            .unwrap_or_default()
    }

    /// Every hash the unit has ever had, oldest first.
    pub fn get_updated_hashes(&self, unit_id: UnitId) -> Vec<ContentHash> {
        self.unit(unit_id)
            .map(|u| u.hash_history.clone())
            .unwrap_or_default()
    }

    /// For a component registry: the component itself plus everything it
    /// transitively depends on, ascending.
    pub fn get_subcomponents(&self, unit_id: UnitId) -> Vec<UnitId> {
        if self.kind != UnitKind::Component || !self.exists(unit_id) {
            return Vec::new();
        }
        self.component_closure(&[unit_id])
    }

    /// Transitive closure of `roots` over this registry's dependency graph.
    pub fn component_closure(&self, roots: &[UnitId]) -> Vec<UnitId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<UnitId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            if let Some(unit) = self.unit(id) {
                if seen.insert(id) {
                    stack.extend(unit.dependencies.iter().copied());
                }
            }
        }
        seen.into_iter().collect()
    }

    pub fn exists(&self, unit_id: UnitId) -> bool {
        self.unit(unit_id).is_some()
    }

    pub fn total_supply(&self) -> u32 {
        self.units.len() as u32
    }

    /// Whether `hash` is, or ever was, the hash of a unit in this registry.
    pub fn contains_hash(&self, hash: &ContentHash) -> bool {
        self.hash_index.contains_key(hash)
    }

    /// The unit a hash belongs or belonged to.
    pub fn unit_for_hash(&self, hash: &ContentHash) -> Option<UnitId> {
        self.hash_index.get(hash).copied()
    }

    pub fn owner_of(&self, unit_id: UnitId) -> Option<Address> {
        self.ownership.owner_of(&unit_id)
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.ownership.balance_of(owner)
    }

    /// Metadata URI for the unit's current hash.
    pub fn token_uri(&self, unit_id: UnitId) -> Option<String> {
        self.unit(unit_id).map(|u| {
            format!(
                "{}{}{}",
                self.base_uri,
                CID_PREFIX,
                u.current_hash.to_hex()
            )
        })
    }

    /// Supply view for other registries.
    pub fn supply_view(&self) -> SupplyView {
        self.supply.clone()
    }

    pub fn events(&self) -> &[UnitRegistryEvent] {
        &self.events
    }

    /// Transfer ownership of a unit. Only the current owner may transfer.
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, unit_id: UnitId) -> Result<()> {
        let owner = self
            .ownership
            .owner_of(&unit_id)
            .ok_or(UnitError::not_found(self.kind, unit_id))?;
        if ctx.caller != owner {
            return Err(UnitError::OwnerOnly {
                caller: ctx.caller,
                owner,
            });
        }
        if to.is_zero() {
            return Err(UnitError::ZeroAddress);
        }

        self.ownership.transfer(unit_id, to);
        if let Some(unit) = self.unit_mut(unit_id) {
            unit.owner = to;
        }
        self.events.push(UnitRegistryEvent::Transfer {
            from: owner,
            to,
            unit_id,
        });

        info!(kind = %self.kind, unit_id = %unit_id, from = %owner, to = %to, "Unit transferred");
        Ok(())
    }

    pub fn change_owner(&mut self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        self.check_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(UnitError::ZeroAddress);
        }
        self.owner = new_owner;
        self.events
            .push(UnitRegistryEvent::OwnerUpdated { owner: new_owner });
        info!(kind = %self.kind, owner = %new_owner, "Registry owner updated");
        Ok(())
    }

    pub fn change_manager(&mut self, ctx: &CallContext, new_manager: Address) -> Result<()> {
        self.check_owner(ctx)?;
        if new_manager.is_zero() {
            return Err(UnitError::ZeroAddress);
        }
        self.manager = new_manager;
        self.events.push(UnitRegistryEvent::ManagerUpdated {
            manager: new_manager,
        });
        info!(kind = %self.kind, manager = %new_manager, "Registry manager updated");
        Ok(())
    }

    pub fn set_base_uri(&mut self, ctx: &CallContext, base_uri: impl Into<String>) -> Result<()> {
        self.check_owner(ctx)?;
        let base_uri = base_uri.into();
        if base_uri.is_empty() {
            return Err(UnitError::ZeroValue);
        }
        self.base_uri = base_uri.clone();
        self.events
            .push(UnitRegistryEvent::BaseUriChanged { base_uri });
        Ok(())
    }

    fn insert(
        &mut self,
        owner: Address,
        developer: Address,
        hash: ContentHash,
        dependencies: Vec<UnitId>,
    ) -> UnitId {
        let unit_id = UnitId::new(self.total_supply() + 1);
        debug!(
            kind = %self.kind,
            unit_id = %unit_id,
            dependencies = dependencies.len(),
            "Unit passed creation checks"
        );

        self.units.push(Unit {
            id: unit_id,
            owner,
            developer,
            current_hash: hash,
            hash_history: vec![hash],
            dependencies,
        });
        self.hash_index.insert(hash, unit_id);
        self.ownership.mint(unit_id, owner);
        self.supply.set(self.total_supply());
        self.events.push(UnitRegistryEvent::CreateUnit {
            unit_id,
            kind: self.kind,
            hash,
        });

        info!(kind = %self.kind, unit_id = %unit_id, owner = %owner, hash = %hash, "Unit created");
        unit_id
    }

    fn unit(&self, unit_id: UnitId) -> Option<&Unit> {
        if unit_id.is_zero() {
            return None;
        }
        self.units.get(unit_id.get() as usize - 1)
    }

    fn unit_mut(&mut self, unit_id: UnitId) -> Option<&mut Unit> {
        if unit_id.is_zero() {
            return None;
        }
        self.units.get_mut(unit_id.get() as usize - 1)
    }

    fn expect_kind(&self, expected: UnitKind) -> Result<()> {
        if self.kind != expected {
            return Err(UnitError::WrongUnitKind {
                expected,
                actual: self.kind,
            });
        }
        Ok(())
    }

    fn check_manager(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.manager || self.manager.is_zero() {
            warn!(kind = %self.kind, caller = %ctx.caller, "Rejected non-manager call");
            return Err(UnitError::ManagerOnly {
                caller: ctx.caller,
                manager: self.manager,
            });
        }
        Ok(())
    }

    fn check_owner(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.owner {
            warn!(kind = %self.kind, caller = %ctx.caller, "Rejected non-owner call");
            return Err(UnitError::OwnerOnly {
                caller: ctx.caller,
                owner: self.owner,
            });
        }
        Ok(())
    }

    fn check_creation(&self, owner: Address, developer: Address, hash: &ContentHash) -> Result<()> {
        if owner.is_zero() || developer.is_zero() {
            return Err(UnitError::ZeroAddress);
        }
        if hash.is_zero() {
            return Err(UnitError::ZeroValue);
        }
        if self.hash_index.contains_key(hash) {
            return Err(UnitError::HashExists(*hash));
        }
        Ok(())
    }
}

impl UnitDirectory for UnitRegistry {
    fn exists(&self, id: UnitId) -> bool {
        UnitRegistry::exists(self, id)
    }

    fn total_supply(&self) -> u32 {
        UnitRegistry::total_supply(self)
    }
}

/// Dependencies must be strictly ascending and within `1..=bound`.
fn check_dependencies(dependencies: &[UnitId], bound: u32) -> Result<()> {
    let mut last = 0u32;
    for dependency in dependencies {
        let id = dependency.get();
        if id <= last || id > bound {
            return Err(UnitError::ComponentNotFound(*dependency));
        }
        last = id;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::from_label("registry-owner")
    }

    fn manager() -> Address {
        Address::from_label("manager")
    }

    fn dev() -> Address {
        Address::from_label("developer")
    }

    fn hash(n: u8) -> ContentHash {
        ContentHash::digest(&[n])
    }

    fn ids(raw: &[u32]) -> Vec<UnitId> {
        raw.iter().copied().map(UnitId::new).collect()
    }

    fn managed(kind: UnitKind) -> UnitRegistry {
        let mut registry = UnitRegistry::new(kind, "Units", "UNIT", "https://units/", owner());
        registry
            .change_manager(&CallContext::new(owner()), manager())
            .unwrap();
        registry
    }

    fn as_manager() -> CallContext {
        CallContext::new(manager())
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut components = managed(UnitKind::Component);
        let first = components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        let second = components
            .create_component(&as_manager(), dev(), dev(), hash(2), ids(&[1]))
            .unwrap();

        assert_eq!(first, UnitId::new(1));
        assert_eq!(second, UnitId::new(2));
        assert_eq!(components.total_supply(), 2);
        assert_eq!(components.balance_of(&dev()), 2);
    }

    #[test]
    fn create_requires_manager() {
        let mut components = managed(UnitKind::Component);
        let err = components
            .create_component(&CallContext::new(dev()), dev(), dev(), hash(1), vec![])
            .unwrap_err();
        assert!(matches!(err, UnitError::ManagerOnly { .. }));
    }

    #[test]
    fn unset_manager_rejects_everyone() {
        let mut components =
            UnitRegistry::new(UnitKind::Component, "C", "C", "uri/", owner());
        let err = components
            .create_component(&CallContext::new(Address::ZERO), dev(), dev(), hash(1), vec![])
            .unwrap_err();
        assert!(matches!(err, UnitError::ManagerOnly { .. }));
    }

    #[test]
    fn create_rejects_zero_inputs() {
        let mut components = managed(UnitKind::Component);
        assert_eq!(
            components.create_component(&as_manager(), Address::ZERO, dev(), hash(1), vec![]),
            Err(UnitError::ZeroAddress)
        );
        assert_eq!(
            components.create_component(&as_manager(), dev(), Address::ZERO, hash(1), vec![]),
            Err(UnitError::ZeroAddress)
        );
        assert_eq!(
            components.create_component(&as_manager(), dev(), dev(), ContentHash::ZERO, vec![]),
            Err(UnitError::ZeroValue)
        );
    }

    #[test]
    fn dependencies_must_exist_and_ascend() {
        let mut components = managed(UnitKind::Component);
        components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        components
            .create_component(&as_manager(), dev(), dev(), hash(2), vec![])
            .unwrap();

        assert_eq!(
            components.create_component(&as_manager(), dev(), dev(), hash(3), ids(&[0])),
            Err(UnitError::ComponentNotFound(UnitId::new(0)))
        );
        assert_eq!(
            components.create_component(&as_manager(), dev(), dev(), hash(3), ids(&[3])),
            Err(UnitError::ComponentNotFound(UnitId::new(3)))
        );
        assert_eq!(
            components.create_component(&as_manager(), dev(), dev(), hash(3), ids(&[2, 1])),
            Err(UnitError::ComponentNotFound(UnitId::new(1)))
        );
        assert_eq!(
            components.create_component(&as_manager(), dev(), dev(), hash(3), ids(&[1, 1])),
            Err(UnitError::ComponentNotFound(UnitId::new(1)))
        );

        let id = components
            .create_component(&as_manager(), dev(), dev(), hash(3), ids(&[1, 2]))
            .unwrap();
        assert_eq!(components.get_dependencies(id), ids(&[1, 2]));
    }

    #[test]
    fn agents_depend_on_components() {
        let mut components = managed(UnitKind::Component);
        let mut agents = managed(UnitKind::Agent);
        components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();

        assert_eq!(
            agents.create_agent(&as_manager(), dev(), dev(), hash(10), vec![], &components),
            Err(UnitError::ZeroValue)
        );
        assert_eq!(
            agents.create_agent(&as_manager(), dev(), dev(), hash(10), ids(&[2]), &components),
            Err(UnitError::ComponentNotFound(UnitId::new(2)))
        );

        let agent = agents
            .create_agent(&as_manager(), dev(), dev(), hash(10), ids(&[1]), &components)
            .unwrap();
        assert_eq!(agent, UnitId::new(1));
    }

    #[test]
    fn agent_creation_requires_component_registry() {
        let mut agents = managed(UnitKind::Agent);
        let other_agents = managed(UnitKind::Agent);
        let err = agents
            .create_agent(&as_manager(), dev(), dev(), hash(1), ids(&[1]), &other_agents)
            .unwrap_err();
        assert!(matches!(err, UnitError::WrongUnitKind { .. }));
    }

    #[test]
    fn hash_history_is_append_only() {
        let mut components = managed(UnitKind::Component);
        let id = components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();

        components
            .update_hash(&as_manager(), dev(), id, hash(2))
            .unwrap();
        components
            .update_hash(&as_manager(), dev(), id, hash(3))
            .unwrap();

        let info = components.get_info(id);
        assert_eq!(info.current_hash, hash(3));
        assert_eq!(components.get_updated_hashes(id), vec![hash(1), hash(2), hash(3)]);
    }

    #[test]
    fn historical_hashes_stay_reserved() {
        let mut components = managed(UnitKind::Component);
        let id = components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        components
            .update_hash(&as_manager(), dev(), id, hash(2))
            .unwrap();

        assert_eq!(
            components.create_component(&as_manager(), dev(), dev(), hash(1), vec![]),
            Err(UnitError::HashExists(hash(1)))
        );
        assert_eq!(
            components.update_hash(&as_manager(), dev(), id, hash(1)),
            Err(UnitError::HashExists(hash(1)))
        );
    }

    #[test]
    fn update_hash_requires_unit_owner() {
        let mut agents = managed(UnitKind::Agent);
        let mut components = managed(UnitKind::Component);
        components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        let id = agents
            .create_agent(&as_manager(), dev(), dev(), hash(2), ids(&[1]), &components)
            .unwrap();

        let stranger = Address::from_label("stranger");
        assert_eq!(
            agents.update_hash(&as_manager(), stranger, id, hash(3)),
            Err(UnitError::AgentNotFound(id))
        );
        assert_eq!(
            agents.update_hash(&as_manager(), dev(), UnitId::new(9), hash(3)),
            Err(UnitError::AgentNotFound(UnitId::new(9)))
        );
    }

    #[test]
    fn reads_are_total() {
        let components = managed(UnitKind::Component);
        assert_eq!(components.get_info(UnitId::new(0)), Unit::default());
        assert_eq!(components.get_info(UnitId::new(42)), Unit::default());
        assert!(components.get_dependencies(UnitId::new(42)).is_empty());
        assert!(components.get_updated_hashes(UnitId::new(42)).is_empty());
        assert!(components.token_uri(UnitId::new(42)).is_none());
    }

    #[test]
    fn subcomponents_are_transitive() {
        let mut components = managed(UnitKind::Component);
        for (n, deps) in [(1u8, vec![]), (2, vec![1]), (3, vec![]), (4, vec![2, 3])] {
            components
                .create_component(&as_manager(), dev(), dev(), hash(n), ids(&deps))
                .unwrap();
        }

        assert_eq!(components.get_subcomponents(UnitId::new(4)), ids(&[1, 2, 3, 4]));
        assert_eq!(components.get_subcomponents(UnitId::new(2)), ids(&[1, 2]));
        assert!(components.get_subcomponents(UnitId::new(5)).is_empty());
    }

    #[test]
    fn transfer_moves_ownership() {
        let mut components = managed(UnitKind::Component);
        let id = components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        let buyer = Address::from_label("buyer");

        let err = components
            .transfer(&CallContext::new(buyer), buyer, id)
            .unwrap_err();
        assert!(matches!(err, UnitError::OwnerOnly { .. }));

        components
            .transfer(&CallContext::new(dev()), buyer, id)
            .unwrap();
        assert_eq!(components.owner_of(id), Some(buyer));
        assert_eq!(components.get_info(id).owner, buyer);
        assert_eq!(components.balance_of(&dev()), 0);

        // the new owner now controls the hash
        components
            .update_hash(&as_manager(), buyer, id, hash(2))
            .unwrap();
    }

    #[test]
    fn token_uri_uses_current_hash() {
        let mut components = managed(UnitKind::Component);
        let id = components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        let uri = components.token_uri(id).unwrap();
        assert_eq!(uri, format!("https://units/f01701220{}", hash(1).to_hex()));
    }

    #[test]
    fn admin_operations_require_owner() {
        let mut components = managed(UnitKind::Component);
        let stranger = CallContext::new(Address::from_label("stranger"));
        assert!(matches!(
            components.change_manager(&stranger, stranger.caller),
            Err(UnitError::OwnerOnly { .. })
        ));
        assert!(matches!(
            components.set_base_uri(&stranger, "x"),
            Err(UnitError::OwnerOnly { .. })
        ));
        assert_eq!(
            components.change_owner(&CallContext::new(owner()), Address::ZERO),
            Err(UnitError::ZeroAddress)
        );
    }

    #[test]
    fn supply_view_tracks_creation() {
        let mut components = managed(UnitKind::Component);
        let view = components.supply_view();
        assert!(!view.exists(UnitId::new(1)));
        components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        assert!(view.exists(UnitId::new(1)));
        assert!(!view.exists(UnitId::new(0)));
        assert_eq!(UnitDirectory::total_supply(&view), 1);
    }

    #[test]
    fn events_are_recorded() {
        let mut components = managed(UnitKind::Component);
        let id = components
            .create_component(&as_manager(), dev(), dev(), hash(1), vec![])
            .unwrap();
        assert!(components.events().contains(&UnitRegistryEvent::CreateUnit {
            unit_id: id,
            kind: UnitKind::Component,
            hash: hash(1),
        }));
    }
}
