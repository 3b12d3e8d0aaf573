#![allow(dead_code)]

use quorum_node::{Protocol, QuorumConfig};
use quorum_service::AgentParams;
use quorum_types::{Address, AgentId, CallContext, ContentHash, ServiceId};
use quorum_units::UnitKind;

pub const FUNDS: u128 = 1_000_000;

pub fn dao() -> Address {
    Address::from_label("dao")
}

pub fn service_owner() -> Address {
    Address::from_label("service-owner")
}

pub fn operator(n: u32) -> Address {
    Address::from_label(&format!("operator-{n}"))
}

pub fn instance(n: u32) -> Address {
    Address::from_label(&format!("instance-{n}"))
}

pub fn as_(account: Address) -> CallContext {
    CallContext::new(account)
}

pub fn paying(account: Address, value: u128) -> CallContext {
    CallContext::with_value(account, value)
}

/// Protocol with funded accounts and one component plus one agent built on it.
pub fn protocol() -> (Protocol, AgentId) {
    let mut protocol = Protocol::from_config(&QuorumConfig::default(), dao()).unwrap();
    protocol.ledger.mint(service_owner(), FUNDS);
    for n in 1..=4 {
        protocol.ledger.mint(operator(n), FUNDS);
    }

    let developer = Address::from_label("developer");
    let component = protocol
        .units
        .create(
            UnitKind::Component,
            developer,
            developer,
            ContentHash::digest(b"component code"),
            vec![],
        )
        .unwrap();
    let agent = protocol
        .units
        .create(
            UnitKind::Agent,
            developer,
            developer,
            ContentHash::digest(b"agent code"),
            vec![component],
        )
        .unwrap();
    (protocol, agent)
}

/// Register a second agent so services can span two agent ids.
pub fn second_agent(protocol: &mut Protocol) -> AgentId {
    let developer = Address::from_label("developer");
    protocol
        .units
        .create(
            UnitKind::Agent,
            developer,
            developer,
            ContentHash::digest(b"second agent code"),
            vec![quorum_types::UnitId::new(1)],
        )
        .unwrap()
}

/// Create a service over `agents` and activate registration.
pub fn active_service(
    protocol: &mut Protocol,
    agents: Vec<AgentId>,
    params: Vec<AgentParams>,
) -> ServiceId {
    let threshold = params.iter().map(|p| p.slots).sum();
    let deposit = params.iter().map(|p| p.bond).max().unwrap_or(0);
    let service_id = protocol
        .services
        .create(
            &as_(service_owner()),
            service_owner(),
            ContentHash::digest(b"service config"),
            agents,
            params,
            threshold,
        )
        .unwrap();
    protocol
        .services
        .activate_registration(&paying(service_owner(), deposit), service_owner(), service_id)
        .unwrap();
    service_id
}
