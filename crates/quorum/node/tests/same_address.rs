mod common;

use common::*;
use quorum_multisig::{MultisigBackend, MultisigError, SameAddressPayload};
use quorum_node::{BackendKind, Protocol};
use quorum_service::{AgentParams, ServiceError, ServiceState};
use quorum_types::{Address, AgentId, ServiceId};

/// Register `instances` for `op` at 100 per slot.
fn register(
    protocol: &mut Protocol,
    service_id: ServiceId,
    agent: AgentId,
    op: Address,
    instances: Vec<Address>,
) {
    let bond = 100 * instances.len() as u128;
    let agents = vec![agent; instances.len()];
    protocol
        .services
        .register_agents(&paying(op, bond), op, service_id, instances, agents)
        .unwrap();
}

fn wind_down(protocol: &mut Protocol, service_id: ServiceId, op: Address) {
    protocol
        .services
        .terminate(&as_(service_owner()), service_owner(), service_id)
        .unwrap();
    protocol
        .services
        .unbond(&as_(op), op, service_id)
        .unwrap();
}

fn payload(multisig: Address) -> Vec<u8> {
    SameAddressPayload { multisig }.encode()
}

#[test]
fn redeploy_onto_reconfigured_wallet() {
    let (mut protocol, agent) = protocol();
    let service_id = active_service(&mut protocol, vec![agent], vec![AgentParams::new(2, 100)]);

    register(&mut protocol, service_id, agent, operator(1), vec![instance(1), instance(2)]);
    let wallet = protocol
        .deploy(&as_(service_owner()), service_owner(), service_id, BackendKind::Fresh, &[])
        .unwrap();
    wind_down(&mut protocol, service_id, operator(1));

    // old owners hand the wallet to the next instance set out of band
    protocol
        .host
        .reconfigure(
            &[instance(1), instance(2)],
            wallet,
            vec![instance(3), instance(4)],
            2,
        )
        .unwrap();

    protocol
        .services
        .activate_registration(&paying(service_owner(), 100), service_owner(), service_id)
        .unwrap();
    register(&mut protocol, service_id, agent, operator(2), vec![instance(3), instance(4)]);

    let redeployed = protocol
        .deploy(
            &as_(service_owner()),
            service_owner(),
            service_id,
            BackendKind::SameAddress,
            &payload(wallet),
        )
        .unwrap();
    assert_eq!(redeployed, wallet);
    assert_eq!(protocol.host.wallet_count(), 1);
    assert_eq!(
        protocol.services.get_service(service_id).state,
        ServiceState::Deployed
    );
}

#[test]
fn mismatched_threshold_is_rejected() {
    let (mut protocol, agent) = protocol();
    let service_id = active_service(&mut protocol, vec![agent], vec![AgentParams::new(2, 100)]);
    register(&mut protocol, service_id, agent, operator(1), vec![instance(1), instance(2)]);
    let wallet = protocol
        .fresh
        .create(&[instance(1), instance(2)], 1, &[])
        .unwrap();

    assert_eq!(
        protocol
            .same_address
            .create(&[instance(1), instance(2)], 2, &payload(wallet)),
        Err(MultisigError::WrongThreshold {
            provided: 2,
            expected: 1
        })
    );

    let before = protocol.services.get_service(service_id);
    let result = protocol.deploy(
        &as_(service_owner()),
        service_owner(),
        service_id,
        BackendKind::SameAddress,
        &payload(wallet),
    );
    assert_eq!(
        result,
        Err(ServiceError::Multisig(MultisigError::WrongThreshold {
            provided: 2,
            expected: 1
        }))
    );
    assert_eq!(protocol.services.get_service(service_id), before);

    // an owner raises the threshold and the redeploy goes through
    protocol
        .host
        .reconfigure(&[instance(1)], wallet, vec![instance(1), instance(2)], 2)
        .unwrap();
    assert_eq!(
        protocol.deploy(
            &as_(service_owner()),
            service_owner(),
            service_id,
            BackendKind::SameAddress,
            &payload(wallet),
        ),
        Ok(wallet)
    );
}

#[test]
fn unrelated_wallet_cannot_be_claimed() {
    let (mut protocol, agent) = protocol();
    let service_id = active_service(&mut protocol, vec![agent], vec![AgentParams::new(2, 100)]);
    register(&mut protocol, service_id, agent, operator(1), vec![instance(1), instance(2)]);

    let victims = [Address::from_label("victim-1"), Address::from_label("victim-2")];
    let wallet = protocol.fresh.create(&victims, 2, &[]).unwrap();
    let wallet_before = protocol.host.wallet(&wallet).unwrap();
    let service_before = protocol.services.get_service(service_id);

    // trailing reconfiguration words are not an accepted payload
    let mut claim = payload(wallet);
    claim.extend_from_slice(&[0u8; 128]);
    assert!(matches!(
        protocol.deploy(
            &as_(service_owner()),
            service_owner(),
            service_id,
            BackendKind::SameAddress,
            &claim,
        ),
        Err(ServiceError::Multisig(MultisigError::IncorrectDataLength { .. }))
    ));
    assert_eq!(
        protocol.deploy(
            &as_(service_owner()),
            service_owner(),
            service_id,
            BackendKind::SameAddress,
            &payload(wallet),
        ),
        Err(ServiceError::Multisig(MultisigError::WrongOwner(instance(1))))
    );

    // the instances alone cannot rewrite a wallet they do not own
    assert!(matches!(
        protocol.host.reconfigure(
            &[instance(1), instance(2)],
            wallet,
            vec![instance(1), instance(2)],
            2
        ),
        Err(MultisigError::InsufficientApprovals { .. })
    ));

    assert_eq!(protocol.host.wallet(&wallet).unwrap(), wallet_before);
    assert_eq!(protocol.services.get_service(service_id), service_before);
    assert_eq!(
        protocol.services.get_service(service_id).state,
        ServiceState::FinishedRegistration
    );
}
