use candid::Nat;
use futures::executor::block_on;

use super::{asset, nat, principal, MockLedger};
use crate::house_pool::audit::{audit_log_count, get_audit_log, AuditEvent};
use crate::house_pool::capacity::pending_exposure;
use crate::house_pool::config::{get_config, set_config, HousePoolConfig};
use crate::house_pool::error::PoolError;
use crate::house_pool::types::{Bet, RequestAux, RequestParams, RequestStatus};
use crate::house_pool::{facade, query};

fn fund_pool(amount: u64) {
    let mock = MockLedger::new();
    mock.mint(asset(), principal(1), amount);
    block_on(facade::add_liquidity(&mock, principal(1), asset(), nat(amount))).unwrap();
}

fn bets(stakes: &[u64]) -> Vec<Bet> {
    stakes
        .iter()
        .map(|s| Bet { stake: nat(*s), params: vec![nat(2), nat(36)] })
        .collect()
}

fn params(operator_id: u64, stakes: &[u64]) -> RequestParams {
    RequestParams {
        operator_id,
        bets: bets(stakes),
        asset: asset(),
        aux: RequestAux::default(),
    }
}

#[test]
fn operators_mint_sequentially() {
    assert_eq!(facade::mint_operator(principal(1), principal(1)), Ok(1));
    assert_eq!(facade::mint_operator(principal(1), principal(2)), Ok(2));
    assert_eq!(query::owner_of(2), Ok(principal(2)));
    assert_eq!(query::total_operators(), 2);
}

#[test]
fn submit_fetch_fulfill() {
    fund_pool(10_000);
    let op = facade::mint_operator(principal(5), principal(5)).unwrap();

    let submitted = params(op, &[100, 250]);
    let id = facade::submit_request(principal(5), submitted.clone()).unwrap();
    assert_eq!(id, 1);
    assert_eq!(query::total_requests(), 1);

    let stored = query::get_request(id).unwrap();
    assert_eq!(stored.id, 1);
    assert_eq!(stored.bets, submitted.bets);
    assert_eq!(stored.aux, submitted.aux);
    assert_eq!(query::get_request_status(id), Ok(RequestStatus::Pending));
    assert_eq!(query::get_response(id), Err(PoolError::NoResponseYet(id)));
    assert_eq!(pending_exposure(asset()), nat(350));

    let words = vec![Nat::from(u128::MAX), nat(3)];
    assert_eq!(facade::fulfill_request(principal(7), id, words.clone()), Ok(()));
    assert_eq!(query::get_response(id), Ok(words.clone()));
    assert_eq!(query::get_request_status(id), Ok(RequestStatus::Fulfilled));
    assert_eq!(pending_exposure(asset()), nat(0));

    assert_eq!(facade::fulfill_request(principal(7), id, vec![nat(1), nat(1)]), Err(PoolError::AlreadyFulfilled(id)));
    assert_eq!(query::get_response(id), Ok(words));
}

#[test]
fn request_requires_pool_and_operator() {
    let op = facade::mint_operator(principal(5), principal(5)).unwrap();
    assert_eq!(facade::submit_request(principal(5), params(op, &[1])), Err(PoolError::UnknownAsset(asset())));

    fund_pool(100);
    assert_eq!(facade::submit_request(principal(5), params(op + 1, &[1])), Err(PoolError::UnknownOperator(op + 1)));
    assert_eq!(facade::submit_request(principal(5), params(op, &[])), Err(PoolError::EmptyBetList));
    assert_eq!(query::total_requests(), 0);
}

#[test]
fn transferred_operator_submits_for_new_owner() {
    fund_pool(100);
    let op = facade::mint_operator(principal(5), principal(5)).unwrap();
    facade::transfer_operator(principal(5), op, principal(6)).unwrap();

    assert_eq!(facade::submit_request(principal(5), params(op, &[1])), Err(PoolError::NotOperatorOwner(op)));
    assert_eq!(facade::submit_request(principal(6), params(op, &[1])), Ok(1));
    assert_eq!(query::operators_of(principal(6)), vec![op]);
    assert_eq!(query::total_operators(), 1);
}

#[test]
fn configured_oracle_is_enforced() {
    fund_pool(100);
    let op = facade::mint_operator(principal(5), principal(5)).unwrap();
    let id = facade::submit_request(principal(5), params(op, &[1])).unwrap();

    set_config(HousePoolConfig { oracle: Some(principal(8)), ..get_config() });

    assert_eq!(facade::fulfill_request(principal(7), id, vec![nat(1)]), Err(PoolError::UnauthorizedOracle));
    assert_eq!(query::get_request_status(id), Ok(RequestStatus::Pending));
    assert_eq!(facade::fulfill_request(principal(8), id, vec![nat(1)]), Ok(()));
}

#[test]
fn word_count_mismatch_keeps_request_pending() {
    fund_pool(100);
    let op = facade::mint_operator(principal(5), principal(5)).unwrap();
    let id = facade::submit_request(principal(5), params(op, &[1, 2])).unwrap();

    assert_eq!(
        facade::fulfill_request(principal(7), id, vec![nat(1)]),
        Err(PoolError::WordCountMismatch { expected: 2, actual: 1 })
    );
    assert_eq!(query::get_request_status(id), Ok(RequestStatus::Pending));
    assert_eq!(facade::fulfill_request(principal(7), id, vec![nat(1), nat(2)]), Ok(()));
}

#[test]
fn every_success_is_audited() {
    fund_pool(100);
    let before = audit_log_count();

    let op = facade::mint_operator(principal(5), principal(5)).unwrap();
    let id = facade::submit_request(principal(5), params(op, &[1])).unwrap();
    facade::fulfill_request(principal(7), id, vec![nat(9)]).unwrap();
    // rejected calls write nothing
    let _ = facade::fulfill_request(principal(7), id, vec![nat(9)]);

    assert_eq!(audit_log_count(), before + 3);
    let events: Vec<AuditEvent> = get_audit_log(before, 10).into_iter().map(|e| e.event).collect();
    assert!(matches!(events[0], AuditEvent::OperatorMinted { operator_id: 1, .. }));
    assert!(matches!(events[1], AuditEvent::RequestSubmitted { request_id: 1, bet_count: 1, .. }));
    assert!(matches!(events[2], AuditEvent::RequestFulfilled { request_id: 1, .. }));
}
