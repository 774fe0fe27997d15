use candid::{Nat, Principal};

use super::capacity;
use super::error::PoolError;
use super::ledger;
use super::operators;
use super::payouts::{self, PendingPayout};
use super::requests;
use super::responses;
use super::types::{LPPosition, Pool, PoolStats, Request, RequestStatus};

// =============================================================================
// LIQUIDITY
// =============================================================================

pub fn get_pool(asset: Principal) -> Option<Pool> {
    ledger::get_pool(asset)
}

pub fn get_pools() -> Vec<Pool> {
    ledger::list_pools()
}

pub fn get_pool_stats(asset: Principal) -> Result<PoolStats, PoolError> {
    let pool = ledger::get_pool(asset).ok_or(PoolError::UnknownAsset(asset))?;
    Ok(PoolStats {
        pool,
        pending_exposure: capacity::pending_exposure(asset),
        total_liquidity_providers: ledger::count_providers(asset),
    })
}

pub fn get_share_balance(asset: Principal, provider: Principal) -> Nat {
    ledger::share_balance(asset, provider)
}

pub fn get_lp_position(asset: Principal, provider: Principal) -> LPPosition {
    ledger::lp_position(asset, provider)
}

/// Share estimate only: the pool may move before a deposit executes.
pub fn calculate_shares_preview(asset: Principal, amount: Nat) -> Result<Nat, PoolError> {
    ledger::preview_shares(asset, &amount)
}

pub fn get_pending_exposure(asset: Principal) -> Nat {
    capacity::pending_exposure(asset)
}

pub fn get_pending_payout(asset: Principal, recipient: Principal) -> Option<PendingPayout> {
    payouts::get_pending_payout(asset, recipient)
}

// =============================================================================
// OPERATORS
// =============================================================================

pub fn owner_of(operator_id: u64) -> Result<Principal, PoolError> {
    operators::owner_of(operator_id)
}

pub fn operators_of(owner: Principal) -> Vec<u64> {
    operators::operators_of(owner)
}

pub fn total_operators() -> u64 {
    operators::total_operators()
}

// =============================================================================
// REQUESTS / RESPONSES
// =============================================================================

pub fn get_request(request_id: u64) -> Result<Request, PoolError> {
    requests::get_request(request_id)
}

pub fn get_request_status(request_id: u64) -> Result<RequestStatus, PoolError> {
    responses::request_status(request_id)
}

pub fn total_requests() -> u64 {
    requests::total_requests()
}

pub fn get_response(request_id: u64) -> Result<Vec<Nat>, PoolError> {
    responses::get_response(request_id)
}
