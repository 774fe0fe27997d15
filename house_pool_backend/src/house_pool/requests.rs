use candid::{Nat, Principal};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::{StableBTreeMap, StableCell};
use std::cell::RefCell;

use crate::{Memory, MEMORY_MANAGER};
use super::capacity::{self, CapacityCheck};
use super::config::HousePoolConfig;
use super::error::PoolError;
use super::ledger;
use super::memory_ids::{REQUESTS_MEMORY_ID, REQUEST_COUNTER_MEMORY_ID};
use super::nat_helpers::nat_is_zero;
use super::operators;
use super::types::{Request, RequestParams};

thread_local! {
    static REQUESTS: RefCell<StableBTreeMap<u64, Request, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(REQUESTS_MEMORY_ID)))
        )
    );

    static REQUEST_COUNTER: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(REQUEST_COUNTER_MEMORY_ID))),
            0u64,
        )
    );
}

/// Validate and store a request. Returns the new id and the total stake reserved.
pub(crate) fn submit_request(
    caller: Principal,
    params: RequestParams,
    config: &HousePoolConfig,
    capacity: &impl CapacityCheck,
) -> Result<(u64, Nat), PoolError> {
    let operator = operators::get_operator(params.operator_id)?;
    if operator.owner != caller {
        return Err(PoolError::NotOperatorOwner(params.operator_id));
    }

    let pool = ledger::get_pool(params.asset).ok_or(PoolError::UnknownAsset(params.asset))?;

    validate_shape(&params, config)?;

    let total_stake = params.total_stake();
    capacity.check_submission(&pool, &total_stake)?;

    let id = REQUEST_COUNTER.with(|c| {
        let mut cell = c.borrow_mut();
        let id = *cell.get() + 1;
        cell.set(id);
        id
    });

    let asset = params.asset;
    REQUESTS.with(|r| {
        r.borrow_mut().insert(id, Request::from_params(id, params));
    });
    capacity::reserve(asset, &total_stake);

    Ok((id, total_stake))
}

fn validate_shape(params: &RequestParams, config: &HousePoolConfig) -> Result<(), PoolError> {
    if params.bets.is_empty() {
        return Err(PoolError::EmptyBetList);
    }

    let max_bets = config.max_bets_per_request as usize;
    if params.bets.len() > max_bets {
        return Err(PoolError::TooManyBets {
            count: params.bets.len() as u64,
            max: max_bets as u64,
        });
    }

    for (index, bet) in params.bets.iter().enumerate() {
        if nat_is_zero(&bet.stake) {
            return Err(PoolError::InvalidBet {
                index: index as u64,
                reason: "stake must be greater than zero".to_string(),
            });
        }
        if bet.params.len() > config.max_params_per_bet as usize {
            return Err(PoolError::InvalidBet {
                index: index as u64,
                reason: format!(
                    "{} params exceeds maximum of {}",
                    bet.params.len(),
                    config.max_params_per_bet
                ),
            });
        }
    }

    let data_len = params.aux.data.len();
    if data_len > config.max_data_bytes as usize {
        return Err(PoolError::DataTooLarge {
            size: data_len as u64,
            max: config.max_data_bytes as u64,
        });
    }

    Ok(())
}

pub fn get_request(request_id: u64) -> Result<Request, PoolError> {
    REQUESTS
        .with(|r| r.borrow().get(&request_id))
        .ok_or(PoolError::UnknownRequest(request_id))
}

pub fn request_exists(request_id: u64) -> bool {
    REQUESTS.with(|r| r.borrow().contains_key(&request_id))
}

pub fn total_requests() -> u64 {
    REQUEST_COUNTER.with(|c| *c.borrow().get())
}
