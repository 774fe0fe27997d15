use candid::{Nat, Principal};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

use crate::{Memory, MEMORY_MANAGER};
use super::capacity;
use super::error::PoolError;
use super::memory_ids::RESPONSES_MEMORY_ID;
use super::requests;
use super::types::{RequestStatus, ResponseRecord};

thread_local! {
    // Presence of an entry means the request is Fulfilled
    static RESPONSES: RefCell<StableBTreeMap<u64, ResponseRecord, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(RESPONSES_MEMORY_ID)))
        )
    );
}

/// Attach randomness to a pending request. One word per bet, in bet order.
pub(crate) fn fulfill_request(caller: Principal, request_id: u64, random_words: Vec<Nat>) -> Result<(), PoolError> {
    let request = requests::get_request(request_id)?;

    if RESPONSES.with(|r| r.borrow().contains_key(&request_id)) {
        return Err(PoolError::AlreadyFulfilled(request_id));
    }

    if random_words.len() != request.bets.len() {
        return Err(PoolError::WordCountMismatch {
            expected: request.bets.len() as u64,
            actual: random_words.len() as u64,
        });
    }

    RESPONSES.with(|r| {
        r.borrow_mut().insert(
            request_id,
            ResponseRecord {
                request_id,
                random_words,
                fulfilled_by: caller,
                fulfilled_at: crate::now(),
            },
        );
    });
    capacity::release(request.asset, &request.total_stake());

    Ok(())
}

pub fn get_response_record(request_id: u64) -> Result<ResponseRecord, PoolError> {
    if let Some(record) = RESPONSES.with(|r| r.borrow().get(&request_id)) {
        return Ok(record);
    }
    if requests::request_exists(request_id) {
        Err(PoolError::NoResponseYet(request_id))
    } else {
        Err(PoolError::UnknownRequest(request_id))
    }
}

pub fn get_response(request_id: u64) -> Result<Vec<Nat>, PoolError> {
    get_response_record(request_id).map(|record| record.random_words)
}

pub fn request_status(request_id: u64) -> Result<RequestStatus, PoolError> {
    if !requests::request_exists(request_id) {
        return Err(PoolError::UnknownRequest(request_id));
    }
    if RESPONSES.with(|r| r.borrow().contains_key(&request_id)) {
        Ok(RequestStatus::Fulfilled)
    } else {
        Ok(RequestStatus::Pending)
    }
}
