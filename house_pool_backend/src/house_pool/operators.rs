use candid::Principal;
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::{StableBTreeMap, StableCell};
use std::cell::RefCell;

use crate::{Memory, MEMORY_MANAGER};
use super::error::PoolError;
use super::memory_ids::{OPERATORS_MEMORY_ID, OPERATOR_COUNTER_MEMORY_ID};
use super::types::OperatorRecord;

thread_local! {
    static OPERATORS: RefCell<StableBTreeMap<u64, OperatorRecord, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(OPERATORS_MEMORY_ID)))
        )
    );

    // Number of operators ever minted; the last id issued
    static OPERATOR_COUNTER: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(OPERATOR_COUNTER_MEMORY_ID))),
            0u64,
        )
    );
}

/// Mint the next operator id (starting at 1) to `owner`.
pub(crate) fn mint_operator(minter: Principal, owner: Principal) -> Result<u64, PoolError> {
    if owner == Principal::anonymous() {
        return Err(PoolError::InvalidOwner);
    }

    let id = OPERATOR_COUNTER.with(|c| {
        let mut cell = c.borrow_mut();
        let id = *cell.get() + 1;
        cell.set(id);
        id
    });

    OPERATORS.with(|ops| {
        ops.borrow_mut().insert(
            id,
            OperatorRecord {
                id,
                owner,
                minted_by: minter,
                minted_at: crate::now(),
            },
        );
    });

    Ok(id)
}

pub fn get_operator(operator_id: u64) -> Result<OperatorRecord, PoolError> {
    OPERATORS
        .with(|ops| ops.borrow().get(&operator_id))
        .ok_or(PoolError::UnknownOperator(operator_id))
}

pub fn owner_of(operator_id: u64) -> Result<Principal, PoolError> {
    get_operator(operator_id).map(|record| record.owner)
}

/// Count of mints. Transfers never change it.
pub fn total_operators() -> u64 {
    OPERATOR_COUNTER.with(|c| *c.borrow().get())
}

/// Hand `operator_id` to `to`. Returns the previous owner.
pub(crate) fn transfer_operator(caller: Principal, operator_id: u64, to: Principal) -> Result<Principal, PoolError> {
    let mut record = get_operator(operator_id)?;
    if record.owner != caller {
        return Err(PoolError::NotOperatorOwner(operator_id));
    }
    if to == Principal::anonymous() {
        return Err(PoolError::InvalidOwner);
    }

    let previous = record.owner;
    record.owner = to;
    OPERATORS.with(|ops| {
        ops.borrow_mut().insert(operator_id, record);
    });
    Ok(previous)
}

/// Ids currently owned by `owner`, ascending.
pub fn operators_of(owner: Principal) -> Vec<u64> {
    OPERATORS.with(|ops| {
        ops.borrow()
            .iter()
            .filter(|entry| entry.value().owner == owner)
            .map(|entry| *entry.key())
            .collect()
    })
}
