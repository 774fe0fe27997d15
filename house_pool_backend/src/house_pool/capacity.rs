use candid::{CandidType, Deserialize, Nat, Principal};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableBTreeMap;
use serde::Serialize;
use std::cell::RefCell;

use crate::{Memory, MEMORY_MANAGER};
use super::error::PoolError;
use super::memory_ids::PENDING_EXPOSURE_MEMORY_ID;
use super::nat_helpers::{nat_add, nat_subtract, nat_zero, StorableNat};
use super::types::Pool;

/// How much of a pool's balance outstanding requests are allowed to claim.
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapacityPolicy {
    /// Withdrawals only need `returned <= total_balance`.
    #[default]
    Unrestricted,
    /// Pending stakes are reserved against the pool balance.
    ReservePendingStakes,
}

/// Hook consulted before a withdrawal debits a pool and before a request is stored.
pub trait CapacityCheck {
    fn check_withdrawal(&self, pool: &Pool, payout: &Nat) -> Result<(), PoolError>;
    fn check_submission(&self, pool: &Pool, stake: &Nat) -> Result<(), PoolError>;
}

impl CapacityCheck for CapacityPolicy {
    fn check_withdrawal(&self, pool: &Pool, payout: &Nat) -> Result<(), PoolError> {
        let remaining = nat_subtract(&pool.total_balance, payout).ok_or_else(|| {
            PoolError::InsufficientPoolBalance {
                available: pool.total_balance.clone(),
                required: payout.clone(),
            }
        })?;

        match self {
            CapacityPolicy::Unrestricted => Ok(()),
            CapacityPolicy::ReservePendingStakes => {
                let reserved = pending_exposure(pool.asset);
                if remaining < reserved {
                    // available = what may leave without touching reserved stakes
                    let available = nat_subtract(&pool.total_balance, &reserved)
                        .unwrap_or_else(nat_zero);
                    return Err(PoolError::InsufficientPoolBalance {
                        available,
                        required: payout.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    fn check_submission(&self, pool: &Pool, stake: &Nat) -> Result<(), PoolError> {
        match self {
            CapacityPolicy::Unrestricted => Ok(()),
            CapacityPolicy::ReservePendingStakes => {
                let reserved = pending_exposure(pool.asset);
                let required = nat_add(&reserved, stake);
                if required > pool.total_balance {
                    return Err(PoolError::InsufficientPoolBalance {
                        available: nat_subtract(&pool.total_balance, &reserved)
                            .unwrap_or_else(nat_zero),
                        required: stake.clone(),
                    });
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// PENDING EXPOSURE
// =============================================================================

thread_local! {
    // Sum of stakes of Pending requests, per asset
    static PENDING_EXPOSURE: RefCell<StableBTreeMap<Principal, StorableNat, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(PENDING_EXPOSURE_MEMORY_ID)))
        )
    );
}

pub fn pending_exposure(asset: Principal) -> Nat {
    PENDING_EXPOSURE.with(|e| e.borrow().get(&asset).map(|n| n.0).unwrap_or_else(nat_zero))
}

pub(crate) fn reserve(asset: Principal, stake: &Nat) {
    PENDING_EXPOSURE.with(|e| {
        let mut map = e.borrow_mut();
        let current = map.get(&asset).map(|n| n.0).unwrap_or_else(nat_zero);
        map.insert(asset, StorableNat(nat_add(&current, stake)));
    });
}

pub(crate) fn release(asset: Principal, stake: &Nat) {
    PENDING_EXPOSURE.with(|e| {
        let mut map = e.borrow_mut();
        let current = map.get(&asset).map(|n| n.0).unwrap_or_else(nat_zero);
        let updated = match nat_subtract(&current, stake) {
            Some(v) => v,
            None => {
                log!("WARNING: exposure underflow for {}: {} - {}", asset, current, stake);
                nat_zero()
            }
        };
        map.insert(asset, StorableNat(updated));
    });
}
