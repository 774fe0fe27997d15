use candid::Principal;
use std::cell::RefCell;
use std::collections::BTreeSet;

use super::error::PoolError;

thread_local! {
    static PENDING_OPERATIONS: RefCell<BTreeSet<Principal>> = RefCell::new(BTreeSet::new());
}

/// Guard to prevent concurrent liquidity operations from the same caller.
/// Released on drop, including when the future holding it is dropped.
pub struct OperationGuard {
    caller: Principal,
}

impl OperationGuard {
    pub fn new(caller: Principal) -> Result<Self, PoolError> {
        PENDING_OPERATIONS.with(|ops| {
            let mut ops = ops.borrow_mut();
            if !ops.insert(caller) {
                return Err(PoolError::OperationInProgress);
            }
            Ok(Self { caller })
        })
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        PENDING_OPERATIONS.with(|ops| {
            ops.borrow_mut().remove(&self.caller);
        });
    }
}

pub fn has_active_guard(principal: Principal) -> bool {
    PENDING_OPERATIONS.with(|ops| ops.borrow().contains(&principal))
}
