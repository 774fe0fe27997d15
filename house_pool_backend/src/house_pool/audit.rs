use candid::{CandidType, Deserialize, Nat, Principal};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{StableBTreeMap, StableCell, Storable};
use serde::Serialize;
use std::borrow::Cow;
use std::cell::RefCell;

use crate::{Memory, MEMORY_MANAGER};
use super::capacity::CapacityPolicy;
use super::memory_ids::{AUDIT_LOG_COUNTER_MEMORY_ID, AUDIT_LOG_MAP_MEMORY_ID};

/// Oldest entries beyond this are pruned on write.
const MAX_AUDIT_ENTRIES: u64 = 50_000;

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: u64,
    pub event: AuditEvent,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum AuditEvent {
    LiquidityAdded { provider: Principal, asset: Principal, amount: Nat, shares: Nat },
    LiquidityRemoved { provider: Principal, asset: Principal, shares: Nat, amount: Nat },
    WithdrawalRolledBack { provider: Principal, asset: Principal, shares: Nat, amount: Nat, reason: String },
    DepositRefunded { provider: Principal, asset: Principal, amount: Nat, refunded: bool },
    PayoutUncertain { recipient: Principal, asset: Principal, amount: Nat, reason: String },
    SharesTransferred { asset: Principal, from: Principal, to: Principal, shares: Nat },
    OperatorMinted { operator_id: u64, owner: Principal, minted_by: Principal },
    OperatorTransferred { operator_id: u64, from: Principal, to: Principal },
    RequestSubmitted { request_id: u64, operator_id: u64, asset: Principal, bet_count: u64, total_stake: Nat },
    RequestFulfilled { request_id: u64, fulfilled_by: Principal },
    ConfigUpdated { capacity_policy: CapacityPolicy, oracle: Option<Principal> },
}

impl Storable for AuditEntry {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(
            candid::encode_one(self).expect(
                "CRITICAL: Failed to encode AuditEntry. \
                 Audit logging is failing - system integrity may be compromised.",
            ),
        )
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode AuditEntry from stable storage. \
             Audit trail integrity cannot be guaranteed.",
        )
    }

    const BOUND: Bound = Bound::Unbounded;
}

thread_local! {
    static AUDIT_LOG: RefCell<StableBTreeMap<u64, AuditEntry, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(AUDIT_LOG_MAP_MEMORY_ID)))
        )
    );

    // Next sequence number; also the number of entries ever written
    static AUDIT_COUNTER: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(AUDIT_LOG_COUNTER_MEMORY_ID))),
            0u64,
        )
    );
}

pub(crate) fn log_audit(event: AuditEvent) {
    let seq = AUDIT_COUNTER.with(|c| {
        let mut cell = c.borrow_mut();
        let seq = *cell.get();
        cell.set(seq + 1);
        seq
    });

    AUDIT_LOG.with(|log| {
        let mut log = log.borrow_mut();
        log.insert(seq, AuditEntry { timestamp: crate::now(), event });

        if seq >= MAX_AUDIT_ENTRIES {
            log.remove(&(seq - MAX_AUDIT_ENTRIES));
        }
    });
}

/// Retained entries, oldest first.
pub fn get_audit_log(offset: u64, limit: u64) -> Vec<AuditEntry> {
    AUDIT_LOG.with(|log| {
        log.borrow()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|entry| entry.value())
            .collect()
    })
}

/// Number of entries currently retained.
pub fn audit_log_count() -> u64 {
    AUDIT_LOG.with(|log| log.borrow().len())
}
