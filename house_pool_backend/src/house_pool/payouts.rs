//! Payouts the ledger has not confirmed yet.
//!
//! A payout is recorded before its push and cleared once the ledger
//! confirms it. An entry left behind means the outcome was unknown, or a
//! refund could not be delivered; the recipient completes it with
//! `retry_payout`, which reuses the original `created_at` so the ledger
//! never executes it twice.

use candid::{CandidType, Deserialize, Nat, Principal};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{StableBTreeMap, Storable};
use serde::Serialize;
use std::borrow::Cow;
use std::cell::RefCell;

use crate::{Memory, MEMORY_MANAGER};
use super::error::sanitize_error;
use super::memory_ids::PENDING_PAYOUTS_MEMORY_ID;

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum PayoutKind {
    /// A deposit that arrived but could not be credited.
    Refund,
    /// Proceeds of burned shares.
    Withdrawal { shares: Nat },
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingPayout {
    pub asset: Principal,
    pub recipient: Principal,
    pub kind: PayoutKind,
    pub amount: Nat,
    pub created_at: u64, // Ledger idempotency key
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl Storable for PendingPayout {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode PendingPayout. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode PendingPayout from stable storage. \
             Manual intervention required - owed funds cannot be tracked.",
        )
    }

    const BOUND: Bound = Bound::Unbounded;
}

thread_local! {
    // Keyed by (asset, recipient); at most one per pair
    static PENDING_PAYOUTS: RefCell<StableBTreeMap<(Principal, Principal), PendingPayout, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(PENDING_PAYOUTS_MEMORY_ID)))
        )
    );
}

pub fn get_pending_payout(asset: Principal, recipient: Principal) -> Option<PendingPayout> {
    PENDING_PAYOUTS.with(|p| p.borrow().get(&(asset, recipient)))
}

pub fn has_pending_payout(asset: Principal, recipient: Principal) -> bool {
    PENDING_PAYOUTS.with(|p| p.borrow().contains_key(&(asset, recipient)))
}

pub fn pending_payout_count() -> u64 {
    PENDING_PAYOUTS.with(|p| p.borrow().len())
}

/// Record a payout about to be pushed. Returns the stored entry.
pub(crate) fn record(asset: Principal, recipient: Principal, kind: PayoutKind, amount: Nat) -> PendingPayout {
    let payout = PendingPayout {
        asset,
        recipient,
        kind,
        amount,
        created_at: crate::now(),
        attempts: 0,
        last_error: None,
    };
    PENDING_PAYOUTS.with(|p| {
        p.borrow_mut().insert((asset, recipient), payout.clone());
    });
    payout
}

pub(crate) fn record_failure(asset: Principal, recipient: Principal, error: &str) {
    PENDING_PAYOUTS.with(|p| {
        let mut map = p.borrow_mut();
        if let Some(mut payout) = map.get(&(asset, recipient)) {
            payout.attempts = payout.attempts.saturating_add(1);
            payout.last_error = Some(sanitize_error(error));
            map.insert((asset, recipient), payout);
        }
    });
}

pub(crate) fn clear(asset: Principal, recipient: Principal) -> Option<PendingPayout> {
    PENDING_PAYOUTS.with(|p| p.borrow_mut().remove(&(asset, recipient)))
}
