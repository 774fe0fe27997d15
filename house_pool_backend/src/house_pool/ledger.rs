//! Per-asset pools and proportional share accounting.
//!
//! All divisions floor, so rounding always favours the pool: a deposit never
//! receives more shares than it paid for and a withdrawal never returns more
//! than its shares are worth. Nothing here moves tokens; the facade pairs
//! these mutations with the transfer collaborator.

use candid::{Nat, Principal};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

use crate::{Memory, MEMORY_MANAGER};
use super::capacity::CapacityCheck;
use super::error::PoolError;
use super::memory_ids::{LP_SHARES_MEMORY_ID, POOLS_MEMORY_ID};
use super::nat_helpers::{nat_add, nat_is_zero, nat_mul_div, nat_subtract, nat_to_u64, nat_zero, StorableNat};
use super::types::{LPPosition, Pool};

const BASIS_POINTS: u64 = 10_000;

thread_local! {
    static POOLS: RefCell<StableBTreeMap<Principal, Pool, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(POOLS_MEMORY_ID)))
        )
    );

    // Keyed by (asset, provider)
    static LP_SHARES: RefCell<StableBTreeMap<(Principal, Principal), StorableNat, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(LP_SHARES_MEMORY_ID)))
        )
    );
}

// =============================================================================
// SHARE MATH
// =============================================================================

/// Shares issued for depositing `amount` into `pool`.
///
/// First deposit (no shares outstanding) is 1:1. Afterwards
/// `floor(amount * total_shares / total_balance)`.
pub fn shares_for_deposit(pool: &Pool, amount: &Nat) -> Nat {
    if pool.is_empty() {
        return amount.clone();
    }
    nat_mul_div(amount, &pool.total_shares, &pool.total_balance).unwrap_or_else(nat_zero)
}

/// Amount returned for burning `shares`: `floor(shares * total_balance / total_shares)`.
pub fn amount_for_shares(pool: &Pool, shares: &Nat) -> Nat {
    nat_mul_div(shares, &pool.total_balance, &pool.total_shares).unwrap_or_else(nat_zero)
}

// =============================================================================
// READS
// =============================================================================

pub fn get_pool(asset: Principal) -> Option<Pool> {
    POOLS.with(|p| p.borrow().get(&asset))
}

pub fn list_pools() -> Vec<Pool> {
    POOLS.with(|p| p.borrow().iter().map(|entry| entry.value()).collect())
}

pub fn share_balance(asset: Principal, provider: Principal) -> Nat {
    LP_SHARES.with(|s| {
        s.borrow()
            .get(&(asset, provider))
            .map(|n| n.0)
            .unwrap_or_else(nat_zero)
    })
}

/// Shares a deposit of `amount` would receive right now. Unknown assets
/// preview as a first deposit.
pub fn preview_shares(asset: Principal, amount: &Nat) -> Result<Nat, PoolError> {
    if nat_is_zero(amount) {
        return Err(PoolError::ZeroAmount);
    }
    let pool = get_pool(asset).unwrap_or_else(|| Pool::empty(asset));
    Ok(shares_for_deposit(&pool, amount))
}

pub fn lp_position(asset: Principal, provider: Principal) -> LPPosition {
    let shares = share_balance(asset, provider);
    let pool = get_pool(asset).unwrap_or_else(|| Pool::empty(asset));

    if pool.is_empty() || nat_is_zero(&shares) {
        return LPPosition {
            asset,
            shares,
            ownership_bps: 0,
            redeemable: nat_zero(),
        };
    }

    let ownership_bps = nat_mul_div(&shares, &Nat::from(BASIS_POINTS), &pool.total_shares)
        .and_then(|bps| nat_to_u64(&bps))
        .unwrap_or(0);

    LPPosition {
        asset,
        redeemable: amount_for_shares(&pool, &shares),
        shares,
        ownership_bps,
    }
}

/// Balances held in `asset`, read from that asset's key range only.
fn provider_balances(asset: Principal) -> Vec<(Principal, Nat)> {
    // The empty principal sorts before every other
    let start = (asset, Principal::from_slice(&[]));
    LP_SHARES.with(|s| {
        s.borrow()
            .range(start..)
            .take_while(|entry| entry.key().0 == asset)
            .map(|entry| (entry.key().1, entry.value().0))
            .collect()
    })
}

/// Providers holding a non-zero balance in `asset`.
pub fn count_providers(asset: Principal) -> u64 {
    provider_balances(asset)
        .iter()
        .filter(|(_, shares)| !nat_is_zero(shares))
        .count() as u64
}

/// Sum of every provider balance in `asset`. Equals the pool's `total_shares`.
pub fn total_provider_shares(asset: Principal) -> Nat {
    provider_balances(asset)
        .iter()
        .fold(nat_zero(), |acc, (_, shares)| nat_add(&acc, shares))
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Credit a deposit whose tokens have already arrived. Creates the pool on
/// first use. Fails without mutating if the deposit would issue zero shares.
pub(crate) fn credit_deposit(provider: Principal, asset: Principal, amount: &Nat) -> Result<Nat, PoolError> {
    if nat_is_zero(amount) {
        return Err(PoolError::ZeroAmount);
    }

    let before = get_pool(asset).unwrap_or_else(|| Pool::empty(asset));
    let issued = shares_for_deposit(&before, amount);
    if nat_is_zero(&issued) {
        return Err(PoolError::DepositTooSmall { amount: amount.clone() });
    }

    let after = Pool {
        asset,
        total_balance: nat_add(&before.total_balance, amount),
        total_shares: nat_add(&before.total_shares, &issued),
    };
    check_invariants(&before, &after);

    let held = share_balance(asset, provider);
    LP_SHARES.with(|s| {
        s.borrow_mut().insert((asset, provider), StorableNat(nat_add(&held, &issued)));
    });
    POOLS.with(|p| {
        p.borrow_mut().insert(asset, after);
    });

    Ok(issued)
}

/// Burn `shares` and debit the proportional amount. Returns the amount owed
/// to the provider; the caller is responsible for delivering it or calling
/// [`restore_withdrawal`].
pub(crate) fn debit_withdrawal(
    provider: Principal,
    asset: Principal,
    shares: &Nat,
    capacity: &impl CapacityCheck,
) -> Result<Nat, PoolError> {
    if nat_is_zero(shares) {
        return Err(PoolError::ZeroAmount);
    }

    let before = get_pool(asset).ok_or(PoolError::UnknownAsset(asset))?;

    let held = share_balance(asset, provider);
    let remaining_shares = nat_subtract(&held, shares).ok_or_else(|| PoolError::InsufficientShares {
        held: held.clone(),
        requested: shares.clone(),
    })?;

    let returned = amount_for_shares(&before, shares);
    if nat_is_zero(&returned) {
        return Err(PoolError::WithdrawalTooSmall { shares: shares.clone() });
    }

    capacity.check_withdrawal(&before, &returned)?;

    let after = Pool {
        asset,
        total_balance: sub_or_trap(&before.total_balance, &returned, "pool balance"),
        total_shares: sub_or_trap(&before.total_shares, shares, "pool shares"),
    };
    check_invariants(&before, &after);

    LP_SHARES.with(|s| {
        s.borrow_mut().insert((asset, provider), StorableNat(remaining_shares));
    });
    POOLS.with(|p| {
        p.borrow_mut().insert(asset, after);
    });

    Ok(returned)
}

/// Undo a [`debit_withdrawal`] whose payout definitely did not happen.
///
/// The shares come back backed by the floored payout, not by their value at
/// the current price. If other providers moved the price in between, the
/// price can therefore dip, by less than one unit of the asset across the
/// whole pool. Only the emptiness invariant is checked here.
pub(crate) fn restore_withdrawal(provider: Principal, asset: Principal, shares: &Nat, amount: &Nat) {
    let before = get_pool(asset).unwrap_or_else(|| Pool::empty(asset));
    let after = Pool {
        asset,
        total_balance: nat_add(&before.total_balance, amount),
        total_shares: nat_add(&before.total_shares, shares),
    };
    check_zero_equivalence(&after);

    let held = share_balance(asset, provider);
    LP_SHARES.with(|s| {
        s.borrow_mut().insert((asset, provider), StorableNat(nat_add(&held, shares)));
    });
    POOLS.with(|p| {
        p.borrow_mut().insert(asset, after);
    });
}

/// Move `shares` of `asset` from one holder to another. Pool totals and the
/// share price are untouched.
pub(crate) fn transfer_shares(asset: Principal, from: Principal, to: Principal, shares: &Nat) -> Result<(), PoolError> {
    if nat_is_zero(shares) {
        return Err(PoolError::ZeroAmount);
    }
    if to == Principal::anonymous() {
        return Err(PoolError::InvalidRecipient);
    }
    if get_pool(asset).is_none() {
        return Err(PoolError::UnknownAsset(asset));
    }

    let held = share_balance(asset, from);
    let remaining = nat_subtract(&held, shares).ok_or_else(|| PoolError::InsufficientShares {
        held: held.clone(),
        requested: shares.clone(),
    })?;
    if from == to {
        return Ok(());
    }

    let received = nat_add(&share_balance(asset, to), shares);
    LP_SHARES.with(|s| {
        let mut s = s.borrow_mut();
        s.insert((asset, from), StorableNat(remaining));
        s.insert((asset, to), StorableNat(received));
    });

    Ok(())
}

/// Overwrite a pool and its holders directly. Lets tests start from a
/// share price other than 1.
#[cfg(test)]
pub(crate) fn seed_pool(pool: Pool, holders: &[(Principal, Nat)]) {
    check_zero_equivalence(&pool);
    let asset = pool.asset;
    POOLS.with(|p| {
        p.borrow_mut().insert(asset, pool);
    });
    LP_SHARES.with(|s| {
        let mut s = s.borrow_mut();
        for (holder, shares) in holders {
            s.insert((asset, *holder), StorableNat(shares.clone()));
        }
    });
}

// =============================================================================
// INVARIANTS
// =============================================================================

fn sub_or_trap(a: &Nat, b: &Nat, what: &str) -> Nat {
    match nat_subtract(a, b) {
        Some(v) => v,
        None => crate::trap(&format!("CRITICAL: {} underflow ({} - {})", what, a, b)),
    }
}

fn check_zero_equivalence(pool: &Pool) {
    if nat_is_zero(&pool.total_balance) != nat_is_zero(&pool.total_shares) {
        crate::trap(&format!(
            "CRITICAL: pool {} has balance {} but {} shares",
            pool.asset, pool.total_balance, pool.total_shares
        ));
    }
}

/// Trap if a mutation would break pool accounting. A trap discards every
/// state change of the current message.
fn check_invariants(before: &Pool, after: &Pool) {
    check_zero_equivalence(after);

    if before.is_empty() || after.is_empty() {
        return;
    }

    // after.balance / after.shares >= before.balance / before.shares
    let lhs = &after.total_balance.0 * &before.total_shares.0;
    let rhs = &before.total_balance.0 * &after.total_shares.0;
    if lhs < rhs {
        crate::trap(&format!(
            "CRITICAL: share price of {} would decrease ({}/{} -> {}/{})",
            before.asset, before.total_balance, before.total_shares, after.total_balance, after.total_shares
        ));
    }
}
