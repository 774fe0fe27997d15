//! House Pool Backend
//!
//! **Design Philosophy:**
//! Pooled liquidity backs batched wager requests submitted by minted operators.
//! Randomness arrives later, from an external oracle, as a separate message.
//!
//! **What lives here:**
//! - Per-asset liquidity pools with proportional, pool-favouring share accounting
//! - Sequential, transferable operator identities
//! - Immutable request payloads and their one-time randomness responses
//!
//! Payout math and game rules are not part of this canister: bet parameters
//! are stored and echoed exactly as submitted.

use candid::{Nat, Principal};
use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
use ic_stable_structures::memory_manager::{MemoryManager, VirtualMemory};
use ic_stable_structures::DefaultMemoryImpl;
use std::cell::RefCell;

// =============================================================================
// LOGGING
// =============================================================================

macro_rules! log {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        ic_cdk::println!($($arg)*);
        #[cfg(not(target_arch = "wasm32"))]
        println!($($arg)*);
    }};
}

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod house_pool;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use house_pool::{
    AuditEntry, Bet, CapacityPolicy, HousePoolConfig, InitArgs, LPPosition, PendingPayout, Pool,
    PoolError, PoolStats, Request, RequestAux, RequestParams, RequestStatus,
};

// =============================================================================
// MEMORY MANAGEMENT
// =============================================================================

pub type Memory = VirtualMemory<DefaultMemoryImpl>;

#[cfg(not(target_arch = "wasm32"))]
const NATIVE_BUCKET_SIZE_PAGES: u16 = 16;

thread_local! {
    pub static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
        RefCell::new(init_memory_manager());
}

fn init_memory_manager() -> MemoryManager<DefaultMemoryImpl> {
    #[cfg(target_arch = "wasm32")]
    {
        MemoryManager::init(DefaultMemoryImpl::default())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        // Heap-backed memory in tests; small buckets keep each test thread light
        MemoryManager::init_with_bucket_size(DefaultMemoryImpl::default(), NATIVE_BUCKET_SIZE_PAGES)
    }
}

// =============================================================================
// HOST HELPERS
// =============================================================================

/// Current time in nanoseconds.
pub(crate) fn now() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        ic_cdk::api::time()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Abort the current message. All state changes made by it are discarded.
pub(crate) fn trap(msg: &str) -> ! {
    #[cfg(target_arch = "wasm32")]
    {
        ic_cdk::trap(msg)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        panic!("{}", msg)
    }
}

// =============================================================================
// LIFECYCLE HOOKS
// =============================================================================

#[init]
fn init(args: Option<InitArgs>) {
    house_pool::config::init_config(args);
    log!("House Pool Backend Initialized");
}

#[pre_upgrade]
fn pre_upgrade() {
    // StableBTreeMap persists automatically, no special handling needed
}

#[post_upgrade]
fn post_upgrade(args: Option<InitArgs>) {
    if let Some(args) = args {
        house_pool::config::apply_upgrade_args(args);
    }
    log!("Post-upgrade: state restored from stable memory");
}

// =============================================================================
// LIQUIDITY ENDPOINTS
// =============================================================================

/// Deposit `amount` of `asset` (ICRC-2 approval required) and receive pool shares.
#[update]
async fn add_liquidity(asset: Principal, amount: Nat) -> Result<Nat, PoolError> {
    let ledger = house_pool::transfer::IcrcLedger;
    house_pool::facade::add_liquidity(&ledger, ic_cdk::api::msg_caller(), asset, amount).await
}

/// Burn `shares` of the caller's position in `asset` and receive the proportional balance.
#[update]
async fn remove_liquidity(asset: Principal, shares: Nat) -> Result<Nat, PoolError> {
    let ledger = house_pool::transfer::IcrcLedger;
    house_pool::facade::remove_liquidity(&ledger, ic_cdk::api::msg_caller(), asset, shares).await
}

/// Move `shares` of the caller's position in `asset` to another principal.
#[update]
fn transfer_shares(asset: Principal, to: Principal, shares: Nat) -> Result<(), PoolError> {
    house_pool::facade::transfer_shares(ic_cdk::api::msg_caller(), asset, to, shares)
}

/// Re-send the caller's pending payout in `asset` (refund or withdrawal proceeds).
#[update]
async fn retry_payout(asset: Principal) -> Result<Nat, PoolError> {
    let ledger = house_pool::transfer::IcrcLedger;
    house_pool::facade::retry_payout(&ledger, ic_cdk::api::msg_caller(), asset).await
}

#[query]
fn get_pending_payout(asset: Principal, recipient: Principal) -> Option<PendingPayout> {
    house_pool::query::get_pending_payout(asset, recipient)
}

#[query]
fn get_my_pending_payout(asset: Principal) -> Option<PendingPayout> {
    house_pool::query::get_pending_payout(asset, ic_cdk::api::msg_caller())
}

#[query]
fn get_pool(asset: Principal) -> Option<Pool> {
    house_pool::query::get_pool(asset)
}

#[query]
fn get_pools() -> Vec<Pool> {
    house_pool::query::get_pools()
}

#[query]
fn get_pool_stats(asset: Principal) -> Result<PoolStats, PoolError> {
    house_pool::query::get_pool_stats(asset)
}

#[query]
fn get_share_balance(asset: Principal, provider: Principal) -> Nat {
    house_pool::query::get_share_balance(asset, provider)
}

#[query]
fn get_lp_position(asset: Principal, provider: Principal) -> LPPosition {
    house_pool::query::get_lp_position(asset, provider)
}

#[query]
fn get_my_lp_position(asset: Principal) -> LPPosition {
    house_pool::query::get_lp_position(asset, ic_cdk::api::msg_caller())
}

#[query]
fn calculate_shares_preview(asset: Principal, amount: Nat) -> Result<Nat, PoolError> {
    house_pool::query::calculate_shares_preview(asset, amount)
}

#[query]
fn get_pending_exposure(asset: Principal) -> Nat {
    house_pool::query::get_pending_exposure(asset)
}

// =============================================================================
// OPERATOR ENDPOINTS
// =============================================================================

#[update]
fn mint_operator(owner: Principal) -> Result<u64, PoolError> {
    house_pool::facade::mint_operator(ic_cdk::api::msg_caller(), owner)
}

#[update]
fn transfer_operator(operator_id: u64, to: Principal) -> Result<(), PoolError> {
    house_pool::facade::transfer_operator(ic_cdk::api::msg_caller(), operator_id, to)
}

#[query]
fn owner_of(operator_id: u64) -> Result<Principal, PoolError> {
    house_pool::query::owner_of(operator_id)
}

#[query]
fn operators_of(owner: Principal) -> Vec<u64> {
    house_pool::query::operators_of(owner)
}

#[query]
fn total_operators() -> u64 {
    house_pool::query::total_operators()
}

// =============================================================================
// REQUEST / RESPONSE ENDPOINTS
// =============================================================================

/// Submit a batch of bets on behalf of an operator the caller owns.
#[update]
fn request(params: RequestParams) -> Result<u64, PoolError> {
    house_pool::facade::submit_request(ic_cdk::api::msg_caller(), params)
}

#[query]
fn get_request(request_id: u64) -> Result<Request, PoolError> {
    house_pool::query::get_request(request_id)
}

#[query]
fn get_request_status(request_id: u64) -> Result<RequestStatus, PoolError> {
    house_pool::query::get_request_status(request_id)
}

#[query]
fn total_requests() -> u64 {
    house_pool::query::total_requests()
}

/// Deliver randomness for a pending request. One word per bet, in bet order.
#[update]
fn fulfill_request(request_id: u64, random_words: Vec<Nat>) -> Result<(), PoolError> {
    house_pool::facade::fulfill_request(ic_cdk::api::msg_caller(), request_id, random_words)
}

#[query]
fn get_response(request_id: u64) -> Result<Vec<Nat>, PoolError> {
    house_pool::query::get_response(request_id)
}

// =============================================================================
// CONFIG & AUDIT ENDPOINTS
// =============================================================================

#[query]
fn get_config() -> HousePoolConfig {
    house_pool::config::get_config()
}

#[query]
fn get_audit_log(offset: u64, limit: u64) -> Vec<AuditEntry> {
    house_pool::audit::get_audit_log(offset, limit.min(types::MAX_PAGINATION_LIMIT))
}

#[query]
fn get_audit_log_count() -> u64 {
    house_pool::audit::audit_log_count()
}

ic_cdk::export_candid!();
