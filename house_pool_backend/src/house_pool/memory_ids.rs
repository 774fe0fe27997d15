//! Central registry for stable memory IDs.
//!
//! IMPORTANT: All memory IDs must be unique across the entire canister.
//! Run `cargo test` to verify no collisions exist.
//!
//! Allocation strategy:
//! - 0-9: Configuration
//! - 10-19: Liquidity (pools, LP shares, pending exposure, pending payouts)
//! - 20-29: Operators (records, mint counter)
//! - 30-39: Requests (payloads, id counter)
//! - 40-49: Responses
//! - 50-59: Audit (log map, counter)

// Configuration (0-9)
pub const CONFIG_MEMORY_ID: u8 = 0;

// Liquidity (10-19)
pub const POOLS_MEMORY_ID: u8 = 10;
pub const LP_SHARES_MEMORY_ID: u8 = 11;
pub const PENDING_EXPOSURE_MEMORY_ID: u8 = 12;
pub const PENDING_PAYOUTS_MEMORY_ID: u8 = 13;

// Operators (20-29)
pub const OPERATORS_MEMORY_ID: u8 = 20;
pub const OPERATOR_COUNTER_MEMORY_ID: u8 = 21;

// Requests (30-39)
pub const REQUESTS_MEMORY_ID: u8 = 30;
pub const REQUEST_COUNTER_MEMORY_ID: u8 = 31;

// Responses (40-49)
pub const RESPONSES_MEMORY_ID: u8 = 40;

// Audit (50-59)
pub const AUDIT_LOG_MAP_MEMORY_ID: u8 = 50;
pub const AUDIT_LOG_COUNTER_MEMORY_ID: u8 = 51;
