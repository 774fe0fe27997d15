use candid::{CandidType, Deserialize, Nat, Principal};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use serde::Serialize;
use std::borrow::Cow;

use super::nat_helpers::{nat_is_zero, nat_zero};

// =============================================================================
// LIQUIDITY
// =============================================================================

/// Aggregated balance of one backing asset plus its outstanding share supply.
///
/// `total_balance == 0` exactly when `total_shares == 0`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Pool {
    pub asset: Principal,
    pub total_balance: Nat,
    pub total_shares: Nat,
}

impl Pool {
    pub fn empty(asset: Principal) -> Self {
        Self {
            asset,
            total_balance: nat_zero(),
            total_shares: nat_zero(),
        }
    }

    pub fn is_empty(&self) -> bool {
        nat_is_zero(&self.total_shares)
    }
}

impl Storable for Pool {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode Pool. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode Pool from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade.",
        )
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// A provider's position in one pool.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LPPosition {
    pub asset: Principal,
    pub shares: Nat,
    /// Ownership of the pool in basis points, rounded down.
    pub ownership_bps: u64,
    /// What burning every share would return right now.
    pub redeemable: Nat,
}

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolStats {
    pub pool: Pool,
    pub pending_exposure: Nat,
    pub total_liquidity_providers: u64,
}

// =============================================================================
// OPERATORS
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct OperatorRecord {
    pub id: u64,
    pub owner: Principal,
    pub minted_by: Principal,
    pub minted_at: u64,
}

impl Storable for OperatorRecord {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode OperatorRecord.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode OperatorRecord from stable storage.",
        )
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 256,
        is_fixed_size: false,
    };
}

// =============================================================================
// REQUESTS
// =============================================================================

/// One wager inside a request. `params` is game-specific and never interpreted here.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    pub stake: Nat,
    pub params: Vec<Nat>,
}

/// Pass-through fields carried with a request and echoed unchanged.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestAux {
    pub fee_tier: u64,
    pub data: String,
    pub reserved: (Nat, Nat),
}

impl Default for RequestAux {
    fn default() -> Self {
        Self {
            fee_tier: 0,
            data: String::new(),
            reserved: (nat_zero(), nat_zero()),
        }
    }
}

/// What an operator submits.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestParams {
    pub operator_id: u64,
    pub bets: Vec<Bet>,
    pub asset: Principal,
    pub aux: RequestAux,
}

impl RequestParams {
    pub fn total_stake(&self) -> Nat {
        super::nat_helpers::nat_sum(self.bets.iter().map(|b| &b.stake))
    }
}

/// A stored request: the submitted params verbatim plus the assigned id.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub id: u64,
    pub operator_id: u64,
    pub bets: Vec<Bet>,
    pub asset: Principal,
    pub aux: RequestAux,
}

impl Request {
    pub fn from_params(id: u64, params: RequestParams) -> Self {
        Self {
            id,
            operator_id: params.operator_id,
            bets: params.bets,
            asset: params.asset,
            aux: params.aux,
        }
    }

    pub fn total_stake(&self) -> Nat {
        super::nat_helpers::nat_sum(self.bets.iter().map(|b| &b.stake))
    }
}

impl Storable for Request {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode Request. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode Request from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade.",
        )
    }

    const BOUND: Bound = Bound::Unbounded;
}

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Fulfilled,
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ResponseRecord {
    pub request_id: u64,
    pub random_words: Vec<Nat>,
    pub fulfilled_by: Principal,
    pub fulfilled_at: u64,
}

impl Storable for ResponseRecord {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(self).expect(
            "CRITICAL: Failed to encode ResponseRecord.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode ResponseRecord from stable storage. \
             Fulfillment history integrity cannot be guaranteed.",
        )
    }

    const BOUND: Bound = Bound::Unbounded;
}
