use candid::Nat;
use futures::executor::block_on;
use std::collections::HashMap;

use super::super::{asset, principal, MockLedger};
use crate::house_pool::capacity::pending_exposure;
use crate::house_pool::error::PoolError;
use crate::house_pool::nat_helpers::{nat_mul_div, nat_sum, nat_zero};
use crate::house_pool::types::{Bet, Pool, RequestAux, RequestParams};
use crate::house_pool::{facade, ledger};

const SEED_HOLDER: u8 = 250;

#[derive(Debug, Clone, PartialEq)]
pub enum OpResult {
    Success,
    Rejected(PoolError),
}

#[derive(Debug, Clone)]
pub enum Operation {
    Deposit { user: u8, amount: u64 },
    /// Burn `bps` basis points of the user's current shares.
    Withdraw { user: u8, bps: u64 },
    Submit { user: u8, stakes: Vec<u64> },
    /// Fulfill the pending request at `pick % pending.len()`.
    Fulfill { pick: usize },
    /// Give `bps` basis points of `from`'s shares to `to`.
    TransferShares { from: u8, to: u8, bps: u64 },
}

/// Drives real canister state through the facade against a mock ledger and
/// checks accounting after each step.
pub struct Harness {
    pub mock: MockLedger,
    operators: HashMap<u8, u64>,
    // (request id, total stake, bet count) of requests still Pending
    pending: Vec<(u64, u64, usize)>,
    last_pool: Option<Pool>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            mock: MockLedger::new(),
            operators: HashMap::new(),
            pending: Vec::new(),
            last_pool: None,
        }
    }

    /// Start from a pool of `balance` backing `shares`, held by a single seed provider.
    pub fn with_seeded_pool(balance: u64, shares: u64) -> Self {
        let harness = Self::new();
        ledger::seed_pool(
            Pool { asset: asset(), total_balance: Nat::from(balance), total_shares: Nat::from(shares) },
            &[(principal(SEED_HOLDER), Nat::from(shares))],
        );
        harness.mock.mint(asset(), MockLedger::canister(), balance);
        Self { last_pool: ledger::get_pool(asset()), ..harness }
    }

    fn operator_for(&mut self, user: u8) -> u64 {
        *self.operators.entry(user).or_insert_with(|| {
            facade::mint_operator(principal(user), principal(user))
                .expect("mint to a non-anonymous owner succeeds")
        })
    }

    pub fn execute(&mut self, op: Operation) -> OpResult {
        let outcome = match op {
            Operation::Deposit { user, amount } => {
                self.mock.mint(asset(), principal(user), amount);
                block_on(facade::add_liquidity(&self.mock, principal(user), asset(), Nat::from(amount))).map(|_| ())
            }
            Operation::Withdraw { user, bps } => {
                let held = ledger::share_balance(asset(), principal(user));
                let burn = nat_mul_div(&held, &Nat::from(bps), &Nat::from(10_000u64)).unwrap_or_else(nat_zero);
                block_on(facade::remove_liquidity(&self.mock, principal(user), asset(), burn)).map(|_| ())
            }
            Operation::Submit { user, stakes } => {
                let operator_id = self.operator_for(user);
                let bet_count = stakes.len();
                let total: u64 = stakes.iter().sum();
                let params = RequestParams {
                    operator_id,
                    bets: stakes.into_iter().map(|s| Bet { stake: Nat::from(s), params: vec![] }).collect(),
                    asset: asset(),
                    aux: RequestAux::default(),
                };
                facade::submit_request(principal(user), params).map(|id| {
                    self.pending.push((id, total, bet_count));
                })
            }
            Operation::Fulfill { pick } => {
                if self.pending.is_empty() {
                    return OpResult::Success;
                }
                let (id, _, bet_count) = self.pending[pick % self.pending.len()];
                let words = (0..bet_count as u64).map(Nat::from).collect();
                facade::fulfill_request(principal(1), id, words).map(|_| {
                    self.pending.retain(|(pending_id, _, _)| *pending_id != id);
                })
            }
            Operation::TransferShares { from, to, bps } => {
                let held = ledger::share_balance(asset(), principal(from));
                let shares = nat_mul_div(&held, &Nat::from(bps), &Nat::from(10_000u64)).unwrap_or_else(nat_zero);
                facade::transfer_shares(principal(from), asset(), principal(to), shares)
            }
        };

        match outcome {
            Ok(()) => OpResult::Success,
            Err(e) => OpResult::Rejected(e),
        }
    }

    pub fn check_invariants(&mut self) -> Result<(), String> {
        let Some(pool) = ledger::get_pool(asset()) else {
            return Ok(());
        };

        let holder_total = ledger::total_provider_shares(asset());
        if holder_total != pool.total_shares {
            return Err(format!("provider shares {} != total_shares {}", holder_total, pool.total_shares));
        }

        if (pool.total_balance == Nat::from(0u64)) != (pool.total_shares == Nat::from(0u64)) {
            return Err(format!("balance {} with shares {}", pool.total_balance, pool.total_shares));
        }

        let held = self.mock.balance_of(asset(), MockLedger::canister());
        if held != pool.total_balance {
            return Err(format!("ledger holds {} but pool records {}", held, pool.total_balance));
        }

        if let Some(prev) = &self.last_pool {
            if !prev.is_empty() && !pool.is_empty() {
                let lhs = &pool.total_balance.0 * &prev.total_shares.0;
                let rhs = &prev.total_balance.0 * &pool.total_shares.0;
                if lhs < rhs {
                    return Err(format!(
                        "share price fell from {}/{} to {}/{}",
                        prev.total_balance, prev.total_shares, pool.total_balance, pool.total_shares
                    ));
                }
            }
        }

        let stakes: Vec<Nat> = self.pending.iter().map(|(_, stake, _)| Nat::from(*stake)).collect();
        let expected_exposure = nat_sum(stakes.iter());
        let exposure = pending_exposure(asset());
        if exposure != expected_exposure {
            return Err(format!("exposure {} != pending stakes {}", exposure, expected_exposure));
        }

        self.last_pool = Some(pool);
        Ok(())
    }
}
