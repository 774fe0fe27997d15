//! Entry points behind the canister endpoints.
//!
//! Composes the ledger, registry and stores, checks the caller, and writes
//! the audit trail. Liquidity operations cross an `await`, so they hold an
//! [`OperationGuard`] for the caller. Deposits mutate only after the pull
//! lands. Withdrawals debit before the push, record the payout as pending,
//! and restore only when the push definitely did not happen.

use candid::{Nat, Principal};

use super::audit::{log_audit, AuditEvent};
use super::config;
use super::error::PoolError;
use super::guard::OperationGuard;
use super::ledger;
use super::nat_helpers::nat_is_zero;
use super::operators;
use super::payouts::{self, PayoutKind};
use super::requests;
use super::responses;
use super::transfer::{AssetTransfer, PushError};
use super::types::RequestParams;

// =============================================================================
// LIQUIDITY
// =============================================================================

fn ensure_no_pending_payout(asset: Principal, caller: Principal) -> Result<(), PoolError> {
    if payouts::has_pending_payout(asset, caller) {
        return Err(PoolError::PayoutPending(asset));
    }
    Ok(())
}

pub async fn add_liquidity<T: AssetTransfer>(
    transfer: &T,
    caller: Principal,
    asset: Principal,
    amount: Nat,
) -> Result<Nat, PoolError> {
    if caller == Principal::anonymous() {
        return Err(PoolError::AnonymousCaller);
    }
    if nat_is_zero(&amount) {
        return Err(PoolError::ZeroAmount);
    }

    // Pre-flight: refuse before any tokens move
    let projected = ledger::preview_shares(asset, &amount)?;
    if nat_is_zero(&projected) {
        return Err(PoolError::DepositTooSmall { amount });
    }

    let _guard = OperationGuard::new(caller)?;
    ensure_no_pending_payout(asset, caller)?;

    transfer
        .pull(asset, caller, amount.clone())
        .await
        .map_err(|e| PoolError::transfer_failed(&e))?;

    // Pool state may have moved while the pull was in flight
    match ledger::credit_deposit(caller, asset, &amount) {
        Ok(shares) => {
            log_audit(AuditEvent::LiquidityAdded {
                provider: caller,
                asset,
                amount: amount.clone(),
                shares: shares.clone(),
            });
            log!("[LIQUIDITY] {} deposited {} of {} for {} shares", caller, amount, asset, shares);
            Ok(shares)
        }
        Err(PoolError::DepositTooSmall { .. }) => {
            let payout = payouts::record(asset, caller, PayoutKind::Refund, amount.clone());
            match transfer.push(asset, caller, amount.clone(), payout.created_at).await {
                Ok(()) => {
                    payouts::clear(asset, caller);
                    log_audit(AuditEvent::DepositRefunded {
                        provider: caller,
                        asset,
                        amount: amount.clone(),
                        refunded: true,
                    });
                    Err(PoolError::DepositTooSmall { amount })
                }
                Err(e) => {
                    // The refund stays pending until retry_payout delivers it
                    payouts::record_failure(asset, caller, e.message());
                    log!("[CRITICAL] refund of {} {} to {} failed: {}", amount, asset, caller, e.message());
                    log_audit(AuditEvent::DepositRefunded {
                        provider: caller,
                        asset,
                        amount,
                        refunded: false,
                    });
                    Err(PoolError::transfer_failed(e.message()))
                }
            }
        }
        Err(e) => Err(e),
    }
}

pub async fn remove_liquidity<T: AssetTransfer>(
    transfer: &T,
    caller: Principal,
    asset: Principal,
    shares: Nat,
) -> Result<Nat, PoolError> {
    if caller == Principal::anonymous() {
        return Err(PoolError::AnonymousCaller);
    }

    let _guard = OperationGuard::new(caller)?;
    ensure_no_pending_payout(asset, caller)?;

    let policy = config::get_config().capacity_policy;
    let returned = ledger::debit_withdrawal(caller, asset, &shares, &policy)?;
    let payout = payouts::record(
        asset,
        caller,
        PayoutKind::Withdrawal { shares: shares.clone() },
        returned.clone(),
    );

    match transfer.push(asset, caller, returned.clone(), payout.created_at).await {
        Ok(()) => {
            payouts::clear(asset, caller);
            log_audit(AuditEvent::LiquidityRemoved {
                provider: caller,
                asset,
                shares: shares.clone(),
                amount: returned.clone(),
            });
            log!("[LIQUIDITY] {} burned {} shares of {} for {}", caller, shares, asset, returned);
            Ok(returned)
        }
        Err(PushError::Definite(msg)) => {
            payouts::clear(asset, caller);
            ledger::restore_withdrawal(caller, asset, &shares, &returned);
            let error = PoolError::transfer_failed(&msg);
            log_audit(AuditEvent::WithdrawalRolledBack {
                provider: caller,
                asset,
                shares,
                amount: returned,
                reason: error.to_string(),
            });
            Err(error)
        }
        Err(PushError::Uncertain(msg)) => {
            // Shares stay burned: the tokens may already be on their way
            payouts::record_failure(asset, caller, &msg);
            log!("[WARNING] withdrawal of {} {} to {} uncertain: {}", returned, asset, caller, msg);
            log_audit(AuditEvent::PayoutUncertain {
                recipient: caller,
                asset,
                amount: returned,
                reason: msg.clone(),
            });
            Err(PoolError::transfer_failed(&msg))
        }
    }
}

/// Push the caller's pending payout in `asset` again, with its original
/// deduplication key. Returns the amount owed once the ledger confirms.
///
/// A failure here never restores shares: once an outcome was unknown, an
/// earlier attempt may still have landed.
pub async fn retry_payout<T: AssetTransfer>(
    transfer: &T,
    caller: Principal,
    asset: Principal,
) -> Result<Nat, PoolError> {
    if caller == Principal::anonymous() {
        return Err(PoolError::AnonymousCaller);
    }

    let _guard = OperationGuard::new(caller)?;
    let payout = payouts::get_pending_payout(asset, caller).ok_or(PoolError::NoPendingPayout(asset))?;

    match transfer.push(asset, caller, payout.amount.clone(), payout.created_at).await {
        Ok(()) => {
            payouts::clear(asset, caller);
            match payout.kind {
                PayoutKind::Refund => log_audit(AuditEvent::DepositRefunded {
                    provider: caller,
                    asset,
                    amount: payout.amount.clone(),
                    refunded: true,
                }),
                PayoutKind::Withdrawal { shares } => log_audit(AuditEvent::LiquidityRemoved {
                    provider: caller,
                    asset,
                    shares,
                    amount: payout.amount.clone(),
                }),
            }
            log!("[PAYOUT] delivered {} {} to {} after {} failed attempts", payout.amount, asset, caller, payout.attempts);
            Ok(payout.amount)
        }
        Err(e) => {
            payouts::record_failure(asset, caller, e.message());
            Err(PoolError::transfer_failed(e.message()))
        }
    }
}

/// Move `shares` of the caller's position in `asset` to `to`.
pub fn transfer_shares(caller: Principal, asset: Principal, to: Principal, shares: Nat) -> Result<(), PoolError> {
    if caller == Principal::anonymous() {
        return Err(PoolError::AnonymousCaller);
    }

    let _guard = OperationGuard::new(caller)?;
    ledger::transfer_shares(asset, caller, to, &shares)?;

    log_audit(AuditEvent::SharesTransferred { asset, from: caller, to, shares });
    Ok(())
}

// =============================================================================
// OPERATORS
// =============================================================================

pub fn mint_operator(caller: Principal, owner: Principal) -> Result<u64, PoolError> {
    let operator_id = operators::mint_operator(caller, owner)?;
    log_audit(AuditEvent::OperatorMinted { operator_id, owner, minted_by: caller });
    Ok(operator_id)
}

pub fn transfer_operator(caller: Principal, operator_id: u64, to: Principal) -> Result<(), PoolError> {
    let from = operators::transfer_operator(caller, operator_id, to)?;
    log_audit(AuditEvent::OperatorTransferred { operator_id, from, to });
    Ok(())
}

// =============================================================================
// REQUESTS / RESPONSES
// =============================================================================

pub fn submit_request(caller: Principal, params: RequestParams) -> Result<u64, PoolError> {
    let config = config::get_config();
    let operator_id = params.operator_id;
    let asset = params.asset;
    let bet_count = params.bets.len() as u64;

    let (request_id, total_stake) =
        requests::submit_request(caller, params, &config, &config.capacity_policy)?;

    log_audit(AuditEvent::RequestSubmitted {
        request_id,
        operator_id,
        asset,
        bet_count,
        total_stake,
    });
    Ok(request_id)
}

pub fn fulfill_request(caller: Principal, request_id: u64, random_words: Vec<Nat>) -> Result<(), PoolError> {
    if let Some(oracle) = config::get_config().oracle {
        if caller != oracle {
            return Err(PoolError::UnauthorizedOracle);
        }
    }

    responses::fulfill_request(caller, request_id, random_words)?;
    log_audit(AuditEvent::RequestFulfilled { request_id, fulfilled_by: caller });
    Ok(())
}
