use candid::{Nat, Principal};
use ic_cdk::call::{Call, CallErrorExt};

use crate::types::{Account, TransferArg, TransferError, TransferFromArgs, TransferFromError};
use super::nat_helpers::nat_subtract;

/// Why a push did not complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushError {
    /// Nothing moved.
    Definite(String),
    /// The ledger may have executed the transfer. Retrying with the same
    /// `created_at` either completes it or is rejected as a duplicate.
    Uncertain(String),
}

impl PushError {
    pub fn message(&self) -> &str {
        match self {
            PushError::Definite(msg) | PushError::Uncertain(msg) => msg,
        }
    }
}

/// Moves tokens between a provider and this canister.
#[allow(async_fn_in_trait)]
pub trait AssetTransfer {
    /// Take `amount` of `asset` from `from` into the canister. An `Err`
    /// means nothing moved.
    async fn pull(&self, asset: Principal, from: Principal, amount: Nat) -> Result<(), String>;

    /// Send `amount` of `asset` from the canister to `to`. `created_at` is
    /// the deduplication key: pushes repeated with the same key land once.
    async fn push(&self, asset: Principal, to: Principal, amount: Nat, created_at: u64) -> Result<(), PushError>;
}

/// ICRC-1/ICRC-2 ledger. `asset` is the ledger canister id.
pub struct IcrcLedger;

impl IcrcLedger {
    async fn fee(&self, ledger: Principal) -> Result<Nat, String> {
        Call::unbounded_wait(ledger, "icrc1_fee")
            .await
            .map_err(|e| format!("icrc1_fee call failed: {}", e))?
            .candid::<Nat>()
            .map_err(|e| format!("icrc1_fee decode failed: {}", e))
    }
}

impl AssetTransfer for IcrcLedger {
    // Requires a prior icrc2_approve from the provider; the provider pays the fee.
    async fn pull(&self, asset: Principal, from: Principal, amount: Nat) -> Result<(), String> {
        let args = TransferFromArgs {
            from: Account::from(from),
            to: Account::from(ic_cdk::api::canister_self()),
            amount,
            fee: None,
            memo: None,
            created_at_time: None,
            spender_subaccount: None,
        };

        let result = Call::unbounded_wait(asset, "icrc2_transfer_from")
            .with_arg(&args)
            .await
            .map_err(|e| format!("Call failed: {}", e))?
            .candid::<Result<Nat, TransferFromError>>()
            .map_err(|e| format!("Decode failed: {}", e))?;

        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(format!("icrc2_transfer_from rejected: {:?}", e)),
        }
    }

    // The recipient bears the ledger fee: `amount - fee` arrives.
    async fn push(&self, asset: Principal, to: Principal, amount: Nat, created_at: u64) -> Result<(), PushError> {
        let fee = self.fee(asset).await.map_err(PushError::Definite)?;
        let net = match nat_subtract(&amount, &fee) {
            Some(net) if net > Nat::from(0u64) => net,
            _ => {
                return Err(PushError::Definite(format!(
                    "Amount {} does not cover ledger fee {}",
                    amount, fee
                )))
            }
        };

        let args = TransferArg {
            from_subaccount: None,
            to: Account::from(to),
            amount: net,
            fee: Some(fee),
            memo: None,
            created_at_time: Some(created_at),
        };

        let response = Call::unbounded_wait(asset, "icrc1_transfer")
            .with_arg(&args)
            .await
            .map_err(|e| {
                if e.is_clean_reject() {
                    PushError::Definite(format!("Call rejected: {}", e))
                } else {
                    PushError::Uncertain(format!("Call failed: {}", e))
                }
            })?;

        // The ledger replied, so it may have executed the transfer
        let result = response
            .candid::<Result<Nat, TransferError>>()
            .map_err(|e| PushError::Uncertain(format!("Decode failed: {}", e)))?;

        match result {
            Ok(_) => Ok(()),
            // An earlier attempt with this key already landed
            Err(TransferError::Duplicate { .. }) => Ok(()),
            // Outside the deduplication window: an earlier attempt can no longer be ruled out
            Err(TransferError::TooOld) => Err(PushError::Uncertain("icrc1_transfer rejected: TooOld".to_string())),
            Err(e) => Err(PushError::Definite(format!("icrc1_transfer rejected: {:?}", e))),
        }
    }
}
