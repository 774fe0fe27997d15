use candid::{CandidType, Deserialize, Nat, Principal};
use serde::Serialize;
use thiserror::Error;

/// Truncate collaborator error text before it is stored or returned.
pub fn sanitize_error(msg: &str) -> String {
    msg.chars().take(256).collect()
}

/// Every failure a house pool operation can report.
///
/// An `Err` means the call left pools, shares, operators and requests
/// untouched, with one exception: a `TransferFailed` whose payout outcome is
/// unknown. That payout stays recorded as pending for its recipient and is
/// completed through `retry_payout`.
#[derive(CandidType, Deserialize, Serialize, Error, Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    // Validation
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Request must contain at least one bet")]
    EmptyBetList,

    #[error("Request contains {count} bets, maximum is {max}")]
    TooManyBets { count: u64, max: u64 },

    #[error("Bet {index} is invalid: {reason}")]
    InvalidBet { index: u64, reason: String },

    #[error("Request data is {size} bytes, maximum is {max}")]
    DataTooLarge { size: u64, max: u64 },

    #[error("Expected {expected} random words, got {actual}")]
    WordCountMismatch { expected: u64, actual: u64 },

    #[error("Deposit of {amount} is too small: results in 0 shares")]
    DepositTooSmall { amount: Nat },

    #[error("Burning {shares} shares would return nothing")]
    WithdrawalTooSmall { shares: Nat },

    #[error("Anonymous principal cannot own an operator")]
    InvalidOwner,

    #[error("Anonymous principal cannot provide liquidity")]
    AnonymousCaller,

    #[error("Anonymous principal cannot receive shares")]
    InvalidRecipient,

    // Not found
    #[error("Operator {0} does not exist")]
    UnknownOperator(u64),

    #[error("No pool exists for asset {0}")]
    UnknownAsset(Principal),

    #[error("Request {0} does not exist")]
    UnknownRequest(u64),

    #[error("Request {0} has not been fulfilled yet")]
    NoResponseYet(u64),

    #[error("No pending payout in asset {0}")]
    NoPendingPayout(Principal),

    // State conflict
    #[error("Request {0} is already fulfilled")]
    AlreadyFulfilled(u64),

    #[error("Insufficient shares: held {held}, requested {requested}")]
    InsufficientShares { held: Nat, requested: Nat },

    #[error("Insufficient pool balance: available {available}, required {required}")]
    InsufficientPoolBalance { available: Nat, required: Nat },

    #[error("Caller does not own operator {0}")]
    NotOperatorOwner(u64),

    #[error("Caller is not the configured randomness oracle")]
    UnauthorizedOracle,

    #[error("Operation already in progress for this caller")]
    OperationInProgress,

    #[error("A payout in asset {0} is still pending; call retry_payout first")]
    PayoutPending(Principal),

    // Collaborator
    #[error("Transfer failed: {0}")]
    TransferFailed(String),
}

/// Coarse classification used by callers to decide whether a retry can help.
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    Collaborator,
}

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::ZeroAmount
            | PoolError::EmptyBetList
            | PoolError::TooManyBets { .. }
            | PoolError::InvalidBet { .. }
            | PoolError::DataTooLarge { .. }
            | PoolError::WordCountMismatch { .. }
            | PoolError::DepositTooSmall { .. }
            | PoolError::WithdrawalTooSmall { .. }
            | PoolError::InvalidOwner
            | PoolError::AnonymousCaller
            | PoolError::InvalidRecipient => ErrorKind::Validation,

            PoolError::UnknownOperator(_)
            | PoolError::UnknownAsset(_)
            | PoolError::UnknownRequest(_)
            | PoolError::NoResponseYet(_)
            | PoolError::NoPendingPayout(_) => ErrorKind::NotFound,

            PoolError::AlreadyFulfilled(_)
            | PoolError::InsufficientShares { .. }
            | PoolError::InsufficientPoolBalance { .. }
            | PoolError::NotOperatorOwner(_)
            | PoolError::UnauthorizedOracle
            | PoolError::OperationInProgress
            | PoolError::PayoutPending(_) => ErrorKind::StateConflict,

            PoolError::TransferFailed(_) => ErrorKind::Collaborator,
        }
    }

    pub(crate) fn transfer_failed(msg: &str) -> Self {
        PoolError::TransferFailed(sanitize_error(msg))
    }
}
