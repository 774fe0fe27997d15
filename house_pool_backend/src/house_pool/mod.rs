pub mod audit;
pub mod capacity;
pub mod config;
pub mod error;
pub mod facade;
pub mod guard;
pub mod ledger;
pub mod memory_ids;
pub mod nat_helpers;
pub mod operators;
pub mod payouts;
pub mod query;
pub mod requests;
pub mod responses;
pub mod transfer;
pub mod types;

pub use audit::{AuditEntry, AuditEvent};
pub use capacity::{CapacityCheck, CapacityPolicy};
pub use config::{HousePoolConfig, InitArgs};
pub use error::{ErrorKind, PoolError};
pub use payouts::{PayoutKind, PendingPayout};
pub use transfer::{AssetTransfer, PushError};
pub use types::{
    Bet, LPPosition, OperatorRecord, Pool, PoolStats, Request, RequestAux, RequestParams,
    RequestStatus, ResponseRecord,
};

#[cfg(test)]
mod tests;
