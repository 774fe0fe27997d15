use candid::{CandidType, Deserialize, Principal};
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{StableCell, Storable};
use serde::Serialize;
use std::borrow::Cow;
use std::cell::RefCell;

use crate::types::{DEFAULT_MAX_BETS_PER_REQUEST, DEFAULT_MAX_DATA_BYTES, DEFAULT_MAX_PARAMS_PER_BET};
use crate::{Memory, MEMORY_MANAGER};
use super::audit::{log_audit, AuditEvent};
use super::capacity::CapacityPolicy;
use super::memory_ids::CONFIG_MEMORY_ID;

/// Canister configuration, persisted across upgrades.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HousePoolConfig {
    pub capacity_policy: CapacityPolicy,
    /// When set, only this principal may fulfill requests.
    pub oracle: Option<Principal>,
    pub max_bets_per_request: u32,
    pub max_params_per_bet: u32,
    pub max_data_bytes: u32,
}

impl Default for HousePoolConfig {
    fn default() -> Self {
        Self {
            capacity_policy: CapacityPolicy::Unrestricted,
            oracle: None,
            max_bets_per_request: DEFAULT_MAX_BETS_PER_REQUEST,
            max_params_per_bet: DEFAULT_MAX_PARAMS_PER_BET,
            max_data_bytes: DEFAULT_MAX_DATA_BYTES,
        }
    }
}

impl Storable for HousePoolConfig {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        let serialized = serde_json::to_vec(self)
            .expect("CRITICAL: Failed to encode HousePoolConfig.");
        Cow::Owned(serialized)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        serde_json::from_slice(&bytes)
            .expect("CRITICAL: Failed to decode HousePoolConfig from stable storage.")
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 1000,
        is_fixed_size: false,
    };
}

/// Install/upgrade arguments. Every field is optional; unset fields keep
/// their current (or default) value.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default)]
pub struct InitArgs {
    pub capacity_policy: Option<CapacityPolicy>,
    pub oracle: Option<Principal>,
    pub max_bets_per_request: Option<u32>,
    pub max_params_per_bet: Option<u32>,
    pub max_data_bytes: Option<u32>,
}

impl InitArgs {
    fn apply_to(self, mut config: HousePoolConfig) -> HousePoolConfig {
        if let Some(policy) = self.capacity_policy {
            config.capacity_policy = policy;
        }
        if self.oracle.is_some() {
            config.oracle = self.oracle;
        }
        if let Some(max) = self.max_bets_per_request {
            config.max_bets_per_request = max;
        }
        if let Some(max) = self.max_params_per_bet {
            config.max_params_per_bet = max;
        }
        if let Some(max) = self.max_data_bytes {
            config.max_data_bytes = max;
        }
        config
    }
}

thread_local! {
    static CONFIG: RefCell<StableCell<HousePoolConfig, Memory>> = RefCell::new(
        StableCell::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(CONFIG_MEMORY_ID))),
            HousePoolConfig::default(),
        )
    );
}

pub fn get_config() -> HousePoolConfig {
    CONFIG.with(|c| c.borrow().get().clone())
}

pub fn set_config(config: HousePoolConfig) {
    CONFIG.with(|c| {
        c.borrow_mut().set(config.clone());
    });
    log_audit(AuditEvent::ConfigUpdated {
        capacity_policy: config.capacity_policy,
        oracle: config.oracle,
    });
}

pub fn init_config(args: Option<InitArgs>) {
    let config = args.unwrap_or_default().apply_to(HousePoolConfig::default());
    set_config(config);
}

pub fn apply_upgrade_args(args: InitArgs) {
    let config = args.apply_to(get_config());
    set_config(config);
}
