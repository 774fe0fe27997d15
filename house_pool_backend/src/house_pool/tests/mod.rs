mod request_lifecycle;
mod stress_tests;

use candid::{Nat, Principal};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::transfer::{AssetTransfer, PushError};

pub fn principal(n: u8) -> Principal {
    Principal::from_slice(&[n; 10])
}

pub fn asset() -> Principal {
    Principal::from_slice(&[200; 10])
}

pub fn nat(n: u64) -> Nat {
    Nat::from(n)
}

/// In-memory token ledger standing in for the ICRC ledgers.
///
/// Tracks balances per (asset, holder). The canister's own holdings live
/// under `canister()`.
pub struct MockLedger {
    balances: RefCell<HashMap<(Principal, Principal), Nat>>,
    // Pushes that landed, by (asset, recipient, created_at)
    delivered: RefCell<HashSet<(Principal, Principal, u64)>>,
    pub fail_pull: Cell<bool>,
    /// Push is rejected and nothing moves.
    pub fail_push: Cell<bool>,
    /// Push times out before reaching the ledger: nothing moves, outcome unknown.
    pub stall_push: Cell<bool>,
    /// Push lands but its reply is lost.
    pub lose_push_reply: Cell<bool>,
    /// Runs in the middle of a pull, after funds arrive and before the
    /// pull returns. Models other messages interleaving at the await.
    pub during_pull: RefCell<Option<Box<dyn Fn()>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            balances: RefCell::new(HashMap::new()),
            delivered: RefCell::new(HashSet::new()),
            fail_pull: Cell::new(false),
            fail_push: Cell::new(false),
            stall_push: Cell::new(false),
            lose_push_reply: Cell::new(false),
            during_pull: RefCell::new(None),
        }
    }

    pub fn canister() -> Principal {
        principal(255)
    }

    pub fn mint(&self, asset: Principal, holder: Principal, amount: u64) {
        let current = self.balance_of(asset, holder);
        self.balances.borrow_mut().insert((asset, holder), current + Nat::from(amount));
    }

    pub fn balance_of(&self, asset: Principal, holder: Principal) -> Nat {
        self.balances.borrow().get(&(asset, holder)).cloned().unwrap_or_else(|| Nat::from(0u64))
    }

    fn move_funds(&self, asset: Principal, from: Principal, to: Principal, amount: &Nat) -> Result<(), String> {
        let from_balance = self.balance_of(asset, from);
        if &from_balance < amount {
            return Err(format!("InsufficientFunds {{ balance: {} }}", from_balance));
        }
        let to_balance = self.balance_of(asset, to);
        let mut balances = self.balances.borrow_mut();
        balances.insert((asset, from), from_balance - amount.clone());
        balances.insert((asset, to), to_balance + amount.clone());
        Ok(())
    }
}

impl AssetTransfer for MockLedger {
    async fn pull(&self, asset: Principal, from: Principal, amount: Nat) -> Result<(), String> {
        if self.fail_pull.get() {
            return Err("InsufficientAllowance { allowance: 0 }".to_string());
        }
        self.move_funds(asset, from, Self::canister(), &amount)?;
        if let Some(hook) = self.during_pull.borrow().as_ref() {
            hook();
        }
        Ok(())
    }

    async fn push(&self, asset: Principal, to: Principal, amount: Nat, created_at: u64) -> Result<(), PushError> {
        if self.fail_push.get() {
            return Err(PushError::Definite("TemporarilyUnavailable".to_string()));
        }
        if self.stall_push.get() {
            return Err(PushError::Uncertain("SysUnknown: deadline expired".to_string()));
        }
        // Duplicate of a push that already landed
        if self.delivered.borrow().contains(&(asset, to, created_at)) {
            return Ok(());
        }
        self.move_funds(asset, Self::canister(), to, &amount).map_err(PushError::Definite)?;
        self.delivered.borrow_mut().insert((asset, to, created_at));
        if self.lose_push_reply.get() {
            return Err(PushError::Uncertain("Decode failed: reply lost".to_string()));
        }
        Ok(())
    }
}
