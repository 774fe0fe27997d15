// Nat arithmetic helpers for share accounting.
// Every division rounds down; callers rely on that to keep rounding in the pool's favour.
use candid::Nat;
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::borrow::Cow;

pub fn nat_zero() -> Nat {
    Nat::from(0u64)
}

pub fn nat_is_zero(n: &Nat) -> bool {
    n.0.is_zero()
}

// Integer division - ALWAYS ROUNDS DOWN
pub fn nat_divide(numerator: &Nat, denominator: &Nat) -> Option<Nat> {
    if nat_is_zero(denominator) {
        return None;
    }
    Some(Nat(&numerator.0 / &denominator.0))
}

/// `floor(a * b / c)`, or `None` when `c` is zero.
pub fn nat_mul_div(a: &Nat, b: &Nat, c: &Nat) -> Option<Nat> {
    nat_divide(&Nat(&a.0 * &b.0), c)
}

pub fn nat_add(n1: &Nat, n2: &Nat) -> Nat {
    Nat(&n1.0 + &n2.0)
}

// Safe subtraction - returns None if would underflow
pub fn nat_subtract(n1: &Nat, n2: &Nat) -> Option<Nat> {
    if n1 < n2 {
        None
    } else {
        Some(Nat(&n1.0 - &n2.0))
    }
}

pub fn nat_sum<'a, I: IntoIterator<Item = &'a Nat>>(values: I) -> Nat {
    values.into_iter().fold(nat_zero(), |acc, v| nat_add(&acc, v))
}

// Convert Nat to u64 - returns None if too large
pub fn nat_to_u64(n: &Nat) -> Option<u64> {
    n.0.to_u64()
}

// =============================================================================
// STORABLE WRAPPER FOR NAT
// =============================================================================

/// Wrapper for Nat that implements Storable for ic-stable-structures
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct StorableNat(pub Nat);

impl From<Nat> for StorableNat {
    fn from(n: Nat) -> Self {
        StorableNat(n)
    }
}

impl From<StorableNat> for Nat {
    fn from(s: StorableNat) -> Self {
        s.0
    }
}

impl Storable for StorableNat {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        // Length-prefixed big-endian magnitude
        let bytes = self.0 .0.to_bytes_be();
        let len = bytes.len() as u32;
        let mut result = len.to_be_bytes().to_vec();
        result.extend_from_slice(&bytes);
        Cow::Owned(result)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<'_, [u8]>) -> Self {
        if bytes.len() < 4 {
            panic!("CRITICAL: StorableNat has invalid byte length < 4");
        }
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if bytes.len() < 4 + len {
            panic!(
                "CRITICAL: StorableNat expected {} bytes but got {}",
                4 + len,
                bytes.len()
            );
        }
        StorableNat(Nat(BigUint::from_bytes_be(&bytes[4..4 + len])))
    }

    const BOUND: Bound = Bound::Unbounded;
}
