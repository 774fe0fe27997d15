use proptest::prelude::*;
use super::Operation;

// Providers 1-8 (250 is the seed holder)
pub fn user_id() -> impl Strategy<Value = u8> {
    1..=8u8
}

// Mix of dust, ordinary and whale deposits
pub fn deposit_amount() -> impl Strategy<Value = u64> {
    prop_oneof![
        1 => (1..100u64),
        6 => (100..1_000_000u64),
        1 => (1_000_000..1_000_000_000_000u64),
    ]
}

pub fn withdraw_bps() -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => (1..=10_000u64),
        1 => Just(10_000u64), // full exit
    ]
}

pub fn stakes() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(1..10_000u64, 1..5)
}

pub fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        5 => (user_id(), deposit_amount()).prop_map(|(user, amount)| Operation::Deposit { user, amount }),
        3 => (user_id(), withdraw_bps()).prop_map(|(user, bps)| Operation::Withdraw { user, bps }),
        2 => (user_id(), stakes()).prop_map(|(user, stakes)| Operation::Submit { user, stakes }),
        2 => any::<usize>().prop_map(|pick| Operation::Fulfill { pick }),
        1 => (user_id(), user_id(), withdraw_bps())
            .prop_map(|(from, to, bps)| Operation::TransferShares { from, to, bps }),
    ]
}

pub fn operation_sequence(len: usize) -> impl Strategy<Value = Vec<Operation>> {
    proptest::collection::vec(operation(), len)
}

// Starting (balance, shares) with a share price between 1 and ~1000
pub fn seeded_pool() -> impl Strategy<Value = (u64, u64)> {
    (1..1_000_000u64).prop_flat_map(|shares| (shares..shares.saturating_mul(1000), Just(shares)))
}
