//! Unit tests for session key policies
//!
//! These tests verify policy composition:
//! - Sudo approves everything
//! - An empty set denies everything
//! - Policies are a conjunction evaluated in insertion order

use alloy_primitives::{Address, U256, address};
use kernel_account_core::calls::Call;
use kernel_account_core::policy::{CallPermission, Policy, PolicyDecision, PolicySet};

const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
const TOKEN: Address = address!("2222222222222222222222222222222222222222");
const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

fn transfer(value: u64) -> Call {
    Call::new(TOKEN, U256::from(value), TRANSFER.to_vec())
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_sudo_alone_allows_anything() {
    let set = PolicySet::sudo();
    let calls = [
        transfer(0),
        Call::new(ACCOUNT, U256::MAX, vec![]),
        Call::delegate(Address::ZERO, vec![0xff; 100]),
    ];
    assert_eq!(set.evaluate(ACCOUNT, &calls), PolicyDecision::Approve);
    assert_eq!(set.evaluate(ACCOUNT, &[]), PolicyDecision::Approve);
}

#[test]
fn test_empty_set_is_deny_all() {
    let set = PolicySet::new();
    assert!(set.is_empty());
    assert!(matches!(
        set.evaluate(ACCOUNT, &[transfer(0)]),
        PolicyDecision::Reject { .. }
    ));
}

// ============================================================================
// Call Permissions
// ============================================================================

#[test]
fn test_value_cap_per_permission() {
    let set = PolicySet::new().with(Policy::call(vec![
        CallPermission::new(TOKEN)
            .with_selector(TRANSFER)
            .with_max_value(U256::from(10)),
    ]));
    assert!(set.evaluate(ACCOUNT, &[transfer(10)]).is_approved());
    assert!(!set.evaluate(ACCOUNT, &[transfer(11)]).is_approved());
}

#[test]
fn test_every_call_must_match() {
    let set = PolicySet::new().with(Policy::call(vec![CallPermission::new(TOKEN)]));
    let calls = [transfer(0), Call::new(ACCOUNT, U256::ZERO, vec![])];
    match set.evaluate(ACCOUNT, &calls) {
        PolicyDecision::Reject { reason } => assert!(reason.contains("Call 1")),
        PolicyDecision::Approve => panic!("second call should be rejected"),
    }
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_first_rejection_is_reported() {
    let set = PolicySet::new()
        .with(Policy::value_limit(U256::from(1)))
        .with(Policy::call(vec![]));

    match set.evaluate(ACCOUNT, &[transfer(5)]) {
        PolicyDecision::Reject { reason } => assert!(reason.contains("exceeds limit")),
        PolicyDecision::Approve => panic!("value limit should reject"),
    }
}

#[test]
fn test_descriptors_follow_insertion_order() {
    let set = PolicySet::new()
        .with(Policy::value_limit(U256::from(1)))
        .with(Policy::Sudo);
    let descriptors = set.descriptors();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0][0], 0x02);
    assert_eq!(descriptors[1][0], 0x00);
}
