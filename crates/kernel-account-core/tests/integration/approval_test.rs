//! Integration tests for session key approvals
//!
//! The owner approves a session key offline; a different process holding only
//! the session key rebuilds the account from the serialized approval and
//! signs within the approved policies.

use alloy_primitives::{Address, U256, address, b256};
use kernel_account_core::approval::{
    Approval, ApprovalOptions, create_approval, deserialize_approval, serialize_approval,
};
use kernel_account_core::chain::{MemoryBundler, MemoryChain};
use kernel_account_core::policy::{CallPermission, Policy, PolicySet};
use kernel_account_core::signer::{LocalSigner, Signer};
use kernel_account_core::types::{is_signed_by, keccak256};
use kernel_account_core::validator::{EnableSignature, ValidatorMode};
use kernel_account_core::{AccountConfig, Call, Error, KernelAccount};
use std::sync::Arc;

const TOKEN: Address = address!("2222222222222222222222222222222222222222");

fn config() -> AccountConfig {
    AccountConfig::kernel_v2(
        8453,
        b256!("4444444444444444444444444444444444444444444444444444444444444444"),
    )
    .with_permission_validator(address!("5555555555555555555555555555555555555555"))
}

fn policies() -> PolicySet {
    PolicySet::new()
        .with(Policy::call(vec![
            CallPermission::new(TOKEN).with_selector([0xa9, 0x05, 0x9c, 0xbb]),
        ]))
        .with(Policy::value_limit(U256::ZERO))
}

async fn issue(session_key: Address) -> (KernelAccount, Approval) {
    let chain = MemoryChain::new(8453);
    let owner = Arc::new(LocalSigner::random());
    let account = KernelAccount::new(config(), owner, U256::from(3), Arc::new(chain)).unwrap();
    let approval = create_approval(&account, session_key, policies(), ApprovalOptions::default())
        .await
        .unwrap();
    (account, approval)
}

// ============================================================================
// Round Trip
// ============================================================================

#[tokio::test]
async fn test_redeemed_account_signs_with_session_key() {
    let session = Arc::new(LocalSigner::random());
    let (original, approval) = issue(session.address()).await;
    let serialized = serialize_approval(&approval).unwrap();

    // Session holder side: fresh chain client, no owner key
    let chain = MemoryChain::new(8453);
    let bundler = MemoryBundler::attached(chain.clone());
    let account = deserialize_approval(&serialized, session.clone(), Arc::new(chain)).unwrap();

    assert_eq!(account.address(), original.address());
    assert_eq!(account.owner(), original.owner());
    assert_eq!(
        account.plugins().regular().map(|v| v.address()),
        Some(approval.validator)
    );

    let transfer = Call::new(TOKEN, U256::ZERO, vec![0xa9, 0x05, 0x9c, 0xbb, 0x00]);
    account
        .send_user_operation(&[transfer], &bundler, None)
        .await
        .unwrap();

    let op = bundler.submitted()[0].clone();
    assert_eq!(ValidatorMode::from_signature(&op.signature), Some(ValidatorMode::Enable));
    let enable = EnableSignature::decode(&op.signature, approval.enable_data.selector.0).unwrap();
    assert_eq!(enable.enable_data, approval.enable_data);
    assert_eq!(enable.enable_signature, approval.enable_signature);

    let hash = account.user_operation_hash(&op);
    assert!(is_signed_by(&hash, &enable.signature, session.address()));
    assert!(!is_signed_by(&hash, &enable.signature, original.owner()));
}

#[tokio::test]
async fn test_redeemed_account_enforces_policies() {
    let session = Arc::new(LocalSigner::random());
    let (_, approval) = issue(session.address()).await;

    let chain = MemoryChain::new(8453);
    let bundler = MemoryBundler::attached(chain.clone());
    let account =
        deserialize_approval(&approval.to_serialized().unwrap(), session, Arc::new(chain)).unwrap();

    let with_value = Call::new(TOKEN, U256::from(1), vec![0xa9, 0x05, 0x9c, 0xbb]);
    let err = account
        .send_user_operation(&[with_value], &bundler, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PolicyViolation(_)));
}

#[tokio::test]
async fn test_redeemed_account_cannot_sign_as_owner() {
    let session = Arc::new(LocalSigner::random());
    let (_, approval) = issue(session.address()).await;
    let account = deserialize_approval(
        &approval.to_serialized().unwrap(),
        session,
        Arc::new(MemoryChain::new(8453)),
    )
    .unwrap();

    let err = account.sign_hash(&keccak256(b"message")).await.unwrap_err();
    assert!(matches!(err, Error::SigningRefused(_)));
}

#[tokio::test]
async fn test_expiry_is_carried_not_enforced() {
    let session = Arc::new(LocalSigner::random());
    let chain = MemoryChain::new(8453);
    let account = KernelAccount::new(
        config(),
        Arc::new(LocalSigner::random()),
        U256::ZERO,
        Arc::new(chain.clone()),
    )
    .unwrap();

    let options = ApprovalOptions {
        valid_after: 1,
        valid_until: 2,
        ..ApprovalOptions::default()
    };
    let approval = create_approval(&account, session.address(), policies(), options)
        .await
        .unwrap();
    assert_eq!(approval.enable_data.valid_until, 2);

    let redeemed =
        deserialize_approval(&approval.to_serialized().unwrap(), session, Arc::new(chain)).unwrap();
    assert_eq!(redeemed.plugins().enable_data().map(|d| d.valid_until), Some(2));
}

// ============================================================================
// Mismatches
// ============================================================================

#[tokio::test]
async fn test_wrong_chain_rejected() {
    let session = Arc::new(LocalSigner::random());
    let (_, approval) = issue(session.address()).await;
    let err = deserialize_approval(
        &approval.to_serialized().unwrap(),
        session,
        Arc::new(MemoryChain::new(1)),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ApprovalMismatch(_)));
}

#[tokio::test]
async fn test_tampered_fields_rejected() {
    let session = Arc::new(LocalSigner::random());
    let (_, approval) = issue(session.address()).await;

    let mut wrong_account = approval.clone();
    wrong_account.account = Address::repeat_byte(0x55);

    let mut wrong_policies = approval.clone();
    wrong_policies.policies = PolicySet::sudo();

    let mut wrong_owner = approval.clone();
    wrong_owner.owner = LocalSigner::random().address();

    let mut wrong_signature = approval.clone();
    let reversed: Vec<u8> = wrong_signature.enable_signature.iter().rev().copied().collect();
    wrong_signature.enable_signature = reversed.into();

    let mut wrong_validator = approval.clone();
    wrong_validator.validator = Address::repeat_byte(0x66);

    for tampered in [
        wrong_account,
        wrong_policies,
        wrong_owner,
        wrong_signature,
        wrong_validator,
    ] {
        let err = deserialize_approval(
            &tampered.to_serialized().unwrap(),
            session.clone(),
            Arc::new(MemoryChain::new(8453)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ApprovalMismatch(_)), "{:?}", err);
    }
}

#[test]
fn test_garbage_rejected() {
    assert!(matches!(
        Approval::from_serialized("not base64!"),
        Err(Error::Deserialization(_))
    ));
}
