//! Unit tests for call encoding
//!
//! These tests verify how intended calls become account call data:
//! - Single calls through `execute`
//! - Batches through a delegatecall to MultiSend
//! - Self calls passed through unchanged

use alloy_primitives::{Address, Bytes, U256, address};
use alloy_sol_types::SolCall;
use kernel_account_core::calls::{Call, CallKind, decode_calls, encode_calls, encode_multi_send};
use kernel_account_core::config::MULTI_SEND;
use kernel_account_core::contracts::{IKernel, IMultiSend};
use kernel_account_core::Error;

const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
const TOKEN: Address = address!("2222222222222222222222222222222222222222");
const VAULT: Address = address!("3333333333333333333333333333333333333333");

fn batch() -> Vec<Call> {
    vec![
        Call::new(TOKEN, U256::ZERO, vec![0xa9, 0x05, 0x9c, 0xbb, 0x01]),
        Call::new(VAULT, U256::from(5), vec![0xd0, 0xe3, 0x0d, 0xb0]),
        Call::new(TOKEN, U256::ZERO, vec![0x09, 0x5e, 0xa7, 0xb3, 0x02, 0x03]),
    ]
}

// ============================================================================
// Single Call Tests
// ============================================================================

#[test]
fn test_single_call_uses_execute() {
    let call = Call::new(TOKEN, U256::from(7), vec![0xde, 0xad]);
    let data = encode_calls(ACCOUNT, MULTI_SEND, &[call.clone()]).unwrap();

    assert_eq!(&data[..4], &[0x51, 0x94, 0x54, 0x47]);
    let decoded = IKernel::executeCall::abi_decode(&data).unwrap();
    assert_eq!(decoded.to, TOKEN);
    assert_eq!(decoded.value, U256::from(7));
    assert_eq!(decoded.data, call.data);
    assert_eq!(decoded.operation, 0);
}

#[test]
fn test_single_delegatecall_operation_byte() {
    let data = encode_calls(ACCOUNT, MULTI_SEND, &[Call::delegate(VAULT, vec![0x01])]).unwrap();
    let decoded = IKernel::executeCall::abi_decode(&data).unwrap();
    assert_eq!(decoded.operation, 1);
}

#[test]
fn test_self_call_passes_through() {
    let inner = Bytes::from(vec![0x12, 0x34, 0x56, 0x78]);
    let data = encode_calls(ACCOUNT, MULTI_SEND, &[Call::new(ACCOUNT, U256::ZERO, inner.clone())]).unwrap();
    assert_eq!(data, inner);
}

#[test]
fn test_self_delegatecall_is_wrapped() {
    let inner = Bytes::from(vec![0x12, 0x34, 0x56, 0x78]);
    let data = encode_calls(ACCOUNT, MULTI_SEND, &[Call::delegate(ACCOUNT, inner.clone())]).unwrap();

    assert_ne!(data, inner);
    let decoded = IKernel::executeCall::abi_decode(&data).unwrap();
    assert_eq!(decoded.to, ACCOUNT);
    assert_eq!(decoded.data, inner);
    assert_eq!(decoded.operation, 1);

    let calls = decode_calls(ACCOUNT, MULTI_SEND, &data).unwrap();
    assert_eq!(calls, vec![Call::delegate(ACCOUNT, inner)]);
}

#[test]
fn test_empty_batch_rejected() {
    let err = encode_calls(ACCOUNT, MULTI_SEND, &[]).unwrap_err();
    assert!(matches!(err, Error::InvalidCallKind(_)));
}

#[test]
fn test_unknown_operation_rejected() {
    assert!(matches!(CallKind::try_from(2), Err(Error::InvalidCallKind(_))));
    assert_eq!(CallKind::try_from(1).unwrap(), CallKind::DelegateCall);
}

// ============================================================================
// Batch Tests
// ============================================================================

#[test]
fn test_batch_delegates_to_multi_send() {
    let data = encode_calls(ACCOUNT, MULTI_SEND, &batch()).unwrap();
    let execute = IKernel::executeCall::abi_decode(&data).unwrap();

    assert_eq!(execute.to, MULTI_SEND);
    assert_eq!(execute.value, U256::ZERO);
    assert_eq!(execute.operation, 1);

    let inner = IMultiSend::multiSendCall::abi_decode(&execute.data).unwrap();
    assert_eq!(inner.transactions, encode_multi_send(&batch()));
}

#[test]
fn test_batch_preserves_order() {
    let data = encode_calls(ACCOUNT, MULTI_SEND, &batch()).unwrap();
    let decoded = decode_calls(ACCOUNT, MULTI_SEND, &data).unwrap();
    assert_eq!(decoded, batch());
}

#[test]
fn test_multi_send_packing() {
    let packed = encode_multi_send(&batch()[..1]);
    assert_eq!(packed.len(), 1 + 20 + 32 + 32 + 5);
    assert_eq!(packed[0], 0);
    assert_eq!(&packed[1..21], TOKEN.as_slice());
    assert_eq!(packed[84], 5);
    assert_eq!(&packed[85..], &[0xa9, 0x05, 0x9c, 0xbb, 0x01]);
}

#[test]
fn test_encoding_is_idempotent() {
    let a = encode_calls(ACCOUNT, MULTI_SEND, &batch()).unwrap();
    let b = encode_calls(ACCOUNT, MULTI_SEND, &batch()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_decode_raw_call_data_targets_account() {
    let decoded = decode_calls(ACCOUNT, MULTI_SEND, &[0xaa, 0xbb, 0xcc, 0xdd]).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].to, ACCOUNT);
}
