//! Fuzz tests for encoders and decoders
//!
//! Decoders see bytes from bundlers, approvals and other accounts. They must
//! reject malformed input with an error, never panic.

use alloy_primitives::{Address, B256, Bytes, U256, address};
use kernel_account_core::calls::{Call, CallKind, decode_calls, decode_multi_send, encode_calls};
use kernel_account_core::multichain::{MultiChainBatch, MultiChainLeaf, MultiChainProof};
use kernel_account_core::predeploy::unwrap_signature;
use kernel_account_core::types::keccak256;
use kernel_account_core::validator::{EnableSignature, ValidatorMode};
use proptest::prelude::*;
use std::collections::HashSet;

const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
const MULTI_SEND: Address = address!("3333333333333333333333333333333333333333");

// ============================================================================
// Strategies
// ============================================================================

/// Random bytes, sometimes carrying a mode prefix so decoders get past the
/// first check
fn signature_strategy() -> impl Strategy<Value = Vec<u8>> {
    (
        prop_oneof![
            Just(None),
            Just(Some(ValidatorMode::Sudo)),
            Just(Some(ValidatorMode::Enable)),
        ],
        prop::collection::vec(any::<u8>(), 0..400),
    )
        .prop_map(|(mode, body)| match mode {
            Some(mode) => mode.wrap(&body).to_vec(),
            None => body,
        })
}

/// Call to a target that is neither the account nor the batch helper
fn call_strategy() -> impl Strategy<Value = Call> {
    (
        any::<[u8; 20]>(),
        any::<u64>(),
        prop::collection::vec(any::<u8>(), 0..80),
        any::<bool>(),
    )
        .prop_map(|(mut to, value, data, delegate)| {
            to[0] = 0xaa;
            Call {
                to: Address::from(to),
                value: U256::from(value),
                data: Bytes::from(data),
                kind: if delegate {
                    CallKind::DelegateCall
                } else {
                    CallKind::Call
                },
            }
        })
}

// ============================================================================
// Decoders never panic
// ============================================================================

proptest! {
    #[test]
    fn fuzz_decode_multi_send(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
        let _ = decode_multi_send(&bytes);
    }

    #[test]
    fn fuzz_decode_calls(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
        let _ = decode_calls(ACCOUNT, MULTI_SEND, &bytes);
    }

    #[test]
    fn fuzz_decode_enable_signature(signature in signature_strategy(), selector in any::<[u8; 4]>()) {
        let _ = EnableSignature::decode(&signature, selector);
    }

    #[test]
    fn fuzz_decode_multichain_proof(signature in signature_strategy()) {
        let _ = MultiChainProof::from_signature(&signature);
        let _ = MultiChainProof::decode(&signature);
    }

    #[test]
    fn fuzz_unwrap_predeploy(bytes in prop::collection::vec(any::<u8>(), 0..300), magic in any::<bool>()) {
        let mut bytes = bytes;
        if magic {
            bytes.extend_from_slice(&[0x64, 0x92].repeat(16));
        }
        let _ = unwrap_signature(&bytes);
    }
}

// ============================================================================
// Encoder properties
// ============================================================================

proptest! {
    #[test]
    fn fuzz_batch_decodes_to_original(calls in prop::collection::vec(call_strategy(), 1..8)) {
        let encoded = encode_calls(ACCOUNT, MULTI_SEND, &calls).unwrap();
        let decoded = decode_calls(ACCOUNT, MULTI_SEND, &encoded).unwrap();
        prop_assert_eq!(decoded, calls);
    }

    #[test]
    fn fuzz_every_proof_reaches_root(chains in prop::collection::hash_set(1u64..1_000_000, 1..16)) {
        let leaves: Vec<MultiChainLeaf> = chains
            .iter()
            .map(|&chain_id| MultiChainLeaf::new(chain_id, keccak256(&chain_id.to_le_bytes())))
            .collect();
        let batch = MultiChainBatch::new(leaves.clone()).unwrap();

        let mut roots = HashSet::new();
        for (index, leaf) in leaves.iter().enumerate() {
            let proof = batch.proof(index, Bytes::new()).unwrap();
            prop_assert_eq!(proof.compute_root(leaf), batch.root());
            roots.insert(proof.root);
        }
        prop_assert_eq!(roots.len(), 1);
    }

    #[test]
    fn fuzz_proof_rejects_foreign_leaf(chain_id in 1u64..1_000_000, other in any::<[u8; 32]>()) {
        let leaves = vec![
            MultiChainLeaf::new(chain_id, keccak256(b"a")),
            MultiChainLeaf::new(chain_id + 1, keccak256(b"b")),
        ];
        let batch = MultiChainBatch::new(leaves).unwrap();
        let proof = batch.proof(0, Bytes::new()).unwrap();

        let foreign = MultiChainLeaf::new(chain_id, B256::from(other));
        prop_assume!(foreign.user_op_hash != keccak256(b"a"));
        prop_assert_ne!(proof.compute_root(&foreign), batch.root());
    }
}
