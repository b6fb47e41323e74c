//! Unit tests for multi-chain Merkle commitments

use alloy_primitives::{B256, Bytes};
use kernel_account_core::config::ECDSA_VALIDATOR;
use kernel_account_core::multichain::{MultiChainBatch, MultiChainLeaf, MultiChainProof};
use kernel_account_core::signer::{LocalSigner, Signer};
use kernel_account_core::types::keccak256;
use kernel_account_core::validator::EcdsaValidator;
use kernel_account_core::Error;
use std::sync::Arc;

const SEPOLIA: u64 = 11155111;
const OP_SEPOLIA: u64 = 11155420;

fn h(tag: &[u8]) -> B256 {
    keccak256(tag)
}

#[tokio::test]
async fn test_two_chain_batch_shares_root() {
    let owner = Arc::new(LocalSigner::random());
    let validator = EcdsaValidator::new(ECDSA_VALIDATOR, owner.clone());

    let leaves = vec![
        MultiChainLeaf::new(SEPOLIA, h(b"h1")),
        MultiChainLeaf::new(OP_SEPOLIA, h(b"h2")),
    ];
    let batch = MultiChainBatch::new(leaves.clone()).unwrap();
    let proofs = batch.sign(&validator).await.unwrap();

    assert_eq!(proofs.len(), 2);
    assert_eq!(proofs[0].root, proofs[1].root);
    assert_eq!(proofs[0].root_signature, proofs[1].root_signature);

    for (leaf, proof) in leaves.iter().zip(&proofs) {
        assert_eq!(proof.compute_root(leaf), batch.root());
        assert!(proof.verify(leaf, owner.address()));
    }
}

#[test]
fn test_leaf_hash_layout() {
    let leaf = MultiChainLeaf::new(1, B256::repeat_byte(0xaa));
    let mut buf = [0u8; 64];
    buf[31] = 1;
    buf[32..].copy_from_slice(&[0xaa; 32]);
    assert_eq!(leaf.hash(), keccak256(&buf));
}

#[test]
fn test_duplicate_chain_rejected() {
    let err = MultiChainBatch::new(vec![
        MultiChainLeaf::new(SEPOLIA, h(b"h1")),
        MultiChainLeaf::new(SEPOLIA, h(b"h2")),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateChainInBatch(SEPOLIA)));
}

#[tokio::test]
async fn test_tampered_proof_fails() {
    let owner = Arc::new(LocalSigner::random());
    let validator = EcdsaValidator::new(ECDSA_VALIDATOR, owner.clone());
    let leaves = vec![
        MultiChainLeaf::new(1, h(b"a")),
        MultiChainLeaf::new(10, h(b"b")),
        MultiChainLeaf::new(137, h(b"c")),
    ];
    let proofs = MultiChainBatch::new(leaves.clone())
        .unwrap()
        .sign(&validator)
        .await
        .unwrap();

    // wrong leaf
    assert!(!proofs[0].verify(&MultiChainLeaf::new(1, h(b"x")), owner.address()));

    // wrong path
    let mut tampered = proofs[1].clone();
    tampered.sibling_path[0] = B256::ZERO;
    assert!(!tampered.verify(&leaves[1], owner.address()));

    // wrong signer
    assert!(!proofs[2].verify(&leaves[2], LocalSigner::random().address()));
}

#[test]
fn test_decode_rejects_truncated() {
    assert!(matches!(
        MultiChainProof::decode(&[0u8; 96]),
        Err(Error::Encoding(_))
    ));

    let proof = MultiChainProof {
        root: B256::ZERO,
        root_signature: Bytes::from(vec![0u8; 64]),
        leaf_index: 0,
        sibling_path: vec![],
    };
    assert!(proof.encode().is_err());
}
