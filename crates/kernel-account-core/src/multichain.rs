//! # Multi-Chain Signing
//!
//! Signs one user operation per chain with a single signature. The operation
//! hashes are committed to a Merkle tree, the owner signs the root once
//! (EIP-191), and each chain receives the root signature together with the
//! path proving its own operation is in the tree.
//!
//! - leaf: `keccak256(uint256(chainId) || userOpHash)`
//! - node: `keccak256(left || right)`, position decided by the index bit
//! - an odd level duplicates its last node
//! - a single leaf is its own root with an empty path
//!
//! Leaves are sorted by chain id (then hash) before building the tree so the
//! root does not depend on the order the caller supplied them in.
//!
//! Wire format (after the sudo mode prefix):
//! `rootSignature(65) || root(32) || abi.encode(uint256 leafIndex, bytes32[] path)`
//!
//! Multi-chain signing is sudo-only: the root is signed by the account's sudo
//! validator and every signature carries the sudo prefix. Plugin and enable
//! modes are not supported.

use crate::account::UserOperation;
use crate::types::{SIGNATURE_LENGTH, is_signed_by, keccak256};
use crate::validator::{Validator, ValidatorMode};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// One operation hash on one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiChainLeaf {
    pub chain_id: u64,
    pub user_op_hash: B256,
}

impl MultiChainLeaf {
    pub fn new(chain_id: u64, user_op_hash: B256) -> Self {
        Self {
            chain_id,
            user_op_hash,
        }
    }

    /// Leaf hash committed in the tree
    pub fn hash(&self) -> B256 {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf[32..].copy_from_slice(self.user_op_hash.as_slice());
        keccak256(&buf)
    }
}

fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(&buf)
}

/// Per-chain proof of membership plus the shared root signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiChainProof {
    pub root: B256,
    pub root_signature: Bytes,
    pub leaf_index: u64,
    pub sibling_path: Vec<B256>,
}

impl MultiChainProof {
    /// Root implied by `leaf` and this path
    pub fn compute_root(&self, leaf: &MultiChainLeaf) -> B256 {
        let mut node = leaf.hash();
        let mut index = self.leaf_index;
        for sibling in &self.sibling_path {
            node = if index & 1 == 0 {
                hash_pair(&node, sibling)
            } else {
                hash_pair(sibling, &node)
            };
            index >>= 1;
        }
        node
    }

    /// Check the path leads to the signed root and the root was signed by `signer`
    pub fn verify(&self, leaf: &MultiChainLeaf, signer: Address) -> bool {
        self.compute_root(leaf) == self.root && is_signed_by(&self.root, &self.root_signature, signer)
    }

    /// Encode without the mode prefix
    pub fn encode(&self) -> Result<Bytes> {
        if self.root_signature.len() != SIGNATURE_LENGTH {
            return Err(Error::Encoding(format!(
                "root signature must be {} bytes, got {}",
                SIGNATURE_LENGTH,
                self.root_signature.len()
            )));
        }

        let mut out = Vec::with_capacity(SIGNATURE_LENGTH + 32 + 96 + 32 * self.sibling_path.len());
        out.extend_from_slice(&self.root_signature);
        out.extend_from_slice(self.root.as_slice());
        out.extend_from_slice(
            &(U256::from(self.leaf_index), self.sibling_path.clone()).abi_encode_params(),
        );
        Ok(out.into())
    }

    /// Decode a payload produced by [`encode`](Self::encode)
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let header = SIGNATURE_LENGTH + 32;
        if payload.len() < header {
            return Err(Error::Encoding(format!(
                "multi-chain proof needs at least {} bytes, got {}",
                header,
                payload.len()
            )));
        }

        let root_signature = Bytes::copy_from_slice(&payload[..SIGNATURE_LENGTH]);
        let root = B256::from_slice(&payload[SIGNATURE_LENGTH..header]);
        let (index, sibling_path) = <(U256, Vec<B256>)>::abi_decode_params(&payload[header..])?;
        let leaf_index = u64::try_from(index)
            .map_err(|_| Error::Encoding(format!("leaf index {} overflows", index)))?;

        Ok(Self {
            root,
            root_signature,
            leaf_index,
            sibling_path,
        })
    }

    /// Operation signature: sudo mode prefix followed by the proof. The root
    /// signature must come from the sudo validator.
    pub fn to_signature(&self) -> Result<Bytes> {
        Ok(ValidatorMode::Sudo.wrap(&self.encode()?))
    }

    /// Parse an operation signature produced by [`to_signature`](Self::to_signature)
    pub fn from_signature(signature: &[u8]) -> Result<Self> {
        match ValidatorMode::from_signature(signature) {
            Some(ValidatorMode::Sudo) => Self::decode(&signature[4..]),
            _ => Err(Error::InvalidSignature(
                "multi-chain signatures use the sudo mode".into(),
            )),
        }
    }
}

/// Validated set of leaves, at most one per chain
#[derive(Debug, Clone)]
pub struct MultiChainBatch {
    /// Leaves in tree order
    leaves: Vec<MultiChainLeaf>,
    /// Tree position of each leaf in the caller's order
    positions: Vec<usize>,
    /// Tree levels from leaves up to the root
    levels: Vec<Vec<B256>>,
}

impl MultiChainBatch {
    /// Validate and commit `leaves`. Fails before any signing on an empty
    /// batch or a repeated chain id.
    pub fn new(leaves: Vec<MultiChainLeaf>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(Error::Encoding("multi-chain batch is empty".into()));
        }

        let mut seen = HashSet::with_capacity(leaves.len());
        for leaf in &leaves {
            if !seen.insert(leaf.chain_id) {
                return Err(Error::DuplicateChainInBatch(leaf.chain_id));
            }
        }

        let mut order: Vec<usize> = (0..leaves.len()).collect();
        order.sort_by_key(|&i| (leaves[i].chain_id, leaves[i].user_op_hash));

        let mut positions = vec![0usize; leaves.len()];
        for (position, &original) in order.iter().enumerate() {
            positions[original] = position;
        }
        let sorted: Vec<MultiChainLeaf> = order.iter().map(|&i| leaves[i]).collect();

        let mut levels = vec![sorted.iter().map(MultiChainLeaf::hash).collect::<Vec<_>>()];
        while let Some(level) = levels.last()
            && level.len() > 1
        {
            let next = level
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }

        Ok(Self {
            leaves: sorted,
            positions,
            levels,
        })
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Merkle root
    pub fn root(&self) -> B256 {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_default()
    }

    /// Leaves in tree order
    pub fn leaves(&self) -> &[MultiChainLeaf] {
        &self.leaves
    }

    fn sibling_path(&self, position: usize) -> Vec<B256> {
        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut index = position;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            // odd level: the last node pairs with itself
            path.push(level.get(sibling).copied().unwrap_or(level[index]));
            index >>= 1;
        }
        path
    }

    /// Proof for the leaf the caller supplied at `index`, given the root signature
    pub fn proof(&self, index: usize, root_signature: Bytes) -> Result<MultiChainProof> {
        let position = *self
            .positions
            .get(index)
            .ok_or_else(|| Error::Encoding(format!("no leaf at index {}", index)))?;

        Ok(MultiChainProof {
            root: self.root(),
            root_signature,
            leaf_index: position as u64,
            sibling_path: self.sibling_path(position),
        })
    }

    /// Sign the root once and return one proof per leaf, in the caller's order
    #[instrument(skip(self, validator), fields(leaves = self.leaves.len()))]
    pub async fn sign(&self, validator: &dyn Validator) -> Result<Vec<MultiChainProof>> {
        let root = self.root();
        debug!(root = %root, "Signing multi-chain root");
        let root_signature = validator.sign_hash(&root).await?;

        (0..self.positions.len())
            .map(|i| self.proof(i, root_signature.clone()))
            .collect()
    }
}

/// An operation together with where it will be submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiChainUserOperation {
    pub chain_id: u64,
    pub entry_point: Address,
    pub user_operation: UserOperation,
}

impl MultiChainUserOperation {
    pub fn new(chain_id: u64, entry_point: Address, user_operation: UserOperation) -> Self {
        Self {
            chain_id,
            entry_point,
            user_operation,
        }
    }

    /// Leaf for this operation's hash on its chain
    pub fn leaf(&self) -> MultiChainLeaf {
        MultiChainLeaf::new(
            self.chain_id,
            self.user_operation.hash(self.entry_point, self.chain_id),
        )
    }
}

/// Sign every operation with one root signature from `validator` and write
/// the per-chain signature into each operation.
///
/// `validator` must be the account's sudo validator; the signatures are
/// written in sudo mode. All operations must share one sender.
pub async fn sign_user_operations(
    validator: &dyn Validator,
    operations: &mut [MultiChainUserOperation],
) -> Result<Vec<MultiChainProof>> {
    if let Some((first, rest)) = operations.split_first()
        && let Some(other) = rest
            .iter()
            .find(|op| op.user_operation.sender != first.user_operation.sender)
    {
        return Err(Error::Encoding(format!(
            "multi-chain batch mixes senders {} and {}",
            first.user_operation.sender, other.user_operation.sender
        )));
    }

    let batch = MultiChainBatch::new(operations.iter().map(MultiChainUserOperation::leaf).collect())?;
    let proofs = batch.sign(validator).await?;

    for (operation, proof) in operations.iter_mut().zip(&proofs) {
        operation.user_operation.signature = proof.to_signature()?;
    }

    info!(
        chains = operations.len(),
        root = %batch.root(),
        "Signed multi-chain operations"
    );
    Ok(proofs)
}
