//! ECDSA owner validator
//!
//! The default sudo validator of a Kernel v2 account. Its enable data is the
//! 20-byte owner address and it accepts EIP-191 signatures of the operation
//! hash from that owner.

use super::Validator;
use crate::signer::Signer;
use crate::types::{hash_message, is_signed_by};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use std::sync::Arc;

/// ECDSA validator for a single owner key
#[derive(Debug, Clone)]
pub struct EcdsaValidator {
    address: Address,
    owner: Address,
    signer: Option<Arc<dyn Signer>>,
}

impl EcdsaValidator {
    /// Validator at `address` backed by `signer`
    pub fn new(address: Address, signer: Arc<dyn Signer>) -> Self {
        Self {
            address,
            owner: signer.address(),
            signer: Some(signer),
        }
    }

    /// Validator that knows the owner but holds no key.
    /// Used when an account is rebuilt from an approval.
    pub fn detached(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            signer: None,
        }
    }

    /// Owner address
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Whether this handle can sign
    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }
}

#[async_trait]
impl Validator for EcdsaValidator {
    fn address(&self) -> Address {
        self.address
    }

    fn enable_data(&self) -> Bytes {
        Bytes::copy_from_slice(self.owner.as_slice())
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Bytes> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            Error::SigningRefused(format!("no key held for owner {}", self.owner))
        })?;
        let signature = signer.sign_hash(&hash_message(hash)).await?;
        Ok(Bytes::copy_from_slice(&signature.to_bytes()))
    }

    fn validate_signature(&self, hash: &B256, signature: &[u8]) -> bool {
        is_signed_by(hash, signature, self.owner)
    }
}
