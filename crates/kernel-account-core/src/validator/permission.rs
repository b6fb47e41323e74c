//! Session key validator
//!
//! A regular validator that signs with a session key and only for calls its
//! [`PolicySet`] approves. Policies are checked before the key is asked to
//! sign, so a rejected batch never reaches the key material.

use super::Validator;
use crate::calls::Call;
use crate::policy::{PolicyDecision, PolicySet};
use crate::signer::Signer;
use crate::types::{hash_message, is_signed_by};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Enable data installed for a session key: `abi.encode(sessionKey, policyDescriptors)`.
/// The key sits in the first word, left-padded; the configured permission
/// validator must decode this layout.
pub fn permission_enable_data(session_key: Address, policies: &PolicySet) -> Bytes {
    (session_key, policies.descriptors()).abi_encode_params().into()
}

/// Policy-gated session key validator
#[derive(Debug, Clone)]
pub struct PermissionValidator {
    address: Address,
    signer: Arc<dyn Signer>,
    policies: PolicySet,
}

impl PermissionValidator {
    /// Session key validator at `address`
    pub fn new(address: Address, signer: Arc<dyn Signer>, policies: PolicySet) -> Self {
        Self {
            address,
            signer,
            policies,
        }
    }

    /// Session key address
    pub fn session_key(&self) -> Address {
        self.signer.address()
    }

    /// Policies enforced by this validator
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }
}

#[async_trait]
impl Validator for PermissionValidator {
    fn address(&self) -> Address {
        self.address
    }

    fn enable_data(&self) -> Bytes {
        permission_enable_data(self.session_key(), &self.policies)
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Bytes> {
        let signature = self.signer.sign_hash(&hash_message(hash)).await?;
        Ok(Bytes::copy_from_slice(&signature.to_bytes()))
    }

    fn validate_signature(&self, hash: &B256, signature: &[u8]) -> bool {
        is_signed_by(hash, signature, self.session_key())
    }

    fn check_calls(&self, account: Address, calls: &[Call]) -> Result<()> {
        match self.policies.evaluate(account, calls) {
            PolicyDecision::Approve => Ok(()),
            PolicyDecision::Reject { reason } => {
                warn!(account = %account, reason = %reason, "Session key policy rejected calls");
                Err(Error::PolicyViolation(reason))
            }
        }
    }
}
