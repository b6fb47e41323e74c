//! Sudo/regular validator selection and the in-band enable flow
//!
//! The [`KernelPluginManager`] decides, per operation, which validator signs
//! and in which mode. A regular validator that is not yet installed on the
//! account is enabled by the operation itself: the signature carries the
//! [`EnableData`] together with a sudo signature over its EIP-712 digest, and
//! the account installs the validator while validating the operation.

use super::{PluginState, Validator, ValidatorMode};
use crate::account::UserOperation;
use crate::calls::{Call, decode_calls};
use crate::chain::ChainClient;
use crate::config::AccountConfig;
use crate::contracts::{IKernel, ValidatorApproved, kernel_domain};
use crate::types::{read_address, read_len, read_slice, read_u48};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes, FixedBytes, U256};
use alloy_sol_types::{SolCall, SolStruct};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Largest value of a `uint48` validity bound
pub const MAX_UINT48: u64 = (1 << 48) - 1;

/// Approval to install a regular validator for one selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableData {
    /// Regular validator contract (validator id)
    pub validator: Address,
    /// Expiry, 0 for none. Carried but not checked client-side.
    pub valid_until: u64,
    /// Start of validity, 0 for immediately
    pub valid_after: u64,
    /// Executor bound to the selector, zero for the account itself
    pub executor: Address,
    /// Account function the validator is enabled for
    pub selector: FixedBytes<4>,
    /// Data the validator is initialized with (for session keys: the policy data)
    pub data: Bytes,
}

impl EnableData {
    /// Unbounded approval of `validator` for `selector`
    pub fn new(validator: Address, selector: [u8; 4], data: Bytes) -> Self {
        Self {
            validator,
            valid_until: 0,
            valid_after: 0,
            executor: Address::ZERO,
            selector: FixedBytes(selector),
            data,
        }
    }

    /// Set the validity window
    pub fn with_validity(mut self, valid_after: u64, valid_until: u64) -> Self {
        self.valid_after = valid_after;
        self.valid_until = valid_until;
        self
    }

    /// Set the executor
    pub fn with_executor(mut self, executor: Address) -> Self {
        self.executor = executor;
        self
    }

    /// Reject bounds that do not fit the on-chain `uint48`
    pub fn validate(&self) -> Result<()> {
        if self.valid_until > MAX_UINT48 || self.valid_after > MAX_UINT48 {
            return Err(Error::Encoding(format!(
                "validity bounds ({}, {}) exceed uint48",
                self.valid_after, self.valid_until
            )));
        }
        Ok(())
    }

    /// `validUntil(6) || validAfter(6) || validator(20)`
    fn packed_header(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..6].copy_from_slice(&self.valid_until.to_be_bytes()[2..]);
        out[6..12].copy_from_slice(&self.valid_after.to_be_bytes()[2..]);
        out[12..].copy_from_slice(self.validator.as_slice());
        out
    }

    /// The packed header read as `uint256`, as the account hashes it
    pub fn validator_data(&self) -> U256 {
        U256::from_be_bytes(self.packed_header())
    }

    /// EIP-712 digest the sudo validator signs, bound to `account` on `chain_id`
    pub fn digest(&self, account: Address, chain_id: u64, version: &str) -> Result<B256> {
        self.validate()?;

        let approval = ValidatorApproved {
            sig: self.selector,
            validatorData: self.validator_data(),
            executor: self.executor,
            enableData: self.data.clone(),
        };
        Ok(approval.eip712_signing_hash(&kernel_domain(account, chain_id, version)))
    }
}

/// Decoded enable-mode signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableSignature {
    /// Approval being redeemed
    pub enable_data: EnableData,
    /// Sudo signature over the approval digest
    pub enable_signature: Bytes,
    /// Regular validator signature over the operation
    pub signature: Bytes,
}

impl EnableSignature {
    /// Encode with the enable mode prefix:
    ///
    /// `0x00000002 || validUntil(6) || validAfter(6) || validator(20) || executor(20) ||
    ///  uint256(len) || enableData || uint256(len) || enableSig || signature`
    pub fn encode(&self) -> Result<Bytes> {
        self.enable_data.validate()?;

        let data = &self.enable_data.data;
        let mut out = Vec::with_capacity(
            4 + 32 + 20 + 32 + data.len() + 32 + self.enable_signature.len() + self.signature.len(),
        );
        out.extend_from_slice(&ValidatorMode::Enable.prefix());
        out.extend_from_slice(&self.enable_data.packed_header());
        out.extend_from_slice(self.enable_data.executor.as_slice());
        out.extend_from_slice(&U256::from(data.len()).to_be_bytes::<32>());
        out.extend_from_slice(data);
        out.extend_from_slice(&U256::from(self.enable_signature.len()).to_be_bytes::<32>());
        out.extend_from_slice(&self.enable_signature);
        out.extend_from_slice(&self.signature);
        Ok(out.into())
    }

    /// Parse an enable-mode signature. The selector is not part of the
    /// layout; the account takes it from the operation's call data.
    pub fn decode(signature: &[u8], selector: [u8; 4]) -> Result<Self> {
        if ValidatorMode::from_signature(signature) != Some(ValidatorMode::Enable) {
            return Err(Error::InvalidSignature("not an enable-mode signature".into()));
        }

        let mut i = 4usize;
        let valid_until = read_u48(signature, &mut i)?;
        let valid_after = read_u48(signature, &mut i)?;
        let validator = read_address(signature, &mut i)?;
        let executor = read_address(signature, &mut i)?;
        let data_len = read_len(signature, &mut i)?;
        let data = Bytes::copy_from_slice(read_slice(signature, &mut i, data_len)?);
        let enable_sig_len = read_len(signature, &mut i)?;
        let enable_signature = Bytes::copy_from_slice(read_slice(signature, &mut i, enable_sig_len)?);
        let signature = Bytes::copy_from_slice(&signature[i..]);

        Ok(Self {
            enable_data: EnableData {
                validator,
                valid_until,
                valid_after,
                executor,
                selector: FixedBytes(selector),
                data,
            },
            enable_signature,
            signature,
        })
    }
}

/// Chooses the signing validator and mode for each operation
#[derive(Debug, Clone)]
pub struct KernelPluginManager {
    config: AccountConfig,
    sudo: Arc<dyn Validator>,
    regular: Option<Arc<dyn Validator>>,
    enable_data: Option<EnableData>,
    enable_signature: Option<Bytes>,
}

impl KernelPluginManager {
    /// Manager with only a sudo validator
    pub fn new(sudo: Arc<dyn Validator>, config: AccountConfig) -> Self {
        Self {
            config,
            sudo,
            regular: None,
            enable_data: None,
            enable_signature: None,
        }
    }

    /// Add a regular validator for the `execute` selector with an unbounded approval
    pub fn with_regular(self, regular: Arc<dyn Validator>) -> Self {
        let enable_data = EnableData::new(
            regular.address(),
            IKernel::executeCall::SELECTOR,
            regular.enable_data(),
        );
        self.with_regular_approval(regular, enable_data)
    }

    /// Add a regular validator with explicit approval terms
    pub fn with_regular_approval(mut self, regular: Arc<dyn Validator>, enable_data: EnableData) -> Self {
        self.regular = Some(regular);
        self.enable_data = Some(enable_data);
        self.enable_signature = None;
        self
    }

    /// Attach a sudo signature produced by [`approve_regular`](Self::approve_regular)
    pub fn with_enable_signature(mut self, enable_signature: Bytes) -> Self {
        self.enable_signature = Some(enable_signature);
        self
    }

    pub fn sudo(&self) -> &Arc<dyn Validator> {
        &self.sudo
    }

    pub fn regular(&self) -> Option<&Arc<dyn Validator>> {
        self.regular.as_ref()
    }

    pub fn enable_data(&self) -> Option<&EnableData> {
        self.enable_data.as_ref()
    }

    pub fn enable_signature(&self) -> Option<&Bytes> {
        self.enable_signature.as_ref()
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    fn pending_enable_data(&self) -> Result<&EnableData> {
        self.enable_data
            .as_ref()
            .ok_or_else(|| Error::ValidatorNotEnabled("no regular validator configured".into()))
    }

    /// EIP-712 digest of the pending approval for `account`
    pub fn enable_digest(&self, account: Address) -> Result<B256> {
        self.pending_enable_data()?
            .digest(account, self.config.chain_id, &self.config.kernel_version)
    }

    /// Sudo signs the pending approval once. The returned bytes go to
    /// [`with_enable_signature`](Self::with_enable_signature).
    #[instrument(skip(self), fields(sudo = %self.sudo.address()))]
    pub async fn approve_regular(&self, account: Address) -> Result<Bytes> {
        let digest = self.enable_digest(account)?;
        let signature = self.sudo.sign_hash(&digest).await?;

        info!(
            account = %account,
            validator = %self.pending_enable_data()?.validator,
            "Regular validator approved by sudo"
        );
        Ok(signature)
    }

    /// Whether `enable_signature` is a valid sudo approval for `account`
    pub fn verify_enable_signature(&self, account: Address, enable_signature: &[u8]) -> Result<bool> {
        let digest = self.enable_digest(account)?;
        Ok(self.sudo.validate_signature(&digest, enable_signature))
    }

    /// Probe the account for the regular validator on `selector`.
    /// An undeployed account has nothing installed.
    pub async fn plugin_state(
        &self,
        chain: &dyn ChainClient,
        account: Address,
        selector: [u8; 4],
    ) -> Result<PluginState> {
        let Some(regular) = &self.regular else {
            return Ok(PluginState::SudoOnly);
        };

        if chain.get_code(account).await?.is_empty() {
            return Ok(PluginState::RegularEnabling);
        }

        let request = IKernel::getExecutionCall {
            selector: FixedBytes(selector),
        }
        .abi_encode();
        let out = chain.call(account, request.into()).await?;

        // (uint48 validAfter, uint48 validUntil, address executor, address validator)
        let installed = match out.get(108..128) {
            Some(word) => Address::from_slice(word),
            None if out.is_empty() => Address::ZERO,
            None => {
                return Err(Error::Encoding(format!(
                    "getExecution returned {} bytes",
                    out.len()
                )));
            }
        };

        if installed == regular.address() {
            Ok(PluginState::RegularActive)
        } else {
            Ok(PluginState::RegularEnabling)
        }
    }

    /// Sign an operation hash for `account`, selecting the mode from the
    /// current plugin state. Regular validators may veto `calls` first.
    #[instrument(skip(self, chain, account, calls), fields(account = %account))]
    pub async fn sign_user_op_hash(
        &self,
        chain: &dyn ChainClient,
        account: Address,
        selector: [u8; 4],
        hash: &B256,
        calls: &[Call],
    ) -> Result<Bytes> {
        let state = self.plugin_state(chain, account, selector).await?;
        debug!(state = ?state, "Selected signing mode");

        match (state, &self.regular) {
            (PluginState::SudoOnly, _) | (_, None) => {
                let signature = self.sudo.sign_hash(hash).await?;
                Ok(ValidatorMode::Sudo.wrap(&signature))
            }
            (PluginState::RegularActive, Some(regular)) => {
                regular.check_calls(account, calls)?;
                let signature = regular.sign_hash(hash).await?;
                Ok(ValidatorMode::Plugin.wrap(&signature))
            }
            (PluginState::RegularEnabling, Some(regular)) => {
                let enable_data = self.pending_enable_data()?;
                let enable_signature = self.enable_signature.as_ref().ok_or_else(|| {
                    Error::ValidatorNotEnabled(format!(
                        "validator {} has no sudo approval for {}",
                        regular.address(),
                        account
                    ))
                })?;
                if enable_data.selector.0 != selector {
                    return Err(Error::ValidatorNotEnabled(format!(
                        "approval covers selector 0x{}, operation calls 0x{}",
                        hex::encode(enable_data.selector),
                        hex::encode(selector)
                    )));
                }

                regular.check_calls(account, calls)?;
                let signature = regular.sign_hash(hash).await?;

                info!(validator = %regular.address(), "Enabling regular validator in-band");
                EnableSignature {
                    enable_data: enable_data.clone(),
                    enable_signature: enable_signature.clone(),
                    signature,
                }
                .encode()
            }
        }
    }

    /// Sign a complete operation. Calls are recovered from its call data so
    /// externally built operations get the same policy checks.
    pub async fn sign_user_operation(&self, chain: &dyn ChainClient, user_op: &UserOperation) -> Result<Bytes> {
        let selector = user_op
            .call_data
            .get(..4)
            .map(|s| [s[0], s[1], s[2], s[3]])
            .unwrap_or_default();
        let calls = if self.regular.is_some() {
            decode_calls(user_op.sender, self.config.multi_send, &user_op.call_data)?
        } else {
            Vec::new()
        };
        let hash = user_op.hash(self.config.entry_point, self.config.chain_id);

        self.sign_user_op_hash(chain, user_op.sender, selector, &hash, &calls)
            .await
    }
}
