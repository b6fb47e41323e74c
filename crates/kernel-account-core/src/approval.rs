//! # Session Key Approvals
//!
//! The owner of an account delegates a policy-limited session key once,
//! offline, by signing its [`EnableData`]. The result is an [`Approval`]: a
//! self-describing value with everything needed to rebuild the account on
//! another machine except private key material. The session key holder
//! redeems it with [`deserialize_approval`] and its own key; the first
//! operation they send installs the session key validator in-band.
//!
//! Transport encoding is base64 of the JSON form, versioned, and stable:
//! parsing and re-serializing yields the same string.
//!
//! ## Example
//!
//! ```rust,ignore
//! // Owner side
//! let approval = create_approval(&account, session_key, policies, ApprovalOptions::default()).await?;
//! let serialized = serialize_approval(&approval)?;
//!
//! // Session key side
//! let account = deserialize_approval(&serialized, session_signer, chain)?;
//! let hash = account.send_user_operation(&calls, &bundler, None).await?;
//! ```

use crate::account::KernelAccount;
use crate::chain::ChainClient;
use crate::config::AccountConfig;
use crate::contracts::IKernel;
use crate::policy::PolicySet;
use crate::signer::Signer;
use crate::validator::{EcdsaValidator, EnableData, PermissionValidator, permission_enable_data};
use crate::{Error, Result};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Current approval format
pub const APPROVAL_VERSION: u32 = 1;

/// Terms of a delegation beyond the policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOptions {
    /// Start of validity, 0 for immediately
    pub valid_after: u64,
    /// Expiry, 0 for none
    pub valid_until: u64,
    /// Account function the session key may drive
    pub selector: [u8; 4],
    /// Executor bound to the selector
    pub executor: Address,
}

impl Default for ApprovalOptions {
    fn default() -> Self {
        Self {
            valid_after: 0,
            valid_until: 0,
            selector: IKernel::executeCall::SELECTOR,
            executor: Address::ZERO,
        }
    }
}

/// Owner-signed delegation to a session key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub version: u32,
    /// Chain, entry point, factory and validators of the account
    pub config: AccountConfig,
    pub account: Address,
    pub owner: Address,
    pub index: U256,
    /// Session key validator id
    pub validator: Address,
    pub session_key: Address,
    pub policies: PolicySet,
    pub enable_data: EnableData,
    /// Sudo signature over the enable digest
    pub enable_signature: Bytes,
}

impl Approval {
    /// base64(JSON)
    pub fn to_serialized(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }

    /// Parse a serialized approval, rejecting unknown versions
    pub fn from_serialized(serialized: &str) -> Result<Self> {
        let json = STANDARD.decode(serialized.trim())?;
        let value: serde_json::Value =
            serde_json::from_slice(&json).map_err(|e| Error::Deserialization(e.to_string()))?;

        match value.get("version").and_then(serde_json::Value::as_u64) {
            Some(version) if version == u64::from(APPROVAL_VERSION) => {}
            Some(version) => {
                return Err(Error::Deserialization(format!(
                    "unsupported approval version {}",
                    version
                )));
            }
            None => return Err(Error::Deserialization("approval has no version".into())),
        }

        serde_json::from_value(value).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Delegate `policies` on `account` to `session_key`. The account's sudo
/// validator signs once; the account does not need to be deployed.
#[instrument(skip(account, policies), fields(account = %account.address()))]
pub async fn create_approval(
    account: &KernelAccount,
    session_key: Address,
    policies: PolicySet,
    options: ApprovalOptions,
) -> Result<Approval> {
    let config = account.config();
    let validator = config.require_permission_validator()?;
    let enable_data = EnableData::new(
        validator,
        options.selector,
        permission_enable_data(session_key, &policies),
    )
    .with_validity(options.valid_after, options.valid_until)
    .with_executor(options.executor);

    let digest = enable_data.digest(account.address(), config.chain_id, &config.kernel_version)?;
    let enable_signature = account.plugins().sudo().sign_hash(&digest).await?;

    info!(
        session_key = %session_key,
        policies = policies.policies().len(),
        "Session key approved"
    );

    Ok(Approval {
        version: APPROVAL_VERSION,
        config: config.clone(),
        account: account.address(),
        owner: account.owner(),
        index: account.init_args().index,
        validator,
        session_key,
        policies,
        enable_data,
        enable_signature,
    })
}

/// Serialize for transport
pub fn serialize_approval(approval: &Approval) -> Result<String> {
    approval.to_serialized()
}

fn mismatch(reason: String) -> Error {
    warn!(reason = %reason, "Approval rejected");
    Error::ApprovalMismatch(reason)
}

/// Rebuild the approved account around `session_signer`.
///
/// The sudo validator is rebuilt detached (owner address only) and the
/// session key validator is configured with the stored approval. Every
/// binding in the approval is checked against what is rebuilt locally.
pub fn deserialize_approval(
    serialized: &str,
    session_signer: Arc<dyn Signer>,
    chain: Arc<dyn ChainClient>,
) -> Result<KernelAccount> {
    let approval = Approval::from_serialized(serialized)?;
    let config = approval.config;

    if chain.chain_id() != config.chain_id {
        return Err(mismatch(format!(
            "approval is for chain {}, client is on chain {}",
            config.chain_id,
            chain.chain_id()
        )));
    }
    if session_signer.address() != approval.session_key {
        return Err(mismatch(format!(
            "approval is for session key {}, signer is {}",
            approval.session_key,
            session_signer.address()
        )));
    }
    let validator = config.require_permission_validator()?;
    if approval.validator != validator || approval.enable_data.validator != approval.validator {
        return Err(mismatch(format!(
            "validator {} does not match configured {}",
            approval.enable_data.validator, validator
        )));
    }
    if permission_enable_data(approval.session_key, &approval.policies) != approval.enable_data.data {
        return Err(mismatch("policy data does not match the approved enable data".into()));
    }

    let sudo = EcdsaValidator::detached(config.sudo_validator, approval.owner);
    let account = KernelAccount::from_sudo(config.clone(), sudo, approval.index, chain)?;
    if account.address() != approval.account {
        return Err(mismatch(format!(
            "approval is for account {}, rebuilt {}",
            approval.account,
            account.address()
        )));
    }

    let regular = Arc::new(PermissionValidator::new(
        validator,
        session_signer,
        approval.policies,
    ));
    let account = account
        .with_regular_approval(regular, approval.enable_data)
        .with_enable_signature(approval.enable_signature.clone());

    if !account
        .plugins()
        .verify_enable_signature(account.address(), &approval.enable_signature)?
    {
        return Err(mismatch(format!(
            "enable signature was not produced by owner {}",
            approval.owner
        )));
    }

    Ok(account)
}
