//! # Validator Plugins
//!
//! A Kernel account authorizes every user operation through a validator
//! contract. This module models the client side of that architecture:
//!
//! - A **sudo** validator is installed at deployment and can always sign.
//! - A **regular** validator is a delegated authority (for example a session
//!   key) that must be enabled for a selector before it can act. The first
//!   operation it signs carries a sudo-signed approval in-band, which installs
//!   it as a side effect of validation.
//!
//! The signature mode is the first four bytes of the operation signature:
//!
//! | Mode   | Prefix       | Payload                                   |
//! |--------|--------------|-------------------------------------------|
//! | Sudo   | `0x00000000` | sudo validator signature                  |
//! | Plugin | `0x00000001` | regular validator signature               |
//! | Enable | `0x00000002` | enable data, sudo approval, regular sig   |
//!
//! ## Example
//!
//! ```rust,ignore
//! use kernel_account_core::validator::{EcdsaValidator, KernelPluginManager};
//!
//! let sudo = Arc::new(EcdsaValidator::new(config.sudo_validator, owner));
//! let manager = KernelPluginManager::new(sudo, config.clone());
//! let signature = manager.sign_user_op_hash(chain.as_ref(), account, &hash, &calls).await?;
//! ```

pub mod ecdsa;
pub mod permission;
pub mod plugin;

use crate::Result;
use crate::calls::Call;
use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use ecdsa::EcdsaValidator;
pub use permission::{PermissionValidator, permission_enable_data};
pub use plugin::{EnableData, EnableSignature, KernelPluginManager};

/// Client-side half of an on-chain validator
#[async_trait]
pub trait Validator: Send + Sync + fmt::Debug {
    /// Validator contract address, also used as the validator id
    fn address(&self) -> Address;

    /// Data the validator contract is initialized with for an account
    fn enable_data(&self) -> Bytes;

    /// Sign a user operation hash or message digest
    async fn sign_hash(&self, hash: &B256) -> Result<Bytes>;

    /// Check `signature` over `hash` the way the validator contract would
    fn validate_signature(&self, hash: &B256, signature: &[u8]) -> bool;

    /// Veto calls before any signature is requested
    fn check_calls(&self, _account: Address, _calls: &[Call]) -> Result<()> {
        Ok(())
    }
}

/// Signature mode selected by the 4-byte prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorMode {
    Sudo,
    Plugin,
    Enable,
}

impl ValidatorMode {
    /// Prefix written in front of the validator signature
    pub fn prefix(&self) -> [u8; 4] {
        match self {
            ValidatorMode::Sudo => [0, 0, 0, 0],
            ValidatorMode::Plugin => [0, 0, 0, 1],
            ValidatorMode::Enable => [0, 0, 0, 2],
        }
    }

    /// Mode of an encoded signature, `None` for short or unknown prefixes
    pub fn from_signature(signature: &[u8]) -> Option<Self> {
        match signature.get(..4)? {
            [0, 0, 0, 0] => Some(ValidatorMode::Sudo),
            [0, 0, 0, 1] => Some(ValidatorMode::Plugin),
            [0, 0, 0, 2] => Some(ValidatorMode::Enable),
            _ => None,
        }
    }

    /// `prefix || payload`
    pub fn wrap(&self, payload: &[u8]) -> Bytes {
        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&self.prefix());
        out.extend_from_slice(payload);
        out.into()
    }
}

/// Which validator signs the next operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// No regular validator configured
    SudoOnly,
    /// Regular validator configured but not installed on the account yet
    RegularEnabling,
    /// Regular validator installed for the selector
    RegularActive,
}

impl PluginState {
    /// Signature mode used in this state
    pub fn mode(&self) -> ValidatorMode {
        match self {
            PluginState::SudoOnly => ValidatorMode::Sudo,
            PluginState::RegularEnabling => ValidatorMode::Enable,
            PluginState::RegularActive => ValidatorMode::Plugin,
        }
    }
}
