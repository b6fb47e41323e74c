//! Account configuration
//!
//! Everything that would otherwise be process-wide (entry point, factory,
//! validator deployments) is carried in an [`AccountConfig`] value and passed
//! into account construction explicitly.

use crate::{Error, Result};
use alloy_primitives::{Address, B256, address};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// ERC-4337 EntryPoint v0.6 address (same on most chains)
pub const ENTRY_POINT_V06: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// Kernel v2 account factory
pub const KERNEL_FACTORY: Address = address!("5de4839a76cf55d0c90e2061ef4386d962E15ae3");

/// Kernel v2.4 account implementation
pub const KERNEL_IMPLEMENTATION: Address = address!("d3082872F8B06073A021b4602e022d5A070d7cfC");

/// ECDSA validator used as the sudo validator
pub const ECDSA_VALIDATOR: Address = address!("d9AB5096a832b9ce79914329DAEE236f8Eea0390");

/// Batch execution helper reached through delegatecall
pub const MULTI_SEND: Address = address!("8ae01fcf7c655655ff2c6ef907b8b4718ab4e17c");

/// EIP-712 domain version reported by Kernel v2.4
pub const KERNEL_VERSION: &str = "0.2.4";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a Kernel account on one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    /// Chain the account lives on
    pub chain_id: u64,
    /// EntryPoint contract address
    pub entry_point: Address,
    /// Account factory contract address
    pub factory: Address,
    /// Account implementation behind the proxy
    pub implementation: Address,
    /// Validator installed as sudo at account creation
    pub sudo_validator: Address,
    /// Validator used for session keys. Zero until configured; the contract
    /// must accept `permission_enable_data` as its enable data.
    pub permission_validator: Address,
    /// Batch helper contract
    pub multi_send: Address,
    /// keccak256 of the proxy creation code deployed by the factory
    pub proxy_init_code_hash: B256,
    /// Version string of the account's EIP-712 domain
    pub kernel_version: String,
}

impl AccountConfig {
    /// Config for the Kernel v2 deployment on `chain_id`.
    ///
    /// The proxy init code hash depends on the factory build and must be
    /// supplied by the caller. No permission validator is preset: session key
    /// approvals need one set with [`Self::with_permission_validator`].
    pub fn kernel_v2(chain_id: u64, proxy_init_code_hash: B256) -> Self {
        Self {
            chain_id,
            entry_point: ENTRY_POINT_V06,
            factory: KERNEL_FACTORY,
            implementation: KERNEL_IMPLEMENTATION,
            sudo_validator: ECDSA_VALIDATOR,
            permission_validator: Address::ZERO,
            multi_send: MULTI_SEND,
            proxy_init_code_hash,
            kernel_version: KERNEL_VERSION.to_string(),
        }
    }

    /// Set the entry point
    pub fn with_entry_point(mut self, entry_point: Address) -> Self {
        self.entry_point = entry_point;
        self
    }

    /// Set the factory and implementation
    pub fn with_factory(mut self, factory: Address, implementation: Address) -> Self {
        self.factory = factory;
        self.implementation = implementation;
        self
    }

    /// Set the sudo validator
    pub fn with_sudo_validator(mut self, validator: Address) -> Self {
        self.sudo_validator = validator;
        self
    }

    /// Set the permission validator
    pub fn with_permission_validator(mut self, validator: Address) -> Self {
        self.permission_validator = validator;
        self
    }

    /// Set the batch helper
    pub fn with_multi_send(mut self, multi_send: Address) -> Self {
        self.multi_send = multi_send;
        self
    }

    /// Same config on another chain
    pub fn on_chain(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Permission validator, or an error when none is configured
    pub fn require_permission_validator(&self) -> Result<Address> {
        if self.permission_validator == Address::ZERO {
            return Err(Error::InvalidConfig("permission validator is not configured".into()));
        }
        Ok(self.permission_validator)
    }

    /// Reject configs that can only produce unusable accounts. The permission
    /// validator is optional here; owner-only accounts never use it.
    pub fn validate(&self) -> Result<()> {
        let addresses = [
            ("entry point", self.entry_point),
            ("factory", self.factory),
            ("implementation", self.implementation),
            ("sudo validator", self.sudo_validator),
            ("multi send", self.multi_send),
        ];
        for (name, address) in addresses {
            if address == Address::ZERO {
                return Err(Error::InvalidConfig(format!("{} address is zero", name)));
            }
        }

        if self.proxy_init_code_hash == B256::ZERO {
            return Err(Error::InvalidConfig("proxy init code hash is zero".into()));
        }
        if self.chain_id == 0 {
            return Err(Error::InvalidConfig("chain id is zero".into()));
        }
        if self.kernel_version.is_empty() {
            return Err(Error::InvalidConfig("kernel version is empty".into()));
        }
        Ok(())
    }
}
