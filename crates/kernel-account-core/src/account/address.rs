//! Counterfactual account addresses
//!
//! The Kernel factory deploys each account as a proxy through CREATE2 with
//! `salt = keccak256(initializeData || uint256(index))`, so the address is a
//! pure function of the factory and the init arguments and is known before
//! the account exists.

use crate::config::AccountConfig;
use crate::contracts::{IKernel, IKernelFactory};
use crate::types::keccak256;
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};

/// Arguments the factory uses to create an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInitArgs {
    /// Implementation behind the proxy
    pub implementation: Address,
    /// `initialize(sudoValidator, sudoEnableData)` call data
    pub initialize_data: Bytes,
    /// Account index for the same owner
    pub index: U256,
}

impl AccountInitArgs {
    /// Init args for an account whose sudo validator is `validator`
    /// installed with `enable_data`
    pub fn new(implementation: Address, validator: Address, enable_data: Bytes, index: U256) -> Self {
        let initialize_data = IKernel::initializeCall {
            defaultValidator: validator,
            data: enable_data,
        }
        .abi_encode()
        .into();

        Self {
            implementation,
            initialize_data,
            index,
        }
    }

    /// Init args for an account owned by an ECDSA key through the configured sudo validator
    pub fn for_owner(config: &AccountConfig, owner: Address, index: U256) -> Self {
        Self::new(
            config.implementation,
            config.sudo_validator,
            Bytes::copy_from_slice(owner.as_slice()),
            index,
        )
    }

    /// CREATE2 salt used by the factory
    pub fn salt(&self) -> B256 {
        let mut buf = Vec::with_capacity(self.initialize_data.len() + 32);
        buf.extend_from_slice(&self.initialize_data);
        buf.extend_from_slice(&self.index.to_be_bytes::<32>());
        keccak256(&buf)
    }

    /// `createAccount(implementation, initializeData, index)` call data
    pub fn factory_call_data(&self) -> Bytes {
        IKernelFactory::createAccountCall {
            implementation: self.implementation,
            data: self.initialize_data.clone(),
            index: self.index,
        }
        .abi_encode()
        .into()
    }
}

/// Derive the account address deployed by `factory` for `args`.
/// Independent of whether the account exists on chain.
pub fn derive_address(factory: Address, args: &AccountInitArgs, proxy_init_code_hash: B256) -> Address {
    create2_address(factory, args.salt(), proxy_init_code_hash)
}

/// CREATE2: keccak256(0xff || deployer || salt || initCodeHash)[12..]
pub fn create2_address(deployer: Address, salt: B256, init_code_hash: B256) -> Address {
    let mut buf = [0u8; 85];
    buf[0] = 0xff;
    buf[1..21].copy_from_slice(deployer.as_slice());
    buf[21..53].copy_from_slice(salt.as_slice());
    buf[53..85].copy_from_slice(init_code_hash.as_slice());
    let hash = keccak256(&buf);
    Address::from_slice(&hash[12..])
}

/// `factory || factoryCallData`, the EntryPoint `initCode` layout
pub fn init_code(factory: Address, factory_call_data: &[u8]) -> Bytes {
    let mut code = Vec::with_capacity(20 + factory_call_data.len());
    code.extend_from_slice(factory.as_slice());
    code.extend_from_slice(factory_call_data);
    code.into()
}
