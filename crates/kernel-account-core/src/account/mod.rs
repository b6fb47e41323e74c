//! # Kernel Account
//!
//! A [`KernelAccount`] is the client-side handle of one Kernel v2 smart
//! account: its counterfactual address, how to deploy it, how to encode and
//! sign operations for it, and which validator signs them.
//!
//! The address is fixed when the handle is built. Deployment state is never
//! cached: every operation that depends on it asks the chain again.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kernel_account_core::{AccountConfig, Call, KernelAccount, LocalSigner};
//!
//! let config = AccountConfig::kernel_v2(8453, proxy_init_code_hash);
//! let owner = Arc::new(LocalSigner::from_hex(key)?);
//! let account = KernelAccount::new(config, owner, U256::ZERO, chain)?;
//!
//! let user_op = account.build_user_operation(&[Call::new(to, value, data)]).await?;
//! let signed = account.sign_user_operation(user_op).await?;
//! let hash = bundler.send_user_operation(&signed, account.config().entry_point).await?;
//! ```

pub mod address;
pub mod user_op;

pub use address::{AccountInitArgs, create2_address, derive_address, init_code};
pub use user_op::{UserOperation, UserOperationReceipt};

use crate::calls::{Call, encode_calls};
use crate::chain::{BundlerClient, ChainClient, PaymasterClient};
use crate::config::AccountConfig;
use crate::contracts::{KernelWrapper, kernel_domain};
use crate::predeploy::wrap_signature;
use crate::signer::Signer;
use crate::types::keccak256;
use crate::validator::{EcdsaValidator, EnableData, KernelPluginManager, Validator};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolStruct;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Handle to one Kernel account
#[derive(Clone)]
pub struct KernelAccount {
    config: AccountConfig,
    init_args: AccountInitArgs,
    address: Address,
    owner: Address,
    plugins: KernelPluginManager,
    chain: Arc<dyn ChainClient>,
}

impl fmt::Debug for KernelAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelAccount")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("chain_id", &self.config.chain_id)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

impl KernelAccount {
    /// Account owned by `owner` through the configured ECDSA sudo validator
    pub fn new(
        config: AccountConfig,
        owner: Arc<dyn Signer>,
        index: U256,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self> {
        let sudo = EcdsaValidator::new(config.sudo_validator, owner);
        Self::from_sudo(config, sudo, index, chain)
    }

    /// Account for an existing sudo validator handle, which may be detached
    pub fn from_sudo(
        config: AccountConfig,
        sudo: EcdsaValidator,
        index: U256,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self> {
        config.validate()?;
        if chain.chain_id() != config.chain_id {
            return Err(Error::ChainIdMismatch {
                expected: config.chain_id,
                actual: chain.chain_id(),
            });
        }
        if sudo.address() != config.sudo_validator {
            return Err(Error::InvalidConfig(format!(
                "sudo validator {} does not match configured {}",
                sudo.address(),
                config.sudo_validator
            )));
        }

        let owner = sudo.owner();
        let init_args = AccountInitArgs::new(config.implementation, sudo.address(), sudo.enable_data(), index);
        let address = derive_address(config.factory, &init_args, config.proxy_init_code_hash);
        let plugins = KernelPluginManager::new(Arc::new(sudo), config.clone());

        debug!(account = %address, owner = %owner, chain_id = config.chain_id, "Kernel account created");

        Ok(Self {
            config,
            init_args,
            address,
            owner,
            plugins,
            chain,
        })
    }

    /// Add a regular validator enabled for `execute`
    pub fn with_regular(mut self, regular: Arc<dyn Validator>) -> Self {
        self.plugins = self.plugins.with_regular(regular);
        self
    }

    /// Add a regular validator with explicit approval terms
    pub fn with_regular_approval(mut self, regular: Arc<dyn Validator>, enable_data: EnableData) -> Self {
        self.plugins = self.plugins.with_regular_approval(regular, enable_data);
        self
    }

    /// Attach the sudo approval of the regular validator
    pub fn with_enable_signature(mut self, enable_signature: Bytes) -> Self {
        self.plugins = self.plugins.with_enable_signature(enable_signature);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Owner of the sudo validator
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    pub fn init_args(&self) -> &AccountInitArgs {
        &self.init_args
    }

    pub fn plugins(&self) -> &KernelPluginManager {
        &self.plugins
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    /// Whether code exists at the account address
    pub async fn is_deployed(&self) -> Result<bool> {
        Ok(!self.chain.get_code(self.address).await?.is_empty())
    }

    /// Factory and the call that deploys this account
    pub fn factory_data(&self) -> (Address, Bytes) {
        (self.config.factory, self.init_args.factory_call_data())
    }

    /// EntryPoint `initCode`: empty once the account is deployed
    pub async fn init_code(&self) -> Result<Bytes> {
        if self.is_deployed().await? {
            return Ok(Bytes::new());
        }
        let (factory, data) = self.factory_data();
        Ok(init_code(factory, &data))
    }

    /// Next EntryPoint nonce on key 0
    pub async fn get_nonce(&self) -> Result<U256> {
        self.chain
            .get_nonce(self.config.entry_point, self.address, U256::ZERO)
            .await
    }

    /// `callData` for `calls`
    pub fn encode_calls(&self, calls: &[Call]) -> Result<Bytes> {
        encode_calls(self.address, self.config.multi_send, calls)
    }

    /// Unsigned operation for `calls` with the current nonce and deploy code.
    /// Gas fields are left for the caller.
    pub async fn build_user_operation(&self, calls: &[Call]) -> Result<UserOperation> {
        let call_data = self.encode_calls(calls)?;
        let nonce = self.get_nonce().await?;
        let init_code = self.init_code().await?;

        Ok(UserOperation::new(self.address, nonce, call_data).with_init_code(init_code))
    }

    /// Attach paymaster sponsorship. Must happen before signing.
    pub async fn sponsor(&self, user_op: UserOperation, paymaster: &dyn PaymasterClient) -> Result<UserOperation> {
        let paymaster_and_data = paymaster
            .sponsor_user_operation(&user_op, self.config.entry_point)
            .await?;
        Ok(user_op.with_paymaster_and_data(paymaster_and_data))
    }

    /// Operation hash on this account's chain and entry point
    pub fn user_operation_hash(&self, user_op: &UserOperation) -> B256 {
        user_op.hash(self.config.entry_point, self.config.chain_id)
    }

    /// Fill the signature field of `user_op`
    #[instrument(skip(self, user_op), fields(account = %self.address, nonce = %user_op.nonce))]
    pub async fn sign_user_operation(&self, user_op: UserOperation) -> Result<UserOperation> {
        if user_op.sender != self.address {
            return Err(Error::InvalidConfig(format!(
                "operation sender {} is not account {}",
                user_op.sender, self.address
            )));
        }

        let signature = self
            .plugins
            .sign_user_operation(self.chain.as_ref(), &user_op)
            .await?;
        Ok(user_op.with_signature(signature))
    }

    /// Build, optionally sponsor, sign and submit `calls`
    #[instrument(skip(self, calls, bundler, paymaster), fields(account = %self.address, calls = calls.len()))]
    pub async fn send_user_operation(
        &self,
        calls: &[Call],
        bundler: &dyn BundlerClient,
        paymaster: Option<&dyn PaymasterClient>,
    ) -> Result<B256> {
        let mut user_op = self.build_user_operation(calls).await?;
        if let Some(paymaster) = paymaster {
            user_op = self.sponsor(user_op, paymaster).await?;
        }
        let user_op = self.sign_user_operation(user_op).await?;

        let hash = bundler
            .send_user_operation(&user_op, self.config.entry_point)
            .await?;
        info!(user_op_hash = %hash, deploys = user_op.deploys_account(), "User operation submitted");
        Ok(hash)
    }

    /// Digest the account checks in `isValidSignature`:
    /// EIP-712 `KernelWrapper(bytes32 hash)` in the account's domain
    pub fn message_digest(&self, hash: &B256) -> B256 {
        let domain = kernel_domain(self.address, self.config.chain_id, &self.config.kernel_version);
        KernelWrapper { hash: *hash }.eip712_signing_hash(&domain)
    }

    /// ERC-1271 signature over `hash` by the sudo validator. Wrapped in an
    /// ERC-6492 envelope when the account is not deployed at signing time.
    #[instrument(skip(self), fields(account = %self.address))]
    pub async fn sign_hash(&self, hash: &B256) -> Result<Bytes> {
        let signature = self.plugins.sudo().sign_hash(&self.message_digest(hash)).await?;

        let deployed = self.is_deployed().await?;
        let (factory, factory_data) = self.factory_data();
        debug!(deployed, "Wrapping message signature");
        Ok(wrap_signature(signature, deployed, factory, factory_data))
    }

    /// ERC-1271 signature over an EIP-191 personal message
    pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        self.sign_hash(&personal_message_hash(message)).await
    }

    /// Sudo approval of the configured regular validator
    pub async fn approve_regular(&self) -> Result<Bytes> {
        self.plugins.approve_regular(self.address).await
    }
}

/// keccak256("\x19Ethereum Signed Message:\n" || len || message)
pub fn personal_message_hash(message: &[u8]) -> B256 {
    let mut buf = Vec::with_capacity(32 + message.len());
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    buf.extend_from_slice(message.len().to_string().as_bytes());
    buf.extend_from_slice(message);
    keccak256(&buf)
}
