//! # Kernel Account Core
//!
//! Authorization core for Kernel smart accounts on ERC-4337 (EntryPoint v0.6).
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Account Model**: counterfactual CREATE2 addresses, deploy code and deploy-state probing
//! - **Call Encoding**: single, batched (MultiSend) and delegate calls
//! - **Validator Plugins**: a sudo validator plus an optional regular validator that is
//!   enabled in-band by the first operation it signs
//! - **Multi-Chain Signing**: one signature over a Merkle root authorizes an operation on
//!   every chain in the batch
//! - **Session Keys**: policy-gated delegation with offline, serializable approvals
//! - **ERC-6492**: message signatures that verify before the account is deployed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kernel_account_core::{AccountConfig, Call, KernelAccount, LocalSigner};
//! use kernel_account_core::chain::{RpcBundlerClient, RpcChainClient, RpcClient};
//!
//! let config = AccountConfig::kernel_v2(8453, proxy_init_code_hash);
//! let chain = Arc::new(RpcChainClient::new(RpcClient::new(node_url)?, 8453));
//! let bundler = RpcBundlerClient::new(RpcClient::new(bundler_url)?);
//!
//! let owner = Arc::new(LocalSigner::from_hex(private_key)?);
//! let account = KernelAccount::new(config, owner, U256::ZERO, chain)?;
//!
//! let hash = account
//!     .send_user_operation(&[Call::new(to, value, data)], &bundler, None)
//!     .await?;
//! ```
//!
//! ## Delegation
//!
//! ```rust,ignore
//! // Owner: approve a session key once, offline
//! let approval = create_approval(&account, session_key, policies, ApprovalOptions::default()).await?;
//! let serialized = serialize_approval(&approval)?;
//!
//! // Session key holder: rebuild the account and act within the policies
//! let account = deserialize_approval(&serialized, session_signer, chain)?;
//! ```
//!
//! The core never talks to the network on its own and never retries: every
//! chain, bundler and paymaster interaction goes through the traits in
//! [`chain`], and every failure is returned to the caller.

pub mod account;
pub mod approval;
pub mod calls;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod multichain;
pub mod policy;
pub mod predeploy;
pub mod signer;
pub mod types;
pub mod validator;

pub use account::{AccountInitArgs, KernelAccount, UserOperation, UserOperationReceipt};
pub use approval::{
    Approval, ApprovalOptions, create_approval, deserialize_approval, serialize_approval,
};
pub use calls::{Call, CallKind, encode_calls};
pub use chain::{BundlerClient, ChainClient, PaymasterClient};
pub use config::AccountConfig;
pub use error::{Error, ErrorKind, Result};
pub use multichain::{
    MultiChainBatch, MultiChainLeaf, MultiChainProof, MultiChainUserOperation,
    sign_user_operations,
};
pub use policy::{CallPermission, Policy, PolicyDecision, PolicySet};
pub use predeploy::{PredeploySignature, unwrap_signature, wrap_signature};
pub use signer::{LocalSigner, Signer};
pub use types::Signature;
pub use validator::{
    EcdsaValidator, EnableData, KernelPluginManager, PermissionValidator, PluginState,
    Validator, ValidatorMode,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
