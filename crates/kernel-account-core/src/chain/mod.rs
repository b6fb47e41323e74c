//! # External boundaries
//!
//! The core never talks to the network directly. Everything it needs from a
//! node, a bundler or a paymaster goes through the traits below: single
//! request, single response, no retries. Failures surface as
//! [`Error::Adapter`](crate::Error::Adapter) and are never replaced by a
//! default value.
//!
//! - [`memory`] provides in-memory implementations for tests and local development
//! - [`rpc`] provides JSON-RPC implementations (requires the `runtime` feature)

pub mod memory;
#[cfg(feature = "runtime")]
pub mod rpc;

use crate::Result;
use crate::account::{UserOperation, UserOperationReceipt};
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;

pub use memory::{MemoryBundler, MemoryChain};
#[cfg(feature = "runtime")]
pub use rpc::{RpcBundlerClient, RpcChainClient, RpcClient, RpcPaymasterClient};

/// Read access to a chain node
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain this client is connected to
    fn chain_id(&self) -> u64;

    /// Deployed bytecode at `address` (empty when nothing is deployed)
    async fn get_code(&self, address: Address) -> Result<Bytes>;

    /// EntryPoint nonce for `(account, key)`
    async fn get_nonce(&self, entry_point: Address, account: Address, key: U256) -> Result<U256>;

    /// `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;
}

/// ERC-4337 bundler
#[async_trait]
pub trait BundlerClient: Send + Sync {
    /// Submit a fully signed operation, returning its hash
    async fn send_user_operation(&self, user_op: &UserOperation, entry_point: Address) -> Result<B256>;

    /// Receipt for a submitted operation, `None` while pending
    async fn get_user_operation_receipt(&self, user_op_hash: B256) -> Result<Option<UserOperationReceipt>>;
}

/// Gas sponsorship service
#[async_trait]
pub trait PaymasterClient: Send + Sync {
    /// `paymasterAndData` for an operation that is not signed yet
    async fn sponsor_user_operation(&self, user_op: &UserOperation, entry_point: Address) -> Result<Bytes>;
}
