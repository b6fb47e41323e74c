//! JSON-RPC adapters for nodes, bundlers and paymasters
//!
//! Each adapter issues exactly one request per call. Transport failures,
//! JSON-RPC errors and malformed results all surface as
//! [`Error::Adapter`] with the underlying message.

use super::{BundlerClient, ChainClient, PaymasterClient};
use crate::account::{UserOperation, UserOperationReceipt};
use crate::contracts::IEntryPoint;
use crate::{Error, Result};
use alloy_primitives::aliases::U192;
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default HTTP timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// RPC Client
// ============================================================================

/// HTTP JSON-RPC client for one endpoint
#[derive(Clone)]
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
}

impl RpcClient {
    /// Create a client for `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::InvalidConfig("RPC URL required".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Adapter(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a JSON-RPC request
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Adapter(format!("{} request failed: {}", method, e)))?;

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Adapter(format!("failed to parse {} response: {}", method, e)))?;

        if let Some(error) = response_body.get("error") {
            tracing::warn!(method, url = %self.url, "RPC error: {}", error);
            return Err(Error::Adapter(format!("{} error: {}", method, error)));
        }

        let result = response_body
            .get("result")
            .ok_or_else(|| Error::Adapter(format!("missing result in {} response", method)))?;

        serde_json::from_value(result.clone())
            .map_err(|e| Error::Adapter(format!("failed to deserialize {} result: {}", method, e)))
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("url", &self.url).finish()
    }
}

// ============================================================================
// Chain client
// ============================================================================

/// Node access over JSON-RPC
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    rpc: RpcClient,
    chain_id: u64,
}

impl RpcChainClient {
    /// Client for a node known to serve `chain_id`
    pub fn new(rpc: RpcClient, chain_id: u64) -> Self {
        Self { rpc, chain_id }
    }

    /// Ask the node for its chain id
    pub async fn connect(rpc: RpcClient) -> Result<Self> {
        let chain_id: U256 = rpc.request("eth_chainId", serde_json::json!([])).await?;
        let chain_id = u64::try_from(chain_id)
            .map_err(|_| Error::Adapter(format!("eth_chainId returned {}", chain_id)))?;
        Ok(Self { rpc, chain_id })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        self.rpc
            .request("eth_getCode", serde_json::json!([address, "latest"]))
            .await
    }

    async fn get_nonce(&self, entry_point: Address, account: Address, key: U256) -> Result<U256> {
        if key >> 192 != U256::ZERO {
            return Err(Error::Encoding(format!("nonce key {} exceeds uint192", key)));
        }
        let data = IEntryPoint::getNonceCall {
            sender: account,
            key: U192::from_be_slice(&key.to_be_bytes::<32>()[8..]),
        }
        .abi_encode();

        let result = self.call(entry_point, data.into()).await?;
        if result.len() < 32 {
            return Err(Error::Adapter(format!(
                "getNonce returned {} bytes",
                result.len()
            )));
        }
        Ok(U256::from_be_slice(&result[..32]))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.rpc
            .request(
                "eth_call",
                serde_json::json!([{ "to": to, "data": data }, "latest"]),
            )
            .await
    }
}

// ============================================================================
// Bundler client
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    user_op_hash: B256,
    sender: Address,
    nonce: U256,
    success: bool,
    actual_gas_cost: U256,
    actual_gas_used: U256,
    receipt: RpcTransactionReceipt,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransactionReceipt {
    transaction_hash: B256,
    block_number: U256,
}

impl TryFrom<RpcReceipt> for UserOperationReceipt {
    type Error = Error;

    fn try_from(receipt: RpcReceipt) -> Result<Self> {
        let block_number = u64::try_from(receipt.receipt.block_number).map_err(|_| {
            Error::Adapter(format!(
                "block number {} out of range",
                receipt.receipt.block_number
            ))
        })?;

        Ok(UserOperationReceipt {
            user_op_hash: receipt.user_op_hash,
            sender: receipt.sender,
            nonce: receipt.nonce,
            success: receipt.success,
            actual_gas_cost: receipt.actual_gas_cost,
            actual_gas_used: receipt.actual_gas_used,
            transaction_hash: receipt.receipt.transaction_hash,
            block_number,
        })
    }
}

/// ERC-4337 bundler over JSON-RPC
#[derive(Debug, Clone)]
pub struct RpcBundlerClient {
    rpc: RpcClient,
}

impl RpcBundlerClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl BundlerClient for RpcBundlerClient {
    async fn send_user_operation(&self, user_op: &UserOperation, entry_point: Address) -> Result<B256> {
        self.rpc
            .request(
                "eth_sendUserOperation",
                serde_json::json!([user_op.to_rpc_format(), entry_point]),
            )
            .await
    }

    async fn get_user_operation_receipt(&self, user_op_hash: B256) -> Result<Option<UserOperationReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .rpc
            .request("eth_getUserOperationReceipt", serde_json::json!([user_op_hash]))
            .await?;

        receipt.map(UserOperationReceipt::try_from).transpose()
    }
}

// ============================================================================
// Paymaster client
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsorResult {
    paymaster_and_data: Bytes,
}

/// Gas sponsorship over `pm_sponsorUserOperation`
#[derive(Debug, Clone)]
pub struct RpcPaymasterClient {
    rpc: RpcClient,
}

impl RpcPaymasterClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl PaymasterClient for RpcPaymasterClient {
    async fn sponsor_user_operation(&self, user_op: &UserOperation, entry_point: Address) -> Result<Bytes> {
        let result: SponsorResult = self
            .rpc
            .request(
                "pm_sponsorUserOperation",
                serde_json::json!([user_op.to_rpc_format(), entry_point]),
            )
            .await?;
        Ok(result.paymaster_and_data)
    }
}
