//! ERC-4337 UserOperation (EntryPoint v0.6 layout)

use crate::types::keccak256;
use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// ERC-4337 UserOperation (v0.6 format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Smart account address
    pub sender: Address,
    /// Anti-replay nonce
    pub nonce: U256,
    /// Account initialization code (empty if account exists)
    pub init_code: Bytes,
    /// Encoded call to execute
    pub call_data: Bytes,
    /// Gas for the execution phase
    pub call_gas_limit: U256,
    /// Gas for validation and account creation
    pub verification_gas_limit: U256,
    /// Pre-verification gas
    pub pre_verification_gas: U256,
    /// Maximum fee per gas
    pub max_fee_per_gas: U256,
    /// Maximum priority fee per gas
    pub max_priority_fee_per_gas: U256,
    /// Paymaster and data (empty if self-paying)
    pub paymaster_and_data: Bytes,
    /// Signature
    pub signature: Bytes,
}

impl UserOperation {
    /// Create a new UserOperation with zeroed gas fields
    pub fn new(sender: Address, nonce: U256, call_data: Bytes) -> Self {
        Self {
            sender,
            nonce,
            init_code: Bytes::new(),
            call_data,
            call_gas_limit: U256::ZERO,
            verification_gas_limit: U256::ZERO,
            pre_verification_gas: U256::ZERO,
            max_fee_per_gas: U256::ZERO,
            max_priority_fee_per_gas: U256::ZERO,
            paymaster_and_data: Bytes::new(),
            signature: Bytes::new(),
        }
    }

    /// Set init code for account deployment
    pub fn with_init_code(mut self, init_code: Bytes) -> Self {
        self.init_code = init_code;
        self
    }

    /// Set gas limits
    pub fn with_gas_limits(
        mut self,
        call_gas: u64,
        verification_gas: u64,
        pre_verification_gas: u64,
    ) -> Self {
        self.call_gas_limit = U256::from(call_gas);
        self.verification_gas_limit = U256::from(verification_gas);
        self.pre_verification_gas = U256::from(pre_verification_gas);
        self
    }

    /// Set gas prices
    pub fn with_gas_prices(mut self, max_fee: u128, max_priority_fee: u128) -> Self {
        self.max_fee_per_gas = U256::from(max_fee);
        self.max_priority_fee_per_gas = U256::from(max_priority_fee);
        self
    }

    /// Set paymaster sponsorship data, verbatim
    pub fn with_paymaster_and_data(mut self, paymaster_and_data: Bytes) -> Self {
        self.paymaster_and_data = paymaster_and_data;
        self
    }

    /// Set signature
    pub fn with_signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }

    /// Whether this operation deploys its sender
    pub fn deploys_account(&self) -> bool {
        !self.init_code.is_empty()
    }

    /// Calculate the UserOperation hash for signing (v0.6 format):
    /// keccak256(keccak256(pack(op)) || entryPoint || chainId)
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let inner_hash = keccak256(&self.pack_for_hash());

        let mut buf = Vec::with_capacity(96);
        buf.extend_from_slice(inner_hash.as_slice());

        // entryPoint (address - 32 bytes padded)
        buf.extend_from_slice(&[0u8; 12]);
        buf.extend_from_slice(entry_point.as_slice());

        buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
        keccak256(&buf)
    }

    /// Pack every field except the signature
    fn pack_for_hash(&self) -> Vec<u8> {
        let mut packed = Vec::with_capacity(32 * 10);

        // sender (address - 32 bytes padded)
        packed.extend_from_slice(&[0u8; 12]);
        packed.extend_from_slice(self.sender.as_slice());

        packed.extend_from_slice(&self.nonce.to_be_bytes::<32>());

        // dynamic fields are committed by hash
        packed.extend_from_slice(keccak256(&self.init_code).as_slice());
        packed.extend_from_slice(keccak256(&self.call_data).as_slice());

        packed.extend_from_slice(&self.call_gas_limit.to_be_bytes::<32>());
        packed.extend_from_slice(&self.verification_gas_limit.to_be_bytes::<32>());
        packed.extend_from_slice(&self.pre_verification_gas.to_be_bytes::<32>());
        packed.extend_from_slice(&self.max_fee_per_gas.to_be_bytes::<32>());
        packed.extend_from_slice(&self.max_priority_fee_per_gas.to_be_bytes::<32>());

        packed.extend_from_slice(keccak256(&self.paymaster_and_data).as_slice());

        packed
    }

    /// Convert to JSON-RPC format
    pub fn to_rpc_format(&self) -> serde_json::Value {
        serde_json::json!({
            "sender": self.sender.to_string(),
            "nonce": format!("{:#x}", self.nonce),
            "initCode": self.init_code.to_string(),
            "callData": self.call_data.to_string(),
            "callGasLimit": format!("{:#x}", self.call_gas_limit),
            "verificationGasLimit": format!("{:#x}", self.verification_gas_limit),
            "preVerificationGas": format!("{:#x}", self.pre_verification_gas),
            "maxFeePerGas": format!("{:#x}", self.max_fee_per_gas),
            "maxPriorityFeePerGas": format!("{:#x}", self.max_priority_fee_per_gas),
            "paymasterAndData": self.paymaster_and_data.to_string(),
            "signature": self.signature.to_string(),
        })
    }
}

/// Receipt for an included UserOperation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    pub nonce: U256,
    pub success: bool,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    pub transaction_hash: B256,
    pub block_number: u64,
}
