//! In-memory chain and bundler for testing and local development
//!
//! [`MemoryChain`] answers the reads the core performs (code presence, nonces,
//! installed validators). [`MemoryBundler`] records submitted operations and,
//! when attached to a chain, applies the state changes an EntryPoint would:
//! deploying the sender, consuming the nonce and remembering validators
//! enabled in-band.

use super::{BundlerClient, ChainClient};
use crate::account::{UserOperation, UserOperationReceipt};
use crate::contracts::IKernel;
use crate::validator::{EnableSignature, ValidatorMode};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes, FixedBytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Placeholder bytecode for deployed accounts
const DEPLOYED_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40];

#[derive(Debug, Default)]
struct ChainState {
    code: HashMap<Address, Bytes>,
    nonces: HashMap<(Address, U256), U256>,
    /// (account, selector) -> validator
    executions: HashMap<(Address, [u8; 4]), Address>,
    /// Error returned by every read while set
    failure: Option<String>,
}

/// In-memory chain state
#[derive(Debug, Clone)]
pub struct MemoryChain {
    chain_id: u64,
    state: Arc<RwLock<ChainState>>,
}

impl MemoryChain {
    /// Create an empty chain
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Arc::new(RwLock::new(ChainState::default())),
        }
    }

    /// Mark `address` as deployed
    pub fn deploy(&self, address: Address) {
        self.state
            .write()
            .code
            .insert(address, Bytes::from_static(DEPLOYED_CODE));
    }

    /// Set the EntryPoint nonce for `(account, key)`
    pub fn set_nonce(&self, account: Address, key: U256, nonce: U256) {
        self.state.write().nonces.insert((account, key), nonce);
    }

    /// Record `validator` as installed on `account` for `selector`
    pub fn install_validator(&self, account: Address, selector: [u8; 4], validator: Address) {
        self.state
            .write()
            .executions
            .insert((account, selector), validator);
    }

    /// Make every read fail with `message` until cleared with `None`
    pub fn set_failure(&self, message: Option<&str>) {
        self.state.write().failure = message.map(str::to_string);
    }

    fn check_failure(&self) -> Result<()> {
        match &self.state.read().failure {
            Some(message) => Err(Error::Adapter(message.clone())),
            None => Ok(()),
        }
    }

    fn consume_nonce(&self, account: Address, nonce: U256) {
        // The upper 192 bits of a v0.6 nonce are the key
        let key = nonce >> 64;
        let mut state = self.state.write();
        let entry = state.nonces.entry((account, key)).or_insert(U256::ZERO);
        *entry += U256::from(1);
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_code(&self, address: Address) -> Result<Bytes> {
        self.check_failure()?;
        Ok(self
            .state
            .read()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_nonce(&self, _entry_point: Address, account: Address, key: U256) -> Result<U256> {
        self.check_failure()?;
        let sequence = self
            .state
            .read()
            .nonces
            .get(&(account, key))
            .copied()
            .unwrap_or(U256::ZERO);
        Ok((key << 64) | sequence)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.check_failure()?;
        let state = self.state.read();

        if !state.code.contains_key(&to) {
            return Ok(Bytes::new());
        }

        if data.starts_with(&IKernel::getExecutionCall::SELECTOR) {
            let request = IKernel::getExecutionCall::abi_decode(&data)?;
            let validator = state
                .executions
                .get(&(to, request.selector.0))
                .copied()
                .unwrap_or(Address::ZERO);

            // (uint48 validAfter, uint48 validUntil, address executor, address validator)
            let mut out = vec![0u8; 128];
            out[108..128].copy_from_slice(validator.as_slice());
            return Ok(out.into());
        }

        Err(Error::Adapter(format!(
            "memory chain does not support call to {} with selector 0x{}",
            to,
            hex::encode(data.get(..4).unwrap_or_default())
        )))
    }
}

/// In-memory bundler
#[derive(Debug, Clone)]
pub struct MemoryBundler {
    chain_id: u64,
    chain: Option<MemoryChain>,
    submitted: Arc<RwLock<Vec<(B256, UserOperation)>>>,
    receipts: Arc<RwLock<HashMap<B256, UserOperationReceipt>>>,
}

impl MemoryBundler {
    /// Bundler that only records submissions
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            chain: None,
            submitted: Arc::new(RwLock::new(Vec::new())),
            receipts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bundler that applies submissions to `chain`
    pub fn attached(chain: MemoryChain) -> Self {
        let mut bundler = Self::new(chain.chain_id);
        bundler.chain = Some(chain);
        bundler
    }

    /// Operations submitted so far, in order
    pub fn submitted(&self) -> Vec<UserOperation> {
        self.submitted
            .read()
            .iter()
            .map(|(_, op)| op.clone())
            .collect()
    }

    /// Apply `user_op` to `chain`. A malformed enable signature is rejected
    /// before any state changes, as the EntryPoint would revert.
    fn apply(&self, chain: &MemoryChain, user_op: &UserOperation) -> Result<()> {
        let enabled = if ValidatorMode::from_signature(&user_op.signature) == Some(ValidatorMode::Enable) {
            let selector = user_op
                .call_data
                .get(..4)
                .map(FixedBytes::<4>::from_slice)
                .ok_or_else(|| Error::Encoding("enable mode needs a call data selector".into()))?;
            let enable = EnableSignature::decode(&user_op.signature, selector.0)?;
            Some((selector.0, enable.enable_data.validator))
        } else {
            None
        };

        if user_op.deploys_account() {
            chain.deploy(user_op.sender);
        }
        chain.consume_nonce(user_op.sender, user_op.nonce);
        if let Some((selector, validator)) = enabled {
            chain.install_validator(user_op.sender, selector, validator);
        }
        Ok(())
    }
}

#[async_trait]
impl BundlerClient for MemoryBundler {
    async fn send_user_operation(&self, user_op: &UserOperation, entry_point: Address) -> Result<B256> {
        let hash = user_op.hash(entry_point, self.chain_id);

        if let Some(chain) = &self.chain {
            self.apply(chain, user_op)?;
        }

        self.submitted.write().push((hash, user_op.clone()));
        self.receipts.write().insert(
            hash,
            UserOperationReceipt {
                user_op_hash: hash,
                sender: user_op.sender,
                nonce: user_op.nonce,
                success: true,
                actual_gas_cost: U256::ZERO,
                actual_gas_used: U256::ZERO,
                transaction_hash: hash,
                block_number: 1,
            },
        );
        Ok(hash)
    }

    async fn get_user_operation_receipt(&self, user_op_hash: B256) -> Result<Option<UserOperationReceipt>> {
        Ok(self.receipts.read().get(&user_op_hash).cloned())
    }
}
