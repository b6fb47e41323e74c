//! Call encoding
//!
//! Turns one or more intended calls into the single `callData` payload the
//! Kernel account executes:
//!
//! - a single call to the account itself is passed through unchanged
//! - any other single call is wrapped in `execute(to, value, data, operation)`
//! - a batch becomes one delegatecall to the `MultiSend` helper, which runs the
//!   inner calls in order and reverts the whole batch if any of them fails

use crate::contracts::{IKernel, IMultiSend};
use crate::{Error, Result};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};

/// How a call is executed by the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Ordinary CALL
    #[default]
    Call,
    /// DELEGATECALL in the account's context
    DelegateCall,
}

impl CallKind {
    /// Operation byte used by `execute` and `MultiSend`
    pub fn operation(&self) -> u8 {
        match self {
            CallKind::Call => 0,
            CallKind::DelegateCall => 1,
        }
    }
}

impl TryFrom<u8> for CallKind {
    type Error = Error;

    fn try_from(operation: u8) -> Result<Self> {
        match operation {
            0 => Ok(CallKind::Call),
            1 => Ok(CallKind::DelegateCall),
            other => Err(Error::InvalidCallKind(format!(
                "unknown operation {}",
                other
            ))),
        }
    }
}

/// One intended on-chain call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Target contract or EOA
    pub to: Address,
    /// Native value sent with the call
    pub value: U256,
    /// Call data
    pub data: Bytes,
    /// Call or delegatecall
    #[serde(default)]
    pub kind: CallKind,
}

impl Call {
    /// Create an ordinary call
    pub fn new(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value,
            data: data.into(),
            kind: CallKind::Call,
        }
    }

    /// Create a delegatecall
    pub fn delegate(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
            kind: CallKind::DelegateCall,
        }
    }

    /// Function selector of the call data, if any
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }
}

/// Encode calls into the account's `callData`.
///
/// A single plain call to the account itself is passed through as raw call
/// data. A self-call with `DelegateCall` kind is still wrapped in `execute`
/// so the operation byte reaches the account.
pub fn encode_calls(account: Address, multi_send: Address, calls: &[Call]) -> Result<Bytes> {
    match calls {
        [] => Err(Error::InvalidCallKind("empty call batch".into())),
        [call] if call.to == account && call.kind == CallKind::Call => Ok(call.data.clone()),
        [call] => Ok(encode_execute(call)),
        batch => {
            let inner = IMultiSend::multiSendCall {
                transactions: encode_multi_send(batch),
            }
            .abi_encode();
            Ok(encode_execute(&Call::delegate(multi_send, inner)))
        }
    }
}

/// Encode `execute(address,uint256,bytes,uint8)`
pub fn encode_execute(call: &Call) -> Bytes {
    IKernel::executeCall {
        to: call.to,
        value: call.value,
        data: call.data.clone(),
        operation: call.kind.operation(),
    }
    .abi_encode()
    .into()
}

/// Pack calls in the `MultiSend` layout:
/// `uint8 operation || address to || uint256 value || uint256 length || data` per call
pub fn encode_multi_send(calls: &[Call]) -> Bytes {
    let size = calls.iter().map(|c| 1 + 20 + 32 + 32 + c.data.len()).sum();
    let mut packed = Vec::with_capacity(size);
    for call in calls {
        packed.push(call.kind.operation());
        packed.extend_from_slice(call.to.as_slice());
        packed.extend_from_slice(&call.value.to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(call.data.len()).to_be_bytes::<32>());
        packed.extend_from_slice(&call.data);
    }
    packed.into()
}

/// Recover the calls an account `callData` will execute, in execution order
pub fn decode_calls(account: Address, multi_send: Address, call_data: &[u8]) -> Result<Vec<Call>> {
    if !call_data.starts_with(&IKernel::executeCall::SELECTOR) {
        return Ok(vec![Call::new(account, U256::ZERO, call_data.to_vec())]);
    }

    let execute = IKernel::executeCall::abi_decode(call_data)?;
    let kind = CallKind::try_from(execute.operation)?;

    if execute.to == multi_send
        && kind == CallKind::DelegateCall
        && execute.data.starts_with(&IMultiSend::multiSendCall::SELECTOR)
    {
        let batch = IMultiSend::multiSendCall::abi_decode(&execute.data)?;
        return decode_multi_send(&batch.transactions);
    }

    Ok(vec![Call {
        to: execute.to,
        value: execute.value,
        data: execute.data,
        kind,
    }])
}

/// Unpack a `MultiSend` payload
pub fn decode_multi_send(packed: &[u8]) -> Result<Vec<Call>> {
    let mut calls = Vec::new();
    let mut i = 0usize;

    while i < packed.len() {
        let header = packed
            .get(i..i + 85)
            .ok_or_else(|| Error::Encoding("truncated multi-send header".into()))?;
        let kind = CallKind::try_from(header[0])?;
        let to = Address::from_slice(&header[1..21]);
        let value = U256::from_be_slice(&header[21..53]);
        let len = usize::try_from(U256::from_be_slice(&header[53..85]))
            .map_err(|_| Error::Encoding("multi-send data length overflow".into()))?;
        i += 85;

        let end = i
            .checked_add(len)
            .ok_or_else(|| Error::Encoding("multi-send data length overflow".into()))?;
        let data = packed
            .get(i..end)
            .ok_or_else(|| Error::Encoding("truncated multi-send data".into()))?;
        i = end;

        calls.push(Call {
            to,
            value,
            data: Bytes::copy_from_slice(data),
            kind,
        });
    }

    Ok(calls)
}
