//! Session key policies
//!
//! A policy is a pure predicate over an account and the calls it is about to
//! make. Policies compose by conjunction in a fixed order (the order they were
//! added), the first rejection wins, and there is no partial approval.
//!
//! ## Supported Policies
//!
//! - **Sudo**: approves everything; used when the session key is fully trusted
//! - **Call**: every call must match one permission (target, optional selector,
//!   optional value cap); delegatecalls are never permitted
//! - **Value limit**: total native value across the batch is capped
//!
//! An empty [`PolicySet`] rejects everything.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kernel_account_core::policy::{CallPermission, Policy, PolicySet};
//!
//! let policies = PolicySet::new()
//!     .with(Policy::call(vec![CallPermission::new(token).with_selector(transfer)]))
//!     .with(Policy::value_limit(U256::ZERO));
//!
//! let decision = policies.evaluate(account, &calls);
//! ```

use crate::calls::{Call, CallKind};
use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use serde::{Deserialize, Serialize};

/// Decision from policy evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyDecision {
    /// Calls are allowed
    Approve,
    /// Calls are rejected with reason
    Reject { reason: String },
}

impl PolicyDecision {
    /// Check if the decision is an approval
    pub fn is_approved(&self) -> bool {
        matches!(self, PolicyDecision::Approve)
    }
}

/// One allowed call shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPermission {
    /// Contract that may be called
    pub target: Address,
    /// Function that may be called (any when unset)
    #[serde(default)]
    pub selector: Option<FixedBytes<4>>,
    /// Maximum value per call (unbounded when unset)
    #[serde(default)]
    pub max_value: Option<U256>,
}

impl CallPermission {
    /// Allow any zero-or-more-value call to `target`
    pub fn new(target: Address) -> Self {
        Self {
            target,
            selector: None,
            max_value: None,
        }
    }

    /// Restrict to one function
    pub fn with_selector(mut self, selector: [u8; 4]) -> Self {
        self.selector = Some(FixedBytes(selector));
        self
    }

    /// Cap the value of each call
    pub fn with_max_value(mut self, max_value: U256) -> Self {
        self.max_value = Some(max_value);
        self
    }

    fn matches(&self, call: &Call) -> bool {
        if call.to != self.target {
            return false;
        }
        if let Some(selector) = self.selector
            && call.selector() != Some(selector.0)
        {
            return false;
        }
        match self.max_value {
            Some(max) => call.value <= max,
            None => true,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let mut flags = 0u8;
        if self.selector.is_some() {
            flags |= 0b01;
        }
        if self.max_value.is_some() {
            flags |= 0b10;
        }
        out.push(flags);
        out.extend_from_slice(self.target.as_slice());
        out.extend_from_slice(self.selector.unwrap_or_default().as_slice());
        out.extend_from_slice(&self.max_value.unwrap_or_default().to_be_bytes::<32>());
    }
}

/// A single policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Policy {
    /// Always approves
    Sudo,
    /// Calls must match one of the permissions
    Call { permissions: Vec<CallPermission> },
    /// Total value across the batch may not exceed `max_value`
    ValueLimit { max_value: U256 },
}

impl Policy {
    /// Call policy from permissions
    pub fn call(permissions: Vec<CallPermission>) -> Self {
        Policy::Call { permissions }
    }

    /// Value limit policy
    pub fn value_limit(max_value: U256) -> Self {
        Policy::ValueLimit { max_value }
    }

    /// Evaluate this policy against a batch
    pub fn evaluate(&self, account: Address, calls: &[Call]) -> PolicyDecision {
        match self {
            Policy::Sudo => PolicyDecision::Approve,
            Policy::Call { permissions } => {
                for (i, call) in calls.iter().enumerate() {
                    if call.kind == CallKind::DelegateCall {
                        return PolicyDecision::Reject {
                            reason: format!(
                                "Call {} from {} is a delegatecall to {}",
                                i, account, call.to
                            ),
                        };
                    }
                    if !permissions.iter().any(|p| p.matches(call)) {
                        return PolicyDecision::Reject {
                            reason: format!(
                                "Call {} from {} to {} is not permitted",
                                i, account, call.to
                            ),
                        };
                    }
                }
                PolicyDecision::Approve
            }
            Policy::ValueLimit { max_value } => {
                let total = calls
                    .iter()
                    .try_fold(U256::ZERO, |acc, call| acc.checked_add(call.value));
                match total {
                    Some(total) if total <= *max_value => PolicyDecision::Approve,
                    Some(total) => PolicyDecision::Reject {
                        reason: format!(
                            "Batch value {} exceeds limit {} for {}",
                            total, max_value, account
                        ),
                    },
                    None => PolicyDecision::Reject {
                        reason: "batch value overflows".into(),
                    },
                }
            }
        }
    }

    /// Descriptor installed on chain: `type || body`
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::new();
        match self {
            Policy::Sudo => out.push(0x00),
            Policy::Call { permissions } => {
                out.push(0x01);
                for permission in permissions {
                    permission.encode_into(&mut out);
                }
            }
            Policy::ValueLimit { max_value } => {
                out.push(0x02);
                out.extend_from_slice(&max_value.to_be_bytes::<32>());
            }
        }
        out.into()
    }
}

/// Ordered conjunction of policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicySet(Vec<Policy>);

impl PolicySet {
    /// Create an empty set, which denies everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing only the sudo policy
    pub fn sudo() -> Self {
        Self(vec![Policy::Sudo])
    }

    /// Append a policy; evaluation follows insertion order
    pub fn with(mut self, policy: Policy) -> Self {
        self.0.push(policy);
        self
    }

    /// Policies in evaluation order
    pub fn policies(&self) -> &[Policy] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluate all policies; an empty set rejects
    pub fn evaluate(&self, account: Address, calls: &[Call]) -> PolicyDecision {
        if self.0.is_empty() {
            return PolicyDecision::Reject {
                reason: "no policies configured".into(),
            };
        }

        for policy in &self.0 {
            let decision = policy.evaluate(account, calls);
            if !decision.is_approved() {
                return decision;
            }
        }
        PolicyDecision::Approve
    }

    /// Descriptors in evaluation order
    pub fn descriptors(&self) -> Vec<Bytes> {
        self.0.iter().map(Policy::encode).collect()
    }
}

impl From<Vec<Policy>> for PolicySet {
    fn from(policies: Vec<Policy>) -> Self {
        Self(policies)
    }
}
