//! Error types for smart account operations

use thiserror::Error;

/// Result type alias for smart account operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building and signing user operations
#[derive(Debug, Error)]
pub enum Error {
    // ============ Configuration Errors ============
    /// Invalid account configuration (factory, index, entry point)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Chain client is connected to a different chain than the account expects
    #[error("Chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    // ============ Encoding Errors ============
    /// Empty batch or unknown call operation
    #[error("Invalid call kind: {0}")]
    InvalidCallKind(String),

    /// Two leaves for the same chain in one multi-chain commitment
    #[error("Duplicate chain {0} in multi-chain batch")]
    DuplicateChainInBatch(u64),

    /// Malformed input to an encoder or decoder
    #[error("Encoding error: {0}")]
    Encoding(String),

    // ============ Validator State Errors ============
    /// Regular validator used before any enable signature was produced
    #[error("Validator not enabled: {0}")]
    ValidatorNotEnabled(String),

    /// Approval redeemed against a different account, validator or key
    #[error("Approval mismatch: {0}")]
    ApprovalMismatch(String),

    /// Calls rejected by the session key's policy set
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    // ============ Signing Errors ============
    /// Key material declined, timed out or is not held by this handle
    #[error("Signing refused: {0}")]
    SigningRefused(String),

    /// Signature bytes could not be parsed
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    // ============ Adapter Errors ============
    /// Chain client, bundler or paymaster failure
    #[error("Adapter error: {0}")]
    Adapter(String),

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Coarse error classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fails before any network or signing call
    Configuration,
    /// Caller must fix the input
    Encoding,
    /// Validator or approval used in the wrong state
    ValidatorState,
    /// Key material refused to sign
    SigningRefused,
    /// Chain, bundler or paymaster failure
    Adapter,
    /// Persisted data could not be read or written
    Serialization,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_) | Error::ChainIdMismatch { .. } => ErrorKind::Configuration,
            Error::InvalidCallKind(_)
            | Error::DuplicateChainInBatch(_)
            | Error::Encoding(_)
            | Error::InvalidSignature(_) => ErrorKind::Encoding,
            Error::ValidatorNotEnabled(_)
            | Error::ApprovalMismatch(_)
            | Error::PolicyViolation(_) => ErrorKind::ValidatorState,
            Error::SigningRefused(_) => ErrorKind::SigningRefused,
            Error::Adapter(_) => ErrorKind::Adapter,
            Error::Serialization(_) | Error::Deserialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    /// The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::SigningRefused | ErrorKind::Adapter)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Deserialization(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Deserialization(e.to_string())
    }
}

impl From<alloy_sol_types::Error> for Error {
    fn from(e: alloy_sol_types::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}
