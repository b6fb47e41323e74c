//! Key material behind validators
//!
//! A [`Signer`] signs raw 32-byte digests. Implementations may be local keys,
//! hardware wallets or remote signers; every call may suspend and either
//! returns a complete signature or fails with [`Error::SigningRefused`].

use crate::types::{Signature, address_from_key};
use crate::{Error, Result};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use std::fmt;

/// Signs 32-byte digests with a secp256k1 key
#[async_trait]
pub trait Signer: Send + Sync + fmt::Debug {
    /// Address of the key
    fn address(&self) -> Address;

    /// Sign a prehashed digest. No further hashing is applied.
    async fn sign_hash(&self, hash: &B256) -> Result<Signature>;
}

/// In-process secp256k1 key
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    /// Generate a fresh random key
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Load a key from its 32-byte scalar
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| Error::InvalidConfig(format!("invalid private key: {}", e)))?;
        Ok(Self::from_signing_key(key))
    }

    /// Load a key from hex, with or without `0x`
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| Error::InvalidConfig("private key must be 32 bytes".into()))?;
        Self::from_bytes(&bytes)
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let address = address_from_key(key.verifying_key());
        Self { key, address }
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| Error::SigningRefused(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(Signature::new(r, s, recovery_id.to_byte()))
    }
}
