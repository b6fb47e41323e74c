//! Core types shared by the signing paths
//!
//! ECDSA signatures in the `r || s || v` layout the Kernel validators verify,
//! plus the Keccak and EIP-191 hashing helpers.

use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use k256::{
    ecdsa::{self, RecoveryId, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

/// Length of an `r || s || v` signature
pub const SIGNATURE_LENGTH: usize = 65;

/// ECDSA signature (r, s, v)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// S component (32 bytes)
    pub s: [u8; 32],
    /// Recovery ID (0 or 1)
    pub recovery_id: u8,
}

impl Signature {
    /// Create a new signature
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }

    /// Parse a 65-byte `r || s || v` signature. `v` may be 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(Error::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LENGTH,
                bytes.len()
            )));
        }

        let recovery_id = match bytes[64] {
            0 | 1 => bytes[64],
            27 | 28 => bytes[64] - 27,
            v => return Err(Error::InvalidSignature(format!("invalid v value {}", v))),
        };

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, recovery_id })
    }

    /// Convert to bytes (r || s || v) with `v` in {27, 28}
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v();
        bytes
    }

    /// Get v value as checked by `ecrecover`
    pub fn v(&self) -> u8 {
        self.recovery_id + 27
    }

    /// Recover the signer address for a 32-byte prehash
    pub fn recover(&self, prehash: &B256) -> Result<Address> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);

        let signature = ecdsa::Signature::from_slice(&rs)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.recovery_id).ok_or_else(|| {
            Error::InvalidSignature(format!("invalid recovery id {}", self.recovery_id))
        })?;

        let key = VerifyingKey::recover_from_prehash(prehash.as_slice(), &signature, recovery_id)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        Ok(address_from_key(&key))
    }
}

/// Derive the Ethereum address of a secp256k1 public key
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed prefix
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Keccak-256 hash
pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    B256::from(hash)
}

/// EIP-191 personal message hash of a 32-byte digest:
/// keccak256("\x19Ethereum Signed Message:\n32" || hash)
pub fn hash_message(hash: &B256) -> B256 {
    let mut hasher = Keccak::v256();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.as_slice());
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    B256::from(out)
}

/// Recover the signer of an EIP-191 signature over `hash`.
/// Returns `false` instead of an error when the bytes are not a signature.
pub fn is_signed_by(hash: &B256, signature: &[u8], signer: Address) -> bool {
    Signature::from_bytes(signature)
        .and_then(|sig| sig.recover(&hash_message(hash)))
        .map(|recovered| recovered == signer)
        .unwrap_or(false)
}

// ============================================================================
// Big-endian readers
// ============================================================================

/// Read `len` bytes at `*i` and advance
pub(crate) fn read_slice<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = i
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| {
            Error::Encoding(format!(
                "need {} bytes at offset {}, have {}",
                len,
                i,
                bytes.len()
            ))
        })?;
    let out = &bytes[*i..end];
    *i = end;
    Ok(out)
}

/// Read a 32-byte word as `U256`
pub(crate) fn read_u256(bytes: &[u8], i: &mut usize) -> Result<U256> {
    Ok(U256::from_be_slice(read_slice(bytes, i, 32)?))
}

/// Read a 32-byte word as a length that fits in memory
pub(crate) fn read_len(bytes: &[u8], i: &mut usize) -> Result<usize> {
    let len = read_u256(bytes, i)?;
    usize::try_from(len).map_err(|_| Error::Encoding(format!("length {} overflows", len)))
}

/// Read a big-endian `uint48`
pub(crate) fn read_u48(bytes: &[u8], i: &mut usize) -> Result<u64> {
    let raw = read_slice(bytes, i, 6)?;
    let mut buf = [0u8; 8];
    buf[2..].copy_from_slice(raw);
    Ok(u64::from_be_bytes(buf))
}

/// Read a packed 20-byte address
pub(crate) fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address> {
    Ok(Address::from_slice(read_slice(bytes, i, 20)?))
}
