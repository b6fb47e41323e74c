//! ERC-6492 signatures for accounts that are not deployed yet.
//!
//! Envelope layout: `abi.encode(address factory, bytes factoryCalldata, bytes signature) || MAGIC`.
//! A verifier that sees the magic suffix deploys (or simulates deploying) the
//! account through the factory before checking the inner signature.

use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes, b256};
use alloy_sol_types::SolValue;

/// Trailing magic value of an ERC-6492 envelope
pub const ERC6492_MAGIC: B256 =
    b256!("6492649264926492649264926492649264926492649264926492649264926492");

/// Contents of an ERC-6492 envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredeploySignature {
    /// Factory that deploys the account
    pub factory: Address,
    /// Call data for the factory
    pub factory_data: Bytes,
    /// Signature the deployed account will check
    pub signature: Bytes,
}

impl PredeploySignature {
    /// Encode as an ERC-6492 envelope
    pub fn encode(&self) -> Bytes {
        let mut out = (
            self.factory,
            self.factory_data.clone(),
            self.signature.clone(),
        )
            .abi_encode_params();
        out.extend_from_slice(ERC6492_MAGIC.as_slice());
        out.into()
    }
}

/// Wrap `signature` for an undeployed account; deployed accounts get it back unchanged
pub fn wrap_signature(
    signature: Bytes,
    is_deployed: bool,
    factory: Address,
    factory_data: Bytes,
) -> Bytes {
    if is_deployed {
        return signature;
    }

    PredeploySignature {
        factory,
        factory_data,
        signature,
    }
    .encode()
}

/// Whether `signature` ends with the ERC-6492 magic suffix
pub fn is_predeploy_signature(signature: &[u8]) -> bool {
    signature.ends_with(ERC6492_MAGIC.as_slice())
}

/// Split an ERC-6492 envelope into its parts
pub fn unwrap_signature(signature: &[u8]) -> Result<PredeploySignature> {
    if !is_predeploy_signature(signature) {
        return Err(Error::InvalidSignature(
            "missing ERC-6492 magic suffix".into(),
        ));
    }

    let body = &signature[..signature.len() - 32];
    let (factory, factory_data, signature) = <(Address, Bytes, Bytes)>::abi_decode_params(body)?;

    Ok(PredeploySignature {
        factory,
        factory_data,
        signature,
    })
}
