//! Unit tests for ERC-6492 predeploy signatures

use alloy_primitives::{Bytes, address};
use kernel_account_core::predeploy::{
    ERC6492_MAGIC, is_predeploy_signature, unwrap_signature, wrap_signature,
};
use kernel_account_core::Error;

#[test]
fn test_deployed_signature_unchanged() {
    let signature = Bytes::from(vec![0x11; 65]);
    let factory = address!("5de4839a76cf55d0c90e2061ef4386d962E15ae3");
    let wrapped = wrap_signature(signature.clone(), true, factory, Bytes::from(vec![1, 2, 3]));
    assert_eq!(wrapped, signature);
    assert!(!is_predeploy_signature(&wrapped));
}

#[test]
fn test_wrap_unwrap_roundtrip() {
    let signature = Bytes::from(vec![0x22; 69]);
    let factory = address!("5de4839a76cf55d0c90e2061ef4386d962E15ae3");
    let factory_data = Bytes::from(vec![0x33; 100]);

    let wrapped = wrap_signature(signature.clone(), false, factory, factory_data.clone());
    assert!(wrapped.ends_with(ERC6492_MAGIC.as_slice()));

    let inner = unwrap_signature(&wrapped).unwrap();
    assert_eq!(inner.signature, signature);
    assert_eq!(inner.factory, factory);
    assert_eq!(inner.factory_data, factory_data);
    assert_eq!(inner.encode(), wrapped);
}

#[test]
fn test_unwrap_requires_magic() {
    let err = unwrap_signature(&[0u8; 65]).unwrap_err();
    assert!(matches!(err, Error::InvalidSignature(_)));
}

#[test]
fn test_unwrap_rejects_corrupt_body() {
    let mut corrupt = vec![0xff; 40];
    corrupt.extend_from_slice(ERC6492_MAGIC.as_slice());
    assert!(unwrap_signature(&corrupt).is_err());
}
