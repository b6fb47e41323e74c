//! Integration tests module
//!
//! End-to-end flows over the in-memory chain and bundler:
//! - Validator enable flow
//! - Multi-chain signing
//! - Session key approvals

pub mod approval_test;
