//! Unit tests module
//!
//! This module contains unit tests for individual components:
//! - Call encoding
//! - Predeploy signatures
//! - Policies
//! - Merkle commitments

pub mod call_encoder_test;
pub mod merkle_test;
pub mod policy_test;
pub mod predeploy_test;
