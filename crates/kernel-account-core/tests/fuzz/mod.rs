//! Fuzz tests module
//!
//! Property-based testing using proptest to find edge cases in the encoders
//! and decoders.

pub mod encoding_fuzz;
