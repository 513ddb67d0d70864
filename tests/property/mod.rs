//! Property-based tests using proptest
//!
//! Tests parsing invariants and decision properties.

pub mod decider_tests;
pub mod distribution_tests;
