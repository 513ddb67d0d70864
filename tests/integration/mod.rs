//! Integration test module
//!
//! Contains end-to-end tests for both servers and the simulator.

pub mod common;
pub mod ping_tests;
pub mod pong_tests;
pub mod simulator_tests;
