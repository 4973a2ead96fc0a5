//! Integration testing module
//!
//! End-to-end tests for the relay server:
//! - Route behavior against a scripted provider
//! - The real player adapter against a mock upstream
//! - Streaming over a live socket

pub mod e2e;
