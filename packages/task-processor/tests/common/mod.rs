//! Common test utilities for task processor integration tests
//!
//! Provides recording tasks and in-memory collaborators so the processor
//! and the built-in jobs can be exercised without real storage.

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;
