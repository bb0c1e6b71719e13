//! Common test utilities for server integration tests

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod helpers;

pub use helpers::*;
