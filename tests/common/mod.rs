//! Shared fixtures and mocks. Each test crate uses a different subset.
#![allow(dead_code)]

pub mod mocks;
pub mod test_helpers;
