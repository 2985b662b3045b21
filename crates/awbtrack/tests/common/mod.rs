//! Shared test utilities for awbtrack integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a `JobEngine` to a stub lookup and a recording sink
//! - Builders for CSV uploads

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{RecordingSink, StubLookup, TestHarness};
